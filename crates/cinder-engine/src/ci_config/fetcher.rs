/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use super::location::Location;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

/// Loads the raw text of included files.
pub trait ContentFetcher {
    fn fetch(&self, location: &Location) -> Result<String, String>;

    /// Fetches several files at once. Results are in the order of `locations`.
    fn fetch_batch(&self, locations: &[&Location]) -> Vec<Result<String, String>> {
        locations.iter().map(|l| self.fetch(l)).collect()
    }
}

/// Reads local includes from `root` and project includes from
/// `root/<project>/`. Remote includes are refused.
#[derive(Debug, Clone)]
pub struct FileSystemFetcher {
    root: PathBuf,
}

impl FileSystemFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSystemFetcher { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: PathBuf, location: &Location) -> Result<String, String> {
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => format!("{} does not exist!", location.describe()),
            _ => format!("{} could not be read: {}", location.describe(), e),
        })
    }
}

impl ContentFetcher for FileSystemFetcher {
    fn fetch(&self, location: &Location) -> Result<String, String> {
        match location {
            Location::Local { path } => self.read(self.root.join(path), location),
            Location::Project { project, file } => {
                self.read(self.root.join(project).join(file), location)
            }
            Location::Remote { .. } => Err(format!(
                "{} could not be fetched, remote includes are not served from disk!",
                location.describe()
            )),
        }
    }

    fn fetch_batch(&self, locations: &[&Location]) -> Vec<Result<String, String>> {
        thread::scope(|scope| {
            let handles: Vec<_> = locations
                .iter()
                .map(|location| scope.spawn(move || self.fetch(location)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err("Include fetch thread panicked".to_string()))
                })
                .collect()
        })
    }
}
