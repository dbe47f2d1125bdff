/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use std::fmt;
use std::path::{Component, Path};
use url::Url;

/// Where an included file comes from. Doubles as the file's identity in the
/// expand set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Path relative to the repository root.
    Local { path: String },
    /// File in another project.
    Project { project: String, file: String },
    /// http(s) address.
    Remote { address: String },
}

fn has_yaml_extension(path: &str) -> bool {
    path.ends_with(".yml") || path.ends_with(".yaml")
}

fn escapes_root(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}

impl Location {
    pub fn local(path: &str) -> Self {
        Location::Local {
            path: path.trim_start_matches('/').to_string(),
        }
    }

    pub fn project(project: &str, file: &str) -> Self {
        Location::Project {
            project: project.to_string(),
            file: file.trim_start_matches('/').to_string(),
        }
    }

    pub fn remote(address: &str) -> Self {
        Location::Remote {
            address: address.to_string(),
        }
    }

    /// Resolves a location found inside a file of `project`. Local paths
    /// there refer to the same project; other locations are unchanged.
    pub fn within_project(self, project: &str) -> Self {
        match self {
            Location::Local { path } => Location::Project {
                project: project.to_string(),
                file: path,
            },
            other => other,
        }
    }

    /// Human readable prefix used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Location::Local { path } => format!("Local file `{}`", path),
            Location::Project { project, file } => {
                format!("Project `{}` file `{}`", project, file)
            }
            Location::Remote { address } => format!("Remote file `{}`", address),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let path = match self {
            Location::Local { path } => path.clone(),
            Location::Project { file, .. } => file.clone(),
            Location::Remote { address } => {
                let url = Url::parse(address).map_err(|_| {
                    format!("{} does not have a valid address!", self.describe())
                })?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(format!("{} does not have a valid address!", self.describe()));
                }
                url.path().to_string()
            }
        };

        if !has_yaml_extension(&path) {
            return Err(format!(
                "{} does not have a valid YAML extension!",
                self.describe()
            ));
        }

        if escapes_root(&path) {
            return Err(format!(
                "{} cannot reference a parent directory!",
                self.describe()
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local { path } => write!(f, "local:{}", path),
            Location::Project { project, file } => write!(f, "project:{}:{}", project, file),
            Location::Remote { address } => write!(f, "remote:{}", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_locations() {
        assert!(Location::local("/templates/build.yml").validate().is_ok());
        assert!(Location::project("group/shared", "ci/test.yaml")
            .validate()
            .is_ok());
        assert!(Location::remote("https://example.com/ci/deploy.yml?ref=main")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_leading_slash_is_stripped() {
        assert_eq!(Location::local("/a/b.yml"), Location::local("a/b.yml"));
    }

    #[test]
    fn test_local_path_inside_project() {
        assert_eq!(
            Location::local("ci/audit.yml").within_project("group/shared"),
            Location::project("group/shared", "ci/audit.yml")
        );
        let remote = Location::remote("https://example.com/ci.yml");
        assert_eq!(remote.clone().within_project("group/shared"), remote);
    }

    #[test]
    fn test_extension_errors() {
        assert_eq!(
            Location::local("templates/build.json").validate().unwrap_err(),
            "Local file `templates/build.json` does not have a valid YAML extension!"
        );
        assert_eq!(
            Location::project("g/p", "ci.txt").validate().unwrap_err(),
            "Project `g/p` file `ci.txt` does not have a valid YAML extension!"
        );
    }

    #[test]
    fn test_parent_directory_is_rejected() {
        assert_eq!(
            Location::local("../secrets.yml").validate().unwrap_err(),
            "Local file `../secrets.yml` cannot reference a parent directory!"
        );
    }

    #[test]
    fn test_remote_address_errors() {
        assert_eq!(
            Location::remote("not a url").validate().unwrap_err(),
            "Remote file `not a url` does not have a valid address!"
        );
        assert!(Location::remote("ftp://example.com/ci.yml")
            .validate()
            .is_err());
    }
}
