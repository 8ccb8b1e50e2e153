//! core::config::schema
//!
//! User configuration schema.
//!
//! All fields are optional; accessor methods on
//! [`Config`](super::Config) apply the defaults.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How an already existing work branch is reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchReuse {
    /// Keep the branch when the remote base is one of its ancestors,
    /// otherwise report a conflict.
    #[default]
    FastForward,
    /// Reset the branch to the base and force-push it.
    Recreate,
}

impl BranchReuse {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchReuse::FastForward => "fast-forward",
            BranchReuse::Recreate => "recreate",
        }
    }
}

impl std::str::FromStr for BranchReuse {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast-forward" => Ok(BranchReuse::FastForward),
            "recreate" => Ok(BranchReuse::Recreate),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid branch reuse policy '{other}', must be one of: fast-forward, recreate"
            ))),
        }
    }
}

impl std::fmt::Display for BranchReuse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-level configuration (`multi-repo-automation.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
    /// Repository list used when `--repos` is not given.
    pub repos_filename: Option<String>,

    /// Command used to open created pull requests.
    pub browser: Option<String>,

    /// Command used to open files for manual edits.
    pub editor: Option<String>,

    /// Policy for work branches that already exist.
    pub branch_reuse: Option<BranchReuse>,

    /// GitHub API base URL.
    pub github_api: Option<String>,
}

impl UserConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("repos_filename", &self.repos_filename),
            ("browser", &self.browser),
            ("editor", &self.editor),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{key} cannot be empty")));
            }
        }

        if let Some(api) = &self.github_api {
            if !api.starts_with("https://") && !api.starts_with("http://") {
                return Err(ConfigError::InvalidValue(format!(
                    "github_api must be an http(s) URL, got '{api}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod user_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = UserConfig::default();
            assert!(config.repos_filename.is_none());
            assert!(config.browser.is_none());
            assert!(config.branch_reuse.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn parse_all_keys() {
            let yaml = "\
repos_filename: my-repos.yaml
browser: firefox
editor: code
branch_reuse: recreate
github_api: https://github.example.com/api/v3
";
            let config: UserConfig = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(config.repos_filename.as_deref(), Some("my-repos.yaml"));
            assert_eq!(config.browser.as_deref(), Some("firefox"));
            assert_eq!(config.editor.as_deref(), Some("code"));
            assert_eq!(config.branch_reuse, Some(BranchReuse::Recreate));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn empty_browser_rejected() {
            let config = UserConfig {
                browser: Some("  ".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn non_http_api_rejected() {
            let config = UserConfig {
                github_api: Some("api.github.com".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn reject_unknown_fields() {
            let result: Result<UserConfig, _> = serde_yaml::from_str("browser: firefox\ncolour: red\n");
            assert!(result.is_err());
        }

        #[test]
        fn roundtrip() {
            let config = UserConfig {
                repos_filename: Some("repos.yaml".to_string()),
                branch_reuse: Some(BranchReuse::FastForward),
                ..Default::default()
            };
            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: UserConfig = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod branch_reuse {
        use super::*;

        #[test]
        fn parse() {
            assert_eq!("fast-forward".parse::<BranchReuse>().unwrap(), BranchReuse::FastForward);
            assert_eq!("recreate".parse::<BranchReuse>().unwrap(), BranchReuse::Recreate);
            assert!("force".parse::<BranchReuse>().is_err());
        }

        #[test]
        fn yaml_uses_kebab_case() {
            let reuse: BranchReuse = serde_yaml::from_str("fast-forward").unwrap();
            assert_eq!(reuse, BranchReuse::FastForward);
            assert_eq!(BranchReuse::Recreate.to_string(), "recreate");
        }
    }
}
