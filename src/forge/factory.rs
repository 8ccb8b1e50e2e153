//! forge::factory
//!
//! Forge creation.
//!
//! Commands use [`create_forge`] instead of naming a forge implementation,
//! so the orchestrator only ever sees `dyn Forge`.

use std::sync::Arc;

use super::github::GitHubForge;
use super::token::{EnvTokenProvider, TokenProvider};
use super::traits::Forge;
use crate::core::config::Config;

/// Create the forge for a run.
///
/// The token is resolved lazily, on the first request: a run that never
/// opens a pull request does not need one.
///
/// # Example
///
/// ```
/// use multirepo::core::config::Config;
/// use multirepo::forge::create_forge;
///
/// let forge = create_forge(&Config::default());
/// assert_eq!(forge.name(), "github");
/// ```
pub fn create_forge(config: &Config) -> Box<dyn Forge> {
    create_forge_with_token(config, Arc::new(EnvTokenProvider::new()))
}

/// Create the forge with an explicit token source.
pub fn create_forge_with_token(config: &Config, token: Arc<dyn TokenProvider>) -> Box<dyn Forge> {
    Box::new(GitHubForge::with_api_base(token, config.github_api()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::UserConfig;
    use crate::forge::StaticToken;

    #[test]
    fn uses_configured_api() {
        let config = Config::from_user(UserConfig {
            github_api: Some("https://ghe.example.com/api/v3".to_string()),
            ..Default::default()
        });
        let forge = create_forge_with_token(&config, Arc::new(StaticToken::new("t")));
        assert_eq!(forge.name(), "github");
    }
}
