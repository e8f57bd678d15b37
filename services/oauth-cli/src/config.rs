//! CLI configuration
//!
//! Where the API lives, who the OAuth client is, and where the session is
//! stored. The client secret comes from OAUTH_CLIENT_SECRET or
//! client_secret_file and is never read from the TOML itself.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub oauth: OAuthConfig,
    /// Where the serialized OAuth session is kept between runs
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// API session settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Full API URL or bare wiki domain (`test.wikipedia.org`)
    pub url: String,
    /// User agent identifying this tool and its operator
    pub user_agent: String,
    /// How long after a request starts an expired token may still be refreshed
    #[serde(default = "default_retry_window")]
    pub retry_window_secs: u64,
}

/// OAuth client settings
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to OAUTH_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_assert_user")]
    pub assert_user: bool,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("oauth-session.json")
}

fn default_retry_window() -> u64 {
    60
}

fn default_assert_user() -> bool {
    true
}

impl Config {
    /// Parse and validate the TOML file, then resolve the client secret.
    ///
    /// Client secret resolution order:
    /// 1. OAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    ///
    /// No secret at all configures a non-confidential (PKCE-only) client.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        // Either a bare domain or an http(s) URL
        let url = &config.api.url;
        if url.is_empty()
            || (url.contains("://") && !url.starts_with("http://") && !url.starts_with("https://"))
        {
            return Err(common::Error::Config(format!(
                "api.url must be a domain or start with http:// or https://, got: {url}"
            )));
        }

        if config.api.user_agent.trim().is_empty() {
            return Err(common::Error::Config(
                "api.user_agent must not be empty".into(),
            ));
        }

        if config.oauth.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "oauth.client_id must not be empty".into(),
            ));
        }

        if config.api.retry_window_secs == 0 {
            return Err(common::Error::Config(
                "retry_window_secs must be greater than 0".into(),
            ));
        }

        if config.state_file.file_name().is_none() {
            return Err(common::Error::Config(format!(
                "state_file must name a file, got: {}",
                config.state_file.display()
            )));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("OAUTH_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            config.oauth.client_secret = Secret::from_file(secret_file)?;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("oauth-cli.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[api]
url = "test.wikipedia.org"
user_agent = "oauth-cli-test (https://example.org/)"

[oauth]
client_id = "CLIENTID"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { remove_env("OAUTH_CLIENT_SECRET") };

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.url, "test.wikipedia.org");
        assert_eq!(config.api.retry_window_secs, 60);
        assert_eq!(config.oauth.client_id, "CLIENTID");
        assert!(config.oauth.assert_user);
        assert!(config.oauth.client_secret.is_none());
        assert_eq!(config.state_file, PathBuf::from("oauth-session.json"));
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let cases = [
            (
                valid_toml().replace("test.wikipedia.org", "ftp://test.wikipedia.org/w/api.php"),
                "api.url",
            ),
            (
                valid_toml().replace("oauth-cli-test (https://example.org/)", " "),
                "user_agent",
            ),
            (
                valid_toml().replace("[oauth]", "retry_window_secs = 0\n\n[oauth]"),
                "retry_window_secs",
            ),
            (format!("state_file = \"..\"\n{}", valid_toml()), "state_file"),
        ];

        for (toml, field) in cases {
            let dir = tempfile::tempdir().unwrap();
            let path = write_config(&dir, &toml);
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "{field}: got {err}");
        }
    }

    #[test]
    fn test_secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();
        let toml = format!(
            "{}client_secret_file = \"{}\"\n",
            valid_toml(),
            secret_path.display()
        );
        let path = write_config(&dir, &toml);

        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        let config = Config::load(&path).unwrap();

        assert_eq!(config.oauth.client_secret.unwrap().expose(), "file-secret");
    }

    #[test]
    fn test_missing_secret_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            "{}client_secret_file = \"/nonexistent/client_secret\"\n",
            valid_toml()
        );
        let path = write_config(&dir, &toml);

        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        let err = Config::load(&path).unwrap_err();
        assert!(
            matches!(err, common::Error::SecretFile { .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn test_env_secret_beats_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        std::fs::write(&secret_path, "file-secret").unwrap();
        let toml = format!(
            "{}client_secret_file = \"{}\"\n",
            valid_toml(),
            secret_path.display()
        );
        let path = write_config(&dir, &toml);

        unsafe { set_env("OAUTH_CLIENT_SECRET", "env-secret") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };

        assert_eq!(config.oauth.client_secret.unwrap().expose(), "env-secret");
    }

    #[test]
    fn test_secret_not_in_debug() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("OAUTH_CLIENT_SECRET", "super-secret-value") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"), "got: {debug}");
    }

    #[test]
    fn test_resolve_path_prefers_cli() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/from/env.toml") };
        assert_eq!(
            Config::resolve_path(Some("/from/cli.toml")),
            PathBuf::from("/from/cli.toml")
        );
        assert_eq!(Config::resolve_path(None), PathBuf::from("/from/env.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("oauth-cli.toml"));
    }
}
