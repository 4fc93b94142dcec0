//! Config file resolution and env overrides with isolated temp files.

use iyashi_bot::config::{Config, CONFIG_PATH_ENV};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tempfile::TempDir;

const OVERRIDE_VARS: &[&str] = &[
    CONFIG_PATH_ENV,
    "IYASHI_BOT_SLACK_BOT_TOKEN",
    "IYASHI_BOT_SLACK_SIGNING_SECRET",
    "IYASHI_BOT_FLICKR_API_TOKEN",
    "IYASHI_BOT_TUMBLR_API_TOKEN",
    "IYASHI_BOT_MOE_URL",
    "IYASHI_BOT_MOE_KEYS",
    "IYASHI_BOT_GATEWAY_HOST",
    "IYASHI_BOT_GATEWAY_PORT",
];

/// Serializes env mutation and restores every override var on drop.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn clean() -> Self {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let lock = LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            std::env::remove_var(key);
        }
        Self { saved, _lock: lock }
    }

    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn write_config(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

const FILE: &str = r#"
[gateway]
port = 9090

[flickr]
api_key = "from-file"
default_keywords = ["猫"]

[tumblr]
api_key = "tumblr-from-file"

[moe]
base_url = "https://moe.example.com"
keys = ["a", "b"]

[[blogs]]
blog = "nekogazou"
triggers = ["ねこ"]
"#;

#[tokio::test]
async fn explicit_path_is_read_and_recorded() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "config.toml", FILE);

    let config = Config::load(Some(path.as_path())).await.unwrap();

    assert_eq!(config.config_path, path);
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.flickr.api_key, "from-file");
    assert_eq!(config.flickr.default_keywords, vec!["猫"]);
    assert_eq!(config.blogs.len(), 1);
    assert_eq!(config.blogs[0].blog, "nekogazou");
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn env_overrides_beat_file_values() {
    let env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "config.toml", FILE);
    env.set("IYASHI_BOT_FLICKR_API_TOKEN", "  from-env  ");
    env.set("IYASHI_BOT_SLACK_BOT_TOKEN", "xoxb-env");
    env.set("IYASHI_BOT_SLACK_SIGNING_SECRET", "signing-env");
    env.set("IYASHI_BOT_MOE_KEYS", "x, y,,z ");
    env.set("IYASHI_BOT_GATEWAY_PORT", "3000");

    let config = Config::load(Some(path.as_path())).await.unwrap();

    assert_eq!(config.flickr.api_key, "from-env");
    assert_eq!(config.tumblr.api_key, "tumblr-from-file");
    assert_eq!(config.moe.keys, vec!["x", "y", "z"]);
    assert_eq!(config.gateway.port, 3000);
    assert!(config.validate_slack().is_ok());
}

#[tokio::test]
async fn blank_or_invalid_env_values_are_ignored() {
    let env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "config.toml", FILE);
    env.set("IYASHI_BOT_FLICKR_API_TOKEN", "   ");
    env.set("IYASHI_BOT_GATEWAY_PORT", "eighty");

    let config = Config::load(Some(path.as_path())).await.unwrap();

    assert_eq!(config.flickr.api_key, "from-file");
    assert_eq!(config.gateway.port, 9090);
}

#[tokio::test]
async fn config_env_var_names_the_file() {
    let env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "bot.toml", FILE);
    env.set(CONFIG_PATH_ENV, path.to_str().unwrap());

    let config = Config::load(None).await.unwrap();

    assert_eq!(config.config_path, path);
    assert_eq!(config.moe.keys, vec!["a", "b"]);
}

#[tokio::test]
async fn explicit_path_wins_over_config_env_var() {
    let env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let from_env = write_config(tmp.path(), "env.toml", "[gateway]\nport = 1111\n");
    let explicit = write_config(tmp.path(), "explicit.toml", "[gateway]\nport = 2222\n");
    env.set(CONFIG_PATH_ENV, from_env.to_str().unwrap());

    let config = Config::load(Some(explicit.as_path())).await.unwrap();

    assert_eq!(config.gateway.port, 2222);
}

#[tokio::test]
async fn missing_explicit_file_is_an_error() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let err = Config::load(Some(missing.as_path())).await.unwrap_err();

    assert!(format!("{err:#}").contains("nope.toml"));
}

#[tokio::test]
async fn malformed_toml_reports_the_path() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "broken.toml", "[gateway\nport = 1");

    let err = Config::load(Some(path.as_path())).await.unwrap_err();

    assert!(err.to_string().contains("broken.toml"));
}

#[tokio::test]
async fn blog_without_triggers_is_rejected_at_load() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        "config.toml",
        "[[blogs]]\nblog = \"nekogazou\"\ntriggers = []\n",
    );

    let err = Config::load(Some(path.as_path())).await.unwrap_err();

    assert!(err.to_string().contains("blogs[0].triggers"));
}

#[tokio::test]
async fn file_without_credentials_loads_but_fails_validation() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "config.toml", "[gateway]\nhost = \"0.0.0.0\"\n");

    let config = Config::load(Some(path.as_path())).await.unwrap();

    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.blogs.len(), 4);
    assert!(config.validate().is_err());
    assert!(config.validate_slack().is_err());
}

#[tokio::test]
async fn empty_default_keywords_are_rejected_at_load() {
    let _env = EnvGuard::clean();
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "config.toml", "[flickr]\ndefault_keywords = []\n");

    let err = Config::load(Some(path.as_path())).await.unwrap_err();

    assert!(err.to_string().contains("flickr.default_keywords"));
}
