use crate::channels::slack::SLACK_API_URL;
use crate::images::flickr::{DEFAULT_KEYWORDS, FLICKR_API_URL};
use crate::images::tumblr::TUMBLR_API_URL;
use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "IYASHI_BOT_CONFIG";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level iyashi-bot configuration, loaded from `config.toml`.
///
/// Resolution order: `--config` flag → `IYASHI_BOT_CONFIG` env →
/// `~/.iyashi-bot/config.toml`. A missing default file means built-in
/// defaults plus env overrides.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path the config was read from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// HTTP gateway receiving Slack events (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Outbound HTTP client settings (`[http]`).
    #[serde(default)]
    pub http: HttpConfig,

    /// Slack app credentials (`[slack]`).
    #[serde(default)]
    pub slack: SlackConfig,

    /// Flickr photo search (`[flickr]`).
    #[serde(default)]
    pub flickr: FlickrConfig,

    /// Tumblr API access (`[tumblr]`).
    #[serde(default)]
    pub tumblr: TumblrConfig,

    /// Fixed picture stash (`[moe]`).
    #[serde(default)]
    pub moe: MoeConfig,

    /// One command per Tumblr blog (`[[blogs]]`), registered in order.
    #[serde(default = "default_blogs")]
    pub blogs: Vec<BlogCommandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            gateway: GatewayConfig::default(),
            http: HttpConfig::default(),
            slack: SlackConfig::default(),
            flickr: FlickrConfig::default(),
            tumblr: TumblrConfig::default(),
            moe: MoeConfig::default(),
            blogs: default_blogs(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway port (default: 8080)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            host: default_gateway_host(),
        }
    }
}

// ── HTTP client ───────────────────────────────────────────────────

/// Timeouts applied to every provider and Slack request (`[http]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds (default: 10)
    #[serde(default = "default_http_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_http_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: default_http_connect_timeout_secs(),
        }
    }
}

/// Build the shared HTTP client. Falls back to a default client if the
/// builder rejects the settings.
pub fn build_http_client(http: &HttpConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs.max(1)))
        .user_agent(concat!("iyashi-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!("Failed to build HTTP client with timeouts: {error}");
            reqwest::Client::new()
        })
}

// ── Slack ─────────────────────────────────────────────────────────

/// Slack app configuration (`[slack]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlackConfig {
    /// Bot OAuth token (xoxb-...). Overridden by `IYASHI_BOT_SLACK_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: String,
    /// Signing secret used to verify Events API requests.
    /// Overridden by `IYASHI_BOT_SLACK_SIGNING_SECRET`.
    #[serde(default)]
    pub signing_secret: String,
    /// Web API base URL (default: `https://slack.com/api`).
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
}

fn default_slack_api_url() -> String {
    SLACK_API_URL.into()
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: String::new(),
            api_url: default_slack_api_url(),
        }
    }
}

// ── Providers ─────────────────────────────────────────────────────

/// Flickr search configuration (`[flickr]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlickrConfig {
    /// Flickr API key. Overridden by `IYASHI_BOT_FLICKR_API_TOKEN`.
    #[serde(default)]
    pub api_key: String,
    /// REST endpoint (default: `https://api.flickr.com/services/rest/`).
    #[serde(default = "default_flickr_api_url")]
    pub api_url: String,
    /// Keywords drawn from when a search has none.
    #[serde(default = "default_flickr_keywords")]
    pub default_keywords: Vec<String>,
}

fn default_flickr_api_url() -> String {
    FLICKR_API_URL.into()
}

fn default_flickr_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|w| (*w).to_string()).collect()
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_flickr_api_url(),
            default_keywords: default_flickr_keywords(),
        }
    }
}

/// Tumblr API configuration (`[tumblr]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TumblrConfig {
    /// Tumblr OAuth consumer key. Overridden by `IYASHI_BOT_TUMBLR_API_TOKEN`.
    #[serde(default)]
    pub api_key: String,
    /// API base URL (default: `https://api.tumblr.com`).
    #[serde(default = "default_tumblr_api_url")]
    pub api_url: String,
}

fn default_tumblr_api_url() -> String {
    TUMBLR_API_URL.into()
}

impl Default for TumblrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: default_tumblr_api_url(),
        }
    }
}

/// Fixed picture stash (`[moe]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct MoeConfig {
    /// Base URL the keys live under. Overridden by `IYASHI_BOT_MOE_URL`.
    #[serde(default)]
    pub base_url: String,
    /// Picture keys. Overridden by `IYASHI_BOT_MOE_KEYS` (comma separated).
    #[serde(default)]
    pub keys: Vec<String>,
}

/// A command answering with pictures from one Tumblr blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BlogCommandConfig {
    /// Blog name, the `<blog>` in `<blog>.tumblr.com`.
    pub blog: String,
    /// Words that trigger the command (exact, case-sensitive).
    pub triggers: Vec<String>,
    /// Tags always added after the user's tags.
    #[serde(default)]
    pub append_tags: Vec<String>,
    /// Send the picture by DM and acknowledge in the channel.
    #[serde(default)]
    pub direct_message: bool,
}

impl BlogCommandConfig {
    fn new(blog: &str, trigger: &str, append_tags: &[&str], direct_message: bool) -> Self {
        Self {
            blog: blog.into(),
            triggers: vec![trigger.into()],
            append_tags: append_tags.iter().map(|t| (*t).to_string()).collect(),
            direct_message,
        }
    }
}

fn default_blogs() -> Vec<BlogCommandConfig> {
    vec![
        BlogCommandConfig::new("grass-tree-garden", "しばき", &[], false),
        BlogCommandConfig::new("honobonoarc", "萌え", &[], true),
        BlogCommandConfig::new("ganbaruzoi", "ぞい", &[], false),
        BlogCommandConfig::new("tawawa-of-monday", "たわわ", &["safe"], false),
    ]
}

// ── Loading ───────────────────────────────────────────────────────

fn default_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| dirs.home_dir().join(".iyashi-bot").join("config.toml"))
}

impl Config {
    /// Load configuration and apply env overrides.
    ///
    /// An explicit path (argument or `IYASHI_BOT_CONFIG`) must exist; the
    /// default path may be absent. Structural problems are rejected here,
    /// credentials are checked by [`Config::validate`].
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::read(&path).await?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path).await?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate_structure()?;
        tracing::info!(
            path = %config.config_path.display(),
            blogs = config.blogs.len(),
            "Config loaded"
        );
        Ok(config)
    }

    async fn read(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        fn non_empty(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        if let Some(v) = non_empty("IYASHI_BOT_SLACK_BOT_TOKEN") {
            self.slack.bot_token = v;
        }
        if let Some(v) = non_empty("IYASHI_BOT_SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = v;
        }
        if let Some(v) = non_empty("IYASHI_BOT_FLICKR_API_TOKEN") {
            self.flickr.api_key = v;
        }
        if let Some(v) = non_empty("IYASHI_BOT_TUMBLR_API_TOKEN") {
            self.tumblr.api_key = v;
        }
        if let Some(v) = non_empty("IYASHI_BOT_MOE_URL") {
            self.moe.base_url = v;
        }
        if let Some(v) = non_empty("IYASHI_BOT_MOE_KEYS") {
            self.moe.keys = v
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = non_empty("IYASHI_BOT_GATEWAY_HOST") {
            self.gateway.host = v;
        }
        if let Some(port) = non_empty("IYASHI_BOT_GATEWAY_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!("Ignoring invalid IYASHI_BOT_GATEWAY_PORT: {port}"),
            }
        }
    }

    /// Reject values that make the command set or gateway unusable.
    pub fn validate_structure(&self) -> Result<()> {
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.flickr.default_keywords.iter().all(|w| w.trim().is_empty()) {
            anyhow::bail!("flickr.default_keywords must contain at least one word");
        }
        for (i, blog) in self.blogs.iter().enumerate() {
            if blog.blog.trim().is_empty() {
                anyhow::bail!("blogs[{i}].blog must not be empty");
            }
            if blog.triggers.iter().all(|t| t.trim().is_empty()) {
                anyhow::bail!("blogs[{i}].triggers must contain at least one word");
            }
        }
        Ok(())
    }

    /// Require the provider credentials every command needs.
    pub fn validate(&self) -> Result<()> {
        self.validate_structure()?;
        if self.flickr.api_key.trim().is_empty() {
            anyhow::bail!("flickr.api_key required (or IYASHI_BOT_FLICKR_API_TOKEN)");
        }
        if self.tumblr.api_key.trim().is_empty() {
            anyhow::bail!("tumblr.api_key required (or IYASHI_BOT_TUMBLR_API_TOKEN)");
        }
        if self.moe.base_url.trim().is_empty() {
            anyhow::bail!("moe.base_url required (or IYASHI_BOT_MOE_URL)");
        }
        Ok(())
    }

    /// Require the Slack credentials the gateway needs.
    pub fn validate_slack(&self) -> Result<()> {
        if self.slack.bot_token.trim().is_empty() {
            anyhow::bail!("slack.bot_token required (or IYASHI_BOT_SLACK_BOT_TOKEN)");
        }
        if self.slack.signing_secret.trim().is_empty() {
            anyhow::bail!("slack.signing_secret required (or IYASHI_BOT_SLACK_SIGNING_SECRET)");
        }
        Ok(())
    }
}
