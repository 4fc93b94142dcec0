pub mod schema;

pub use schema::{
    build_http_client, BlogCommandConfig, Config, FlickrConfig, GatewayConfig, HttpConfig,
    MoeConfig, SlackConfig, TumblrConfig, CONFIG_PATH_ENV,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexported_config_default_is_constructible() {
        let config = Config::default();

        assert!(!config.blogs.is_empty());
        assert!(config.slack.bot_token.is_empty());
        assert!(config.http.timeout_secs > 0);
    }

    #[test]
    fn config_schema_lists_top_level_sections() {
        let schema = serde_json::to_value(schemars::schema_for!(Config)).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for section in ["gateway", "http", "slack", "flickr", "tumblr", "moe", "blogs"] {
            assert!(properties.contains_key(section), "missing {section}");
        }
        assert!(!properties.contains_key("config_path"));
    }
}
