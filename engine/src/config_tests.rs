/// Validation and default tests for BotConfig, built from explicit overrides
/// so they do not race with the environment-based test.
#[cfg(test)]
mod validation_tests {
    use super::super::*;
    use ::config::Config;

    fn builder(pairs: &[(&str, &str)]) -> ConfigBuilder<DefaultState> {
        let mut b = Config::builder()
            .set_override("rpc_url", "https://test.rpc").unwrap()
            .set_override("ws_url", "wss://test.ws").unwrap()
            .set_override("discord_bot_token", "token").unwrap();
        for (k, v) in pairs {
            b = b.set_override(*k, *v).unwrap();
        }
        b
    }

    fn load(pairs: &[(&str, &str)]) -> BotConfig {
        BotConfig::load(builder(pairs), &["DISCORD_CHANNEL_ID_BONK_MIGRATION"]).expect("Config should load")
    }

    #[test]
    fn test_defaults_match_production_values() {
        let config = load(&[]);
        assert_eq!(config.queue_delay(), Duration::from_millis(5_000));
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(10));
        assert_eq!(config.pair_retry(), RetryPolicy::fixed(30, Duration::from_secs(30)));
        assert!(config.metrics_port.is_none());
        assert!(config.moralis_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_numeric_overrides_parse() {
        let config = load(&[("queue_delay_ms", "250"), ("pair_retry_attempts", "3"), ("metrics_port", "9100")]);
        assert_eq!(config.queue_delay_ms, 250);
        assert_eq!(config.pair_retry_attempts, 3);
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_config_validate_invalid_rpc_url() {
        let config = load(&[("rpc_url", "invalid-url")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_invalid_ws_url() {
        let config = load(&[("ws_url", "https://not-a-socket")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_zero_retry_attempts() {
        let config = load(&[("pair_retry_attempts", "0")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_blank_token() {
        let config = load(&[("discord_bot_token", "  ")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_destination_captured_only_when_set() {
        let config = load(&[("discord_channel_id_bonk_migration", " 987654 ")]);
        assert_eq!(config.destination_for("DISCORD_CHANNEL_ID_BONK_MIGRATION"), Some("987654"));
        assert!(load(&[]).destinations.is_empty());
    }
}
