use std::time::Duration;

use dg_domain::config::{Config, ConfigSeverity};

#[test]
fn default_gateway_is_local_devgate() {
    let config = Config::default();
    assert_eq!(config.gateway.url, "http://localhost:1234");
    assert_eq!(config.gateway.poll_interval(), Duration::from_secs(1));
    assert_eq!(config.gateway.timeout(), Duration::from_secs(30));
    assert_eq!(config.gateway.response_timeout(), None);
}

#[test]
fn explicit_gateway_parses() {
    let toml_str = r#"
[gateway]
url = "https://gateway.devnet.example"
api_key = "k"
poll_interval_ms = 250
response_timeout_ms = 60000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.gateway.url, "https://gateway.devnet.example");
    assert_eq!(config.gateway.api_key.as_deref(), Some("k"));
    assert_eq!(config.gateway.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.gateway.response_timeout(), Some(Duration::from_secs(60)));
    assert!(config.validate().is_empty());
}

#[test]
fn session_key_defaults_to_unset() {
    let config: Config = toml::from_str("[gateway]\n").unwrap();
    assert!(config.gateway.session_key.is_none());
}

#[test]
fn default_config_only_warns() {
    let issues = Config::default().validate();
    assert!(!issues.is_empty());
    assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
}
