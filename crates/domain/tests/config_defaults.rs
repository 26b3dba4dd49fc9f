use lumen_domain::config::Config;

#[test]
fn default_model_name_is_set() {
    let config = Config::default();
    assert!(!config.llm.model_name.is_empty());
}

#[test]
fn explicit_overrides_parse_from_toml() {
    let toml_str = r#"
[llm]
model_name = "gemini-2.0-flash-lite"
base_url = "https://example.invalid"

[sessions]
ttl_seconds = 3600
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.model_name, "gemini-2.0-flash-lite");
    assert_eq!(config.sessions.ttl_seconds, 3600);
    // Unset fields still take their serde defaults.
    assert_eq!(config.sessions.max_history_entries, 1000);
}

#[test]
fn explicit_overrides_parse_from_yaml() {
    let yaml_str = r#"
llm:
  model_name: gemini-2.0-flash
persistence:
  persist_pool_size: 8
"#;
    let config: Config = serde_yaml::from_str(yaml_str).unwrap();
    assert_eq!(config.persistence.persist_pool_size, 8);
}
