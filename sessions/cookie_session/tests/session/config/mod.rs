use cookie_session::SessionConfig;


#[test]
fn all_fields_have_a_default_value() {
    assert!(serde_json::from_str::<SessionConfig>("{}").is_ok());
}

#[test]
fn nested_sections_can_be_partially_specified() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "cookie": { "name": "sid" }, "state": {} }"#).unwrap();
    assert_eq!(config.cookie.name, "sid");
    assert_eq!(config.cookie.path.as_deref(), Some("/"));
    assert_eq!(config.state.ttl, std::time::Duration::from_secs(60 * 60 * 24));
}
