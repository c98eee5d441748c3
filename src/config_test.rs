use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// =========================================================================
// parse_retries
// =========================================================================

#[test]
fn parse_retries_accepts_positive_integers() {
    assert_eq!(parse_retries("5"), 5);
    assert_eq!(parse_retries(" 2 "), 2);
    assert_eq!(parse_retries("+4"), 4);
}

#[test]
fn parse_retries_reads_leading_digits() {
    assert_eq!(parse_retries("2.5"), 2);
    assert_eq!(parse_retries("3abc"), 3);
    assert_eq!(parse_retries("0.9"), DEFAULT_RETRIES);
    assert_eq!(parse_retries("99999999999"), DEFAULT_RETRIES);
    assert_eq!(parse_retries(".5"), DEFAULT_RETRIES);
}

#[test]
fn parse_retries_falls_back_on_garbage() {
    assert_eq!(parse_retries(""), DEFAULT_RETRIES);
    assert_eq!(parse_retries("three"), DEFAULT_RETRIES);
    assert_eq!(parse_retries("-1"), DEFAULT_RETRIES);
    assert_eq!(parse_retries("0"), DEFAULT_RETRIES);
}

// =========================================================================
// AppConfig::from_lookup
// =========================================================================

#[test]
fn from_lookup_defaults() {
    let cfg = AppConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.settings, Settings::default());
    assert_eq!(cfg.settings.retries, 3);
    assert_eq!(cfg.settings.backoff, Duration::from_millis(100));
    assert!((cfg.settings.temperature - 0.1).abs() < f32::EPSILON);
    assert_eq!(cfg.engine, EngineKind::Mmdc);
    assert_eq!(cfg.mmdc.path, DEFAULT_MMDC_PATH);
    assert_eq!(cfg.mmdc.timeout, Duration::from_secs(DEFAULT_MMDC_TIMEOUT_SECS));
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn from_lookup_reads_key_through_indirection() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
        ("LLM_ENDPOINT", " https://example.openai.azure.com/openai/deployments/gpt/chat/completions "),
        ("LLM_API_KEY_ENV", "AZURE_OPENAI_KEY"),
        ("AZURE_OPENAI_KEY", "sk-test"),
        ("LLM_API_KEY", "ignored"),
    ]))
    .unwrap();
    assert_eq!(cfg.settings.endpoint, "https://example.openai.azure.com/openai/deployments/gpt/chat/completions");
    assert_eq!(cfg.settings.api_key, "sk-test");
}

#[test]
fn from_lookup_default_key_var() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("LLM_API_KEY", "abc")])).unwrap();
    assert_eq!(cfg.settings.api_key, "abc");
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = AppConfig::from_lookup(lookup_from(&[
        ("PORT", "8080"),
        ("RENDER_RETRIES", "7"),
        ("RENDER_BACKOFF_MS", "250"),
        ("LLM_TEMPERATURE", "0.7"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "3"),
        ("RENDER_ENGINE", "builtin"),
        ("MMDC_PATH", "/opt/mmdc"),
        ("MMDC_TIMEOUT_SECS", "9"),
    ]))
    .unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.settings.retries, 7);
    assert_eq!(cfg.settings.backoff, Duration::from_millis(250));
    assert!((cfg.settings.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 3 });
    assert_eq!(cfg.engine, EngineKind::Builtin);
    assert_eq!(cfg.mmdc, MmdcConfig { path: "/opt/mmdc".into(), timeout: Duration::from_secs(9) });
}

#[test]
fn from_lookup_non_numeric_retries_fall_back() {
    let cfg = AppConfig::from_lookup(lookup_from(&[("RENDER_RETRIES", "lots")])).unwrap();
    assert_eq!(cfg.settings.retries, DEFAULT_RETRIES);
}

#[test]
fn from_lookup_unknown_engine_errors() {
    let err = AppConfig::from_lookup(lookup_from(&[("RENDER_ENGINE", "graphviz")])).unwrap_err();
    assert!(err.to_string().contains("unknown RENDER_ENGINE"));
    assert_eq!(err.error_code(), "E_CONFIG_ENGINE");
}

// =========================================================================
// Settings
// =========================================================================

#[test]
fn with_overrides_keeps_unset_fields() {
    let base = Settings { endpoint: "https://a".into(), api_key: "k".into(), ..Settings::default() };
    let next = base.with_overrides(None, None, Some(5));
    assert_eq!(next.endpoint, "https://a");
    assert_eq!(next.api_key, "k");
    assert_eq!(next.retries, 5);
}

#[test]
fn with_overrides_replaces_and_trims() {
    let base = Settings::default();
    let next = base.with_overrides(Some(" https://b "), Some(" key "), None);
    assert_eq!(next.endpoint, "https://b");
    assert_eq!(next.api_key, "key");
    assert_eq!(next.retries, DEFAULT_RETRIES);
}

#[test]
fn with_overrides_zero_retries_falls_back() {
    let next = Settings::default().with_overrides(None, None, Some(0));
    assert_eq!(next.retries, DEFAULT_RETRIES);
}

#[test]
fn debug_redacts_api_key() {
    let settings = Settings { api_key: "sk-very-secret".into(), ..Settings::default() };
    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("sk-very-secret"));
    assert!(rendered.contains("<redacted>"));
}
