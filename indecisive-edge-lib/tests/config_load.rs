use indecisive_edge_lib::config::{load_from_path, validate_config, Config};
use indecisive_edge_lib::EdgeError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    write!(file, "{contents}")?;
    Ok(file)
}

fn parse(contents: &str) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(toml::from_str(contents)?)
}

#[test]
fn test_minimal_config_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_config(
        r#"
listen = "127.0.0.1:8080"

[upstream]
address = "127.0.0.1:3000"
"#,
    )?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.listen.port(), 8080);
    assert!(!cfg.production);
    assert!(!cfg.upstream.preserve_host);
    assert_eq!(cfg.locale.supported, vec!["en", "bg"]);
    assert_eq!(cfg.locale.default, "en");
    assert_eq!(cfg.locale.cookie_name, "indecisive-locale");
    assert_eq!(cfg.locale.cookie_max_age_secs, 31_536_000);
    assert_eq!(cfg.locale.countries.get("BG").map(String::as_str), Some("bg"));
    assert_eq!(cfg.locale.country_headers, vec!["x-vercel-ip-country", "cf-ipcountry"]);
    assert!(cfg.rate_limit.enabled);
    assert_eq!(cfg.rate_limit.sweep_interval_secs, 300);
    assert_eq!(cfg.rate_limit.routes.len(), 1);
    assert_eq!(cfg.rate_limit.routes[0].prefix, "/api/waitlist");
    assert_eq!(cfg.timeout.upstream_ms, 10_000);
    assert_eq!(cfg.logging.level, "info");
    assert!(cfg.telemetry.metrics_port.is_none());
    Ok(())
}

#[test]
fn test_full_config_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_config(
        r#"
listen = "0.0.0.0:9000"
production = true

[upstream]
address = "storefront:3000"
preserve_host = true

[locale]
supported = ["en", "bg", "de"]
default = "de"
excluded_prefixes = ["/api"]

[locale.countries]
AT = "de"

[rate_limit]
sweep_interval_secs = 60

[[rate_limit.routes]]
prefix = "/api/checkout"
limit = 10
window_ms = 1000

[[rate_limit.routes]]
prefix = "/api"
limit = 100
window_ms = 60000

[telemetry]
metrics_port = 9100
"#,
    )?;
    let cfg = load_from_path(file.path())?;

    assert!(cfg.production);
    assert!(cfg.upstream.preserve_host);
    assert_eq!(cfg.locale.default, "de");
    assert_eq!(cfg.locale.countries.len(), 1);
    assert_eq!(cfg.rate_limit.routes.len(), 2);
    assert_eq!(cfg.rate_limit.routes[0].limit, 10);
    assert_eq!(cfg.telemetry.metrics_port, Some(9100));
    Ok(())
}

#[test]
fn test_shipped_config_is_valid() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/edge.toml");
    let cfg = load_from_path(path)?;
    assert_eq!(cfg.rate_limit.routes[0].limit, 5);
    Ok(())
}

#[test]
fn test_missing_file_is_config_error() {
    let result = load_from_path("/nonexistent/indecisive-edge.toml");
    assert!(matches!(result, Err(EdgeError::Config(_))));
}

#[test]
fn test_malformed_toml_is_config_error() -> Result<(), Box<dyn std::error::Error>> {
    let file = write_config("listen = [not toml")?;
    assert!(matches!(load_from_path(file.path()), Err(EdgeError::Config(_))));
    Ok(())
}

#[test]
fn test_rejects_unsupported_default_locale() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = parse(
        r#"
listen = "127.0.0.1:8080"
[upstream]
address = "127.0.0.1:3000"
[locale]
supported = ["en"]
default = "bg"
countries = {}
"#,
    )?;
    let err = validate_config(&cfg).err().ok_or("expected validation error")?;
    assert!(err.to_string().contains("default locale 'bg' is not supported"), "{err}");
    Ok(())
}

#[test]
fn test_rejects_country_mapped_to_unsupported_locale() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = parse(
        r#"
listen = "127.0.0.1:8080"
[upstream]
address = "127.0.0.1:3000"
[locale]
supported = ["en"]
default = "en"
[locale.countries]
FR = "fr"
"#,
    )?;
    assert!(validate_config(&cfg).is_err());
    Ok(())
}

#[test]
fn test_locale_names_are_case_insensitive() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = parse(
        r#"
listen = "127.0.0.1:8080"
[upstream]
address = "127.0.0.1:3000"
[locale]
supported = ["en", "BG"]
default = "EN"
[locale.countries]
BG = "Bg"
"#,
    )?;
    validate_config(&cfg)?;
    Ok(())
}

#[test]
fn test_rejects_bad_rate_limit_routes() -> Result<(), Box<dyn std::error::Error>> {
    let base = r#"
listen = "127.0.0.1:8080"
[upstream]
address = "127.0.0.1:3000"
"#;
    for route in [
        "prefix = \"api\"\nlimit = 5\nwindow_ms = 1000",
        "prefix = \"/api\"\nlimit = 0\nwindow_ms = 1000",
        "prefix = \"/api\"\nlimit = 5\nwindow_ms = 0",
    ] {
        let cfg = parse(&format!("{base}[[rate_limit.routes]]\n{route}\n"))?;
        assert!(validate_config(&cfg).is_err(), "route should be rejected: {route}");
    }
    Ok(())
}

#[test]
fn test_rejects_empty_upstream() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = parse(
        r#"
listen = "127.0.0.1:8080"
[upstream]
address = "  "
"#,
    )?;
    assert!(validate_config(&cfg).is_err());
    Ok(())
}
