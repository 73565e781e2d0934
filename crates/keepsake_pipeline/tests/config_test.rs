use keepsake_error::KeepsakeErrorKind;
use keepsake_pipeline::PipelineConfig;
use std::path::Path;
use tempfile::TempDir;

const FULL: &str = r#"
dry_run = true

[ledger]
path = "/var/lib/keepsake/media.db"
pool_size = 2

[destinations]
a = "nas"
b = "pixel"

[limits]
batch_limit = 10
workers = 2
executor_timeout_secs = 60
max_failures = 3

[compression]
light_max_age_months = 6
medium_max_age_months = 24
light_quality = 90
heavy_crf = 32
ffmpeg_path = "/usr/bin/ffmpeg"

[storage]
media_root = "/srv/media"

[logging]
level = "debug"
json = true
"#;

fn config_message(toml: &str) -> String {
    let err = PipelineConfig::from_toml_str(toml).unwrap_err();
    match err.kind() {
        KeepsakeErrorKind::Config(e) => e.message.clone(),
        other => panic!("unexpected error {other}"),
    }
}

fn with_destinations(a: &str, b: &str) -> String {
    format!(
        "[ledger]\npath = \"media.db\"\n\n[destinations]\na = \"{}\"\nb = \"{}\"\n",
        a, b
    )
}

#[test]
fn loads_every_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keepsake.toml");
    std::fs::write(&path, FULL).unwrap();

    let config = PipelineConfig::load(&path).unwrap();

    assert!(*config.dry_run());
    assert_eq!(config.ledger().path(), Path::new("/var/lib/keepsake/media.db"));
    assert_eq!(*config.ledger().pool_size(), 2);
    assert_eq!(*config.limits().batch_limit(), 10);
    assert_eq!(*config.limits().max_failures(), 3);
    assert_eq!(*config.compression().tier_boundaries().light_max_age_months(), 6);

    let profile = config.compression().profile().unwrap();
    assert_eq!(*profile.light_quality(), 90);
    assert_eq!(*profile.medium_quality(), 75);
    assert_eq!(*profile.heavy_crf(), 32);

    assert_eq!(config.storage().media_root(), Path::new("/srv/media"));
    assert_eq!(config.logging().level(), "debug");
    assert!(*config.logging().json());
}

#[test]
fn defaults_apply_to_optional_sections() {
    let config = PipelineConfig::from_toml_str(&with_destinations("nas", "pixel")).unwrap();

    assert!(!*config.dry_run());
    assert_eq!(*config.ledger().pool_size(), 4);
    assert_eq!(*config.limits().workers(), 4);
    assert_eq!(*config.limits().executor_timeout_secs(), 300);
    assert_eq!(*config.compression().medium_max_age_months(), 36);
    assert_eq!(config.logging().level(), "info");
}

#[test]
fn missing_file_is_a_config_error() {
    let err = PipelineConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err.kind(), KeepsakeErrorKind::Config(_)));
}

#[test]
fn required_values_have_no_defaults() {
    assert!(config_message("[destinations]\na = \"nas\"\nb = \"pixel\"\n").contains("ledger"));
    assert!(config_message("[ledger]\npath = \"media.db\"\n").contains("destinations"));
    assert!(config_message(&with_destinations("", "pixel")).contains("destinations.a"));
}

#[test]
fn destinations_must_be_distinct_and_plain() {
    assert!(config_message(&with_destinations("nas", "nas")).contains("must differ"));
    assert!(config_message(&with_destinations("nas,2", "pixel")).contains("','"));
}

#[test]
fn rejects_invalid_values() {
    let base = with_destinations("nas", "pixel");
    assert!(
        config_message(&format!("{}\n[limits]\nmax_failures = 0\n", base))
            .contains("limits.max_failures")
    );
    assert!(
        config_message(&format!("{}\n[limits]\nworkers = 0\n", base)).contains("limits.workers")
    );
    assert!(
        config_message(&format!(
            "{}\n[compression]\nlight_max_age_months = 40\n",
            base
        ))
        .contains("light_max_age_months")
    );
    assert!(
        config_message(&format!("{}\n[compression]\nheavy_quality = 0\n", base))
            .contains("compression.heavy_quality")
    );
    assert!(
        config_message(&format!("{}\n[compression]\nlight_crf = 60\n", base))
            .contains("compression.light_crf")
    );
}

#[test]
fn rejects_unknown_keys() {
    let toml = format!("{}\n[limits]\nbatch_size = 10\n", with_destinations("nas", "pixel"));
    assert!(config_message(&toml).contains("batch_size"));
}
