use chrono::{Duration, Utc};
use clap::Parser;
use keepsake::cli::{Cli, Commands, OutputFormat, execute, open_ledger};
use keepsake::{
    AcquiredAttrs, Failure, KeepsakeErrorKind, LedgerStore, PassReport, PipelineConfig,
    PipelineStage, StageReport,
};
use tempfile::TempDir;

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::new(dir.path().join("ledger.db"), "nas", "pixel")
        .with_media_root(dir.path().join("media"))
}

async fn json(command: Commands, config: &PipelineConfig) -> serde_json::Value {
    let output = execute(&command, config, OutputFormat::Json)
        .await
        .expect("command succeeds");
    serde_json::from_str(&output).expect("output is JSON")
}

/// A ledger with one healthy record and one quarantined record.
async fn seeded(dir: &TempDir) -> (PipelineConfig, String, String) {
    let config = config(dir);
    let ledger = open_ledger(&config).unwrap();
    let created = Utc::now() - Duration::days(30);

    let healthy = ledger
        .upsert_on_acquire(
            "IMG_0001",
            &AcquiredAttrs::new(dir.path().join("IMG_0001.jpg"), 2_048, created),
        )
        .await
        .unwrap();
    let broken = ledger
        .upsert_on_acquire(
            "IMG_0002",
            &AcquiredAttrs::new(dir.path().join("IMG_0002.jpg"), 4_096, created),
        )
        .await
        .unwrap();
    ledger
        .record_failure(broken.id(), &Failure::permanent("replicate_a: file vanished"), 5)
        .await
        .unwrap();

    let mut report = PassReport::started(Utc::now(), false);
    let mut acquire = StageReport::new(PipelineStage::Acquire);
    acquire.advanced = 2;
    report.push(acquire);
    report.finished_at = Some(Utc::now());
    ledger.record_pass(&report).await.unwrap();

    (config, healthy.id().clone(), broken.id().clone())
}

#[test]
fn parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "keepsake",
        "status",
        "--config",
        "/etc/keepsake.toml",
        "--format",
        "json",
        "--passes",
        "10",
        "-v",
    ])
    .unwrap();

    assert_eq!(cli.config.to_str(), Some("/etc/keepsake.toml"));
    assert_eq!(cli.format, OutputFormat::Json);
    assert!(cli.verbose);
    assert_eq!(cli.command, Commands::Status { passes: 10 });
}

#[test]
fn defaults_to_human_output_and_twenty_quarantined() {
    let cli = Cli::try_parse_from(["keepsake", "quarantined"]).unwrap();
    assert_eq!(cli.format, OutputFormat::Human);
    assert_eq!(cli.command, Commands::Quarantined { limit: 20 });
}

#[test]
fn show_requires_a_record() {
    assert!(Cli::try_parse_from(["keepsake", "show"]).is_err());
    assert!(Cli::try_parse_from(["keepsake", "--format", "yaml", "init"]).is_err());
}

#[tokio::test]
async fn init_creates_an_empty_ledger() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    let output = execute(&Commands::Init, &config, OutputFormat::Human)
        .await
        .unwrap();

    assert!(output.starts_with("Ledger ready at"));
    assert!(output.ends_with("(0 records)"));
    assert!(dir.path().join("ledger.db").exists());
}

#[tokio::test]
async fn status_reports_stages_and_passes() {
    let dir = TempDir::new().unwrap();
    let (config, _, _) = seeded(&dir).await;

    let value = json(Commands::Status { passes: 5 }, &config).await;
    assert_eq!(value["stats"]["total"], 2);
    assert_eq!(value["stats"]["quarantined"], 1);
    assert_eq!(value["stats"]["by_stage"]["acquired"], 2);
    assert_eq!(value["stats"]["by_stage"]["retired"], 0);
    assert_eq!(value["recent_passes"].as_array().map(Vec::len), Some(1));

    let human = execute(&Commands::Status { passes: 5 }, &config, OutputFormat::Human)
        .await
        .unwrap();
    assert!(human.contains("Records: 2 (1 quarantined)"));
    assert!(human.contains("Recent passes:"));
    assert!(human.contains("advanced    2"));
}

#[tokio::test]
async fn show_finds_by_id_or_source_reference() {
    let dir = TempDir::new().unwrap();
    let (config, healthy, _) = seeded(&dir).await;

    let by_id = json(Commands::Show { record: healthy.clone() }, &config).await;
    let by_reference = json(
        Commands::Show {
            record: "IMG_0001".to_string(),
        },
        &config,
    )
    .await;

    assert_eq!(by_id, by_reference);
    assert_eq!(by_id["source_reference"], "IMG_0001");
    assert_eq!(by_id["stage"], "acquired");
}

#[tokio::test]
async fn show_unknown_record_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (config, _, _) = seeded(&dir).await;

    let err = execute(
        &Commands::Show {
            record: "nope".to_string(),
        },
        &config,
        OutputFormat::Human,
    )
    .await
    .unwrap_err();

    assert!(matches!(err.kind(), KeepsakeErrorKind::Database(_)));
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn quarantined_then_release() {
    let dir = TempDir::new().unwrap();
    let (config, healthy, broken) = seeded(&dir).await;

    let listed = json(Commands::Quarantined { limit: 20 }, &config).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], broken.as_str());

    let human = execute(
        &Commands::Release { id: broken.clone() },
        &config,
        OutputFormat::Human,
    )
    .await
    .unwrap();
    assert_eq!(human, format!("Released {}", broken));

    let again = json(Commands::Release { id: broken.clone() }, &config).await;
    assert_eq!(again["released"], false);

    let untouched = execute(
        &Commands::Release { id: healthy.clone() },
        &config,
        OutputFormat::Human,
    )
    .await
    .unwrap();
    assert_eq!(untouched, format!("{} was not quarantined", healthy));

    let empty = execute(
        &Commands::Quarantined { limit: 20 },
        &config,
        OutputFormat::Human,
    )
    .await
    .unwrap();
    assert_eq!(empty, "No quarantined records");
}

#[tokio::test]
async fn backup_writes_a_usable_copy_once() {
    let dir = TempDir::new().unwrap();
    let (config, healthy, _) = seeded(&dir).await;
    let destination = dir.path().join("backup.db");

    execute(
        &Commands::Backup {
            destination: destination.clone(),
        },
        &config,
        OutputFormat::Human,
    )
    .await
    .unwrap();
    assert!(destination.exists());

    let restored = PipelineConfig::new(&destination, "nas", "pixel");
    let value = json(Commands::Show { record: healthy }, &restored).await;
    assert_eq!(value["source_reference"], "IMG_0001");

    let second = execute(
        &Commands::Backup { destination },
        &config,
        OutputFormat::Human,
    )
    .await;
    assert!(second.is_err());
}
