//! Human-readable output.

use keepsake_core::{LedgerStats, MediaRecord, PassRun};

const SEPARATOR_WIDTH: usize = 80;

fn separator() -> String {
    format!("{:-<width$}", "", width = SEPARATOR_WIDTH)
}

/// Sizes in binary units, e.g. `1.5 MiB`.
pub(crate) fn bytes(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", size)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub(crate) fn status(stats: &LedgerStats, passes: &[PassRun]) -> String {
    let mut lines = vec![
        format!(
            "Records: {} ({} quarantined)",
            stats.total, stats.quarantined
        ),
        separator(),
    ];
    for (stage, count) in &stats.by_stage {
        lines.push(format!("{:<20} {:>8}", stage.as_str(), count));
    }
    lines.push(separator());
    lines.push(format!(
        "Stored: {} of {} acquired",
        bytes(stats.bytes_current),
        bytes(stats.bytes_original)
    ));

    lines.push(String::new());
    if passes.is_empty() {
        lines.push("No passes recorded".to_string());
    } else {
        lines.push("Recent passes:".to_string());
        lines.push(separator());
        lines.extend(passes.iter().map(pass_line));
    }
    lines.join("\n")
}

fn pass_line(pass: &PassRun) -> String {
    let report = pass.report();
    let mut line = format!(
        "#{:<5} {}  advanced {:>4}  failed {:>4}",
        pass.id(),
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.total_advanced(),
        report.total_failed()
    );
    if report.dry_run {
        line.push_str("  (dry run)");
    }
    if let Some(reason) = &report.aborted {
        line.push_str(&format!("  aborted: {}", reason));
    }
    line
}

pub(crate) fn record(record: &MediaRecord) -> String {
    let destinations: Vec<&str> = record.replica_flags().iter().collect();
    let mut lines = vec![
        format!("Record {}", record.id()),
        separator(),
        format!("source      {}", record.source_reference()),
        format!("stage       {}", record.stage()),
        format!(
            "local file  {}",
            record
                .local_path()
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(released)".to_string())
        ),
        format!("created     {}", record.created_at().to_rfc3339()),
        format!(
            "size        {} (acquired {})",
            bytes(*record.byte_size_current()),
            bytes(*record.byte_size_original())
        ),
        format!(
            "replicas    {}",
            if destinations.is_empty() {
                "none".to_string()
            } else {
                destinations.join(", ")
            }
        ),
    ];
    if let Some(tier) = record.compression_tier() {
        lines.push(format!("tier        {}", tier));
    }
    if let Some(token) = record.deletion_token() {
        lines.push(format!("deletion    {}", token));
    }
    lines.push(format!("failures    {}", record.error_count()));
    if let Some(error) = record.last_error() {
        lines.push(format!("last error  {}", error));
    }
    if *record.quarantined() {
        lines.push("QUARANTINED".to_string());
    }
    lines.push(format!("updated     {}", record.updated_at().to_rfc3339()));
    lines.join("\n")
}

pub(crate) fn quarantined(records: &[MediaRecord]) -> String {
    if records.is_empty() {
        return "No quarantined records".to_string();
    }
    let mut lines = vec![
        format!("{:<38} {:<18} {:>4}  last error", "id", "stage", "errs"),
        separator(),
    ];
    for record in records {
        lines.push(format!(
            "{:<38} {:<18} {:>4}  {}",
            record.id(),
            record.stage().as_str(),
            record.error_count(),
            record.last_error().as_deref().unwrap_or("")
        ));
    }
    lines.push(separator());
    lines.push(format!("Total: {} records", records.len()));
    lines.join("\n")
}
