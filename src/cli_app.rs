//! Top-level CLI definition and dispatch.

#![allow(missing_docs)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::Colorize;
use colored::control;

use crate::classify::record::{FileCategory, ThreatLevel};
use crate::classify::summary::SummaryStatus;
use crate::core::config::Config;
use crate::core::errors::{Result, SentryError};
use crate::disposition::store::DispositionRecord;
use crate::engine::TriageEngine;
use crate::sentry::alerts::DesktopAlertSink;

/// disk_sentry — local endpoint triage engine.
#[derive(Debug, Parser)]
#[command(
    name = "dsentry",
    author,
    version,
    about = "Disk Sentry - Endpoint Triage Engine",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan all monitored sectors and report classifications.
    Scan(ScanArgs),
    /// Classify a single file.
    Classify(PathArg),
    /// Summarize monitored sectors into an integrity score.
    Summary,
    /// Move a file into quarantine.
    Quarantine(DispositionArgs),
    /// Move a file into the secure vault.
    Vault(DispositionArgs),
    /// Restore a quarantined or vaulted file by id.
    Restore(RestoreArgs),
    /// List quarantine or vault holdings.
    List(ListArgs),
    /// Destroy a file with a multi-pass overwrite, then remove it.
    Shred(ShredArgs),
    /// Byte-level forensic inspection of a file.
    DeepScan(PathArg),
    /// Sort files into per-category folders.
    Organize(OrganizeArgs),
    /// Show pending sentry notifications.
    Notifications,
    /// Dismiss a pending notification by id.
    Dismiss(IdArg),
    /// Run the sentry scheduler in the foreground.
    #[cfg(feature = "daemon")]
    Daemon,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Only report files at or above this threat level (safe|suspicious|malicious).
    #[arg(long, value_name = "LEVEL")]
    min_threat: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct PathArg {
    path: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct DispositionArgs {
    path: PathBuf,
    /// Free-text reason recorded with the disposition.
    #[arg(long, default_value = "operator request")]
    reason: String,
}

#[derive(Debug, Clone, Args)]
struct RestoreArgs {
    /// Which holding area: quarantine or vault.
    kind: String,
    /// Entry id as printed by `list` (hex).
    id: String,
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    /// Which holding area: quarantine or vault.
    kind: String,
}

#[derive(Debug, Clone, Args)]
struct ShredArgs {
    path: PathBuf,
    /// Required acknowledgement that the operation is irreversible.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct OrganizeArgs {
    paths: Vec<PathBuf>,
    /// Force one category bucket instead of per-file detection.
    #[arg(long, value_name = "CATEGORY")]
    category: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct IdArg {
    /// Notification id.
    id: u64,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

/// Entry point called from `main`.
pub fn run(cli: &Cli) -> Result<()> {
    if cli.no_color {
        control::set_override(false);
    }

    if let Command::Completions(args) = &cli.command {
        let mut cmd = Cli::command();
        generate(args.shell, &mut cmd, "dsentry", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let engine = TriageEngine::new(config)?;

    match &cli.command {
        Command::Scan(args) => cmd_scan(&engine, args, cli.json),
        Command::Classify(args) => cmd_classify(&engine, args, cli.json),
        Command::Summary => cmd_summary(&engine, cli.json),
        Command::Quarantine(args) => {
            let record = engine.quarantine(&args.path, &args.reason)?;
            print_disposition(&record, cli.json);
            Ok(())
        }
        Command::Vault(args) => {
            let record = engine.vault(&args.path, &args.reason)?;
            print_disposition(&record, cli.json);
            Ok(())
        }
        Command::Restore(args) => cmd_restore(&engine, args),
        Command::List(args) => cmd_list(&engine, args, cli.json),
        Command::Shred(args) => cmd_shred(&engine, args),
        Command::DeepScan(args) => cmd_deep_scan(&engine, args, cli.json),
        Command::Organize(args) => cmd_organize(&engine, args),
        Command::Notifications => cmd_notifications(&engine, cli.json),
        Command::Dismiss(args) => engine.dismiss_notification(args.id),
        #[cfg(feature = "daemon")]
        Command::Daemon => cmd_daemon(&engine),
        Command::Completions(_) => unreachable!("handled above"),
    }
}

fn parse_threat_level(raw: &str) -> Result<ThreatLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "safe" => Ok(ThreatLevel::Safe),
        "suspicious" => Ok(ThreatLevel::Suspicious),
        "malicious" => Ok(ThreatLevel::Malicious),
        other => Err(SentryError::InvalidConfig {
            details: format!("unknown threat level: {other}"),
        }),
    }
}

fn parse_category(raw: &str) -> Result<FileCategory> {
    match raw.to_ascii_lowercase().as_str() {
        "image" => Ok(FileCategory::Image),
        "video" => Ok(FileCategory::Video),
        "audio" => Ok(FileCategory::Audio),
        "document" => Ok(FileCategory::Document),
        "code" => Ok(FileCategory::Code),
        "archive" => Ok(FileCategory::Archive),
        "executable" => Ok(FileCategory::Executable),
        "application" => Ok(FileCategory::Application),
        "other" => Ok(FileCategory::Other),
        other => Err(SentryError::InvalidConfig {
            details: format!("unknown category: {other}"),
        }),
    }
}

fn threat_colored(level: ThreatLevel) -> colored::ColoredString {
    match level {
        ThreatLevel::Safe => "safe".green(),
        ThreatLevel::Suspicious => "suspicious".yellow(),
        ThreatLevel::Malicious => "malicious".red().bold(),
    }
}

fn cmd_scan(engine: &TriageEngine, args: &ScanArgs, json: bool) -> Result<()> {
    let min = args
        .min_threat
        .as_deref()
        .map(parse_threat_level)
        .transpose()?
        .unwrap_or(ThreatLevel::Safe);

    let records: Vec<_> = engine
        .scan_all()?
        .into_iter()
        .filter(|r| r.threat_level >= min)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        let tags = record.tags.iter().cloned().collect::<Vec<_>>().join(",");
        println!(
            "{:<11} {:<9} {:<40} {}",
            threat_colored(record.threat_level),
            record.privacy_level,
            record.path.display(),
            tags
        );
    }
    println!("{} files", records.len());
    Ok(())
}

fn cmd_classify(engine: &TriageEngine, args: &PathArg, json: bool) -> Result<()> {
    let record = engine.scan_one(&args.path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    println!("path:    {}", record.path.display());
    println!("threat:  {}", threat_colored(record.threat_level));
    println!("privacy: {}", record.privacy_level);
    if let Some(ty) = &record.threat_type {
        println!("type:    {ty}");
    }
    if !record.tags.is_empty() {
        let tags = record.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        println!("tags:    {tags}");
    }
    Ok(())
}

fn cmd_summary(engine: &TriageEngine, json: bool) -> Result<()> {
    let records = engine.scan_all()?;
    let summary = engine.summarize(&records);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    let status = match summary.status {
        SummaryStatus::Protected => "protected".green(),
        SummaryStatus::Warning => "warning".yellow(),
        SummaryStatus::Alert => "alert".red().bold(),
    };
    println!("status:            {status}");
    println!("integrity score:   {}/100", summary.integrity_score);
    println!("files scanned:     {}", summary.total_files);
    println!("malicious:         {}", summary.malicious_count);
    println!("suspicious:        {}", summary.suspicious_count);
    println!("critical privacy:  {}", summary.critical_privacy_count);
    println!("sensitive privacy: {}", summary.sensitive_privacy_count);
    Ok(())
}

fn print_disposition(record: &DispositionRecord, json: bool) {
    if json {
        if let Ok(s) = serde_json::to_string_pretty(record) {
            println!("{s}");
        }
        return;
    }
    println!("id:     {:016x}", record.id);
    println!("stored: {}", record.stored_path.display());
    println!("digest: {}", record.digest);
}

fn parse_kind(raw: &str) -> Result<crate::disposition::store::DispositionKind> {
    use crate::disposition::store::DispositionKind;
    match raw.to_ascii_lowercase().as_str() {
        "quarantine" => Ok(DispositionKind::Quarantine),
        "vault" => Ok(DispositionKind::Vault),
        other => Err(SentryError::InvalidConfig {
            details: format!("unknown holding area: {other} (expected quarantine|vault)"),
        }),
    }
}

fn cmd_restore(engine: &TriageEngine, args: &RestoreArgs) -> Result<()> {
    use crate::disposition::store::DispositionKind;
    let kind = parse_kind(&args.kind)?;
    let id = u64::from_str_radix(args.id.trim_start_matches("0x"), 16).map_err(|e| {
        SentryError::InvalidConfig {
            details: format!("bad id {:?}: {e}", args.id),
        }
    })?;
    let restored = match kind {
        DispositionKind::Quarantine => engine.restore_quarantine(id)?,
        DispositionKind::Vault => engine.restore_vault(id)?,
    };
    println!("restored to {}", restored.display());
    Ok(())
}

fn cmd_list(engine: &TriageEngine, args: &ListArgs, json: bool) -> Result<()> {
    use crate::disposition::store::DispositionKind;
    let records = match parse_kind(&args.kind)? {
        DispositionKind::Quarantine => engine.list_quarantine()?,
        DispositionKind::Vault => engine.list_vault()?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for record in &records {
        println!(
            "{:016x}  {}  {}  ({})",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.original_path.display(),
            record.reason
        );
    }
    println!("{} entries", records.len());
    Ok(())
}

fn cmd_shred(engine: &TriageEngine, args: &ShredArgs) -> Result<()> {
    if !args.yes {
        return Err(SentryError::InvalidConfig {
            details: "shred is irreversible; pass --yes to confirm".to_string(),
        });
    }
    let report = engine.shred(&args.path)?;
    println!(
        "shredded {} ({} bytes, {} passes)",
        report.path.display(),
        report.size_bytes,
        report.passes
    );
    println!("{}", format!("note: {}", report.caveat).yellow());
    Ok(())
}

fn cmd_deep_scan(engine: &TriageEngine, args: &PathArg, json: bool) -> Result<()> {
    let report = engine.deep_scan(&args.path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("path:    {}", report.path.display());
    println!("level:   {}", threat_colored(report.threat_level));
    println!("entropy: {:.2}", report.entropy);
    for finding in &report.findings {
        println!("  - {finding}");
    }
    Ok(())
}

fn cmd_organize(engine: &TriageEngine, args: &OrganizeArgs) -> Result<()> {
    let category = args.category.as_deref().map(parse_category).transpose()?;
    let report = engine.organize(&args.paths, category)?;
    for (from, to) in &report.moved {
        println!("{} -> {}", from.display(), to.display());
    }
    println!("{} moved, {} skipped", report.moved.len(), report.skipped);
    Ok(())
}

fn cmd_notifications(engine: &TriageEngine, json: bool) -> Result<()> {
    let notifications = engine.notifications();
    if json {
        println!("{}", serde_json::to_string_pretty(&notifications)?);
        return Ok(());
    }
    for n in &notifications {
        let prompt = n
            .action
            .as_ref()
            .map(|a| format!("  [{}]", a.prompt()))
            .unwrap_or_default();
        println!("#{} {} — {}{prompt}", n.id, n.title.bold(), n.message);
    }
    println!("{} pending", notifications.len());
    Ok(())
}

#[cfg(feature = "daemon")]
fn cmd_daemon(engine: &TriageEngine) -> Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&term)).map_err(|e| {
            SentryError::Runtime {
                details: format!("signal handler registration failed: {e}"),
            }
        })?;
    }

    let handle = engine.start_sentry(Some(Box::new(DesktopAlertSink)));
    eprintln!(
        "dsentry sentry running (interval {}m); Ctrl-C to stop",
        engine.config().sentry.interval_minutes
    );

    while !term.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    handle.stop();
    eprintln!("dsentry stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_scan_with_filter() {
        let cli = Cli::try_parse_from(["dsentry", "scan", "--min-threat", "suspicious"]).unwrap();
        match cli.command {
            Command::Scan(args) => assert_eq!(args.min_threat.as_deref(), Some("suspicious")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["dsentry"]).is_err());
    }

    #[test]
    fn shred_requires_yes_flag() {
        let cli = Cli::try_parse_from(["dsentry", "shred", "/tmp/x"]).unwrap();
        match cli.command {
            Command::Shred(args) => assert!(!args.yes),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn threat_level_parsing() {
        assert_eq!(parse_threat_level("MALICIOUS").unwrap(), ThreatLevel::Malicious);
        assert!(parse_threat_level("weird").is_err());
    }

    #[test]
    fn category_parsing() {
        assert_eq!(parse_category("archive").unwrap(), FileCategory::Archive);
        assert!(parse_category("stuff").is_err());
    }

    #[test]
    fn kind_parsing() {
        use crate::disposition::store::DispositionKind;
        assert_eq!(parse_kind("Vault").unwrap(), DispositionKind::Vault);
        assert!(parse_kind("lockbox").is_err());
    }
}
