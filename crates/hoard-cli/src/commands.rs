use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use colored::Colorize;
use hoard_ingest::IngestReport;
use hoard_types::Entry;
use walkdir::WalkDir;

use crate::archive::Archive;
use crate::cli::*;
use crate::config::HoardConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = HoardConfig::load(&cli.config)?;
    let archive = Archive::open(&config)?;
    let format = cli.format;

    match cli.command {
        Command::Ingest(args) => cmd_ingest(&archive, args, format),
        Command::Show(args) => {
            let entry = archive.index.get(&args.id)?;
            print_entry(&entry, format)
        }
        Command::Cat(args) => cmd_cat(&archive, args),
        Command::Alias(args) => {
            archive.index.alias(&args.alias, &args.id)?;
            println!("{} {} → {}", "✓".green().bold(), args.alias.yellow(), args.id);
            Ok(())
        }
        Command::Unalias(args) => {
            archive.index.unalias(&args.alias)?;
            println!("{} removed {}", "✓".green().bold(), args.alias.yellow());
            Ok(())
        }
        Command::Resolve(args) => {
            let entry = archive.index.get_alias(&args.alias)?;
            print_entry(&entry, format)
        }
        Command::Relate(args) => {
            archive.index.relate(&args.from, &args.to)?;
            println!("{} {} → {}", "✓".green().bold(), args.from, args.to.cyan());
            Ok(())
        }
        Command::Unrelate(args) => {
            archive.index.unrelate(&args.from, &args.to)?;
            println!("{} {} ↛ {}", "✓".green().bold(), args.from, args.to.cyan());
            Ok(())
        }
        Command::Relations(args) => {
            let targets = archive.index.relations(&args.id)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&targets)?),
                OutputFormat::Text if targets.is_empty() => println!("No relations."),
                OutputFormat::Text => {
                    for target in targets {
                        println!("{}", target.cyan());
                    }
                }
            }
            Ok(())
        }
        Command::Near(args) => {
            let entries = archive.index.near(&args.gridsquare)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
                OutputFormat::Text if entries.is_empty() => println!("No entries."),
                OutputFormat::Text => {
                    for entry in entries {
                        println!(
                            "{}  {}  {}",
                            entry.gridsquare.as_deref().unwrap_or("").yellow(),
                            entry.id,
                            entry.name.as_deref().unwrap_or("").dimmed()
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

fn cmd_ingest(archive: &Archive, args: IngestArgs, format: OutputFormat) -> anyhow::Result<()> {
    let paths = expand_paths(&args.paths, args.recursive)?;
    let ingestor = archive.ingestor();

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let report = runtime.block_on(ingestor.ingest_all(&paths));

    match format {
        OutputFormat::Json => print_report_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_success() {
        bail!("{} of {} files failed", report.failed.len(), report.total());
    }
    Ok(())
}

/// Turn command-line paths into the list of files to ingest.
fn expand_paths(paths: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        if !recursive {
            bail!("{} is a directory (use --recursive)", path.display());
        }
        let mut found: Vec<PathBuf> = Vec::new();
        for dirent in WalkDir::new(path) {
            let dirent = dirent.with_context(|| format!("walking {}", path.display()))?;
            if dirent.file_type().is_file() {
                found.push(dirent.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn cmd_cat(archive: &Archive, args: CatArgs) -> anyhow::Result<()> {
    let entry = archive.index.get(&args.id)?;
    let address = entry
        .addresses
        .get(&args.role)
        .with_context(|| format!("entry {} has no {:?} address", entry.id, args.role))?;
    let store = archive
        .store_for(&args.role)
        .with_context(|| format!("no store configured for role {:?}", args.role))?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            store.get_address(address, &mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            store.get_address(address, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn print_entry(entry: &Entry, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    println!("{}", entry.id.yellow().bold());
    if let Some(name) = &entry.name {
        println!("  Name:       {name}");
    }
    println!("  Time:       {}", entry.timestamp.to_rfc3339());
    if let Some(kind) = &entry.entry_type {
        println!("  Type:       {kind}");
    }
    if let Some(gs) = &entry.gridsquare {
        println!("  Gridsquare: {}", gs.cyan());
    }
    println!("  Importance: {}", entry.importance);
    for (role, address) in &entry.addresses {
        println!(
            "  {:<11} {}  {} bytes  {}",
            format!("{role}:"),
            address.score.short().yellow(),
            address.size,
            address.location.dimmed()
        );
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    for id in &report.added {
        println!("  {} {}", "added:".green(), id);
    }
    for id in &report.duplicates {
        println!("  {} {}", "exists:".yellow(), id);
    }
    for path in &report.skipped {
        println!("  {} {}", "skipped:".dimmed(), path.display());
    }
    for (path, reason) in &report.failed {
        println!("  {} {}: {}", "failed:".red(), path.display(), reason);
    }
    println!(
        "{} {} added, {} already archived, {} skipped, {} failed",
        if report.is_success() { "✓".green().bold() } else { "✗".red().bold() },
        report.added.len(),
        report.duplicates.len(),
        report.skipped.len(),
        report.failed.len()
    );
}

fn print_report_json(report: &IngestReport) -> anyhow::Result<()> {
    let failed: Vec<_> = report
        .failed
        .iter()
        .map(|(path, reason)| serde_json::json!({ "path": path, "error": reason }))
        .collect();
    let value = serde_json::json!({
        "added": report.added,
        "duplicates": report.duplicates,
        "skipped": report.skipped,
        "failed": failed,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
