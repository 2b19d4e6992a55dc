//! Zentinel SVG sanitizer binary.
//!
//! Run with: `zentinel-svg-sanitizer --config config.yaml logo.svg`
//!
//! Without input files, reads one SVG from stdin and writes the result to
//! stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_svg_sanitizer::paths::resolve_within;
use zentinel_svg_sanitizer::{SvgSanitizerConfig, SvgUploadGuard, UploadDecision};

const STDIN_NAME: &str = "<stdin>";

/// SVG upload sanitizer for Zentinel.
///
/// Strips scripts, event handlers, external entities and anything outside the
/// element/attribute allow-lists. Exits non-zero if any input is rejected.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Write sanitized files into this directory instead of stdout
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print what was stripped from each input (YAML, to stderr)
    #[arg(long)]
    report: bool,

    /// Print the effective policy (YAML) and exit
    #[arg(long)]
    print_policy: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// SVG files to sanitize
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only markup
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Zentinel SVG sanitizer v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        info!("Config file: {}", args.config.display());
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        SvgSanitizerConfig::default()
    };

    info!(
        profile = ?config.policy.profile,
        block_doctype = config.xxe_prevention.block_doctype,
        legacy_matching = config.scrubbing.legacy_matching,
        max_input_size = config.settings.max_input_size,
        "Configuration loaded"
    );

    let guard = SvgUploadGuard::new(config).context("Invalid sanitizer configuration")?;

    if args.print_policy {
        let snapshot = guard.sanitizer().policy().snapshot();
        print!("{}", serde_yaml::to_string(&snapshot)?);
        return Ok(());
    }

    if let Some(dir) = &args.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut rejected = 0usize;
    if args.files.is_empty() {
        let mut body = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut body)
            .await
            .context("Failed to read stdin")?;
        if !handle_input(&guard, &args, STDIN_NAME, &body).await? {
            rejected += 1;
        }
    } else {
        for path in &args.files {
            let body = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if !handle_input(&guard, &args, &path.display().to_string(), &body).await? {
                rejected += 1;
            }
        }
    }

    let metrics = guard.metrics();
    info!(
        processed = metrics.uploads_processed,
        accepted = metrics.uploads_accepted,
        rejected = metrics.uploads_rejected,
        elements_stripped = metrics.elements_stripped,
        attributes_stripped = metrics.attributes_stripped,
        "Done"
    );

    if rejected > 0 {
        anyhow::bail!("{} of {} inputs rejected", rejected, metrics.uploads_processed);
    }
    Ok(())
}

/// Sanitize one input and emit the result. Returns `false` if it was rejected.
async fn handle_input(
    guard: &SvgUploadGuard,
    args: &Args,
    name: &str,
    body: &[u8],
) -> Result<bool> {
    let sanitized = match guard.process_upload(name, body) {
        UploadDecision::Accept(sanitized) => sanitized,
        UploadDecision::Reject(err) => {
            eprintln!("{}: {}", name, err);
            return Ok(false);
        }
    };

    if args.report {
        eprintln!("# {}", name);
        eprint!("{}", serde_yaml::to_string(&sanitized.report)?);
    }

    match &args.output_dir {
        Some(dir) => {
            let file_name = match Path::new(name).file_name() {
                Some(n) if name != STDIN_NAME => n.to_string_lossy().into_owned(),
                _ => "stdin.svg".to_string(),
            };
            let target = resolve_within(dir, &file_name)
                .with_context(|| format!("Refusing to write {}", file_name))?;
            tokio::fs::write(&target, sanitized.markup.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;
            info!(input = %name, output = %target.display(), "Wrote sanitized SVG");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(sanitized.markup.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(true)
}
