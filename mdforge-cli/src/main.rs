#![deny(missing_docs)]
//! mdforge command-line interface.
//!
//! Scans a project, generates a context brief from a preset, and audits an
//! existing brief for quality and drift.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use mdforge_core::config::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES};
use mdforge_core::{
    CancelFlag, DriftItem, IgnoreRules, Overrides, PresetRegistry, ProjectFingerprint,
    ScanConfig, Scanner, StdFileSystem, audit, diff, generate, parse, render_audit_markdown,
    render_audit_text, render_drift_markdown, render_drift_text, render_fingerprint_markdown,
    render_fingerprint_text, render_json, render_presets_markdown, render_presets_text,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// File name written and audited when none is given.
const DEFAULT_DOCUMENT: &str = "CLAUDE.md";

#[derive(Parser)]
#[command(
    name = "mdforge",
    version,
    about = "Generate and audit AI-assistant context briefs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct ScanArgs {
    /// Project root to scan.
    #[arg(long, default_value = ".")]
    path: PathBuf,
    /// Files larger than this many bytes are counted but not read.
    #[arg(long, env = "MDFORGE_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,
    /// Stop walking after this many files.
    #[arg(long, env = "MDFORGE_MAX_FILES", default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,
    /// Worker threads for file reads (defaults to one per CPU).
    #[arg(long, env = "MDFORGE_WORKERS")]
    workers: Option<usize>,
    /// Extra glob patterns to skip (repeatable or comma-separated).
    #[arg(long, env = "MDFORGE_EXCLUDE", value_delimiter = ',')]
    exclude: Vec<String>,
    /// Abort the scan after this many seconds.
    #[arg(long, env = "MDFORGE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl ScanArgs {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            ignore: IgnoreRules::with_extra(&self.exclude),
            max_file_size: self.max_file_size,
            max_files: self.max_files,
            workers: self.workers.filter(|workers| *workers > 0),
        }
    }
}

#[derive(Args, Clone, Debug)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Args, Clone, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    scan: ScanArgs,
    /// Preset id (defaults to the best match for the project).
    #[arg(long)]
    preset: Option<String>,
    /// Project name (defaults to the manifest name, then the directory name).
    #[arg(long)]
    name: Option<String>,
    /// One-line project description.
    #[arg(long)]
    description: Option<String>,
    /// Project version.
    #[arg(long)]
    version: Option<String>,
    /// Last-updated date written into the brief (YYYY-MM-DD, defaults to today).
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Destination file (defaults to CLAUDE.md in the project root).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Overwrite an existing destination file.
    #[arg(long)]
    force: bool,
    /// Print the brief instead of writing it.
    #[arg(long)]
    stdout: bool,
}

#[derive(Args, Clone, Debug)]
struct DocumentArgs {
    #[command(flatten)]
    scan: ScanArgs,
    /// Brief to check, relative to the project root unless absolute.
    #[arg(long, default_value = DEFAULT_DOCUMENT)]
    file: PathBuf,
    #[command(flatten)]
    report: OutputArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a project and print its fingerprint.
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Generate a context brief from a preset.
    Generate(GenerateArgs),
    /// Score a brief against the rubric and check it for drift.
    Audit {
        #[command(flatten)]
        document: DocumentArgs,
        /// Exit with an error when the score is below this value.
        #[arg(long)]
        min_score: Option<u8>,
    },
    /// Compare the facts a brief declares with the codebase.
    Diff {
        #[command(flatten)]
        document: DocumentArgs,
        /// Exit with an error when any drift is found.
        #[arg(long)]
        fail_on_drift: bool,
    },
    /// List available presets.
    Presets {
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { scan, report } => run_scan(&scan, &report).await?,
        Commands::Generate(args) => run_generate(&args).await?,
        Commands::Audit {
            document,
            min_score,
        } => run_audit(&document, min_score).await?,
        Commands::Diff {
            document,
            fail_on_drift,
        } => run_diff(&document, fail_on_drift).await?,
        Commands::Presets { report } => run_presets(&report).await?,
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

async fn run_scan(scan: &ScanArgs, report: &OutputArgs) -> CliResult<()> {
    let fingerprint = scan_project(scan).await?;
    let contents = match report.format {
        OutputFormat::Text => render_fingerprint_text(&fingerprint),
        OutputFormat::Markdown => render_fingerprint_markdown(&fingerprint),
        OutputFormat::Json => render_json(&fingerprint)?,
    };
    emit_output(report, contents).await
}

async fn run_generate(args: &GenerateArgs) -> CliResult<()> {
    let registry = PresetRegistry::embedded()?;
    if let Some(id) = &args.preset {
        registry.lookup(id)?;
    }
    let fingerprint = scan_project(&args.scan).await?;
    let preset = match &args.preset {
        Some(id) => registry.lookup(id)?,
        None => registry.suggest(&fingerprint),
    };
    info!("using preset {}", preset.id);

    let fallback_name = if fingerprint.metadata.name.is_none() {
        directory_name(&args.scan.path).await
    } else {
        None
    };
    let overrides = Overrides {
        project_name: args.name.clone().or(fallback_name),
        description: args.description.clone(),
        version: args.version.clone(),
        generated_on: Some(args.date.unwrap_or_else(|| Local::now().date_naive())),
        ..Overrides::default()
    };
    let document = generate(&fingerprint, preset, &overrides)?;

    if args.stdout {
        print!("{document}");
        return Ok(());
    }
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| args.scan.path.join(DEFAULT_DOCUMENT));
    if !args.force && tokio::fs::try_exists(&destination).await? {
        return Err(format!(
            "{} already exists; pass --force to overwrite it",
            destination.display()
        )
        .into());
    }
    write_file(&destination, document).await?;
    println!(
        "Wrote {} using preset {}",
        destination.display(),
        preset.id
    );
    Ok(())
}

async fn run_audit(args: &DocumentArgs, min_score: Option<u8>) -> CliResult<()> {
    let (path, text) = read_document(args).await?;
    let fingerprint = scan_project(&args.scan).await?;
    let result = audit(&parse(&text), &fingerprint, Local::now().date_naive());

    let name = path.display().to_string();
    let contents = match args.report.format {
        OutputFormat::Text => render_audit_text(&name, &result),
        OutputFormat::Markdown => render_audit_markdown(&name, &result),
        OutputFormat::Json => render_json(&result)?,
    };
    emit_output(&args.report, contents).await?;

    if let Some(min_score) = min_score
        && result.score < min_score
    {
        return Err(format!("score {} is below the minimum of {min_score}", result.score).into());
    }
    Ok(())
}

async fn run_diff(args: &DocumentArgs, fail_on_drift: bool) -> CliResult<()> {
    let (path, text) = read_document(args).await?;
    let fingerprint = scan_project(&args.scan).await?;
    let items = diff(&parse(&text), &fingerprint);
    emit_drift(&path, &items, &args.report).await?;

    if fail_on_drift && !items.is_empty() {
        return Err(format!("{} drifted from the codebase in {} fields", path.display(), items.len()).into());
    }
    Ok(())
}

async fn run_presets(report: &OutputArgs) -> CliResult<()> {
    let presets = PresetRegistry::embedded()?.list_available();
    let contents = match report.format {
        OutputFormat::Text => render_presets_text(&presets),
        OutputFormat::Markdown => render_presets_markdown(&presets),
        OutputFormat::Json => render_json(&presets)?,
    };
    emit_output(report, contents).await
}

/// Run the blocking scan off the async runtime, honoring the timeout.
async fn scan_project(args: &ScanArgs) -> CliResult<ProjectFingerprint> {
    let root = args.path.clone();
    let config = args.scan_config();
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    debug!("scanning {} with {config:?}", root.display());

    let mut task = tokio::task::spawn_blocking(move || {
        Scanner::with_config(StdFileSystem::new(), config).scan(&root, &worker_cancel)
    });
    let fingerprint = match args.timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), &mut task).await {
            Ok(joined) => joined??,
            Err(_) => {
                cancel.cancel();
                // The walk and the reads both poll the flag, so this returns promptly.
                let _ = task.await;
                return Err(format!("scan timed out after {secs}s").into());
            }
        },
        None => task.await??,
    };
    Ok(fingerprint)
}

async fn read_document(args: &DocumentArgs) -> CliResult<(PathBuf, String)> {
    let path = document_path(&args.scan.path, &args.file);
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    Ok((path, text))
}

fn document_path(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}

async fn directory_name(path: &Path) -> Option<String> {
    let resolved = tokio::fs::canonicalize(path).await.ok()?;
    resolved
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

async fn emit_drift(path: &Path, items: &[DriftItem], output: &OutputArgs) -> CliResult<()> {
    let name = path.display().to_string();
    let contents = match output.format {
        OutputFormat::Text => render_drift_text(items),
        OutputFormat::Markdown => render_drift_markdown(&name, items),
        OutputFormat::Json => render_json(items)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        write_file(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

async fn write_file(path: &Path, contents: String) -> CliResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}
