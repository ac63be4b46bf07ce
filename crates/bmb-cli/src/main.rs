use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bmb_core::{ConvertConfig, ConvertedOutput, DedupMode, OutputFormat, TagsMode};
use bmb_storage::{
    push_payloads, read_export_file, write_bytes_atomic, write_json_output, HttpBookmarkSink,
    PushConfig, SinkConfig,
};
use bmb_sync::{load_config, ConvertPipeline, ExportStats, RunOutput};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_ITEMS: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "bmb-cli")]
#[command(about = "Bookmark Bridge: convert read-later exports into bookmark-manager imports")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert an export into a list-format file or API payloads.
    Convert {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, required_unless_present = "dry_run")]
        output: Option<PathBuf>,
        #[arg(short, long)]
        format: Option<OutputFormat>,
        #[arg(long)]
        dry_run: bool,
        /// Write the markdown run summary to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Exit non-zero when any record was dropped.
        #[arg(long)]
        strict: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Report the shape of an export without converting it.
    Validate {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Convert an export and send the API payloads to the bookmark service.
    Push {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = 50)]
        batch_size: usize,
        #[arg(long, default_value_t = 1000)]
        batch_delay_ms: u64,
        #[arg(long)]
        strict: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Debug, Args)]
struct SettingsArgs {
    /// YAML file with conversion settings.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    tags_mode: Option<TagsMode>,
    #[arg(long = "dedup")]
    dedup_mode: Option<DedupMode>,
    #[arg(long, conflicts_with = "no_notes")]
    include_notes: bool,
    #[arg(long)]
    no_notes: bool,
    #[arg(long)]
    max_note_length: Option<usize>,
}

impl SettingsArgs {
    /// Defaults < YAML < BMB_* env < flags.
    fn resolve(&self, format: Option<OutputFormat>) -> Result<ConvertConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(tags_mode) = self.tags_mode {
            config.tags_mode = tags_mode;
        }
        if let Some(dedup_mode) = self.dedup_mode {
            config.dedup_mode = dedup_mode;
        }
        if self.include_notes {
            config.include_notes = true;
        }
        if self.no_notes {
            config.include_notes = false;
        }
        if let Some(max) = self.max_note_length {
            config.max_note_length = max;
        }
        if let Some(format) = format {
            config.output_format = format;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            dry_run,
            report,
            strict,
            settings,
        } => {
            let config = settings.resolve(format)?;
            let run = convert_file(&input, config)?;

            if dry_run {
                preview(&run.output)?;
            } else if let Some(output) = output {
                let stored = write_json_output(&output, &run.output).await?;
                info!(
                    path = %stored.path.display(),
                    bytes = stored.byte_size,
                    sha256 = %stored.content_hash,
                    unchanged = stored.unchanged,
                    "output written"
                );
            }
            if let Some(report) = report {
                write_report(&report, &run).await?;
            }
            eprintln!(
                "convert complete: read={} kept={} dropped={}",
                run.summary.total,
                run.summary.kept,
                run.summary.dropped_total()
            );
            if strict && run.summary.dropped_total() > 0 {
                bail!("{} record(s) dropped in strict mode", run.summary.dropped_total());
            }
        }
        Commands::Validate { input } => {
            let entries = read_export_file(&input)?;
            let stats = ExportStats::from_entries(&entries);
            eprintln!("{}", stats.render_table());
            if let Some(warning) = invalid_url_warning(&stats) {
                eprintln!("{warning}");
            }
        }
        Commands::Push {
            input,
            batch_size,
            batch_delay_ms,
            strict,
            settings,
        } => {
            let config = settings.resolve(Some(OutputFormat::Api))?;
            let run = convert_file(&input, config)?;
            let ConvertedOutput::Api(pairs) = run.output else {
                bail!("push requires API payload output");
            };

            let sink = HttpBookmarkSink::new(SinkConfig::from_env()?)?;
            let push_config = PushConfig {
                batch_size,
                batch_delay: Duration::from_millis(batch_delay_ms),
            };
            let report = push_payloads(&sink, &pairs, &push_config).await;
            eprintln!(
                "push complete: created={} existing={} tagged={} failed={} dropped_before_push={}",
                report.created,
                report.existing,
                report.tagged,
                report.failures.len(),
                run.summary.dropped_total()
            );
            for failure in &report.failures {
                eprintln!("  #{} {:?} {}: {}", failure.index, failure.stage, failure.url, failure.error);
            }
            if strict && (!report.failures.is_empty() || run.summary.dropped_total() > 0) {
                bail!("push finished with failures in strict mode");
            }
        }
    }

    Ok(())
}

fn convert_file(input: &Path, config: ConvertConfig) -> Result<RunOutput> {
    let entries = read_export_file(input)?;
    let pipeline = ConvertPipeline::new(config)?;
    Ok(pipeline.run(entries))
}

fn preview(output: &ConvertedOutput) -> Result<()> {
    let items = match output {
        ConvertedOutput::List(items) => serde_json::to_value(items.iter().take(PREVIEW_ITEMS).collect::<Vec<_>>()),
        ConvertedOutput::Api(items) => serde_json::to_value(items.iter().take(PREVIEW_ITEMS).collect::<Vec<_>>()),
    }
    .context("serializing preview")?;
    info!(items = output.len(), "dry run, nothing written");
    info!("preview:\n{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn invalid_url_warning(stats: &ExportStats) -> Option<String> {
    let invalid = stats.invalid();
    (invalid > 0).then(|| {
        format!("warning: {invalid} of {} entries have a missing or invalid URL and will be skipped", stats.total)
    })
}

async fn write_report(path: &Path, run: &RunOutput) -> Result<()> {
    let markdown = run.summary.render_markdown();
    write_bytes_atomic(path, markdown.as_bytes())
        .await
        .with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialised");
    }
}
