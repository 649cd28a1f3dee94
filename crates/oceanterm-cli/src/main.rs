use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use oceanterm_core::config_file;
use oceanterm_core::{Config, Pipeline, ProgressEvent, TaskSelection, TextExtractor};
use oceanterm_pdf_mupdf::MupdfExtractor;

mod output;

use output::ColorMode;

/// Marine-standard terminology extractor - mine term definitions and
/// inter-term relationships from a corpus of standards PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the task file: a JSON array of term names
    task_file: PathBuf,

    /// Which result files to produce
    #[arg(long, value_enum, default_value = "all")]
    task: Task,

    /// Directory scanned for corpus PDFs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory the result files are written into
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Abort on the first unresolved term
    #[arg(long)]
    strict: bool,

    /// Extract documents on parallel workers
    #[arg(long)]
    parallel: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Task {
    /// Terminology extraction only
    #[value(name = "1")]
    Terms,
    /// Relationship discovery only
    #[value(name = "2")]
    Relations,
    /// Both result files plus the validation report
    All,
}

impl Task {
    fn selection(self) -> TaskSelection {
        match self {
            Task::Terms => TaskSelection::Terms,
            Task::Relations => TaskSelection::Relations,
            Task::All => TaskSelection::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let clean = run(cli).await?;
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr so stdout stays clean for result output.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("OCEANTERM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file = match &cli.config {
        Some(path) => config_file::load_explicit(path)?,
        None => config_file::load_config(),
    };
    let mut config = file.into_config(Config::default())?;

    if let Ok(dir) = std::env::var("OCEANTERM_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("OCEANTERM_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.output {
        config.output_dir = dir;
    }
    if cli.strict {
        config.strict = true;
    }
    if cli.parallel {
        config.parallel = true;
    }

    if !cli.task_file.exists() {
        anyhow::bail!("Task file not found: {}", cli.task_file.display());
    }

    let selection = cli.task.selection();
    let output_dir = config.output_dir.clone();
    let color = ColorMode(!cli.no_color);
    let mut pipeline = Pipeline::new(config)?;

    let mut writer = std::io::stdout();
    output::print_run_header(&mut writer, &cli.task_file, pipeline.config())?;
    writer.flush()?;

    // A bar tracks document extraction; term and relation progress is
    // printed line by line once the bar is gone.
    let bar = output::ExtractionBar::new();
    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> =
        Arc::new(Mutex::new(Box::new(std::io::stdout())));

    let progress_cb = {
        let bar = bar.clone();
        let pw = Arc::clone(&progress_writer);
        move |event: ProgressEvent| {
            bar.update(&event);
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, color);
                let _ = w.flush();
            }
        }
    };

    let extractor: Arc<dyn TextExtractor> = Arc::new(MupdfExtractor::new());
    let result = pipeline
        .run(&cli.task_file, selection, extractor, progress_cb)
        .await;
    bar.clear();
    let run_output = result?;

    // Write the selected result files
    let mut written = Vec::new();
    if selection.writes_terms() {
        let path = oceanterm_reporting::write_task1(&run_output.term_entries, &output_dir)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        tracing::info!(path = %path.display(), "wrote terminology results");
        written.push(path);
    }
    if selection.writes_relations() {
        let path = oceanterm_reporting::write_task2(&run_output.relation_entries, &output_dir)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        tracing::info!(path = %path.display(), "wrote relationship results");
        written.push(path);
    }
    if selection == TaskSelection::All {
        let path = oceanterm_reporting::write_report(&run_output.report, &output_dir)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        tracing::info!(path = %path.display(), "wrote validation report");
        written.push(path);
    }

    writeln!(writer)?;
    output::print_issues(&mut writer, &run_output.issues, color)?;
    output::print_validation(&mut writer, &run_output.report, color)?;
    output::print_summary(
        &mut writer,
        &run_output.summary,
        &run_output.stats,
        &run_output.report,
        &written,
        color,
    )?;

    Ok(run_output.summary.is_clean())
}
