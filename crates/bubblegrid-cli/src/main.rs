//! bubblegrid CLI — command-line interface for OMR sheet processing.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use bubblegrid::{render_overlay, AnswerKeyBook, SheetProcessor, Template};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bubblegrid")]
#[command(about = "Read and score photographed OMR answer sheets against a bubble template")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one sheet image: rectify, read bubbles, score.
    Process(CliProcessArgs),

    /// Print a summary of a template JSON file.
    TemplateInfo {
        /// Path to the template JSON.
        #[arg(long)]
        template: PathBuf,
    },

    /// Print the sheets and sizes of an answer-key workbook.
    KeysInfo {
        /// Path to the answer-key workbook (.xlsx).
        #[arg(long)]
        keys: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliProcessArgs {
    /// Path to the sheet photograph.
    #[arg(long)]
    image: PathBuf,

    /// Path to the template JSON.
    #[arg(long)]
    template: PathBuf,

    /// Path to the answer-key workbook (.xlsx, one sheet per version).
    #[arg(long)]
    keys: PathBuf,

    /// Path to write the sheet report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Form version (A/B/...). Detected from the header band when omitted.
    #[arg(long)]
    version: Option<String>,

    /// Path to write the annotated review overlay image.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Path to write the rectified canonical image.
    #[arg(long)]
    warped: Option<PathBuf>,

    /// Minimum fill ratio for a bubble to count as marked.
    #[arg(long, default_value = "0.12")]
    min_fill_ratio: f32,

    /// Minimum best-vs-runner-up separation before flagging ambiguous.
    #[arg(long, default_value = "0.10")]
    ambiguity_margin: f32,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => run_process(&args),
        Commands::TemplateInfo { template } => run_template_info(&template),
        Commands::KeysInfo { keys } => run_keys_info(&keys),
    }
}

// ── process ────────────────────────────────────────────────────────────

fn run_process(args: &CliProcessArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let raw = image::open(&args.image)
        .map_err(|e| {
            bubblegrid::PipelineError::ImageUnreadable(format!(
                "{}: {}",
                args.image.display(),
                e
            ))
        })?
        .to_rgb8();
    let (w, h) = raw.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let template = Template::from_json_file(&args.template)?;
    let keys = AnswerKeyBook::from_xlsx_file(&args.keys)?;

    let mut config = bubblegrid::PipelineConfig::default();
    config.decision.min_fill_ratio = args.min_fill_ratio;
    config.decision.ambiguity_margin = args.ambiguity_margin;

    let processor = SheetProcessor::with_config(template, config)?;
    let canonical = processor.rectify(&raw);
    let report = processor.process_canonical(&canonical, &keys, args.version.as_deref());

    tracing::info!(
        "Version {}: {} answered, {} flagged, total score {}",
        report.version,
        report.detection.n_answered(),
        report.detection.flags.len(),
        report.score.total,
    );

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Report written to {}", args.out.display());

    if let Some(overlay_path) = &args.overlay {
        let overlay = render_overlay(&canonical, processor.template(), &report.detection);
        overlay.save(overlay_path)?;
        tracing::info!("Overlay written to {}", overlay_path.display());
    }

    if let Some(warped_path) = &args.warped {
        canonical.save(warped_path)?;
        tracing::info!("Rectified image written to {}", warped_path.display());
    }

    Ok(())
}

// ── template-info ──────────────────────────────────────────────────────

fn run_template_info(path: &Path) -> CliResult<()> {
    let template = Template::from_json_file(path)?;

    println!("template {}", path.display());
    println!("  name:        {}", template.name);
    println!(
        "  canvas:      {}x{} px",
        template.canvas_size[0], template.canvas_size[1]
    );
    println!("  questions:   {}", template.n_questions());

    if let (Some(first), Some(last)) = (template.questions.first(), template.questions.last()) {
        println!(
            "  question {}: {} options ({})",
            first.number,
            first.options.len(),
            first
                .options
                .iter()
                .map(|o| o.id.as_str())
                .collect::<Vec<_>>()
                .join("/")
        );
        if last.number != first.number {
            println!("  question {}: {} options", last.number, last.options.len());
        }
    }

    Ok(())
}

// ── keys-info ──────────────────────────────────────────────────────────

fn run_keys_info(path: &Path) -> CliResult<()> {
    let keys = AnswerKeyBook::from_xlsx_file(path)?;

    println!("answer keys {}", path.display());
    for name in keys.sheet_names() {
        let (_, key) = keys.resolve(name);
        println!("  sheet {:?}: {} questions", name, key.len());
    }

    Ok(())
}
