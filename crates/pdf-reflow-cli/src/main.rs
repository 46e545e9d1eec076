//! PDF Reflow CLI - Translate a PDF locally and write the reflowed result.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_reflow_core::{AppConfig, DocumentTranslator, FailurePolicy, Lang, language_name};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdf-reflow")]
#[command(author, version, about = "Translate PDF documents with local MarianMT models", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required_unless_present_any = ["list_languages", "clear_cache"])]
    input: Option<PathBuf>,

    /// Output PDF file (default: <input>-<target>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target language code
    #[arg(short = 't', long, env = "PDF_REFLOW_TARGET", default_value = pdf_reflow_core::DEFAULT_TARGET_LANG)]
    target: String,

    /// Config file path
    #[arg(short, long, env = "PDF_REFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Local directory with pre-downloaded models
    #[arg(long, env = "PDF_REFLOW_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Hub repository with converted Marian tokenizers
    #[arg(long, env = "PDF_REFLOW_TOKENIZER_REPO")]
    tokenizer_repo: Option<String>,

    /// TrueType font to embed in the output
    #[arg(long, env = "PDF_REFLOW_FONT")]
    font: Option<PathBuf>,

    /// Run the model on a CUDA device when available
    #[arg(long)]
    gpu: bool,

    /// Keep paragraphs that fail to translate instead of aborting
    #[arg(long)]
    keep_failed: bool,

    /// Disable caching of translated paragraphs, even when configured
    #[arg(long)]
    no_cache: bool,

    /// Print the supported target languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Clear the on-disk translation cache and exit
    #[arg(long)]
    clear_cache: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Command line flags override the config file
    if args.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }
    if let Some(dir) = &args.models_dir {
        config.engine.models_dir = Some(dir.clone());
    }
    if let Some(repo) = &args.tokenizer_repo {
        config.engine.tokenizer_repo = Some(repo.clone());
    }
    if let Some(font) = &args.font {
        config.render.font_path = Some(font.clone());
    }
    if args.gpu {
        config.engine.use_gpu = true;
    }
    if args.keep_failed {
        config.pipeline.on_unit_failure = FailurePolicy::Passthrough;
    }

    Ok(config)
}

// CLI output is intentional
#[allow(clippy::print_stdout)]
fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;

    if args.list_languages {
        for lang in &config.target_languages {
            println!("{}\t{}", lang, language_name(lang.as_str()));
        }
        return Ok(());
    }

    if args.clear_cache {
        let cleared = pdf_reflow_core::clear_translation_cache(&config.cache)
            .context("Failed to clear translation cache")?;
        println!("Cleared {cleared} cached translations");
        return Ok(());
    }

    let input = args.input.clone().context("No input file given")?;
    let target = Lang::new(&args.target).normalized();

    info!("Loading PDF: {}", input.display());
    let bytes = std::fs::read(&input)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;

    let translator = DocumentTranslator::new(&config).context("Failed to initialize translator")?;

    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} paragraphs ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    let result = translator
        .submit_with_progress(&bytes, &target, Some(&progress))
        .with_context(|| {
            format!(
                "Failed to translate {} into {}",
                input.display(),
                language_name(target.as_str())
            )
        })?;

    pb.finish_and_clear();

    for skipped in &result.report.skipped {
        println!(
            "Skipped line {} of paragraph {}: {}",
            skipped.line + 1,
            skipped.paragraph + 1,
            skipped.reason
        );
    }

    let output_path = args.output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        input.with_file_name(format!("{stem}-{target}.pdf"))
    });

    std::fs::write(&output_path, &result.pdf_bytes)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    println!(
        "Translated {} paragraphs into {} pages, saved to: {}",
        result.stats.translated,
        result.report.pages,
        output_path.display()
    );

    Ok(())
}
