//! Command handlers; each returns the process exit code

use super::commands::{ConfigArgs, OrganizeArgs, SubjectsArgs};
use super::output::OutputFormatter;
use crate::classify::{ConfidenceClassifier, KeywordModel, LlmModel, SubjectModel};
use crate::config::{ClassifierKind, NotefilerConfig, StoreKind};
use crate::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::{PipelineConfig, PipelineOrchestrator, RunReport};
use crate::progress::LoggingHandler;
use crate::store::{DriveStore, LocalStore, RemoteStore};
use anyhow::{Context, Result};
use genai::adapter::AdapterKind;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Every note was uploaded or skipped
pub const EXIT_OK: i32 = 0;
/// At least one note failed
pub const EXIT_NOTE_FAILURES: i32 = 1;
/// Misconfiguration or an unreachable store stopped the run, or it was cancelled
pub const EXIT_ABORTED: i32 = 2;

pub async fn handle_organize(args: &OrganizeArgs, quiet: bool) -> i32 {
    let config = apply_organize_overrides(NotefilerConfig::default(), args);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return EXIT_ABORTED;
    }
    debug!("Effective configuration:\n{}", config);

    let orchestrator = match build_orchestrator(&config, args.recursive).await {
        Ok(o) => o,
        Err(e) => {
            error!("Failed to initialize: {:#}", e);
            print_setup_hints(&config);
            return EXIT_ABORTED;
        }
    };

    let cancel = orchestrator.cancellation_token();
    let signal_task = tokio::spawn(cancel_on_ctrl_c(cancel));

    let result = orchestrator
        .run(&args.inputs, config.threshold, config.root_id.as_deref())
        .await;
    signal_task.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Run aborted: {}", e);
            return EXIT_ABORTED;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    let output = match formatter.format_report(&report) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return EXIT_ABORTED;
        }
    };

    if let Err(e) = emit(&output, args.output.as_deref(), quiet) {
        error!("{:#}", e);
        return EXIT_ABORTED;
    }

    exit_code_for(&report)
}

pub async fn handle_subjects(args: &SubjectsArgs) -> i32 {
    let mut config = NotefilerConfig::default();
    if let Some(path) = &args.subjects {
        config.subjects_file = Some(path.clone());
    }
    let vocabulary = match config.vocabulary() {
        Ok(vocabulary) => vocabulary,
        Err(e) => {
            error!("Configuration error: {}", e);
            return EXIT_ABORTED;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_subjects(&vocabulary) {
        Ok(output) => {
            println!("{}", output);
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            EXIT_ABORTED
        }
    }
}

pub async fn handle_config(args: &ConfigArgs) -> i32 {
    let config = NotefilerConfig::default();
    let formatter = OutputFormatter::new(args.format.into());

    match formatter.format_config(&config) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return EXIT_ABORTED;
        }
    }

    if let Err(e) = config.validate() {
        if args.format == super::commands::OutputFormatArg::Human {
            eprintln!("\u{2717} {}", e);
        }
        error!("Configuration error: {}", e);
        return EXIT_ABORTED;
    }
    EXIT_OK
}

/// Layers command-line flags over environment configuration
pub fn apply_organize_overrides(config: NotefilerConfig, args: &OrganizeArgs) -> NotefilerConfig {
    NotefilerConfig {
        threshold: args.threshold.unwrap_or(config.threshold),
        workers: args.workers.unwrap_or(config.workers),
        store: args.store.map(StoreKind::from).unwrap_or(config.store),
        store_dir: args.store_dir.clone().unwrap_or(config.store_dir),
        root_id: args.root.clone().or(config.root_id),
        classifier: args
            .classifier
            .map(ClassifierKind::from)
            .unwrap_or(config.classifier),
        subjects_file: args.subjects.clone().or(config.subjects_file),
        provider: args.backend.unwrap_or(config.provider),
        model: args.model.clone().unwrap_or(config.model),
        tesseract: args.tesseract.clone().unwrap_or(config.tesseract),
        ..config
    }
}

pub fn exit_code_for(report: &RunReport) -> i32 {
    if report.cancelled {
        EXIT_ABORTED
    } else if report.has_failures() {
        EXIT_NOTE_FAILURES
    } else {
        EXIT_OK
    }
}

async fn build_orchestrator(
    config: &NotefilerConfig,
    recursive: bool,
) -> Result<PipelineOrchestrator> {
    let ocr = build_ocr(config).await?;
    let store = build_store(config).await?;
    let model = build_model(config);

    info!(
        "Using classifier: {} ({})",
        model.name(),
        model.model_info().unwrap_or_else(|| "built-in".to_string())
    );

    let vocabulary = config.vocabulary()?;
    info!("Classifying into {} subjects", vocabulary.len());

    let classifier = ConfidenceClassifier::new(model, Arc::new(vocabulary))
        .with_timeout(config.classify_timeout());

    let pipeline_config = PipelineConfig::new()
        .with_workers(config.workers)
        .with_ocr_timeout(config.ocr_timeout())
        .with_retry(config.retry_policy())
        .with_recursive(recursive);

    Ok(
        PipelineOrchestrator::new(ocr, Arc::new(classifier), store, pipeline_config)
            .with_progress(Arc::new(LoggingHandler)),
    )
}

async fn build_ocr(config: &NotefilerConfig) -> Result<Arc<dyn OcrEngine>> {
    let engine = TesseractOcr::new()
        .with_binary(&config.tesseract)
        .with_language(&config.ocr_language);

    let version = engine
        .version()
        .await
        .with_context(|| format!("OCR engine {} is not usable", config.tesseract.display()))?;
    info!("Using OCR engine: {}", version);

    Ok(Arc::new(engine))
}

async fn build_store(config: &NotefilerConfig) -> Result<Arc<dyn RemoteStore>> {
    match config.store {
        StoreKind::Local => {
            let store = LocalStore::open(&config.store_dir).await.with_context(|| {
                format!("Failed to open local store at {}", config.store_dir.display())
            })?;
            info!("Using local store: {}", store.root().display());
            Ok(Arc::new(store))
        }
        StoreKind::Drive => {
            let token = match (&config.drive_token, &config.drive_token_file) {
                (Some(token), _) => token.clone(),
                (None, Some(path)) => DriveStore::read_token_file(path)?,
                (None, None) => anyhow::bail!("Drive access token is not configured"),
            };
            let store = DriveStore::new(token, config.request_timeout())
                .context("Failed to create Google Drive client")?;
            info!("Using Google Drive store");
            Ok(Arc::new(store))
        }
    }
}

fn build_model(config: &NotefilerConfig) -> Arc<dyn SubjectModel> {
    match config.classifier {
        ClassifierKind::Keyword => Arc::new(KeywordModel::new()),
        ClassifierKind::Llm => Arc::new(LlmModel::new(config.provider, config.model.clone())),
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, finishing notes in flight");
        token.cancel();
    }
}

fn emit(output: &str, path: Option<&Path>, quiet: bool) -> Result<()> {
    match path {
        Some(output_file) => {
            std::fs::write(output_file, output).with_context(|| {
                format!("Failed to write output to {}", output_file.display())
            })?;
            info!("Output written to: {}", output_file.display());
            if !quiet {
                println!("Output written to: {}", output_file.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn print_setup_hints(config: &NotefilerConfig) {
    eprintln!("\nPossible solutions:");
    eprintln!(
        "  - Install tesseract or point --tesseract / NOTEFILER_TESSERACT at it (current: {})",
        config.tesseract.display()
    );
    match config.store {
        StoreKind::Local => {
            eprintln!("  - Check that --store-dir / NOTEFILER_STORE_DIR is writable");
        }
        StoreKind::Drive => {
            eprintln!("  - Refresh the access token in NOTEFILER_DRIVE_TOKEN or NOTEFILER_DRIVE_TOKEN_FILE");
        }
    }
    if config.classifier == ClassifierKind::Llm {
        match config.provider {
            AdapterKind::Ollama => {
                eprintln!("  - Ensure Ollama is running: ollama serve");
            }
            _ => {
                if let Some(var) = config.provider.default_key_env_name() {
                    eprintln!("  - Set {} environment variable", var);
                }
            }
        }
    }
}
