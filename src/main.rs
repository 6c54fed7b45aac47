use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::info;
use serde_json::to_string_pretty;
use std::env;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use strum::IntoEnumIterator;

use syllabus_check::cli::Cli;
use syllabus_check::models::{
    ExtraData, FieldName, Header, OUTPUT_FORMAT_VERSION, Output, SystemEnvironment,
};
use syllabus_check::scanner::{ProcessResult, count, process};
use syllabus_check::utils::file::compile_exclude_patterns;
use syllabus_check::{EngineConfig, SyllabusEngine};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let multi_progress = init_logging()?;
    let start_time = Utc::now();

    let config = match &cli.calibration {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let fields: Vec<FieldName> = if cli.fields.is_empty() {
        FieldName::iter().collect()
    } else {
        cli.fields.clone()
    };
    let engine = SyllabusEngine::with_fields(&config, &fields)?;

    let exclude_patterns = compile_exclude_patterns(&cli.exclude);
    info!("Exclusion patterns: {:?}", cli.exclude);

    let (total_files, total_dirs, excluded_count) =
        count(&cli.dir_path, cli.max_depth, &exclude_patterns)
            .with_context(|| format!("failed to read {}", cli.dir_path))?;
    println!(
        "Found {} files in {} directories ({} items excluded)",
        total_files, total_dirs, excluded_count
    );

    let progress_bar = create_progress_bar(&multi_progress, total_files)?;
    let scan_result = process(
        &cli.dir_path,
        cli.max_depth,
        Arc::clone(&progress_bar),
        &exclude_patterns,
        &engine,
    )?;
    progress_bar.finish_with_message("Scan complete!");

    let end_time = Utc::now();
    let output = create_output(start_time, end_time, scan_result, total_dirs, &engine, &cli);
    write_output(&cli.output_file, &output)?;

    println!("JSON output written to {}", cli.output_file);
    Ok(())
}

/// Route log records through the progress bars so they do not tear them.
fn init_logging() -> Result<MultiProgress> {
    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .build();
    let level = logger.filter();
    let multi_progress = MultiProgress::new();
    LogWrapper::new(multi_progress.clone(), logger)
        .try_init()
        .context("failed to initialize logging")?;
    log::set_max_level(level);
    Ok(multi_progress)
}

fn create_progress_bar(multi_progress: &MultiProgress, total_files: usize) -> Result<Arc<ProgressBar>> {
    let progress_bar = multi_progress.add(ProgressBar::new(total_files as u64));
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents processed ({eta})")
            .context("failed to create progress bar style")?
            .progress_chars("#>-"),
    );
    Ok(Arc::new(progress_bar))
}

fn create_output(
    start_time: chrono::DateTime<Utc>,
    end_time: chrono::DateTime<Utc>,
    scan_result: ProcessResult,
    total_dirs: usize,
    engine: &SyllabusEngine,
    cli: &Cli,
) -> Output {
    let duration = (end_time - start_time).num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;

    let extra_data = ExtraData {
        documents_count: scan_result.documents.len(),
        directories_count: total_dirs,
        excluded_count: scan_result.excluded_count,
        fields: engine.fields().iter().map(ToString::to_string).collect(),
        calibration_file: cli
            .calibration
            .as_ref()
            .map(|path| path.display().to_string()),
        system_environment: SystemEnvironment {
            operating_system: sys_info::os_type().ok(),
            cpu_architecture: env::consts::ARCH.to_string(),
            platform: format!(
                "{}-{}-{}",
                sys_info::os_type().unwrap_or_else(|_| "unknown".to_string()),
                sys_info::os_release().unwrap_or_else(|_| "unknown".to_string()),
                env::consts::ARCH
            ),
            rust_version: rustc_version_runtime::version().to_string(),
        },
    };

    let errors: Vec<String> = scan_result
        .documents
        .iter()
        .flat_map(|document| {
            document
                .scan_errors
                .iter()
                .map(move |error| format!("{}: {}", document.path, error))
        })
        .collect();

    Output {
        headers: vec![Header {
            start_timestamp: start_time.to_rfc3339(),
            end_timestamp: end_time.to_rfc3339(),
            duration,
            extra_data,
            errors,
            output_format_version: OUTPUT_FORMAT_VERSION.to_string(),
        }],
        documents: scan_result.documents,
    }
}

fn write_output(output_file: &str, output: &Output) -> Result<()> {
    let json_output = to_string_pretty(output).context("failed to serialize output")?;
    let mut file =
        File::create(output_file).with_context(|| format!("failed to create {output_file}"))?;
    file.write_all(json_output.as_bytes())?;
    Ok(())
}
