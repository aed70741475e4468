use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use photoconv_rs::image_pipeline::{
    BatchConverter, BatchOptions, BatchStatus, BitDepth, CapabilityTable, ConflictPolicy, OutputFormat,
    PipelineConfig, StandardPipeline, is_supported_input,
};
use photoconv_rs::logger;

use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "photoconv")]
#[command(author, version, about = "Bit-depth aware photo converter", long_about = None)]
struct Cli {
    /// Input files or directories (directories are scanned non-recursively)
    #[arg(required_unless_present = "list_formats")]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, required_unless_present = "list_formats")]
    output: Option<PathBuf>,

    /// Output format (jpeg, png, webp, tiff, heic, heif, avif); keeps each
    /// source's own format when omitted
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Quality 1-100; 100 selects lossless where the format has it
    #[arg(short, long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Output bit depth (8, 10, 12 or 16); defaults to the source depth
    #[arg(short, long, value_parser = parse_depth)]
    depth: Option<BitDepth>,

    /// Overwrite existing output files instead of skipping them
    #[arg(long)]
    replace: bool,

    /// Convert files in parallel
    #[arg(long)]
    parallel: bool,

    /// Ignore the camera's as-shot white balance when developing RAW files
    #[arg(long)]
    no_camera_wb: bool,

    /// Print the output formats and the bit depths they accept, then exit
    #[arg(long)]
    list_formats: bool,
}

fn parse_depth(s: &str) -> Result<BitDepth, String> {
    let bits: u8 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    BitDepth::try_from(bits).map_err(|e| e.to_string())
}

fn list_formats() {
    let table = CapabilityTable::standard();
    for format in OutputFormat::ALL {
        let capability = table.get(format);
        let depths: Vec<String> = capability
            .depths
            .iter()
            .map(|d| d.bits().to_string())
            .collect();
        println!(
            "{:<5} depths: {:<12} extensions: {}",
            format.name(),
            depths.join(","),
            capability.extensions.join(",")
        );
    }
}

/// Expands directories into the supported files they contain.
fn collect_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("reading directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported_input(p))
                .collect();
            found.sort();
            if found.is_empty() {
                warn!("No supported files in {}", path.display());
            }
            inputs.extend(found);
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init();

    if cli.list_formats {
        list_formats();
        return Ok(());
    }

    let output_dir: &Path = cli
        .output
        .as_deref()
        .context("an output directory is required")?;
    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        bail!("no input files to convert");
    }

    let config = PipelineConfig::builder()
        .camera_white_balance(!cli.no_camera_wb)
        .build();
    let options = BatchOptions::builder()
        .format(cli.format.unwrap_or(OutputFormat::Jpeg))
        .keep_source_format(cli.format.is_none())
        .quality(cli.quality)
        .bit_depth(cli.depth)
        .conflict_policy(if cli.replace {
            ConflictPolicy::Replace
        } else {
            ConflictPolicy::Skip
        })
        .parallel(cli.parallel)
        .build();

    info!(
        "Converting {} file(s) into {} ({})",
        inputs.len(),
        output_dir.display(),
        cli.format.map_or("source format".to_string(), |f| f.to_string())
    );

    let converter = BatchConverter::new(StandardPipeline::new(config), options);
    let report = converter.run_with_progress(&inputs, output_dir, |done, total, path| {
        info!("[{}/{}] {}", done, total, path.display());
    })?;

    for entry in report.entries.iter().filter(|e| e.status == BatchStatus::Failed) {
        error!(
            "{}: {}",
            entry.input.display(),
            entry.result.error.as_deref().unwrap_or("unknown error")
        );
    }

    info!(
        "Done: {} converted, {} skipped, {} failed",
        report.succeeded, report.skipped, report.failed
    );

    if report.has_failures() {
        bail!("{} of {} file(s) failed", report.failed, report.total());
    }
    Ok(())
}
