//! slide-spacing - inspect whole-slide images from the command line.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slide_spacing::{
    config::{Cli, Command, InspectConfig, OutputFormat, ThumbnailConfig},
    format::jpeg::encode_jpeg,
    open_slide, SlideSummary,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Inspect(config) => run_inspect(config),
        Command::Thumbnail(config) => run_thumbnail(config),
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

fn run_inspect(config: InspectConfig) -> ExitCode {
    init_logging(config.verbose);

    let backend = match open_slide(&config.path) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to open {}: {}", config.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let summary = backend.summary(config.properties);
    match config.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize summary: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn print_summary(summary: &SlideSummary) {
    println!("Slide:         {}", summary.identifier);
    println!(
        "Vendor:        {}",
        summary.vendor.as_deref().unwrap_or("unknown")
    );
    match summary.magnification {
        Some(mag) => println!("Magnification: {}x", mag),
        None => println!("Magnification: unknown"),
    }
    if let Some((width, height)) = summary.dimensions {
        println!("Dimensions:    {} x {}", width, height);
    }
    println!("Levels:        {}", summary.levels.len());
    println!();
    println!(
        "{:>5}  {:>12}  {:>10}  {:>12}  {:>12}",
        "level", "size", "downsample", "mpp-y", "mpp-x"
    );
    for level in &summary.levels {
        println!(
            "{:>5}  {:>12}  {:>10.3}  {:>12.6}  {:>12.6}",
            level.level,
            format!("{}x{}", level.width, level.height),
            level.downsample,
            level.spacing.mpp_y,
            level.spacing.mpp_x
        );
    }

    if let Some(ref properties) = summary.properties {
        println!();
        for (key, value) in properties.iter() {
            println!("{} = {}", key, value);
        }
    }
}

// =============================================================================
// Thumbnail Command
// =============================================================================

fn run_thumbnail(config: ThumbnailConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let backend = match open_slide(&config.path) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Failed to open {}: {}", config.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let thumbnail = match backend.thumbnail(config.thumbnail_size()) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to render thumbnail: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let jpeg = match encode_jpeg(&thumbnail, config.quality) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to encode thumbnail: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fs::write(&config.output, &jpeg) {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    info!(
        "Wrote {}x{} thumbnail to {}",
        thumbnail.width(),
        thumbnail.height(),
        config.output.display()
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Helper Functions
// =============================================================================

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "slide_spacing=debug"
    } else {
        "slide_spacing=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
