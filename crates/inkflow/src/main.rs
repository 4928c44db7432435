//! inkflow: turn a photograph into a printable line-art stencil.
//!
//! Runs grayscale -> Gaussian blur -> Canny -> inversion on one image
//! and writes the result as an 8-bit grayscale PNG. Optionally dumps
//! every intermediate stage and per-stage diagnostics for threshold
//! tuning.
//!
//! # Usage
//!
//! ```text
//! inkflow [OPTIONS] <INPUT>
//! inkflow photo.jpg --high-threshold 140 --blur-radius 5 -o out.png
//! inkflow photo.jpg --data-uri > preview.txt
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use inkflow_pipeline::diagnostics::{Clock, StencilDiagnostics};
use inkflow_pipeline::{StageId, StagedStencil, StencilImage, StencilSettings};
use tracing_subscriber::EnvFilter;

/// Turn a photo into a printable line-art stencil.
///
/// Edges found by Canny edge detection are drawn black on white (or
/// white on black with `--no-invert`).
#[derive(Parser)]
#[command(name = "inkflow", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output PNG path. Defaults to `<input-stem>-stencil.png` next to
    /// the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Canny lower hysteresis threshold (0-255).
    #[arg(long, default_value_t = StencilSettings::DEFAULT_LOW_THRESHOLD)]
    low_threshold: u8,

    /// Canny upper hysteresis threshold (0-255).
    #[arg(long, default_value_t = StencilSettings::DEFAULT_HIGH_THRESHOLD)]
    high_threshold: u8,

    /// Gaussian kernel size in pixels. Even values round up to odd; 1
    /// disables blurring.
    #[arg(long, default_value_t = StencilSettings::DEFAULT_BLUR_RADIUS, allow_negative_numbers = true)]
    blur_radius: i32,

    /// Draw edges white on black instead of black on white.
    #[arg(long)]
    no_invert: bool,

    /// Full stencil settings as a JSON string.
    ///
    /// When provided, the individual settings flags are ignored. Missing
    /// keys take their defaults; `camelCase` keys are accepted.
    #[arg(long)]
    settings_json: Option<String>,

    /// Print the stencil as a `data:image/png;base64,...` URI on stdout
    /// instead of writing a file.
    #[arg(long, conflicts_with = "output")]
    data_uri: bool,

    /// Also write every intermediate stage as a PNG into this directory.
    #[arg(long)]
    stages_dir: Option<PathBuf>,

    /// Print per-stage timing and metrics to stderr.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON on stdout instead of a report on stderr.
    #[arg(long, requires = "diagnostics", conflicts_with = "data_uri")]
    json: bool,

    /// Log pipeline progress (same as `RUST_LOG=debug`).
    #[arg(short, long)]
    verbose: bool,
}

/// Build [`StencilSettings`] from CLI arguments.
///
/// If `--settings-json` is provided, the JSON is parsed directly and all
/// individual settings flags are ignored.
fn settings_from_cli(cli: &Cli) -> Result<StencilSettings, String> {
    if let Some(ref json) = cli.settings_json {
        return serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --settings-json: {e}"));
    }

    Ok(StencilSettings {
        low_threshold: cli.low_threshold,
        high_threshold: cli.high_threshold,
        blur_radius: cli.blur_radius,
        inverted: !cli.no_invert,
    })
}

/// `photo.jpg` -> `photo-stencil.png` in the same directory.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}-stencil.png"))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match settings_from_cli(&cli).and_then(|s| {
        s.validate()
            .map(|()| s)
            .map_err(|e| format!("Error: {e}"))
    }) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?settings, "settings");

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let stencil = if cli.diagnostics || cli.stages_dir.is_some() {
        match inkflow_pipeline::diagnostics::process_staged_with_diagnostics(
            &image_bytes,
            &settings,
            &StdClock,
        ) {
            Ok((staged, diagnostics)) => {
                if cli.diagnostics && !print_diagnostics(&diagnostics, cli.json) {
                    return ExitCode::FAILURE;
                }
                if let Some(ref dir) = cli.stages_dir
                    && let Err(msg) = write_stages(&staged, dir)
                {
                    eprintln!("{msg}");
                    return ExitCode::FAILURE;
                }
                staged.stencil
            }
            Err(e) => {
                eprintln!("Error processing {}: {e}", cli.input.display());
                return ExitCode::FAILURE;
            }
        }
    } else {
        match inkflow_pipeline::generate_stencil_from_bytes(&image_bytes, &settings) {
            Ok(stencil) => stencil,
            Err(e) => {
                eprintln!("Error processing {}: {e}", cli.input.display());
                return ExitCode::FAILURE;
            }
        }
    };

    let written = if cli.data_uri {
        print_data_uri(&stencil)
    } else {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&cli.input));
        write_stencil(&stencil, &path)
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

/// Print diagnostics as a report on stderr or JSON on stdout.
///
/// Returns `false` if serialization failed.
fn print_diagnostics(diagnostics: &StencilDiagnostics, json: bool) -> bool {
    if !json {
        eprintln!("{}", diagnostics.report());
        return true;
    }
    match serde_json::to_string_pretty(diagnostics) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            eprintln!("Error serializing diagnostics: {e}");
            false
        }
    }
}

fn print_data_uri(stencil: &StencilImage) -> Result<(), String> {
    let uri = stencil.to_data_uri().map_err(|e| format!("Error: {e}"))?;
    println!("{uri}");
    Ok(())
}

fn write_stencil(stencil: &StencilImage, path: &Path) -> Result<(), String> {
    let png = stencil.to_png().map_err(|e| format!("Error: {e}"))?;
    std::fs::write(path, png).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

/// Write each stage as `NN-<slug>.png` into `dir`, creating it if needed.
fn write_stages(staged: &StagedStencil, dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;
    for stage in StageId::ALL {
        let path = dir.join(stage.file_name());
        let png = inkflow_pipeline::encode::encode_png(staged.image(stage))
            .map_err(|e| format!("Error encoding {stage} stage: {e}"))?;
        std::fs::write(&path, png)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::debug!(stage = stage.slug(), path = %path.display(), "wrote stage");
    }
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
