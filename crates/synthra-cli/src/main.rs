// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `synthra`: synthetic dataset generation from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use synthra_agents::StopReason;
use synthra_cli::logging::LogTee;
use synthra_cli::pipeline::{self, Overrides, RunMode, RunOptions};
use synthra_data::allocators::TrackingAllocator;
use synthra_io::{check_dataset, visualize_dataset};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new(std::alloc::System);

#[derive(Parser, Debug)]
#[command(name = "synthra", version, about = "Synthetic object detection dataset generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a full dataset.
    Generate {
        #[command(flatten)]
        run: RunArgs,
        /// Number of frames to generate.
        #[arg(short = 'n', long)]
        num_images: Option<usize>,
    },
    /// Generate a few frames into <output>/preview.
    Preview {
        #[command(flatten)]
        run: RunArgs,
        /// Number of preview frames.
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// Check a dataset directory for missing, orphan or malformed labels.
    Check {
        /// Dataset root.
        dir: PathBuf,
    },
    /// Draw label boxes onto copies of the images under <dir>/visualizations.
    Visualize {
        /// Dataset root.
        dir: PathBuf,
        /// Annotate at most this many images.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output directory, overrides `output_dir`.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Scene seed, overrides `random_seed`.
    #[arg(long)]
    seed: Option<u64>,
    /// Hide the progress bar.
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let log_tee = LogTee::new();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_tee.clone())))
        .init();

    let cli = Cli::parse();
    match execute(cli.command, &log_tee) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:?}");
            ExitCode::from(1)
        }
    }
}

fn execute(command: Command, log_tee: &LogTee) -> Result<ExitCode> {
    match command {
        Command::Generate { run, num_images } => {
            generate(run, num_images, RunMode::Generate, log_tee)
        }
        Command::Preview { run, count } => {
            generate(run, None, RunMode::Preview { count }, log_tee)
        }
        Command::Check { dir } => check(dir),
        Command::Visualize { dir, limit } => visualize(dir, limit),
    }
}

fn generate(
    args: RunArgs,
    num_images: Option<usize>,
    mode: RunMode,
    log_tee: &LogTee,
) -> Result<ExitCode> {
    let mut config = pipeline::load_config(args.config.as_deref())?;
    let overrides = Overrides {
        output_dir: args.output,
        num_images,
        random_seed: args.seed,
    }
    .apply(&mut config);

    let options = RunOptions {
        show_progress: !args.quiet,
        log_tee: Some(log_tee.clone()),
    };
    let outcome = pipeline::run(config, mode, overrides, &options)?;
    let summary = &outcome.report.summary;

    println!(
        "{} frames written to {} ({} skipped slots, peak memory {:.1} MB, {:.1}s)",
        summary.accepted_frames,
        outcome.dataset_root.display(),
        summary.skipped_slots,
        summary.peak_memory_mb(),
        summary.elapsed_secs
    );
    println!("Run log: {}", outcome.log_dir.display());
    if let Some(visualizations) = &outcome.visualizations {
        println!(
            "{} annotated images in {}",
            visualizations.written,
            visualizations.output_dir.display()
        );
    }
    if let Some(StopReason::MemoryCeiling { .. }) = summary.stop_reason {
        println!("Stopped early: memory ceiling reached after aggressive cleanup");
    }
    Ok(ExitCode::SUCCESS)
}

fn check(dir: PathBuf) -> Result<ExitCode> {
    let report = check_dataset(&dir)
        .with_context(|| format!("failed to check dataset at '{}'", dir.display()))?;

    for issue in &report.issues {
        println!("{issue}");
    }
    println!(
        "{} images, {} label files, {} annotations, {} issues",
        report.images,
        report.labels,
        report.annotations,
        report.issues.len()
    );

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn visualize(dir: PathBuf, limit: Option<usize>) -> Result<ExitCode> {
    let report = visualize_dataset(&dir, limit)
        .with_context(|| format!("failed to visualize dataset at '{}'", dir.display()))?;

    for path in &report.skipped {
        println!("could not decode {}", path.display());
    }
    println!(
        "{} annotated images ({} boxes, {} without labels) in {}",
        report.written,
        report.boxes,
        report.unlabeled,
        report.output_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}
