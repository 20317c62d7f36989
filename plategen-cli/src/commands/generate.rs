//! Generate command - run one pyramid job with a live progress bar.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use plategen::pipeline::{JobHandle, JobOutput, JobRequest, PyramidPipeline};
use plategen::progress::{JobState, ProgressSnapshot};

use super::common::{format_size, parse_bounds, EncodingArg, ProjectionArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Bar resolution: one step per tenth of a percent.
const BAR_STEPS: u64 = 1000;

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub source: PathBuf,
    pub bounds: Vec<f64>,
    pub projection: ProjectionArg,
    pub source_projection: Option<ProjectionArg>,
    pub output: PathBuf,
    pub name: Option<String>,
    pub threads: Option<usize>,
    pub encoding: Option<EncodingArg>,
    pub thumbnail_edge: Option<u32>,
    pub json: bool,
}

/// Run the generate command.
pub fn run(args: GenerateArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_options(debug, !args.json)?;
    runner.log_startup("generate");

    let bounds = parse_bounds(&args.bounds)?;

    // CLI takes precedence, then config
    let mut config = runner.config().pipeline_config();
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(encoding) = args.encoding {
        config = config.with_encoding(encoding.into());
    }
    if let Some(edge) = args.thumbnail_edge {
        if edge == 0 {
            return Err(CliError::InvalidArgument(
                "--thumbnail-edge must be at least 1".to_string(),
            ));
        }
        config = config.with_thumbnail_max_edge(edge);
    }
    let poll_interval = config.poll_interval();

    let mut request = JobRequest::new(
        &args.source,
        bounds,
        args.projection.into(),
        &args.output,
    );
    if let Some(source_projection) = args.source_projection {
        request = request.with_source_projection(source_projection.into());
    }
    if let Some(name) = args.name {
        request = request.with_base_name(name);
    }

    if !args.json {
        println!("Plategen v{}", plategen::VERSION);
        println!("================");
        println!();
        println!("Source:     {}", args.source.display());
        println!("Bounds:     {}", bounds);
        println!("Projection: {}", request.projection());
        println!("Encoding:   {}", config.encoding());
        println!("Workers:    {}", config.worker_threads());
        println!();
    }

    let pipeline = Arc::new(PyramidPipeline::new(config)?);
    let handle = pipeline.start(request)?;
    info!(job = %handle.id(), "Job submitted");

    let job_id = handle.id();
    let pipeline_clone = Arc::clone(&pipeline);
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, cancelling...");
        pipeline_clone.cancel(job_id);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let result = if args.json {
        follow_json(handle, poll_interval)
    } else {
        follow_bar(handle, poll_interval)
    };

    match result {
        Ok(output) if args.json => {
            let line = serde_json::to_string(&output)
                .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
            println!("{}", line);
            Ok(())
        }
        Ok(output) => {
            print_summary(&output);
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Generate command failed");
            Err(e.into())
        }
    }
}

/// Drive an indicatif bar from progress snapshots until the job ends.
fn follow_bar(
    handle: JobHandle,
    poll_interval: std::time::Duration,
) -> plategen::PyramidResult<JobOutput> {
    let bar = ProgressBar::new(BAR_STEPS);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut progress = handle.subscribe();
    loop {
        if let Some(snapshot) = progress.poll() {
            bar.set_position(bar_position(&snapshot));
            bar.set_message(describe(&snapshot));
        }
        if handle.is_finished() {
            break;
        }
        thread::sleep(poll_interval);
    }

    let last = progress.latest();
    bar.set_position(bar_position(&last));
    match last.state {
        JobState::Completed => bar.finish_with_message(describe(&last)),
        _ => bar.abandon_with_message(describe(&last)),
    }

    handle.wait()
}

/// Print every progress snapshot as one JSON line until the job ends.
fn follow_json(
    handle: JobHandle,
    poll_interval: std::time::Duration,
) -> plategen::PyramidResult<JobOutput> {
    let mut progress = handle.subscribe();
    let print = |snapshot: &ProgressSnapshot| {
        if let Ok(line) = serde_json::to_string(snapshot) {
            println!("{}", line);
        }
    };

    loop {
        if let Some(snapshot) = progress.poll() {
            print(&snapshot);
        }
        if handle.is_finished() {
            break;
        }
        thread::sleep(poll_interval);
    }
    if let Some(snapshot) = progress.poll() {
        print(&snapshot);
    }

    handle.wait()
}

fn bar_position(snapshot: &ProgressSnapshot) -> u64 {
    ((snapshot.overall_percent / 100.0) * BAR_STEPS as f64).round() as u64
}

/// One-line status for the progress bar message.
fn describe(snapshot: &ProgressSnapshot) -> String {
    let mut message = format!("{:5.1}% {}", snapshot.overall_percent, snapshot.state);
    if snapshot.tiles_total > 0 {
        message.push_str(&format!(
            " | tiles {}/{}",
            snapshot.tiles_completed, snapshot.tiles_total
        ));
    }
    if let Some(eta) = snapshot.estimated_seconds_remaining {
        message.push_str(&format!(" | ETA {}", format_eta(eta)));
    }
    message
}

fn format_eta(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    match total {
        0..=59 => format!("{}s", total),
        60..=3599 => format!("{}m{:02}s", total / 60, total % 60),
        _ => format!("{}h{:02}m", total / 3600, (total % 3600) / 60),
    }
}

fn print_summary(output: &JobOutput) {
    println!();
    println!("Output: {}", output.output_dir.display());
    println!("Levels: 0-{}", output.max_level);
    for plate in &output.plates {
        println!(
            "  {:<18} {:>8} tiles  {:>10}",
            plate.file_name,
            plate.tile_count,
            format_size(plate.size_bytes)
        );
    }
    println!("Thumbnail:  {}", output.thumbnail.display());
    println!("Descriptor: {}", output.descriptor.display());
}
