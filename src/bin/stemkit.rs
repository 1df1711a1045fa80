use clap::{Parser, Subcommand};
use serde_json::json;
use std::{
    io::{self, Write},
    path::PathBuf,
    process,
};
use stemkit_core::{
    config::{DEFAULT_BITRATE, DEFAULT_MODEL, DEFAULT_SOLO_STEM},
    mix_files, split_file, Device, MixOptions, OutputFormat, PipelineResult, ProgressReporter,
    SeparationMode, SplitOptions, VolumeVector,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stemkit")]
#[command(about = "Mix audio stems together or separate a track into stems", long_about = None)]
#[command(version)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix input stems into one normalized track. Inputs must share one sample rate
    Mix {
        output_file: PathBuf,

        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Comma-separated gain per input, e.g. 0.5,1.0,0.8
        #[arg(long)]
        volumes: Option<String>,

        /// Inferred from the output extension when omitted
        #[arg(long)]
        format: Option<OutputFormat>,

        #[arg(long, default_value = DEFAULT_BITRATE)]
        bitrate: String,
    },

    /// Separate a track into stems, reporting progress as JSON lines. The input is
    /// resampled to the model's rate when needed
    Separate {
        input_file: PathBuf,

        output_dir: PathBuf,

        #[arg(long)]
        job_id: Option<String>,

        /// Registry model. `center` is built in; the htdemucs models, including
        /// the default, need an external runner script (STEMKIT_RUNNER_SCRIPT)
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,

        /// `stems` writes every model stem, `karaoke` writes solo + accompaniment
        #[arg(long, default_value = "stems")]
        mode: SeparationMode,

        #[arg(long, default_value = DEFAULT_SOLO_STEM)]
        solo: String,

        #[arg(long, default_value = "wav")]
        format: OutputFormat,

        #[arg(long, default_value = DEFAULT_BITRATE)]
        bitrate: String,

        /// Preferred device (cuda, mps, cpu); falls back when unavailable
        #[arg(long, env = "STEMKIT_DEVICE")]
        device: Option<Device>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            let message = e.to_string();
            let first = message.lines().next().unwrap_or("invalid arguments");
            emit(
                &json!({
                    "status": "error",
                    "error": first.trim_start_matches("error: "),
                    "code": "INVALID_ARGUMENTS",
                    "job_id": null,
                })
                .to_string(),
            );
            process::exit(1);
        }
    };
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Mix {
            output_file,
            input_files,
            volumes,
            format,
            bitrate,
        } => handle_mix(output_file, input_files, volumes, format, bitrate),
        Commands::Separate {
            input_file,
            output_dir,
            job_id,
            model,
            mode,
            solo,
            format,
            bitrate,
            device,
        } => {
            let opts = SplitOptions {
                output_dir,
                model_name: model,
                mode,
                solo_stem: solo,
                format,
                bitrate,
                device,
                ..Default::default()
            };
            handle_separate(input_file, opts, job_id)
        }
    };

    emit(&json_line(&result));
    process::exit(if result.is_success() { 0 } else { 1 });
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn handle_mix(
    output: PathBuf,
    inputs: Vec<PathBuf>,
    volumes: Option<String>,
    format: Option<OutputFormat>,
    bitrate: String,
) -> PipelineResult {
    // Volumes are validated before any file is touched.
    let volumes = match volumes.as_deref().map(VolumeVector::parse).transpose() {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return PipelineResult::error(&e, None),
    };

    let opts = MixOptions {
        volumes,
        format,
        bitrate,
        ..Default::default()
    };
    PipelineResult::from_mix(mix_files(&inputs, &output, &opts))
}

fn handle_separate(input: PathBuf, opts: SplitOptions, job_id: Option<String>) -> PipelineResult {
    let mut progress = ProgressReporter::new(|event| {
        emit(
            &json!({
                "status": "progress",
                "progress": event.phase,
                "message": event.message,
            })
            .to_string(),
        );
    });
    let res = split_file(&input, &opts, &mut progress);
    PipelineResult::from_split(res, job_id)
}

fn json_line(result: &PipelineResult) -> String {
    result.to_json_line().unwrap_or_else(|e| {
        json!({ "status": "error", "error": format!("Failed to serialize result: {e}") })
            .to_string()
    })
}

/// One JSON object per line on stdout, flushed so a parent process sees it
/// immediately.
fn emit(line: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}
