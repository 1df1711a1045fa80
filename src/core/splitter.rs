use crate::{
    config::ACCOMPANIMENT_STEM,
    core::{
        audio::{ensure_exists, read_audio_raw, validate_bitrate, write_audio},
        device::{select_device, DeviceProbe, SystemProbe},
        dsp::{match_channels, normalize, pad_to, recombine_without, resample},
    },
    error::{Result, StemError},
    io::progress::{Milestone, ProgressReporter},
    model::{model_manager::load_model, StemModel},
    types::{
        AudioBuffer, EncodeOptions, OutputFormat, SeparationMode, SplitOptions, SplitReport,
        StemSet,
    },
};

use anyhow::anyhow;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Separates `input_path` with the model named in `opts` on the best
/// available device.
pub fn split_file(
    input_path: &Path,
    opts: &SplitOptions,
    progress: &mut ProgressReporter<'_>,
) -> Result<SplitReport> {
    split_file_with(input_path, opts, load_model, &SystemProbe, progress)
}

/// Same as [`split_file`] with the model loader and device probe supplied
/// by the caller.
#[instrument(skip_all, fields(input = %input_path.display(), model = %opts.model_name))]
pub fn split_file_with<L>(
    input_path: &Path,
    opts: &SplitOptions,
    loader: L,
    probe: &dyn DeviceProbe,
    progress: &mut ProgressReporter<'_>,
) -> Result<SplitReport>
where
    L: FnOnce(&str) -> Result<Box<dyn StemModel>>,
{
    ensure_exists(input_path)?;

    let encode = EncodeOptions {
        format: opts.format,
        bitrate: opts.bitrate.clone(),
    };
    if encode.format == OutputFormat::Mp3 && !validate_bitrate(&encode.bitrate) {
        return Err(StemError::encode(
            opts.output_dir.display(),
            format!("invalid bitrate `{}` (expected e.g. 192k)", encode.bitrate),
        ));
    }

    progress.milestone(Milestone::Init, "Initializing audio separation...");
    fs::create_dir_all(&opts.output_dir)?;

    progress.milestone(
        Milestone::ModelLoad,
        format!("Loading {} model...", opts.model_name),
    );
    let model = loader(&opts.model_name)?;

    let device = select_device(opts.device, probe);
    progress.milestone(Milestone::DeviceSelect, device.describe());

    progress.milestone(Milestone::LoadAudio, "Loading audio file...");
    let audio = reconcile_for_model(read_audio_raw(input_path)?, model.as_ref())?;
    let duration_secs = audio.duration_secs();

    progress.milestone(Milestone::Inference, "Running ML-based audio separation...");
    let stems = model.apply(&audio, device)?;

    progress.milestone(Milestone::ProcessStems, "Processing separated stems...");
    let stems = conform_stems(stems, &audio, model.channels())?;
    let outputs = select_outputs(stems, opts)?;

    progress.milestone(Milestone::SaveStems, "Saving separated audio files...");
    let output_paths = save_stems(outputs, opts, &encode)?;

    progress.milestone(Milestone::Done, "Audio separation completed successfully!");
    info!(stems = output_paths.len(), %device, "separation finished");

    Ok(SplitReport {
        stem_count: output_paths.len(),
        output_paths,
        model: model.name().to_string(),
        device,
        sample_rate: audio.sample_rate,
        duration_secs,
    })
}

/// Brings the decoded input to the model's rate and channel count.
///
/// Unlike mixing, a rate mismatch here is resolved by resampling.
pub fn reconcile_for_model(audio: AudioBuffer, model: &dyn StemModel) -> Result<AudioBuffer> {
    let audio = match model.sample_rate() {
        Some(rate) if rate != audio.sample_rate => {
            debug!(from = audio.sample_rate, to = rate, "resampling input for model");
            resample(audio, rate)?
        }
        _ => audio,
    };
    Ok(match_channels(audio, model.channels()))
}

/// Checks the model output and gives every stem the input's layout.
fn conform_stems(stems: StemSet, input: &AudioBuffer, channels: usize) -> Result<StemSet> {
    if stems.is_empty() {
        return Err(anyhow!("Model returned no stems").into());
    }
    if stems.sample_rate() != input.sample_rate {
        return Err(StemError::SampleRateMismatch {
            expected: input.sample_rate,
            actual: stems.sample_rate(),
            path: "model output".into(),
        });
    }

    let longest = stems
        .iter()
        .map(|(_, b)| b.frames())
        .max()
        .unwrap_or(0)
        .max(input.frames());

    let mut conformed = StemSet::new(stems.sample_rate());
    for (name, buffer) in stems {
        conformed.insert(name, pad_to(match_channels(buffer, channels), longest))?;
    }
    Ok(conformed)
}

fn select_outputs(stems: StemSet, opts: &SplitOptions) -> Result<Vec<(String, AudioBuffer)>> {
    match opts.mode {
        SeparationMode::Stems => Ok(stems.into_iter().collect()),
        SeparationMode::Karaoke => {
            let recombined = recombine_without(&stems, &opts.solo_stem)?;
            let solo = stems
                .get(&recombined.solo)
                .cloned()
                .ok_or_else(|| anyhow!("Solo stem `{}` missing", recombined.solo))?;
            let rest_name = if recombined.solo == ACCOMPANIMENT_STEM {
                "remainder"
            } else {
                ACCOMPANIMENT_STEM
            };
            Ok(vec![
                (recombined.solo, solo),
                (rest_name.to_string(), recombined.accompaniment),
            ])
        }
    }
}

/// Normalizes and writes each stem to `<output_dir>/<stem>.<ext>`.
///
/// Each file is normalized on its own. If any write fails, files already
/// written by this call are removed.
fn save_stems(
    outputs: Vec<(String, AudioBuffer)>,
    opts: &SplitOptions,
    encode: &EncodeOptions,
) -> Result<BTreeMap<String, PathBuf>> {
    let mut written: BTreeMap<String, PathBuf> = BTreeMap::new();

    for (name, buffer) in outputs {
        let path = opts
            .output_dir
            .join(format!("{name}.{}", encode.format.extension()));
        let normalized = normalize(buffer, opts.peak_target);

        if let Err(e) = write_audio(&path, &normalized, encode) {
            for stale in written.values().chain(std::iter::once(&path)) {
                if stale.is_file() {
                    if let Err(rm) = fs::remove_file(stale) {
                        warn!(path = %stale.display(), "could not remove partial output: {rm}");
                    }
                }
            }
            return Err(e);
        }
        debug!(stem = %name, path = %path.display(), "stem written");
        written.insert(name, path);
    }
    Ok(written)
}
