use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::{
    core::{
        audio::{ensure_exists, read_audio, validate_bitrate, write_audio},
        dsp::{apply_volumes, ensure_sample_rates, normalize, pad_to_longest, sum_buffers},
    },
    error::{Result, StemError},
    types::{AudioBuffer, EncodeOptions, MixOptions, MixReport, OutputFormat},
};

/// Mixes `inputs` into one track at `output`.
///
/// Stages: load (mono upmixed to stereo) → sample-rate check → pad to the
/// longest input → per-input volume → sum → normalize the full mix → encode.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
pub fn mix_files<P: AsRef<Path>>(
    inputs: &[P],
    output: &Path,
    opts: &MixOptions,
) -> Result<MixReport> {
    if inputs.is_empty() {
        return Err(StemError::NoInputsProvided);
    }

    let encode = EncodeOptions {
        format: opts.format.unwrap_or_else(|| OutputFormat::from_path(output)),
        bitrate: opts.bitrate.clone(),
    };
    if encode.format == OutputFormat::Mp3 && !validate_bitrate(&encode.bitrate) {
        return Err(StemError::encode(
            output.display(),
            format!("invalid bitrate `{}` (expected e.g. 192k)", encode.bitrate),
        ));
    }

    for path in inputs {
        ensure_exists(path.as_ref())?;
    }

    let loaded = inputs
        .iter()
        .map(|path| Ok((path.as_ref().to_path_buf(), read_audio(path)?)))
        .collect::<Result<Vec<(PathBuf, AudioBuffer)>>>()?;
    let sample_rate = ensure_sample_rates(&loaded)?;

    let buffers = pad_to_longest(loaded.into_iter().map(|(_, b)| b).collect());
    let scaled = apply_volumes(buffers, &opts.volumes);
    let mixed = normalize(sum_buffers(&scaled)?, opts.peak_target);

    write_audio(output, &mixed, &encode)?;

    let report = MixReport {
        output_path: output.to_path_buf(),
        sample_rate,
        duration_secs: mixed.duration_secs(),
        stem_count: inputs.len(),
    };
    info!(duration = report.duration_secs, sample_rate, "stems mixed");
    Ok(report)
}
