//! Buffer reconciliation, gain, combination and normalization.
//!
//! Every function takes its input buffer by value and hands back the
//! transformed buffer, so a stage owns what it produces.

use ndarray::{s, Array1, Array2, Axis};
use rubato::{
    InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction,
};
use std::path::Path;
use tracing::{debug, warn};

use crate::{
    core::volume::VolumeVector,
    error::{Result, StemError},
    types::{AudioBuffer, StemSet},
};

const SINC_LEN: usize = 256;

pub fn to_stereo(buffer: AudioBuffer) -> AudioBuffer {
    match_channels(buffer, 2)
}

/// Forces the channel count: fewer channels are duplicated from the first
/// one, more channels are averaged down and then spread over `channels`.
pub fn match_channels(buffer: AudioBuffer, channels: usize) -> AudioBuffer {
    let have = buffer.channels();
    if have == channels || channels == 0 {
        return buffer;
    }
    let frames = buffer.frames();
    if have == 0 {
        return AudioBuffer::silence(frames, channels, buffer.sample_rate);
    }

    let source: Array1<f32> = if have > channels {
        buffer
            .samples
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(frames))
    } else {
        buffer.samples.column(0).to_owned()
    };

    let samples = Array2::from_shape_fn((frames, channels), |(i, _)| source[i]);
    AudioBuffer::new(samples, buffer.sample_rate)
}

/// Appends trailing silence up to `frames`. Never truncates.
pub fn pad_to(buffer: AudioBuffer, frames: usize) -> AudioBuffer {
    let have = buffer.frames();
    if have >= frames {
        return buffer;
    }
    let mut samples = Array2::zeros((frames, buffer.channels()));
    samples.slice_mut(s![..have, ..]).assign(&buffer.samples);
    AudioBuffer::new(samples, buffer.sample_rate)
}

pub fn pad_to_longest(buffers: Vec<AudioBuffer>) -> Vec<AudioBuffer> {
    let longest = buffers.iter().map(AudioBuffer::frames).max().unwrap_or(0);
    buffers.into_iter().map(|b| pad_to(b, longest)).collect()
}

/// Checks that every input shares the first input's sample rate.
///
/// Mixing never resamples: a mismatch is the caller's mistake and is reported
/// against the offending path.
pub fn ensure_sample_rates<P: AsRef<Path>>(inputs: &[(P, AudioBuffer)]) -> Result<u32> {
    let (_, first) = inputs.first().ok_or(StemError::NoInputsProvided)?;
    let expected = first.sample_rate;
    for (path, buffer) in inputs {
        if buffer.sample_rate != expected {
            return Err(StemError::SampleRateMismatch {
                expected,
                actual: buffer.sample_rate,
                path: path.as_ref().display().to_string(),
            });
        }
    }
    Ok(expected)
}

/// Band-limited resampling to `to_rate`.
///
/// The result holds exactly `round(frames * to_rate / from_rate)` frames.
pub fn resample(buffer: AudioBuffer, to_rate: u32) -> Result<AudioBuffer> {
    let from_rate = buffer.sample_rate;
    if from_rate == to_rate {
        return Ok(buffer);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(anyhow::anyhow!("Cannot resample {from_rate} Hz to {to_rate} Hz").into());
    }

    let frames = buffer.frames();
    let channels = buffer.channels();
    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (frames as f64 * ratio).round() as usize;
    if frames == 0 || channels == 0 {
        return Ok(AudioBuffer::silence(expected, channels, to_rate));
    }

    debug!(from_rate, to_rate, frames, "resampling");

    let params = InterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: InterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    // Trailing silence so the aligned output reaches the expected length.
    let chunk = frames + SINC_LEN;
    let waves_in: Vec<Vec<f32>> = (0..channels)
        .map(|c| {
            let mut wave = buffer.channel(c);
            wave.resize(chunk, 0.0);
            wave
        })
        .collect();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk, channels)?;
    let waves_out = resampler.process(&waves_in, None)?;

    // SincFixedIn output is already time-aligned with its input.
    let mut samples = Array2::zeros((expected, channels));
    for (c, wave) in waves_out.iter().enumerate() {
        for (i, &v) in wave.iter().take(expected).enumerate() {
            samples[[i, c]] = v;
        }
    }
    Ok(AudioBuffer::new(samples, to_rate))
}

pub fn scale(mut buffer: AudioBuffer, gain: f32) -> AudioBuffer {
    if gain != 1.0 {
        buffer.samples.mapv_inplace(|s| s * gain);
    }
    buffer
}

/// Multiplies buffer `i` by volume `i`. No clamping happens here.
pub fn apply_volumes(buffers: Vec<AudioBuffer>, volumes: &VolumeVector) -> Vec<AudioBuffer> {
    let gains = volumes.for_inputs(buffers.len());
    buffers
        .into_iter()
        .zip(gains)
        .map(|(b, g)| scale(b, g))
        .collect()
}

/// Elementwise sum of all buffers; shorter buffers count as trailing silence.
///
/// Each output sample is accumulated in `f64` over its inputs in sorted
/// order, so permuting the inputs cannot change a single bit of the result.
pub fn sum_buffers(buffers: &[AudioBuffer]) -> Result<AudioBuffer> {
    let refs: Vec<&AudioBuffer> = buffers.iter().collect();
    sum_refs(&refs)
}

fn sum_refs(buffers: &[&AudioBuffer]) -> Result<AudioBuffer> {
    let first = buffers.first().ok_or(StemError::NoInputsProvided)?;
    let sample_rate = first.sample_rate;
    let channels = first.channels();

    for b in buffers {
        if b.sample_rate != sample_rate {
            return Err(StemError::SampleRateMismatch {
                expected: sample_rate,
                actual: b.sample_rate,
                path: "<buffer>".into(),
            });
        }
        if b.channels() != channels {
            return Err(anyhow::anyhow!(
                "Cannot sum buffers with {} and {} channels",
                channels,
                b.channels()
            )
            .into());
        }
    }

    let frames = buffers.iter().map(|b| b.frames()).max().unwrap_or(0);
    let mut samples = Array2::<f32>::zeros((frames, channels));
    let mut column: Vec<f32> = Vec::with_capacity(buffers.len());

    for ((i, c), out) in samples.indexed_iter_mut() {
        column.clear();
        column.extend(buffers.iter().filter_map(|b| b.samples.get((i, c)).copied()));
        column.sort_by(f32::total_cmp);
        *out = column.iter().map(|&v| v as f64).sum::<f64>() as f32;
    }

    Ok(AudioBuffer::new(samples, sample_rate))
}

#[derive(Clone, Debug)]
pub struct Recombined {
    /// Stem that was left out of the sum.
    pub solo: String,
    pub accompaniment: AudioBuffer,
    /// The requested solo stem was absent and the first stem stood in for it.
    pub fell_back: bool,
}

/// Sums every stem except `solo`.
///
/// When `solo` is not in the set, the first stem in set order is treated as
/// the solo stem instead. A set holding only the solo stem yields silence.
pub fn recombine_without(stems: &StemSet, solo: &str) -> Result<Recombined> {
    let first = stems
        .names()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Cannot recombine an empty stem set"))?;

    let fell_back = !stems.contains(solo);
    let solo = if fell_back {
        warn!(
            requested = solo,
            using = first,
            "solo stem not produced by the model, treating the first stem as solo"
        );
        first
    } else {
        solo
    };

    let rest: Vec<&AudioBuffer> = stems
        .iter()
        .filter(|(name, _)| *name != solo)
        .map(|(_, b)| b)
        .collect();

    let accompaniment = if rest.is_empty() {
        let shape = stems
            .get(solo)
            .ok_or_else(|| anyhow::anyhow!("Solo stem `{solo}` vanished from the set"))?;
        AudioBuffer::silence(shape.frames(), shape.channels(), shape.sample_rate)
    } else {
        sum_refs(&rest)?
    };

    Ok(Recombined {
        solo: solo.to_string(),
        accompaniment,
        fell_back,
    })
}

/// Largest absolute sample value, 0.0 for an empty buffer.
pub fn peak(buffer: &AudioBuffer) -> f32 {
    buffer.samples.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()))
}

/// Rescales the whole buffer so its peak equals `target`. Silence passes
/// through untouched.
///
/// The gain is applied in `f64` and the result clamped, so no sample ever
/// lands above `target` through rounding.
pub fn normalize(mut buffer: AudioBuffer, target: f32) -> AudioBuffer {
    let peak = peak(&buffer);
    if peak <= 0.0 || peak == target {
        return buffer;
    }
    let limit = f64::from(target.abs());
    let gain = f64::from(target) / f64::from(peak);
    buffer
        .samples
        .mapv_inplace(|s| (f64::from(s) * gain).clamp(-limit, limit) as f32);
    buffer
}
