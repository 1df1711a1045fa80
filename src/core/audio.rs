use std::{
    fs::{self, File},
    path::Path,
    process::{Command, Stdio},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, instrument, warn};

use crate::{
    config::ffmpeg_bin,
    core::dsp::to_stereo,
    error::{Result, StemError},
    types::{AudioBuffer, EncodeOptions, OutputFormat},
};

/// Fails with `InputNotFound` unless `path` exists. Runs before any decoding.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(StemError::InputNotFound {
            path: path.display().to_string(),
        })
    }
}

/// Decodes `path` and upmixes mono to stereo. The sample rate is preserved.
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    read_audio_raw(path).map(to_stereo)
}

/// Decodes `path` keeping its native layout (one or two channels).
///
/// Sources with more than two channels keep their first two.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_audio_raw<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path: &Path = path.as_ref();
    ensure_exists(path)?;

    let file: File = File::open(path).map_err(|e| StemError::decode(path.display(), e))?;
    let mss: MediaSourceStream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint: Hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| StemError::decode(path.display(), e))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| StemError::decode(path.display(), "no default track found"))?;
    let track_id = track.id;

    let mut sample_rate: u32 = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels: usize = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| StemError::decode(path.display(), e))?;

    let mut samples: Vec<f32> = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(timestamp = packet.ts(), "skipping undecodable packet: {e}");
                continue;
            }
            Err(e) => return Err(StemError::decode(path.display(), e)),
        };
        sample_rate = decoded.spec().rate;
        channels = decoded.spec().channels.count();

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if sample_rate == 0 || channels == 0 {
        return Err(StemError::decode(
            path.display(),
            "stream does not declare a sample rate and channel layout",
        ));
    }

    debug!(sample_rate, channels, samples = samples.len(), "read audio");

    let buffer = AudioBuffer::from_interleaved(samples, channels, sample_rate)?;
    if channels > 2 {
        warn!(channels, "keeping the first two channels of a multichannel source");
        let front = buffer.samples.slice(ndarray::s![.., ..2]).to_owned();
        return Ok(AudioBuffer::new(front, sample_rate));
    }
    Ok(buffer)
}

/// Encodes `audio` to `path` in the requested format, creating parent
/// directories as needed.
#[instrument(skip_all, fields(path = %path.display(), format = %opts.format))]
pub fn write_audio(path: &Path, audio: &AudioBuffer, opts: &EncodeOptions) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StemError::encode(path.display(), e))?;
    }
    match opts.format {
        OutputFormat::Wav => write_wav(path, audio),
        OutputFormat::Mp3 => write_mp3(path, audio, &opts.bitrate),
    }
}

/// 16-bit PCM WAV. Samples outside [-1, 1] are clamped.
pub fn write_wav(path: &Path, audio: &AudioBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels() as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let err = |e: hound::Error| StemError::encode(path.display(), e);

    let mut writer = WavWriter::create(path, spec).map_err(err)?;
    for sample in audio.samples.iter() {
        let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s).map_err(err)?;
    }
    writer.finalize().map_err(err)?;
    Ok(())
}

/// 32-bit float WAV, lossless for handing buffers to external tools.
pub fn write_wav_f32(path: &Path, audio: &AudioBuffer) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels() as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let err = |e: hound::Error| StemError::encode(path.display(), e);

    let mut writer = WavWriter::create(path, spec).map_err(err)?;
    for &sample in audio.samples.iter() {
        writer.write_sample(sample).map_err(err)?;
    }
    writer.finalize().map_err(err)?;
    Ok(())
}

/// Accepts bitrates such as `192k`.
pub fn validate_bitrate(bitrate: &str) -> bool {
    bitrate
        .strip_suffix(|c: char| c == 'k' || c == 'K')
        .map(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Encodes through an intermediate WAV handed to ffmpeg. The intermediate
/// lives in a process-unique temp directory that is removed on every path.
fn write_mp3(path: &Path, audio: &AudioBuffer, bitrate: &str) -> Result<()> {
    if !validate_bitrate(bitrate) {
        return Err(StemError::encode(
            path.display(),
            format!("invalid bitrate `{bitrate}` (expected e.g. 192k)"),
        ));
    }

    let tmp = tempfile::Builder::new()
        .prefix("stemkit-encode-")
        .tempdir()
        .map_err(|e| StemError::encode(path.display(), e))?;
    let tmp_wav = tmp.path().join("intermediate.wav");
    write_wav(&tmp_wav, audio)?;

    let ffmpeg = ffmpeg_bin();
    let status = Command::new(&ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(&tmp_wav)
        .args(["-codec:a", "libmp3lame", "-b:a", bitrate])
        .arg(path)
        .stdout(Stdio::null())
        .status()
        .map_err(|e| {
            StemError::encode(
                path.display(),
                format!("failed to spawn {}: {e}", ffmpeg.display()),
            )
        })?;

    if !status.success() {
        return Err(StemError::encode(
            path.display(),
            format!("{} exited with {status}", ffmpeg.display()),
        ));
    }

    debug!(bitrate, "mp3 export completed");
    Ok(())
}
