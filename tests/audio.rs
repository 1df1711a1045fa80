mod common;

use approx::assert_abs_diff_eq;
use common::{frames, sine, wav_spec, write_fixture};
use std::fs;
use stemkit_core::{
    core::audio::{validate_bitrate, write_wav_f32},
    read_audio, read_audio_raw, write_audio, EncodeOptions, StemError,
};
use tempfile::tempdir;

#[test]
fn mono_file_reads_as_stereo() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "mono.wav", &sine(440.0, 0.1, 16_000, 1, 0.5));

    let raw = read_audio_raw(&path).unwrap();
    assert_eq!(raw.channels(), 1);
    assert_eq!(raw.sample_rate, 16_000);
    assert_eq!(raw.frames(), 1_600);

    let stereo = read_audio(&path).unwrap();
    assert_eq!(stereo.channels(), 2);
    assert_eq!(stereo.sample_rate, 16_000);
    assert_eq!(stereo.channel(0), raw.channel(0));
    assert_eq!(stereo.channel(1), raw.channel(0));
}

#[test]
fn sixteen_bit_write_keeps_samples_within_quantization() {
    let dir = tempdir().unwrap();
    let original = frames(&[[0.25, -0.5], [0.75, -1.0], [0.0, 0.125]], 44_100);
    let path = write_fixture(dir.path(), "pcm.wav", &original);

    let decoded = read_audio_raw(&path).unwrap();
    assert_eq!(decoded.frames(), 3);
    for (a, b) in original.samples.iter().zip(decoded.samples.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn out_of_range_samples_are_clamped_on_write() {
    let dir = tempdir().unwrap();
    let path = write_fixture(dir.path(), "hot.wav", &frames(&[[2.0, -3.0]], 44_100));

    let decoded = read_audio_raw(&path).unwrap();
    assert_abs_diff_eq!(decoded.samples[[0, 0]], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(decoded.samples[[0, 1]], -1.0, epsilon = 1e-4);
}

#[test]
fn float_wav_is_lossless() {
    let dir = tempdir().unwrap();
    let original = frames(&[[0.123_456, -0.654_321], [1.5, -0.000_01]], 48_000);
    let path = dir.path().join("float.wav");
    write_wav_f32(&path, &original).unwrap();

    assert_eq!(read_audio_raw(&path).unwrap(), original);
}

#[test]
fn write_audio_creates_missing_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("out.wav");

    write_audio(&path, &frames(&[[0.1, 0.1]], 44_100), &EncodeOptions::default()).unwrap();

    let (spec, frames) = wav_spec(&path);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(frames, 1);
}

#[test]
fn missing_file_is_input_not_found() {
    let dir = tempdir().unwrap();
    let err = read_audio(dir.path().join("ghost.wav")).unwrap_err();
    assert!(matches!(err, StemError::InputNotFound { .. }));
}

#[test]
fn garbage_file_is_a_decode_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("noise.wav");
    fs::write(&path, b"definitely not a riff header, just text").unwrap();

    let err = read_audio(&path).unwrap_err();
    assert!(matches!(err, StemError::DecodeFailure { .. }), "{err:?}");
    assert_eq!(err.code(), "DECODE_FAILURE");
}

#[test]
fn bitrates_need_digits_and_a_k_suffix() {
    assert!(validate_bitrate("192k"));
    assert!(validate_bitrate("320K"));
    assert!(!validate_bitrate("192"));
    assert!(!validate_bitrate("k"));
    assert!(!validate_bitrate("fast"));
}

#[cfg(unix)]
#[test]
fn failed_mp3_encode_leaves_no_intermediate_behind() {
    let leftovers = || {
        fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("stemkit-encode-"))
            .count()
    };
    let dir = tempdir().unwrap();
    let out = dir.path().join("mix.mp3");
    let opts = EncodeOptions {
        format: stemkit_core::OutputFormat::Mp3,
        ..Default::default()
    };

    let before = leftovers();
    std::env::set_var("STEMKIT_FFMPEG", "false");
    let err = write_audio(&out, &frames(&[[0.1, 0.1]], 44_100), &opts).unwrap_err();
    std::env::remove_var("STEMKIT_FFMPEG");

    assert_eq!(err.code(), "ENCODE_FAILURE");
    assert_eq!(leftovers(), before);
    assert!(!out.exists());
}
