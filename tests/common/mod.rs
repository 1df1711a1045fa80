#![allow(dead_code)]

use ndarray::Array2;
use std::{
    f32::consts::PI,
    path::{Path, PathBuf},
};
use stemkit_core::{core::audio::write_wav, AudioBuffer};

pub fn sine(freq: f32, secs: f32, sample_rate: u32, channels: usize, amp: f32) -> AudioBuffer {
    let frames = (secs * sample_rate as f32).round() as usize;
    let samples = Array2::from_shape_fn((frames, channels), |(i, _)| {
        (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * amp
    });
    AudioBuffer::new(samples, sample_rate)
}

pub fn silence(secs: f32, sample_rate: u32, channels: usize) -> AudioBuffer {
    let frames = (secs * sample_rate as f32).round() as usize;
    AudioBuffer::silence(frames, channels, sample_rate)
}

/// Stereo buffer from `[left, right]` frames.
pub fn frames(rows: &[[f32; 2]], sample_rate: u32) -> AudioBuffer {
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    AudioBuffer::from_interleaved(flat, 2, sample_rate).unwrap()
}

pub fn write_fixture(dir: &Path, name: &str, audio: &AudioBuffer) -> PathBuf {
    let path = dir.join(name);
    write_wav(&path, audio).unwrap();
    path
}

pub fn wav_spec(path: &Path) -> (hound::WavSpec, usize) {
    let reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let frames = reader.duration() as usize;
    (spec, frames)
}
