use std::{env, path::PathBuf};

/// Peak amplitude every normalized output is rescaled to.
pub const DEFAULT_PEAK_TARGET: f32 = 0.95;

/// Bitrate handed to the MP3 encoder when none is requested.
pub const DEFAULT_BITRATE: &str = "192k";

/// Stem kept apart when recombining the accompaniment.
pub const DEFAULT_SOLO_STEM: &str = "vocals";

/// Stem name under which the recombined remainder is written.
pub const ACCOMPANIMENT_STEM: &str = "accompaniment";

pub const DEFAULT_MODEL: &str = "htdemucs";

/// External model runner invoked by script-backed models.
pub fn runner_script() -> PathBuf {
    env::var("STEMKIT_RUNNER_SCRIPT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("demucs_runner.py"))
}

pub fn python_bin() -> String {
    env::var("STEMKIT_PYTHON").unwrap_or_else(|_| "python3".to_string())
}

pub fn ffmpeg_bin() -> PathBuf {
    env::var("STEMKIT_FFMPEG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ffmpeg"))
}
