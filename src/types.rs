use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_BITRATE, DEFAULT_MODEL, DEFAULT_PEAK_TARGET, DEFAULT_SOLO_STEM},
    core::{device::Device, volume::VolumeVector},
    error::{Result, StemError},
};

/// Frame-major (interleaved) block of samples shaped `(frames, channels)` at
/// one sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    pub samples: Array2<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Array2<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn silence(frames: usize, channels: usize, sample_rate: u32) -> Self {
        Self::new(Array2::zeros((frames, channels)), sample_rate)
    }

    /// Builds a buffer from interleaved samples. A trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(anyhow::anyhow!("Audio buffer needs at least one channel").into());
        }
        let frames = samples.len() / channels;
        samples.truncate(frames * channels);
        let samples = Array2::from_shape_vec((frames, channels), samples)?;
        Ok(Self::new(samples, sample_rate))
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    pub fn frames(&self) -> usize {
        self.samples.nrows()
    }

    pub fn channels(&self) -> usize {
        self.samples.ncols()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy of a single channel.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples.index_axis(Axis(1), index).to_vec()
    }
}

/// Ordered set of named stems sharing one sample rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StemSet {
    sample_rate: u32,
    stems: Vec<(String, AudioBuffer)>,
}

impl StemSet {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stems: Vec::new(),
        }
    }

    /// Adds a stem, replacing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, buffer: AudioBuffer) -> Result<()> {
        let name = name.into();
        if buffer.sample_rate != self.sample_rate {
            return Err(StemError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: buffer.sample_rate,
                path: name,
            });
        }
        match self.stems.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = buffer,
            None => self.stems.push((name, buffer)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AudioBuffer> {
        self.stems.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stems.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AudioBuffer)> {
        self.stems.iter().map(|(n, b)| (n.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl IntoIterator for StemSet {
    type Item = (String, AudioBuffer);
    type IntoIter = std::vec::IntoIter<(String, AudioBuffer)>;

    fn into_iter(self) -> Self::IntoIter {
        self.stems.into_iter()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Wav,
    Mp3,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
        }
    }

    /// `.mp3` selects MP3, anything else is written as WAV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mp3") => OutputFormat::Mp3,
            _ => OutputFormat::Wav,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(OutputFormat::Wav),
            "mp3" => Ok(OutputFormat::Mp3),
            other => Err(format!("unsupported output format `{other}` (expected wav or mp3)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub format: OutputFormat,
    pub bitrate: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Wav,
            bitrate: DEFAULT_BITRATE.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixOptions {
    pub volumes: VolumeVector,
    /// Inferred from the output extension when unset.
    pub format: Option<OutputFormat>,
    pub bitrate: String,
    pub peak_target: f32,
}

impl Default for MixOptions {
    fn default() -> Self {
        Self {
            volumes: VolumeVector::default(),
            format: None,
            bitrate: DEFAULT_BITRATE.into(),
            peak_target: DEFAULT_PEAK_TARGET,
        }
    }
}

/// What the separator writes once the model has run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparationMode {
    /// Every stem the model produced.
    #[default]
    Stems,
    /// The solo stem plus everything else recombined as the accompaniment.
    Karaoke,
}

impl FromStr for SeparationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stems" => Ok(SeparationMode::Stems),
            "karaoke" => Ok(SeparationMode::Karaoke),
            other => Err(format!("unknown separation mode `{other}` (expected stems or karaoke)")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplitOptions {
    pub output_dir: PathBuf,
    pub model_name: String,
    pub mode: SeparationMode,
    pub solo_stem: String,
    pub format: OutputFormat,
    pub bitrate: String,
    /// Tried first when available; the preference list is walked otherwise.
    pub device: Option<Device>,
    pub peak_target: f32,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            output_dir: ".".into(),
            model_name: DEFAULT_MODEL.into(),
            mode: SeparationMode::default(),
            solo_stem: DEFAULT_SOLO_STEM.into(),
            format: OutputFormat::Wav,
            bitrate: DEFAULT_BITRATE.into(),
            device: None,
            peak_target: DEFAULT_PEAK_TARGET,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MixReport {
    pub output_path: PathBuf,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub stem_count: usize,
}

#[derive(Clone, Debug)]
pub struct SplitReport {
    pub output_paths: BTreeMap<String, PathBuf>,
    pub model: String,
    pub device: Device,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub stem_count: usize,
}

/// Terminal value of a pipeline run, serialized as the CLI's final JSON line.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineResult {
    Success {
        message: String,
        output_paths: BTreeMap<String, String>,
        job_id: Option<String>,
        sample_rate: u32,
        duration: f64,
        stem_count: usize,
    },
    Error {
        error: String,
        code: &'static str,
        job_id: Option<String>,
    },
}

impl PipelineResult {
    pub fn from_mix(res: Result<MixReport>) -> Self {
        match res {
            Ok(report) => PipelineResult::Success {
                message: "Stems mixed successfully".into(),
                output_paths: BTreeMap::from([(
                    "mix".to_string(),
                    report.output_path.display().to_string(),
                )]),
                job_id: None,
                sample_rate: report.sample_rate,
                duration: report.duration_secs,
                stem_count: report.stem_count,
            },
            Err(e) => Self::error(&e, None),
        }
    }

    pub fn from_split(res: Result<SplitReport>, job_id: Option<String>) -> Self {
        match res {
            Ok(report) => PipelineResult::Success {
                message: format!(
                    "Audio separation completed with {} on {}",
                    report.model, report.device
                ),
                output_paths: report
                    .output_paths
                    .iter()
                    .map(|(stem, p)| (stem.clone(), p.display().to_string()))
                    .collect(),
                job_id,
                sample_rate: report.sample_rate,
                duration: report.duration_secs,
                stem_count: report.stem_count,
            },
            Err(e) => Self::error(&e, job_id),
        }
    }

    pub fn error(err: &StemError, job_id: Option<String>) -> Self {
        PipelineResult::Error {
            error: err.to_string(),
            code: err.code(),
            job_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
