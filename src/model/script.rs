use std::{
    fs,
    path::PathBuf,
    process::{Command, Stdio},
};

use anyhow::{anyhow, Context};
use tracing::{debug, info, instrument};

use crate::{
    config::{python_bin, runner_script},
    core::{
        audio::{read_audio_raw, write_wav_f32},
        device::Device,
    },
    error::{Result, StemError},
    model::{registry::RegistryEntry, StemModel},
    types::{AudioBuffer, StemSet},
};

/// Model served by the external runner script.
///
/// Runner contract: `<python> <script> --model <name> --device <device>
/// --input <wav> --output <dir>` must leave one `<stem>.wav` per declared
/// stem in `<dir>` and exit with status 0.
pub struct ScriptModel {
    entry: RegistryEntry,
    python: String,
    script: PathBuf,
}

impl ScriptModel {
    pub fn new(entry: RegistryEntry) -> Result<Self> {
        Self::with_runner(entry, python_bin(), runner_script())
    }

    pub fn with_runner(entry: RegistryEntry, python: String, script: PathBuf) -> Result<Self> {
        if !script.exists() {
            return Err(StemError::model(
                entry.name,
                format!(
                    "model runner {} not found (set STEMKIT_RUNNER_SCRIPT)",
                    script.display()
                ),
            ));
        }
        Ok(Self {
            entry,
            python,
            script,
        })
    }
}

impl StemModel for ScriptModel {
    fn name(&self) -> &str {
        &self.entry.name
    }

    fn sample_rate(&self) -> Option<u32> {
        self.entry.sample_rate
    }

    fn channels(&self) -> usize {
        self.entry.channels
    }

    fn stem_names(&self) -> &[String] {
        &self.entry.stems
    }

    #[instrument(skip_all, fields(model = %self.entry.name, %device))]
    fn apply(&self, input: &AudioBuffer, device: Device) -> Result<StemSet> {
        let tmp = tempfile::Builder::new()
            .prefix("stemkit-model-")
            .tempdir()?;
        let input_wav = tmp.path().join("input.wav");
        let output_dir = tmp.path().join("stems");
        fs::create_dir_all(&output_dir)?;

        write_wav_f32(&input_wav, input)?;
        debug!(input = %input_wav.display(), "wrote model input");

        info!(script = %self.script.display(), "running model");
        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg("--model")
            .arg(&self.entry.name)
            .arg("--device")
            .arg(device.as_str())
            .arg("--input")
            .arg(&input_wav)
            .arg("--output")
            .arg(&output_dir)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run model runner {}", self.script.display()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(runner_stderr = %stderr.trim(), "model runner diagnostics");
        }
        if !output.status.success() {
            let tail: String = stderr.lines().last().unwrap_or_default().to_string();
            return Err(anyhow!("Model runner exited with {}: {}", output.status, tail).into());
        }

        let rate = self.entry.sample_rate.unwrap_or(input.sample_rate);
        let mut stems = StemSet::new(rate);
        for name in &self.entry.stems {
            let path = output_dir.join(format!("{name}.wav"));
            if !path.exists() {
                return Err(anyhow!("Model runner did not produce stem `{name}`").into());
            }
            stems.insert(name.clone(), read_audio_raw(&path)?)?;
        }
        Ok(stems)
    }
}
