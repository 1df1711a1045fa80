#![cfg(unix)]

mod common;

use std::{fs, path::PathBuf};

use common::{sine, wav_spec, write_fixture};
use stemkit_core::{
    model::{
        registry::{resolve, Backend, RegistryEntry},
        script::ScriptModel,
    },
    split_file_with, Device, DeviceProbe, ProgressReporter, SplitOptions, StemError, StemModel,
};
use tempfile::tempdir;

const COPY_RUNNER: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --input) in="$2"; shift ;;
    --output) out="$2"; shift ;;
    --device) echo "device $2" >&2; shift ;;
  esac
  shift
done
cp "$in" "$out/vocals.wav"
cp "$in" "$out/accompaniment.wav"
"#;

const FAILING_RUNNER: &str = "echo 'CUDA out of memory' >&2\nexit 3\n";

struct CpuOnly;

impl DeviceProbe for CpuOnly {
    fn is_available(&self, device: Device) -> bool {
        device == Device::Cpu
    }
}

fn entry(rate: Option<u32>) -> RegistryEntry {
    RegistryEntry {
        name: "copy".into(),
        backend: Backend::Script,
        description: String::new(),
        sample_rate: rate,
        channels: 2,
        stems: vec!["vocals".into(), "accompaniment".into()],
    }
}

fn runner(dir: &std::path::Path, body: &str) -> PathBuf {
    let path = dir.join("runner.sh");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn runner_output_becomes_the_stem_set() {
    let dir = tempdir().unwrap();
    let model = ScriptModel::with_runner(entry(None), "sh".into(), runner(dir.path(), COPY_RUNNER))
        .unwrap();
    let input = sine(330.0, 0.2, 32_000, 2, 0.5);

    let stems = model.apply(&input, Device::Cpu).unwrap();

    assert_eq!(stems.sample_rate(), 32_000);
    assert_eq!(stems.names().collect::<Vec<_>>(), vec!["vocals", "accompaniment"]);
    assert_eq!(stems.get("vocals"), Some(&input));
}

#[test]
fn runner_failure_carries_its_stderr() {
    let dir = tempdir().unwrap();
    let model = ScriptModel::with_runner(entry(None), "sh".into(), runner(dir.path(), FAILING_RUNNER))
        .unwrap();

    let err = model
        .apply(&sine(330.0, 0.1, 32_000, 2, 0.5), Device::Cpu)
        .unwrap_err();

    assert_eq!(err.code(), "UNEXPECTED");
    assert!(err.to_string().contains("CUDA out of memory"), "{err}");
}

#[test]
fn missing_runner_is_a_model_load_failure() {
    let dir = tempdir().unwrap();
    let err = ScriptModel::with_runner(entry(None), "sh".into(), dir.path().join("absent.py"))
        .err()
        .unwrap();
    assert!(matches!(err, StemError::ModelLoadFailure { ref model, .. } if model == "copy"));
}

#[test]
fn separation_through_a_script_model() {
    let dir = tempdir().unwrap();
    let input = write_fixture(dir.path(), "song.wav", &sine(440.0, 0.25, 48_000, 1, 0.5));
    let script = runner(dir.path(), COPY_RUNNER);
    let opts = SplitOptions {
        output_dir: dir.path().join("stems"),
        ..Default::default()
    };

    let mut progress = ProgressReporter::silent();
    let report = split_file_with(
        &input,
        &opts,
        |_| Ok(Box::new(ScriptModel::with_runner(entry(Some(44_100)), "sh".into(), script)?) as Box<dyn StemModel>),
        &CpuOnly,
        &mut progress,
    )
    .unwrap();

    assert_eq!(report.model, "copy");
    assert_eq!(report.stem_count, 2);
    let (spec, frames) = wav_spec(&report.output_paths["accompaniment"]);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(frames, 11_025);
}

#[test]
fn registry_models_declare_their_layout() {
    let htdemucs = resolve("").unwrap();
    assert_eq!(htdemucs.name, "htdemucs");
    assert_eq!(htdemucs.backend, Backend::Script);
    assert_eq!(htdemucs.sample_rate, Some(44_100));
    assert_eq!(htdemucs.stems, vec!["drums", "bass", "other", "vocals"]);

    assert_eq!(resolve("htdemucs_6s").unwrap().stems.len(), 6);
    assert_eq!(resolve("center").unwrap().sample_rate, None);
    assert_eq!(resolve("bogus").unwrap_err().code(), "MODEL_LOAD_FAILURE");
}
