use serde::{Deserialize, Serialize};
use std::{
    fmt,
    process::{Command, Stdio},
    str::FromStr,
};
use tracing::{debug, warn};

/// Execution device handed to the model adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cuda,
    Mps,
    Cpu,
}

impl Device {
    /// Highest-throughput accelerator first, the universal fallback last.
    pub const PREFERENCE: [Device; 3] = [Device::Cuda, Device::Mps, Device::Cpu];

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Mps => "mps",
            Device::Cpu => "cpu",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Device::Cuda => "Using NVIDIA GPU (CUDA) for acceleration...",
            Device::Mps => "Using Apple Silicon GPU (Metal) for acceleration...",
            Device::Cpu => "Using CPU (no GPU detected)...",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Device::Cuda),
            "mps" | "metal" => Ok(Device::Mps),
            "cpu" => Ok(Device::Cpu),
            other => Err(format!("unknown device `{other}` (expected cuda, mps or cpu)")),
        }
    }
}

/// Capability probe. Implementations must not have side effects.
pub trait DeviceProbe {
    fn is_available(&self, device: Device) -> bool;
}

/// Probes the host: `nvidia-smi` for CUDA, Apple silicon for Metal.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProbe;

impl DeviceProbe for SystemProbe {
    fn is_available(&self, device: Device) -> bool {
        match device {
            Device::Cuda => Command::new("nvidia-smi")
                .arg("-L")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false),
            Device::Mps => cfg!(all(target_os = "macos", target_arch = "aarch64")),
            Device::Cpu => true,
        }
    }
}

/// Picks the device to run the model on. Never fails: CPU is always there.
pub fn select_device(preferred: Option<Device>, probe: &dyn DeviceProbe) -> Device {
    if let Some(device) = preferred {
        if device == Device::Cpu || probe.is_available(device) {
            return device;
        }
        warn!(%device, "requested device is not available, probing for another");
    }

    let device = Device::PREFERENCE
        .into_iter()
        .find(|&d| d == Device::Cpu || probe.is_available(d))
        .unwrap_or(Device::Cpu);
    debug!(%device, "selected execution device");
    device
}
