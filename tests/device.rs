use std::collections::HashSet;

use stemkit_core::{select_device, Device, DeviceProbe};

struct Available(HashSet<Device>);

impl Available {
    fn of(devices: &[Device]) -> Self {
        Self(devices.iter().copied().collect())
    }
}

impl DeviceProbe for Available {
    fn is_available(&self, device: Device) -> bool {
        self.0.contains(&device)
    }
}

#[test]
fn prefers_cuda_then_mps_then_cpu() {
    let cases = [
        (vec![Device::Cuda, Device::Mps], Device::Cuda),
        (vec![Device::Cuda], Device::Cuda),
        (vec![Device::Mps], Device::Mps),
        (vec![], Device::Cpu),
    ];
    for (available, expected) in cases {
        assert_eq!(
            select_device(None, &Available::of(&available)),
            expected,
            "available: {available:?}"
        );
    }
}

#[test]
fn cpu_is_chosen_even_when_the_probe_denies_it() {
    assert_eq!(select_device(None, &Available::of(&[])), Device::Cpu);
    assert_eq!(
        select_device(Some(Device::Cpu), &Available::of(&[Device::Cuda])),
        Device::Cpu
    );
}

#[test]
fn explicit_preference_wins_when_available() {
    let both = Available::of(&[Device::Cuda, Device::Mps]);
    assert_eq!(select_device(Some(Device::Mps), &both), Device::Mps);
}

#[test]
fn unavailable_preference_falls_through_the_list() {
    let mps_only = Available::of(&[Device::Mps]);
    assert_eq!(select_device(Some(Device::Cuda), &mps_only), Device::Mps);
}

#[test]
fn device_names_parse_and_describe() {
    assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda);
    assert_eq!("metal".parse::<Device>().unwrap(), Device::Mps);
    assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
    assert!("tpu".parse::<Device>().is_err());

    assert_eq!(Device::Mps.to_string(), "mps");
    assert_eq!(Device::Cpu.describe(), "Using CPU (no GPU detected)...");
    assert_eq!(serde_json::to_string(&Device::Cuda).unwrap(), "\"cuda\"");
}
