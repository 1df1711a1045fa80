use ndarray::{Array2, Zip};

use crate::{
    core::{device::Device, dsp::match_channels},
    error::Result,
    model::StemModel,
    types::{AudioBuffer, StemSet},
};

const BLEED: f32 = 0.3;

/// Deterministic mid/side separator.
///
/// vocals = (L + R) / 2, accompaniment = (L - R) / 2 + 0.3 * vocals, both
/// written to two identical channels. Runs at any sample rate.
pub struct CenterChannelModel {
    stems: Vec<String>,
}

impl CenterChannelModel {
    pub const NAME: &'static str = "center";

    pub fn new() -> Self {
        Self {
            stems: vec!["vocals".into(), "accompaniment".into()],
        }
    }
}

impl Default for CenterChannelModel {
    fn default() -> Self {
        Self::new()
    }
}

impl StemModel for CenterChannelModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sample_rate(&self) -> Option<u32> {
        None
    }

    fn channels(&self) -> usize {
        2
    }

    fn stem_names(&self) -> &[String] {
        &self.stems
    }

    fn apply(&self, input: &AudioBuffer, _device: Device) -> Result<StemSet> {
        let stereo = match_channels(input.clone(), 2);
        let left = stereo.samples.column(0);
        let right = stereo.samples.column(1);

        let mid = Zip::from(&left)
            .and(&right)
            .map_collect(|&l, &r| (l + r) * 0.5);
        let rest = Zip::from(&left)
            .and(&right)
            .and(&mid)
            .map_collect(|&l, &r, &m| (l - r) * 0.5 + BLEED * m);

        let frames = stereo.frames();
        let dual = |mono: &ndarray::Array1<f32>| {
            AudioBuffer::new(
                Array2::from_shape_fn((frames, 2), |(i, _)| mono[i]),
                stereo.sample_rate,
            )
        };

        let mut stems = StemSet::new(stereo.sample_rate);
        stems.insert(self.stems[0].clone(), dual(&mid))?;
        stems.insert(self.stems[1].clone(), dual(&rest))?;
        Ok(stems)
    }
}
