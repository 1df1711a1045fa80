pub mod center;
pub mod model_manager;
pub mod registry;
pub mod script;

use crate::{
    core::device::Device,
    error::Result,
    types::{AudioBuffer, StemSet},
};

/// Boundary to a source-separation model.
///
/// The pipeline reconciles the input to `sample_rate()` and `channels()`
/// before calling `apply`.
pub trait StemModel {
    fn name(&self) -> &str;

    /// Rate the model runs at, `None` when any rate is accepted.
    fn sample_rate(&self) -> Option<u32>;

    fn channels(&self) -> usize;

    fn stem_names(&self) -> &[String];

    /// Blocking call; may take minutes on long inputs.
    fn apply(&self, input: &AudioBuffer, device: Device) -> Result<StemSet>;
}
