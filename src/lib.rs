//! # stemkit-core
//!
//! Mixes independent audio stems into one clip-safe track, and separates a
//! mixed track back into stems through a pluggable model adapter.
//!
//! Both directions share one reconciliation core ([`core::dsp`]): channel
//! and length alignment, summation, and peak normalization.

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod model;
pub mod types;

pub use crate::{
    core::{
        audio::{read_audio, read_audio_raw, write_audio},
        device::{select_device, Device, DeviceProbe, SystemProbe},
        mixer::mix_files,
        splitter::{split_file, split_file_with},
        volume::VolumeVector,
    },
    error::{Result, StemError},
    io::progress::{Milestone, ProgressEvent, ProgressReporter},
    model::{model_manager::load_model, StemModel},
    types::{
        AudioBuffer, EncodeOptions, MixOptions, MixReport, OutputFormat, PipelineResult,
        SeparationMode, SplitOptions, SplitReport, StemSet,
    },
};
