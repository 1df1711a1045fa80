pub mod audio;
pub mod device;
pub mod dsp;
pub mod mixer;
pub mod splitter;
pub mod volume;
