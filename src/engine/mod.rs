pub mod buffer;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod manager;
pub mod mixer;
pub mod null;
pub mod output;
pub mod sound;
