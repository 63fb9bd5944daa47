pub mod cpal_backend;
pub mod output_manager;

use crate::engine::buffer::MixConsumer;
use crate::engine::error::AudioError;

pub trait AudioOutput {
    /// Starts (or resumes) pulling mixed audio.
    fn start(&mut self) -> Result<(), AudioError>;

    /// False once the stream errored or the default device changed.
    fn is_healthy(&self) -> bool;

    /// Tears the stream down and hands the buffer consumer back. The
    /// device clock stops running, so the mixer falls back to pacing itself.
    fn shutdown(&mut self) -> Option<MixConsumer>;

    /// Periodic housekeeping from the application loop.
    fn tick(&mut self) {}
}
