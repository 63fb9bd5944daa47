use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Format and run state of the output device.
///
/// Written by the output backend when a stream is (re)built, read by the
/// mixer thread to decide how to convert its blocks.
pub struct DeviceClock {
    /// Device sample rate (e.g., 44100, 48000).
    sample_rate: AtomicU32,
    channels: AtomicU8,
    /// Whether the device callback should pull from the ring buffer.
    running: AtomicBool,
    /// Flag to signal the buffer should be cleared.
    clear_buffer: AtomicBool,
}

impl DeviceClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: AtomicU32::new(sample_rate),
            channels: AtomicU8::new(2),
            running: AtomicBool::new(false),
            clear_buffer: AtomicBool::new(false),
        }
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::SeqCst);
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_channels(&self, channels: u32) {
        self.channels.store(channels.min(u8::MAX as u32) as u8, Ordering::SeqCst);
    }

    pub fn get_channels(&self) -> u32 {
        self.channels.load(Ordering::Relaxed) as u32
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn signal_clear_buffer(&self) {
        self.clear_buffer.store(true, Ordering::SeqCst);
    }

    /// Returns true once per signal.
    pub fn take_clear_buffer(&self) -> bool {
        self.clear_buffer.swap(false, Ordering::SeqCst)
    }
}
