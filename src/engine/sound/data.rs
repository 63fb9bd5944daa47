/// Decoded PCM shared by every handle playing the same resource.
///
/// Samples are interleaved f32. The manager's cache and each live handle hold
/// an `Arc<SoundData>`, so dropping one handle never frees data a sibling
/// still plays.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundData {
    name: String,
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl SoundData {
    pub fn new(name: impl Into<String>, samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let mut samples = samples;
        // Drop a trailing partial frame.
        samples.truncate(samples.len() / channels * channels);
        Self {
            name: name.into(),
            samples,
            channels,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Silent placeholder of the given duration.
    pub fn silent(name: impl Into<String>, seconds: f32, channels: usize, sample_rate: u32) -> Self {
        let frames = (seconds.max(0.0) as f64 * sample_rate as f64).round() as usize;
        Self::new(name, vec![0.0; frames * channels.max(1)], channels, sample_rate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels) as u64
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Returns the (left, right) pair for a frame. Mono is duplicated, extra
    /// channels beyond the first two are ignored.
    #[inline]
    pub fn stereo_frame(&self, frame: usize) -> (f32, f32) {
        let idx = frame * self.channels;
        match self.samples.get(idx..idx + self.channels) {
            Some([mono]) => (*mono, *mono),
            Some([left, right, ..]) => (*left, *right),
            _ => (0.0, 0.0),
        }
    }
}
