use rubato::{Resampler as RubatoResampler, Fft, FixedSync};
use audioadapter_buffers::direct::SequentialSliceOfVecs;

use crate::engine::error::AudioError;

/// Streaming sample-rate converter for interleaved f32 audio.
///
/// Input is buffered until a whole chunk is available.
pub struct Resampler {
    resampler: Fft<f32>,
    channels: usize,
    chunk_size: usize,
    buffer: Vec<f32>,
}

fn resample_err(e: impl std::fmt::Display) -> AudioError {
    AudioError::Resample(e.to_string())
}

impl Resampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self, AudioError> {
        let resampler = Fft::<f32>::new(
            source_sample_rate as usize,
            target_sample_rate as usize,
            chunk_size,
            2,
            channels,
            FixedSync::Input,
        )
        .map_err(resample_err)?;

        Ok(Self {
            resampler,
            channels,
            chunk_size,
            buffer: Vec::with_capacity(chunk_size * channels),
        })
    }

    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>, AudioError> {
        self.buffer.extend_from_slice(input);

        let mut all_output = Vec::new();

        while self.buffer.len() >= self.chunk_size * self.channels {
            let chunk: Vec<f32> = self.buffer.drain(0..self.chunk_size * self.channels).collect();
            let num_frames = self.chunk_size;

            let mut input_buffer = vec![vec![0.0; num_frames]; self.channels];
            for (i, frame) in chunk.chunks_exact(self.channels).enumerate() {
                for (ch, sample) in frame.iter().enumerate() {
                    input_buffer[ch][i] = *sample;
                }
            }

            let out_len = self.resampler.output_frames_next();
            let mut output_buffer = vec![vec![0.0; out_len]; self.channels];

            let input_adapter = SequentialSliceOfVecs::new(&input_buffer, self.channels, num_frames)
                .map_err(resample_err)?;
            let mut output_adapter = SequentialSliceOfVecs::new_mut(&mut output_buffer, self.channels, out_len)
                .map_err(resample_err)?;

            self.resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(resample_err)?;

            for i in 0..out_len {
                for channel in output_buffer.iter() {
                    all_output.push(channel[i]);
                }
            }
        }

        Ok(all_output)
    }

    /// Output frames the filter lags behind its input.
    pub fn output_delay(&self) -> usize {
        self.resampler.output_delay()
    }
}

/// Converts a whole interleaved buffer from `source_rate` to `target_rate`.
///
/// The filter delay is skipped and the input is zero padded until every
/// converted frame is out, so the result lines up with the source and is
/// exactly as long as the converted duration.
pub fn resample_all(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let channels = channels.max(1);
    let mut resampler = Resampler::new(source_rate, target_rate, channels, 1024)?;
    let delay = resampler.output_delay() * channels;

    let frames = samples.len() / channels;
    let expected = (frames as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize * channels;

    let mut out = resampler.process(&samples[..frames * channels])?;
    let padding = vec![0.0; resampler.chunk_size * channels];
    while out.len() < delay + expected {
        out.extend(resampler.process(&padding)?);
    }
    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_passthrough() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_all(&input, 2, 48_000, 48_000).unwrap(), input);
    }

    #[test]
    fn length_follows_rate_ratio() {
        let input = vec![0.0f32; 44_100 * 2];
        let out = resample_all(&input, 2, 44_100, 48_000).unwrap();
        assert_eq!(out.len(), 48_000 * 2);

        let input = vec![0.0f32; 1000];
        let out = resample_all(&input, 1, 48_000, 44_100).unwrap();
        assert_eq!(out.len(), 919);
    }

    #[test]
    fn step_stays_aligned_after_upsampling() {
        // Half a second of silence, then half a second at full scale.
        let mut input = vec![0.0f32; 12_000];
        input.extend(std::iter::repeat(1.0).take(12_000));
        let out = resample_all(&input, 1, 24_000, 48_000).unwrap();
        assert_eq!(out.len(), 48_000);

        let first_loud = out.iter().position(|&s| s > 0.5).unwrap();
        assert!(
            (first_loud as i64 - 24_000).abs() <= 4,
            "step moved to frame {}",
            first_loud
        );
        assert!(out[..23_000].iter().all(|s| s.abs() < 0.05));
        assert!(out[26_000..46_000].iter().all(|s| (s - 1.0).abs() < 0.05));
    }

    #[test]
    fn streaming_buffers_partial_chunks() {
        let mut resampler = Resampler::new(44_100, 48_000, 1, 1024).unwrap();
        assert!(resampler.process(&[0.0; 100]).unwrap().is_empty());
        assert!(!resampler.process(&[0.0; 1024]).unwrap().is_empty());
    }
}
