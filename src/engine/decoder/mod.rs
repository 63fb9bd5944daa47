pub mod symphonia_decoder;

use std::path::Path;

use crate::engine::dsp::resampler::resample_all;
use crate::engine::error::AudioError;
use crate::engine::sound::SoundData;
use symphonia_decoder::SymphoniaDecoder;

/// Source of interleaved f32 PCM, read one packet at a time.
pub trait AudioDecoder {
    /// Appends the next packet's samples to `out`. Returns false once the
    /// stream is exhausted or unreadable.
    fn read_packet(&mut self, out: &mut Vec<f32>) -> bool;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u32;

    /// Length in frames, when the container reports it.
    fn frames_hint(&self) -> Option<u64>;
}

/// Drains a decoder into one interleaved buffer.
pub fn decode_all<D: AudioDecoder>(decoder: &mut D) -> Vec<f32> {
    let mut samples = match decoder.frames_hint() {
        Some(frames) => Vec::with_capacity(frames as usize * decoder.channels() as usize),
        None => Vec::new(),
    };
    while decoder.read_packet(&mut samples) {}
    samples
}

/// Loads a whole file into memory, resampled to `target_rate` when given.
///
/// The sound is named after the path it was loaded from.
pub fn load_sound_data<P: AsRef<Path>>(path: P, target_rate: Option<u32>) -> Result<SoundData, AudioError> {
    let path = path.as_ref();
    let mut decoder = SymphoniaDecoder::new(path)?;
    let channels = decoder.channels() as usize;
    let source_rate = decoder.sample_rate();
    let samples = decode_all(&mut decoder);

    let (samples, rate) = match target_rate {
        Some(target) if target != source_rate => {
            log::debug!("resampling {}: {}Hz -> {}Hz", path.display(), source_rate, target);
            (resample_all(&samples, channels, source_rate, target)?, target)
        }
        _ => (samples, source_rate),
    };

    Ok(SoundData::new(path.display().to_string(), samples, channels, rate))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Writes a 16-bit PCM WAV file with every sample set to `value`.
    pub(crate) fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32, value: i16) {
        let data_len = frames * channels as u32 * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for _ in 0..frames * channels as u32 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn decodes_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 2, 8000, 16384);

        let data = load_sound_data(&path, None).unwrap();
        assert_eq!(data.sample_rate(), 8000);
        assert_eq!(data.channels(), 2);
        assert_eq!(data.frames(), 8000);
        assert!((data.stereo_frame(10).0 - 0.5).abs() < 1e-3);
        assert!(data.name().ends_with("tone.wav"));
    }

    #[test]
    fn reports_length_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 8000, 1, 4000, 100);

        let mut decoder = SymphoniaDecoder::new(&path).unwrap();
        assert_eq!(decoder.frames_hint(), Some(4000));
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.sample_rate(), 8000);
        let samples = decode_all(&mut decoder);
        assert_eq!(samples.len(), 4000);
        assert!(!decoder.read_packet(&mut Vec::new()));
    }

    #[test]
    fn resamples_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("low.wav");
        write_wav(&path, 24_000, 1, 24_000, 8192);

        let data = load_sound_data(&path, Some(48_000)).unwrap();
        assert_eq!(data.sample_rate(), 48_000);
        assert_eq!(data.frames(), 48_000);
        // Away from the edges the level survives conversion.
        assert!((data.stereo_frame(24_000).0 - 0.25).abs() < 0.01);
        assert!((data.stereo_frame(4_000).0 - 0.25).abs() < 0.01);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_sound_data("/no/such/sound.wav", None).unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
    }

    #[test]
    fn garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        assert!(load_sound_data(&path, None).is_err());
    }
}
