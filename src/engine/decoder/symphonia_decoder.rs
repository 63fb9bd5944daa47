use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::engine::decoder::AudioDecoder;
use crate::engine::error::AudioError;

/// Decodes the first audio track of a file with symphonia.
pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u32,
    frames: Option<u64>,
    /// Reused between packets, regrown when a packet does not fit.
    scratch: Option<SampleBuffer<f32>>,
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, AudioError> {
    let source = MediaSourceStream::new(Box::new(File::open(path)?), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

impl SymphoniaDecoder {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let reader = open_format(path)?;

        let (track_id, params) = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| (t.id, t.codec_params.clone()))
            .ok_or_else(|| AudioError::NoTrack(path.to_path_buf()))?;

        let decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;
        let sample_rate = params.sample_rate.unwrap_or(44_100);
        let channels = params.channels.map(|c| c.count() as u32).unwrap_or(2);

        log::debug!(
            "opened {}: {}Hz, {}ch, {:?} frames",
            path.display(),
            sample_rate,
            channels,
            params.n_frames
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            frames: params.n_frames,
            scratch: None,
        })
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn read_packet(&mut self, out: &mut Vec<f32>) -> bool {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(ref err)) if err.kind() == ErrorKind::UnexpectedEof => return false,
                Err(err) => {
                    log::warn!("stopping decode: {}", err);
                    return false;
                }
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::DecodeError(err)) => {
                    log::debug!("skipping undecodable packet: {}", err);
                    continue;
                }
                Err(err) => {
                    log::warn!("stopping decode: {}", err);
                    return false;
                }
            };

            let spec = *decoded.spec();
            let frames = decoded.capacity();
            let fits = matches!(
                &self.scratch,
                Some(buf) if buf.capacity() >= frames * spec.channels.count()
            );
            if !fits {
                self.scratch = Some(SampleBuffer::new(frames as u64, spec));
            }
            if let Some(buf) = self.scratch.as_mut() {
                buf.copy_interleaved_ref(decoded);
                out.extend_from_slice(buf.samples());
            }
            return true;
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u32 {
        self.channels
    }

    fn frames_hint(&self) -> Option<u64> {
        self.frames
    }
}
