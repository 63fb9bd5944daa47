use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig, SampleFormat, FromSample, Sample, SizedSample};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use crate::engine::buffer::MixConsumer;
use crate::engine::clock::DeviceClock;
use crate::engine::error::AudioError;
use crate::engine::output::AudioOutput;

type SharedConsumer = Arc<Mutex<Option<MixConsumer>>>;

/// Default output device stream pulling from the mix ring buffer.
pub struct CpalBackend {
    stream: Stream,
    device_id: String,
    is_healthy: Arc<AtomicBool>,
    consumer: SharedConsumer,
    clock: Arc<DeviceClock>,
}

impl CpalBackend {
    /// Opens the default output device. On failure the consumer is handed
    /// back so a later reconnect can reuse it.
    pub fn new(
        consumer: MixConsumer,
        clock: Arc<DeviceClock>,
    ) -> Result<Self, (Option<MixConsumer>, AudioError)> {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(d) => d,
            None => return Err((Some(consumer), AudioError::Device("no output device available".into()))),
        };

        let device_id = device.name().unwrap_or_else(|_| "unknown".to_string());
        let config_inner = match device.default_output_config() {
            Ok(c) => c,
            Err(e) => return Err((Some(consumer), AudioError::Device(e.to_string()))),
        };

        let sample_format = config_inner.sample_format();
        let config: StreamConfig = config_inner.into();

        clock.set_sample_rate(config.sample_rate);
        clock.set_channels(config.channels as u32);

        let is_healthy = Arc::new(AtomicBool::new(true));
        let shared_consumer: SharedConsumer = Arc::new(Mutex::new(Some(consumer)));

        let stream_res = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &shared_consumer, &clock, &is_healthy),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &shared_consumer, &clock, &is_healthy),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &shared_consumer, &clock, &is_healthy),
            other => Err(AudioError::Device(format!("unsupported sample format {:?}", other))),
        };

        match stream_res {
            Ok(stream) => {
                log::info!(
                    "opened output device {} ({}Hz, {}ch, {:?})",
                    device_id,
                    config.sample_rate,
                    config.channels,
                    sample_format
                );
                Ok(Self {
                    stream,
                    device_id,
                    is_healthy,
                    consumer: shared_consumer,
                    clock,
                })
            }
            Err(e) => Err((take_consumer(&shared_consumer), e)),
        }
    }
}

fn take_consumer(shared: &SharedConsumer) -> Option<MixConsumer> {
    match shared.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    consumer: &SharedConsumer,
    clock: &Arc<DeviceClock>,
    is_healthy: &Arc<AtomicBool>,
) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let consumer_for_callback = consumer.clone();
    let clock_for_callback = clock.clone();
    let is_healthy_err = is_healthy.clone();

    let err_fn = move |err: cpal::StreamError| {
        log::error!("output stream error: {}", err);
        is_healthy_err.store(false, Ordering::SeqCst);
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                if let Ok(mut guard) = consumer_for_callback.lock() {
                    if let Some(c) = guard.as_mut() {
                        process_audio(data, c, &clock_for_callback);
                        return;
                    }
                }
                fill_silence(data);
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::Device(e.to_string()))
}

impl AudioOutput for CpalBackend {
    fn start(&mut self) -> Result<(), AudioError> {
        self.clock.set_running(true);
        self.stream.play().map_err(|e| AudioError::Device(e.to_string()))
    }

    fn is_healthy(&self) -> bool {
        if !self.is_healthy.load(Ordering::SeqCst) {
            return false;
        }
        let host = cpal::default_host();
        if let Some(device) = host.default_output_device() {
            if let Ok(name) = device.name() {
                if name != self.device_id {
                    return false;
                }
            }
        }
        true
    }

    fn shutdown(&mut self) -> Option<MixConsumer> {
        self.clock.set_running(false);
        let _ = self.stream.pause();
        take_consumer(&self.consumer)
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.clock.set_running(false);
    }
}

fn fill_silence<T: Sample + FromSample<f32>>(data: &mut [T]) {
    for sample in data.iter_mut() {
        *sample = T::from_sample(0.0f32);
    }
}

fn process_audio<T: Sample + FromSample<f32>>(
    data: &mut [T],
    consumer: &mut MixConsumer,
    clock: &DeviceClock,
) {
    if clock.take_clear_buffer() {
        consumer.clear();
    }

    if !clock.is_running() {
        fill_silence(data);
        return;
    }

    let mut count = 0;
    for out in data.iter_mut() {
        match consumer.pop() {
            Some(sample) => {
                *out = T::from_sample(sample);
                count += 1;
            }
            None => break,
        }
    }

    // Underrun: the mixer thread fell behind.
    fill_silence(&mut data[count..]);
}
