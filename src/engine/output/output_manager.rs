use std::sync::Arc;
use crate::engine::buffer::MixConsumer;
use crate::engine::clock::DeviceClock;
use crate::engine::error::AudioError;
use crate::engine::output::cpal_backend::CpalBackend;
use crate::engine::output::AudioOutput;

/// Keeps a `CpalBackend` alive across device loss and default-device changes.
pub struct OutputManager {
    backend: Option<CpalBackend>,
    consumer: Option<MixConsumer>,
    clock: Arc<DeviceClock>,
    /// Whether the application asked for output to run.
    wants_running: bool,
}

impl OutputManager {
    pub fn new(consumer: MixConsumer, clock: Arc<DeviceClock>) -> Self {
        let mut manager = Self {
            backend: None,
            consumer: Some(consumer),
            clock,
            wants_running: false,
        };
        if let Err(e) = manager.try_reconnect() {
            log::warn!("no audio output yet: {}", e);
        }
        manager
    }

    pub fn try_reconnect(&mut self) -> Result<(), AudioError> {
        let consumer = self
            .consumer
            .take()
            .ok_or_else(|| AudioError::Device("buffer consumer missing".into()))?;
        match CpalBackend::new(consumer, self.clock.clone()) {
            Ok(backend) => {
                self.backend = Some(backend);
                // Queued audio was mixed for the previous device format.
                self.clock.signal_clear_buffer();
                Ok(())
            }
            Err((recovered_consumer, e)) => {
                self.consumer = recovered_consumer;
                Err(e)
            }
        }
    }

    pub fn check_connection(&mut self) {
        let needs_reconnect = match &self.backend {
            Some(backend) => !backend.is_healthy(),
            None => true,
        };

        if !needs_reconnect {
            return;
        }
        if let Some(mut backend) = self.backend.take() {
            log::warn!("audio output lost, reconnecting");
            if let Some(consumer) = backend.shutdown() {
                self.consumer = Some(consumer);
            }
        }
        match self.try_reconnect() {
            Ok(()) => {
                if self.wants_running {
                    if let Err(e) = self.start() {
                        log::warn!("could not restart output: {}", e);
                    }
                }
            }
            Err(e) => log::debug!("reconnect failed: {}", e),
        }
    }
}

impl AudioOutput for OutputManager {
    fn start(&mut self) -> Result<(), AudioError> {
        self.wants_running = true;
        if self.backend.is_none() {
            self.check_connection();
        }
        if let Some(backend) = &mut self.backend {
            backend.start()
        } else {
            Err(AudioError::Device("no audio backend available".into()))
        }
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            Some(backend) => backend.is_healthy(),
            None => false,
        }
    }

    fn shutdown(&mut self) -> Option<MixConsumer> {
        self.wants_running = false;
        if let Some(mut backend) = self.backend.take() {
            backend.shutdown().or(self.consumer.take())
        } else {
            self.consumer.take()
        }
    }

    fn tick(&mut self) {
        self.check_connection();
    }
}
