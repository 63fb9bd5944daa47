pub mod engine;

pub use engine::config::{EngineConfig, SoundDefaults};
pub use engine::engine::AudioEngine;
pub use engine::error::AudioError;
pub use engine::manager::AudioManager;
pub use engine::null::NullManager;
pub use engine::sound::{AudioSound, SoundData, SoundHandle, SoundStatus};
