use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use mewo_sound::{AudioEngine, AudioManager, EngineConfig, SoundStatus};

/// Play one sound file through the default output device.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Sound file to play.
    path: PathBuf,

    /// Number of times to play; 0 loops forever.
    #[arg(long, default_value_t = 1)]
    loops: u32,

    /// Volume, 0.0 to 1.0.
    #[arg(long, default_value_t = 1.0)]
    volume: f32,

    /// Balance, -1.0 (left) to 1.0 (right).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    balance: f32,

    /// Start position in seconds.
    #[arg(long, default_value_t = 0.0)]
    start: f32,

    /// JSON engine config.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut engine = AudioEngine::new(config)?;
    if !engine.is_valid() {
        log::warn!("no working output device; playback will be silent");
    }
    let (rate, channels) = engine.device_format();
    log::info!("device format: {}Hz, {}ch", rate, channels);

    let sound = engine.get_sound(&args.path);
    if sound.status() == SoundStatus::Bad {
        return Err(format!("could not load {}", args.path.display()).into());
    }

    sound.set_loop_count(args.loops);
    sound.set_volume(args.volume);
    sound.set_balance(args.balance);
    sound.set_time(args.start);
    sound.play();
    log::info!("playing {} ({:.2}s)", sound.get_name(), sound.length());

    // Main loop to keep the engine ticking and handle device changes
    while sound.status() == SoundStatus::Playing {
        engine.tick();
        let time = sound.get_time();
        println!("Playback time: {:.2} / {:.2} seconds", time, sound.length());
        thread::sleep(Duration::from_millis(500));
    }

    println!("Playback finished.");
    Ok(())
}
