//! Play the engine through the default output device

#[cfg(feature = "native")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "native")]
use log::info;
#[cfg(feature = "native")]
use std::time::Duration;
#[cfg(feature = "native")]
use tonebox::{
    utils::init_logger, Channel, CpalOutput, Engine, EngineConfig, EngineEvent, NoiseType,
    SirenType, ToneParameters, Waveform,
};

#[cfg(feature = "native")]
#[derive(Parser)]
#[command(name = "tonebox", about = "Test tones, noise and dub siren")]
struct Cli {
    #[command(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Mode,
}

#[cfg(feature = "native")]
#[derive(Args)]
struct Common {
    /// Volume, 0.0-0.5
    #[arg(long, global = true, default_value_t = 0.1)]
    volume: f32,

    /// left, right or both
    #[arg(long, global = true, default_value = "both")]
    channel: Channel,

    /// Requested sample rate
    #[arg(long, global = true, default_value_t = 44100.0)]
    sample_rate: f32,
}

#[cfg(feature = "native")]
#[derive(Subcommand)]
enum Mode {
    /// Steady tone
    Tone {
        #[arg(long, default_value_t = 1000.0)]
        frequency: f32,
        #[arg(long, default_value = "sine")]
        waveform: Waveform,
        /// Seconds to play
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },
    /// Ten second sweep from DC to 20 kHz
    Sweep {
        #[arg(long, default_value = "sine")]
        waveform: Waveform,
    },
    /// Looping noise
    Noise {
        #[arg(long = "type", default_value = "white")]
        kind: NoiseType,
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },
    /// Dub siren through the delay
    Siren {
        #[arg(long = "type", default_value = "siren")]
        kind: SirenType,
        /// Delay feedback in percent, 0-200
        #[arg(long, default_value_t = 50.0)]
        feedback: f32,
        /// Lock the delay to this tempo instead of the default 250 ms
        #[arg(long)]
        bpm: Option<u32>,
    },
}

#[cfg(feature = "native")]
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(feature = "native")]
fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let waveform = match &cli.command {
        Mode::Tone { waveform, .. } | Mode::Sweep { waveform } => *waveform,
        _ => Waveform::default(),
    };
    let tone = ToneParameters::new(1000.0, waveform, cli.common.volume, cli.common.channel);
    let config = EngineConfig::default()
        .with_sample_rate(cli.common.sample_rate)
        .with_tone(tone);

    let mut engine = Engine::with_config(CpalOutput::new(), config);
    engine.initialize()?;

    match cli.command {
        Mode::Tone {
            frequency, seconds, ..
        } => {
            engine.set_frequency(frequency);
            engine.start_tone()?;
            run_for(&mut engine, seconds);
        }
        Mode::Sweep { .. } => {
            engine.start_sweep()?;
            run_until(&mut engine, EngineEvent::SweepFinished);
        }
        Mode::Noise { kind, seconds } => {
            engine.start_noise(kind)?;
            run_for(&mut engine, seconds);
        }
        Mode::Siren {
            kind,
            feedback,
            bpm,
        } => {
            engine.set_delay_feedback(feedback);
            if let Some(bpm) = bpm {
                engine.set_bpm(bpm);
                engine.set_tempo_sync(true);
            }
            engine.start_siren(kind)?;
            run_until(&mut engine, EngineEvent::SirenFinished);
            // Let the echoes ring out
            run_for(&mut engine, 2.0);
        }
    }

    engine.teardown();
    Ok(())
}

#[cfg(feature = "native")]
fn run_for(engine: &mut Engine<CpalOutput>, seconds: f64) {
    let until = std::time::Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while std::time::Instant::now() < until {
        engine.poll();
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(feature = "native")]
fn run_until(engine: &mut Engine<CpalOutput>, done: EngineEvent) {
    loop {
        for event in engine.poll() {
            if let EngineEvent::SweepStep { progress, .. } = event {
                info!("{:3.0}%  {}", progress, engine.frequency_label());
            }
            if event == done {
                return;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    println!("This binary is only available with the 'native' feature enabled.");
}
