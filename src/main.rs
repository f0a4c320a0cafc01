// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use parking_lot::Mutex;
use tracing::info;

use padtrack::config::{Config, Surface};
use padtrack::controller::{pedal, Controller};
use padtrack::songs::SongBank;
use padtrack::synth::instrument::INSTRUMENTS;
use padtrack::synth::Engine;
use padtrack::{audio, gpio, midi};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A pad-surface accompaniment instrument."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the songs compiled into the song bank.
    Songs {},
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI ports.
    MidiDevices {},
    /// Starts the instrument.
    Run {
        /// The path to the instrument config.
        config_path: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Songs {} => {
            let bank = SongBank::builtin();

            println!("Songs (count: {}):", bank.song_count());
            for song in 0..bank.song_count() {
                let (channels, steps) = bank.dimensions(song)?;
                let instruments: Vec<&str> = bank
                    .instrument_ids(song)?
                    .iter()
                    .map(|id| {
                        INSTRUMENTS
                            .get(*id as usize)
                            .map(|instrument| instrument.name)
                            .unwrap_or("unknown")
                    })
                    .collect();
                println!(
                    "- song {:03}: {} steps, {} channels ({})",
                    song,
                    steps,
                    channels,
                    instruments.join(", ")
                );
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_transports()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Run { config_path } => {
            let config = match config_path {
                Some(config_path) => Config::deserialize(&config_path)?,
                None => Config::default(),
            };

            let engine = Arc::new(Mutex::new(Engine::new()));
            engine.lock().set_volume(config.master_volume);

            let mut audio_device = audio::get_device(&config.audio_device)?;
            audio_device.run(engine.clone())?;

            let transport = midi::get_transport(&config.midi_device)?;
            let pedal = match config.surface {
                Surface::Pedalboard => {
                    let board = gpio::get_pedalboard(&config.pedalboard)?;
                    Some(pedal::Driver::new(
                        board,
                        config.debounce()?,
                        config.hold_threshold()?,
                    ))
                }
                Surface::Launchpad => None,
            };

            let mut controller = Controller::new(transport, SongBank::builtin(), engine, pedal)?;
            info!(version = crate_version!(), "padtrack started.");
            controller.run();
        }
    }

    Ok(())
}
