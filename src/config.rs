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
use std::fs;
use std::path::Path;
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

/// Which input surface drives playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// A pad grid over USB MIDI.
    #[default]
    Launchpad,
    /// A three-switch foot pedalboard.
    Pedalboard,
}

/// The instrument configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The MIDI port the control surface is attached to.
    #[serde(default = "default_midi_device")]
    pub midi_device: String,

    /// The audio output device, or "default".
    #[serde(default = "default_audio_device")]
    pub audio_device: String,

    /// The input surface.
    #[serde(default)]
    pub surface: Surface,

    /// The master volume, as a Q16 scale factor.
    #[serde(default = "default_master_volume")]
    pub master_volume: u16,

    /// The pedalboard backing the pedal surface ("stdin" or "mock...").
    #[serde(default = "default_pedalboard")]
    pub pedalboard: String,

    /// The pedal debounce window, e.g. "30ms".
    #[serde(default = "default_debounce")]
    debounce: String,

    /// How long the reset pedal must be held to rewind, e.g. "2s".
    #[serde(default = "default_hold_threshold")]
    hold_threshold: String,
}

fn default_midi_device() -> String {
    "Launchpad".to_string()
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_master_volume() -> u16 {
    0xFFFF
}

fn default_pedalboard() -> String {
    "stdin".to_string()
}

fn default_debounce() -> String {
    "30ms".to_string()
}

fn default_hold_threshold() -> String {
    "2s".to_string()
}

impl Default for Config {
    fn default() -> Config {
        Config {
            midi_device: default_midi_device(),
            audio_device: default_audio_device(),
            surface: Surface::default(),
            master_volume: default_master_volume(),
            pedalboard: default_pedalboard(),
            debounce: default_debounce(),
            hold_threshold: default_hold_threshold(),
        }
    }
}

impl Config {
    /// Parses a config from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Config, Box<dyn Error>> {
        Ok(serde_yml::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn debounce(&self) -> Result<Duration, Box<dyn Error>> {
        parse_duration(&self.debounce)
    }

    pub fn hold_threshold(&self) -> Result<Duration, Box<dyn Error>> {
        parse_duration(&self.hold_threshold)
    }
}

fn parse_duration(value: &str) -> Result<Duration, Box<dyn Error>> {
    Ok(DurationString::from_string(value.to_string())
        .map_err(|e| format!("invalid duration '{}': {}", value, e))?
        .into())
}
