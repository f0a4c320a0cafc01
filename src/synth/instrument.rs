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
use super::Waveform;

/// A playable instrument: a waveform selection plus envelope timing and
/// levels. Instruments are static; songs refer to them by table index, and
/// loading a song copies the parameters into its channels.
#[derive(Debug, Clone, Copy)]
pub struct Instrument {
    pub name: &'static str,
    pub waveforms: Waveform,
    pub attack_ms: u16,
    pub decay_ms: u16,
    /// Amplitude held during sustain, as a Q16 scale factor.
    pub sustain: u16,
    /// How long sustain lasts before releasing on its own. Zero sustains
    /// until the note is released.
    pub sustain_ms: u16,
    pub release_ms: u16,
    /// The channel volume, as a Q16 scale factor.
    pub volume: u16,
}

/// The instrument table. Song data indexes into this, so the order is part
/// of the song format.
pub const INSTRUMENTS: [Instrument; 9] = [
    Instrument {
        name: "melody",
        waveforms: Waveform::TRIANGLE.union(Waveform::SQUARE),
        attack_ms: 16,
        decay_ms: 168,
        sustain: 0xAFFF,
        sustain_ms: 10_000,
        release_ms: 168,
        volume: 10_000,
    },
    Instrument {
        name: "rhythm",
        waveforms: Waveform::SINE.union(Waveform::SQUARE),
        attack_ms: 38,
        decay_ms: 300,
        sustain: 0,
        sustain_ms: 0,
        release_ms: 0,
        volume: 12_000,
    },
    Instrument {
        name: "drum",
        waveforms: Waveform::NOISE,
        attack_ms: 5,
        decay_ms: 10,
        sustain: 16_000,
        sustain_ms: 10_000,
        release_ms: 100,
        volume: 18_000,
    },
    Instrument {
        name: "hi-hat",
        waveforms: Waveform::NOISE,
        attack_ms: 5,
        decay_ms: 5,
        sustain: 8_000,
        sustain_ms: 10_000,
        release_ms: 40,
        volume: 8_000,
    },
    Instrument {
        name: "bass",
        waveforms: Waveform::SQUARE,
        attack_ms: 10,
        decay_ms: 100,
        sustain: 0,
        sustain_ms: 0,
        release_ms: 500,
        volume: 12_000,
    },
    Instrument {
        name: "piano",
        waveforms: Waveform::PIANO,
        attack_ms: 20,
        decay_ms: 20,
        sustain: 0xAFFF,
        sustain_ms: 3_000,
        release_ms: 500,
        volume: 10_000,
    },
    Instrument {
        name: "reed",
        waveforms: Waveform::REED,
        attack_ms: 16,
        decay_ms: 168,
        sustain: 0xAFFF,
        sustain_ms: 100,
        release_ms: 3_000,
        volume: 10_000,
    },
    Instrument {
        name: "plucked guitar",
        waveforms: Waveform::PLUCKED_GUITAR,
        attack_ms: 16,
        decay_ms: 168,
        sustain: 0xAFFF,
        sustain_ms: 10_000,
        release_ms: 168,
        volume: 10_000,
    },
    Instrument {
        name: "violin",
        waveforms: Waveform::VIOLIN,
        attack_ms: 16,
        decay_ms: 168,
        sustain: 0xAFFF,
        sustain_ms: 10_000,
        release_ms: 168,
        volume: 10_000,
    },
];
