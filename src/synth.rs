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
use std::array;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Error;

mod channel;
pub mod instrument;
mod wavetables;

pub use channel::{AdsrPhase, AudioChannel, Waveform};

/// The number of synthesizer voices.
pub const CHANNEL_COUNT: usize = 8;

/// The engine sample rate in Hz. Envelope frame counts and oscillator phase
/// increments are derived from this.
pub const SAMPLE_RATE: u32 = 22_050;

/// Seed for the noise generator. Fixed so renders are reproducible.
const NOISE_SEED: u64 = 0x32B7_1700;

/// The engine as shared between the control loop and the audio pump. The
/// core is single threaded; this lock exists only because desktop audio
/// backends pull samples from their own callback thread.
pub type SharedEngine = Arc<Mutex<Engine>>;

/// The polyphonic synthesizer: a fixed array of voices mixed into one signed
/// 16-bit sample per frame, scaled by a master volume and hard clipped.
///
/// The engine has no thread awareness of its own. The control loop triggers
/// notes and the audio pump pulls frames; when those run on different
/// threads, the engine must be wrapped in a lock.
pub struct Engine {
    channels: [AudioChannel; CHANNEL_COUNT],
    volume: u16,
    rng: StdRng,
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            channels: array::from_fn(|_| AudioChannel::default()),
            volume: 0xFFFF,
            rng: StdRng::seed_from_u64(NOISE_SEED),
        }
    }

    /// The master volume, as a Q16 scale factor.
    pub fn volume(&self) -> u16 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u16) {
        self.volume = volume;
    }

    pub fn channel(&self, channel: usize) -> &AudioChannel {
        &self.channels[channel]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut AudioChannel {
        &mut self.channels[channel]
    }

    /// Copies an instrument's parameters into the given channel. Fails if
    /// either index is out of range.
    pub fn load_instrument(&mut self, instrument: usize, channel: usize) -> Result<(), Error> {
        let table = &instrument::INSTRUMENTS;
        if instrument >= table.len() {
            return Err(Error::InstrumentOutOfRange {
                instrument,
                count: table.len(),
            });
        }
        if channel >= CHANNEL_COUNT {
            return Err(Error::ChannelOutOfRange {
                channel,
                count: CHANNEL_COUNT,
            });
        }

        self.channels[channel].apply_instrument(&table[instrument]);
        Ok(())
    }

    /// Releases every channel that is still sounding, letting each fade out
    /// through its own release phase.
    pub fn stop_all(&mut self) {
        for channel in self.channels.iter_mut() {
            if !matches!(channel.phase(), AdsrPhase::Off | AdsrPhase::Release) {
                channel.trigger_release();
            }
        }
    }

    /// Forces every channel off immediately. Used for explicit resets and
    /// for error recovery, where fading out would keep sounding against
    /// inconsistent state.
    pub fn reset_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.off();
        }
    }

    /// Whether any channel is currently audible.
    pub fn is_playing(&self) -> bool {
        self.volume > 0
            && self
                .channels
                .iter()
                .any(|channel| channel.volume() > 0 && channel.phase() != AdsrPhase::Off)
    }

    /// Produces the next output frame: every channel advanced once, summed,
    /// scaled by the master volume, and hard clipped to the signed 16-bit
    /// range.
    pub fn next_frame(&mut self) -> i16 {
        let mut mix: i64 = 0;
        for channel in self.channels.iter_mut() {
            mix += channel.advance(&mut self.rng) as i64;
        }

        mix = (mix * self.volume as i64) >> 16;
        mix.clamp(-0x8000, 0x7FFF) as i16
    }
}
