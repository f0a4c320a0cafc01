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
use std::ops::{BitOr, BitOrAssign};

use rand::rngs::StdRng;
use rand::Rng;

use super::instrument::Instrument;
use super::{wavetables, SAMPLE_RATE};

/// Full scale of the Q24 envelope amplitude accumulator.
const ADSR_MAX: i32 = 0xFF_FFFF;

/// A set of oscillator kinds. A channel sums every selected waveform and
/// divides by the number of active ones, so combinations blend with equal
/// weight. Waveforms are always evaluated in ascending bit order; the WAVE
/// buffer refill hook depends on that order staying fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Waveform(u16);

impl Waveform {
    /// A 64-sample caller-refilled wave buffer.
    pub const WAVE: Waveform = Waveform(1);
    pub const SINE: Waveform = Waveform(8);
    pub const TRIANGLE: Waveform = Waveform(16);
    pub const SAW: Waveform = Waveform(32);
    pub const SQUARE: Waveform = Waveform(64);
    pub const NOISE: Waveform = Waveform(128);
    pub const PIANO: Waveform = Waveform(256);
    pub const REED: Waveform = Waveform(512);
    pub const PLUCKED_GUITAR: Waveform = Waveform(1024);
    pub const VIOLIN: Waveform = Waveform(2048);

    /// Const-friendly combination, for building instrument tables.
    pub const fn union(self, other: Waveform) -> Waveform {
        Waveform(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Waveform) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Waveform {
    type Output = Waveform;

    fn bitor(self, rhs: Waveform) -> Waveform {
        Waveform(self.0 | rhs.0)
    }
}

impl BitOrAssign for Waveform {
    fn bitor_assign(&mut self, rhs: Waveform) {
        self.0 |= rhs.0;
    }
}

/// The phase of a channel's amplitude envelope. `Off` is both the initial
/// and the terminal state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdsrPhase {
    #[default]
    Off,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// One synthesizer voice: an oscillator bank with an ADSR envelope, advanced
/// once per output frame. All amplitude math is fixed point: the envelope
/// accumulator is Q24, applied as a Q16 multiply-and-shift together with the
/// channel volume. The oscillator phase accumulator is Q16 and wraps once per
/// cycle.
pub struct AudioChannel {
    frequency: u16,
    waveforms: Waveform,
    attack_ms: u16,
    decay_ms: u16,
    sustain: u16,
    sustain_ms: u16,
    release_ms: u16,
    volume: u16,
    pulse_width: u16,

    phase: AdsrPhase,
    adsr: i32,
    adsr_step: i32,
    adsr_frame: u32,
    adsr_end_frame: u32,

    waveform_offset: u32,
    noise: i16,

    wave_buffer: [i16; 64],
    wave_buf_pos: usize,
    wave_refill: Option<fn(&mut AudioChannel)>,
}

impl Default for AudioChannel {
    fn default() -> AudioChannel {
        AudioChannel {
            frequency: 0,
            waveforms: Waveform::default(),
            attack_ms: 0,
            decay_ms: 0,
            sustain: 0,
            sustain_ms: 0,
            release_ms: 0,
            volume: 0,
            pulse_width: 0x7FFF,
            phase: AdsrPhase::Off,
            adsr: 0,
            adsr_step: 0,
            adsr_frame: 0,
            adsr_end_frame: 0,
            waveform_offset: 0,
            noise: 0,
            wave_buffer: [0; 64],
            wave_buf_pos: 0,
            wave_refill: None,
        }
    }
}

impl AudioChannel {
    /// The current note frequency in Hz. Zero means the channel is silent no
    /// matter what the envelope is doing.
    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: u16) {
        self.frequency = frequency;
    }

    pub fn phase(&self) -> AdsrPhase {
        self.phase
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    /// The current envelope amplitude as a Q16 scale factor.
    pub fn amplitude(&self) -> u16 {
        (self.adsr >> 8) as u16
    }

    /// Installs the hook that refills the WAVE buffer. The hook runs when the
    /// buffer position is at zero, which includes the very first frame.
    pub fn set_wave_refill(&mut self, refill: fn(&mut AudioChannel)) {
        self.wave_refill = Some(refill);
    }

    pub fn wave_buffer_mut(&mut self) -> &mut [i16; 64] {
        &mut self.wave_buffer
    }

    /// Copies an instrument's waveform selection and envelope timing into
    /// this channel. Does not touch the live envelope state.
    pub(crate) fn apply_instrument(&mut self, instrument: &Instrument) {
        self.waveforms = instrument.waveforms;
        self.attack_ms = instrument.attack_ms;
        self.decay_ms = instrument.decay_ms;
        self.sustain = instrument.sustain;
        self.sustain_ms = instrument.sustain_ms;
        self.release_ms = instrument.release_ms;
        self.volume = instrument.volume;
    }

    /// Starts a new note. Retriggering from any phase re-enters attack and
    /// overrides the previous envelope, which is what stops the prior sound
    /// on this channel.
    pub fn trigger_attack(&mut self) {
        self.adsr_frame = 0;
        self.adsr = 0;
        self.phase = AdsrPhase::Attack;
        self.adsr_end_frame = ms_to_frames(self.attack_ms);
        self.adsr_step = ADSR_MAX / self.adsr_end_frame as i32;
    }

    pub(crate) fn trigger_decay(&mut self) {
        self.adsr_frame = 0;
        self.phase = AdsrPhase::Decay;
        self.adsr_end_frame = ms_to_frames(self.decay_ms);
        self.adsr_step = (((self.sustain as i32) << 8) - self.adsr) / self.adsr_end_frame as i32;
    }

    /// Pins the amplitude at the sustain level. A nonzero sustain duration
    /// arms the automatic transition to release; zero sustains until a
    /// release is triggered explicitly.
    pub(crate) fn trigger_sustain(&mut self) {
        self.adsr_frame = 0;
        self.phase = AdsrPhase::Sustain;
        self.adsr = (self.sustain as i32) << 8;
        self.adsr_step = 0;
        self.adsr_end_frame = if self.sustain_ms > 0 {
            ms_to_frames(self.sustain_ms)
        } else {
            u32::MAX
        };
    }

    pub fn trigger_release(&mut self) {
        self.adsr_frame = 0;
        self.phase = AdsrPhase::Release;
        self.adsr_end_frame = ms_to_frames(self.release_ms);
        self.adsr_step = -(self.adsr / self.adsr_end_frame as i32);
    }

    /// Unconditionally silences the channel.
    pub fn off(&mut self) {
        self.adsr_frame = 0;
        self.phase = AdsrPhase::Off;
        self.adsr = 0;
        self.adsr_step = 0;
    }

    /// Advances the voice by one frame and returns its contribution to the
    /// mix, already scaled by envelope amplitude and channel volume. Envelope
    /// phase transitions happen here, at most one per frame.
    pub(crate) fn advance(&mut self, rng: &mut StdRng) -> i32 {
        // The phase accumulator keeps running even for silent channels so a
        // retriggered note does not restart mid cycle.
        let increment = (self.frequency as u32 * 0x10000) / SAMPLE_RATE;
        self.waveform_offset = self.waveform_offset.wrapping_add(increment);

        if self.phase == AdsrPhase::Off {
            return 0;
        }

        if self.adsr_frame >= self.adsr_end_frame {
            match self.phase {
                AdsrPhase::Attack => self.trigger_decay(),
                AdsrPhase::Decay => self.trigger_sustain(),
                AdsrPhase::Sustain => self.trigger_release(),
                AdsrPhase::Release => self.off(),
                AdsrPhase::Off => {}
            }
        }

        self.adsr = (self.adsr + self.adsr_step).clamp(0, ADSR_MAX);
        self.adsr_frame += 1;

        if self.waveform_offset & 0x10000 != 0 {
            // The accumulator wrapped: one full cycle has passed, so redraw
            // the noise sample. Redrawing per cycle rather than per frame
            // keeps the noise character from aliasing at audio rate.
            self.noise = noise_sample(rng);
        }
        self.waveform_offset &= 0xFFFF;

        if self.waveforms.is_empty() || self.frequency == 0 {
            return 0;
        }

        let mut sample: i32 = 0;
        let mut count: i32 = 0;

        if self.waveforms.contains(Waveform::WAVE) {
            if self.wave_buf_pos == 0 {
                if let Some(refill) = self.wave_refill {
                    refill(self);
                }
            }
            sample += self.wave_buffer[self.wave_buf_pos] as i32;
            self.wave_buf_pos += 1;
            if self.wave_buf_pos == self.wave_buffer.len() {
                self.wave_buf_pos = 0;
            }
            count += 1;
        }

        if self.waveforms.contains(Waveform::SINE) {
            sample += wavetables::SINE[(self.waveform_offset >> 8) as usize] as i32;
            count += 1;
        }

        if self.waveforms.contains(Waveform::TRIANGLE) {
            sample += if self.waveform_offset < 0x7FFF {
                (self.waveform_offset as i32) * 2 - 0x7FFF
            } else {
                0x7FFF - (self.waveform_offset as i32 - 0x7FFF) * 2
            };
            count += 1;
        }

        if self.waveforms.contains(Waveform::SAW) {
            sample += self.waveform_offset as i32 - 0x7FFF;
            count += 1;
        }

        if self.waveforms.contains(Waveform::SQUARE) {
            sample += if self.waveform_offset < self.pulse_width as u32 {
                0x7FFF
            } else {
                -0x7FFF
            };
            count += 1;
        }

        if self.waveforms.contains(Waveform::NOISE) {
            sample += self.noise as i32;
            count += 1;
        }

        if self.waveforms.contains(Waveform::PIANO) {
            sample += wavetables::PIANO[(self.waveform_offset >> 8) as usize] as i32;
            count += 1;
        }

        if self.waveforms.contains(Waveform::REED) {
            sample += wavetables::REED[(self.waveform_offset >> 8) as usize] as i32;
            count += 1;
        }

        if self.waveforms.contains(Waveform::PLUCKED_GUITAR) {
            sample += wavetables::PLUCKED_GUITAR[(self.waveform_offset >> 8) as usize] as i32;
            count += 1;
        }

        if self.waveforms.contains(Waveform::VIOLIN) {
            sample += wavetables::VIOLIN[(self.waveform_offset >> 8) as usize] as i32;
            count += 1;
        }

        if count == 0 {
            return 0;
        }

        sample /= count;
        sample = ((sample as i64 * (self.adsr >> 8) as i64) >> 16) as i32;
        ((sample as i64 * self.volume as i64) >> 16) as i32
    }
}

/// Converts a millisecond duration to a frame count at the engine sample
/// rate. Never returns zero: every envelope phase lasts at least one frame so
/// the step divisions stay defined.
fn ms_to_frames(ms: u16) -> u32 {
    (ms as u32 * SAMPLE_RATE / 1000).max(1)
}

/// A rough approximation of normally distributed noise: the mean-centered
/// sum of the 16-bit halves of two PRNG draws.
fn noise_sample(rng: &mut StdRng) -> i16 {
    let r0: u32 = rng.gen();
    let r1: u32 = rng.gen();
    let n = ((r0 & 0xFFFF) + (r1 & 0xFFFF) + (r0 >> 16) + (r1 >> 16)) / 2;
    (n as i32 - 0xFFFF) as i16
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::synth::instrument::INSTRUMENTS;
    use crate::synth::SAMPLE_RATE;

    use super::{AdsrPhase, AudioChannel, Waveform};

    fn melody_channel() -> AudioChannel {
        let mut channel = AudioChannel::default();
        channel.apply_instrument(&INSTRUMENTS[0]);
        channel.set_frequency(220);
        channel
    }

    #[test]
    fn envelope_walks_through_every_phase() {
        // The melody instrument: attack 16ms, decay 168ms, sustain 0xafff for
        // 10s, release 168ms. Record the phase after every frame and
        // run-length encode the sequence.
        let mut channel = melody_channel();
        let mut rng = StdRng::seed_from_u64(1);

        channel.trigger_attack();
        assert_eq!(channel.phase(), AdsrPhase::Attack);

        let mut runs: Vec<(AdsrPhase, u32)> = Vec::new();
        loop {
            channel.advance(&mut rng);
            let phase = channel.phase();
            match runs.last_mut() {
                Some((last, frames)) if *last == phase => *frames += 1,
                _ => runs.push((phase, 1)),
            }
            if phase == AdsrPhase::Off {
                break;
            }
            // Sustain pins the amplitude at the configured level throughout.
            if phase == AdsrPhase::Sustain {
                assert_eq!(channel.amplitude(), 0xAFFF);
            }
        }

        assert_eq!(
            runs,
            vec![
                (AdsrPhase::Attack, 16 * SAMPLE_RATE / 1000),
                (AdsrPhase::Decay, 168 * SAMPLE_RATE / 1000),
                (AdsrPhase::Sustain, 10_000 * SAMPLE_RATE / 1000),
                (AdsrPhase::Release, 168 * SAMPLE_RATE / 1000),
                (AdsrPhase::Off, 1),
            ]
        );
        assert_eq!(channel.amplitude(), 0, "amplitude must be exactly zero at off");
    }

    #[test]
    fn explicit_release_interrupts_sustain() {
        let mut channel = melody_channel();
        let mut rng = StdRng::seed_from_u64(1);

        channel.trigger_attack();
        for _ in 0..SAMPLE_RATE {
            channel.advance(&mut rng);
        }
        assert_eq!(channel.phase(), AdsrPhase::Sustain);

        channel.trigger_release();
        assert_eq!(channel.phase(), AdsrPhase::Release);
        for _ in 0..=168 * SAMPLE_RATE / 1000 {
            channel.advance(&mut rng);
        }
        assert_eq!(channel.phase(), AdsrPhase::Off);
        assert_eq!(channel.amplitude(), 0);
    }

    #[test]
    fn retrigger_restarts_the_envelope() {
        let mut channel = melody_channel();
        let mut rng = StdRng::seed_from_u64(1);

        channel.trigger_attack();
        for _ in 0..SAMPLE_RATE {
            channel.advance(&mut rng);
        }
        assert_eq!(channel.phase(), AdsrPhase::Sustain);

        channel.trigger_attack();
        assert_eq!(channel.phase(), AdsrPhase::Attack);
        assert_eq!(channel.amplitude(), 0);
    }

    #[test]
    fn zero_frequency_contributes_silence() {
        let mut channel = melody_channel();
        let mut rng = StdRng::seed_from_u64(1);

        channel.set_frequency(0);
        channel.trigger_attack();
        for _ in 0..1000 {
            assert_eq!(channel.advance(&mut rng), 0);
        }
        assert_ne!(channel.phase(), AdsrPhase::Off, "envelope still runs");
    }

    #[test]
    fn off_channel_contributes_silence() {
        let mut channel = melody_channel();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..1000 {
            assert_eq!(channel.advance(&mut rng), 0);
        }
    }

    #[test]
    fn noise_redraws_once_per_cycle() {
        let mut channel = AudioChannel::default();
        channel.waveforms = Waveform::NOISE;
        channel.sustain = 0xFFFF;
        channel.volume = 0xFFFF;
        // 2205 Hz wraps the phase accumulator roughly every ten frames.
        channel.set_frequency(2205);
        channel.trigger_sustain();

        let mut rng = StdRng::seed_from_u64(1);
        let samples: Vec<i32> = (0..9).map(|_| channel.advance(&mut rng)).collect();
        assert!(
            samples.windows(2).all(|pair| pair[0] == pair[1]),
            "noise must hold steady within a cycle: {samples:?}"
        );

        let longer: Vec<i32> = (0..50).map(|_| channel.advance(&mut rng)).collect();
        assert!(
            longer.iter().any(|sample| *sample != longer[0]),
            "noise must change across cycles"
        );
    }

    #[test]
    fn combined_waveforms_blend_with_equal_weight() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut sine = AudioChannel::default();
        let mut square = AudioChannel::default();
        let mut both = AudioChannel::default();
        for (channel, waveforms) in [
            (&mut sine, Waveform::SINE),
            (&mut square, Waveform::SQUARE),
            (&mut both, Waveform::SINE | Waveform::SQUARE),
        ] {
            channel.waveforms = waveforms;
            channel.sustain = 0xFFFF;
            channel.volume = 0xFFFF;
            channel.set_frequency(440);
            channel.trigger_sustain();
        }

        for _ in 0..500 {
            let a = sine.advance(&mut rng);
            let b = square.advance(&mut rng);
            let c = both.advance(&mut rng);
            let blended = (a + b) / 2;
            assert!(
                (c - blended).abs() <= 8,
                "expected equal-weight blend, got {c} vs {blended}"
            );
        }
    }

    #[test]
    fn wave_buffer_refills_at_the_start_of_each_pass() {
        fn bump(channel: &mut AudioChannel) {
            let buffer = channel.wave_buffer_mut();
            buffer[0] = buffer[0].wrapping_add(1);
        }

        let mut channel = AudioChannel::default();
        channel.waveforms = Waveform::WAVE;
        channel.sustain = 0xFFFF;
        channel.volume = 0xFFFF;
        channel.set_frequency(440);
        channel.set_wave_refill(bump);
        channel.trigger_sustain();

        let mut rng = StdRng::seed_from_u64(1);
        channel.advance(&mut rng);
        assert_eq!(channel.wave_buffer[0], 1, "refill must run before the first sample");

        for _ in 0..64 {
            channel.advance(&mut rng);
        }
        assert_eq!(channel.wave_buffer[0], 2, "refill must run once per pass");
    }
}
