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
use tracing::{debug, info};

use crate::error::Error;
use crate::midi::OutputQueue;
use crate::songs::{SongBank, SongStep};
use crate::synth::SharedEngine;

/// The function pad that toggles load mode while held.
pub const LOAD_PAD: u8 = 0x08;

/// The function pad that resets the song position to the start.
pub const RESET_POSITION_PAD: u8 = 0x18;

/// The color used to highlight the next step and the function pads.
pub const HIGHLIGHT_COLOR: u8 = 0x3C;

/// Clears every pad LED through the surface reset command and relights the
/// two function pads.
pub(crate) fn reset_leds(out: &mut OutputQueue) {
    out.reset_surface();
    out.note_on(LOAD_PAD, HIGHLIGHT_COLOR);
    out.note_on(RESET_POSITION_PAD, HIGHLIGHT_COLOR);
}

/// Plays a song bank through the synthesizer, one step per pad press.
///
/// The player tracks two cursor positions: `cur_step`, the step currently
/// sounding, and `next_step`, the step that the highlighted pad will advance
/// to. Pressing the highlighted pad moves the cursor; pressing any other
/// assigned pad plays that step without moving it.
pub struct Player {
    bank: SongBank,
    engine: SharedEngine,
    song_num: usize,
    cur_step: SongStep,
    next_step: SongStep,
    next_step_number: usize,
}

impl Player {
    /// Creates a new player and loads song 0, emitting the initial LED state
    /// into the given queue.
    pub fn new(bank: SongBank, engine: SharedEngine, out: &mut OutputQueue) -> Result<Player, Error> {
        let first = bank.get_step(0, 0)?;
        let mut player = Player {
            bank,
            engine,
            song_num: 0,
            cur_step: first.clone(),
            next_step: first,
            next_step_number: 0,
        };
        player.load_song(0, out)?;
        Ok(player)
    }

    pub fn song_num(&self) -> usize {
        self.song_num
    }

    pub fn song_count(&self) -> usize {
        self.bank.song_count()
    }

    pub fn cur_step(&self) -> &SongStep {
        &self.cur_step
    }

    pub fn next_step(&self) -> &SongStep {
        &self.next_step
    }

    pub fn next_step_number(&self) -> usize {
        self.next_step_number
    }

    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    /// Loads the given song: silences everything, assigns the song's
    /// instruments to the channels, lights every step's pad in its normal
    /// color and moves the cursor to step 0.
    pub fn load_song(&mut self, num: usize, out: &mut OutputQueue) -> Result<(), Error> {
        let (channel_count, step_count) = self.bank.dimensions(num)?;

        self.reset_playback();
        reset_leds(out);

        let ids = self.bank.instrument_ids(num)?;
        {
            let mut engine = self.engine.lock();
            for (channel, id) in ids.iter().enumerate() {
                engine.load_instrument(*id as usize, channel)?;
            }
        }

        for position in 0..step_count {
            let step = self.bank.get_step(num, position)?;
            out.note_on(step.pad_number(), step.pad_color());
        }

        self.song_num = num;
        self.reset_position(false, out)?;

        info!(
            song = num,
            steps = step_count,
            channels = channel_count,
            "Loaded song."
        );
        Ok(())
    }

    /// Moves the cursor back to step 0 and highlights its pad. When
    /// `mark_previous_next_normal` is set, the previously highlighted pad is
    /// first restored to its normal color.
    pub fn reset_position(
        &mut self,
        mark_previous_next_normal: bool,
        out: &mut OutputQueue,
    ) -> Result<(), Error> {
        if mark_previous_next_normal {
            out.note_on(self.next_step.pad_number(), self.next_step.pad_color());
        }

        self.next_step_number = 0;
        self.next_step = self.bank.get_step(self.song_num, 0)?;
        self.cur_step = self.next_step.clone();
        out.note_on(self.next_step.pad_number(), HIGHLIGHT_COLOR);
        Ok(())
    }

    /// Handles a pad press: resolves the pad to a step (searching from the
    /// expected next position) and plays it. If it was the highlighted next
    /// step, the cursor advances, wrapping past the last step, and the LEDs
    /// move with it. On failure the player's state is left unchanged; the
    /// caller is expected to silence playback.
    pub fn press_pad(&mut self, pad: u8, out: &mut OutputQueue) -> Result<(), Error> {
        let mut step = self
            .bank
            .get_step_by_pad(self.song_num, self.next_step_number, pad)?;

        if step.pad_number() == self.next_step.pad_number() {
            step = self.next_step.clone();
            out.note_on(step.pad_number(), step.pad_color());

            self.next_step_number = (self.next_step_number + 1) % step.step_count();
            self.next_step = self.bank.get_step(self.song_num, self.next_step_number)?;
            out.note_on(self.next_step.pad_number(), HIGHLIGHT_COLOR);
        }

        // Triggering a channel that is already sounding restarts its
        // envelope, so the previous sound stops on its own.
        self.cur_step = step;
        self.play_current();
        Ok(())
    }

    /// Advances as if the highlighted next pad had been pressed. Used by the
    /// pedal surface, which has no pads to address steps with.
    pub fn advance(&mut self, out: &mut OutputQueue) -> Result<(), Error> {
        self.press_pad(self.next_step.pad_number(), out)
    }

    /// Replays the current step without moving the cursor.
    pub fn replay(&mut self) {
        self.play_current();
    }

    /// Handles a pad release: if the released pad is the one currently
    /// sounding, playback fades out.
    pub fn release_pad(&mut self, pad: u8) {
        if pad == self.cur_step.pad_number() {
            self.stop_playback();
        }
    }

    /// Selects the song the next load will pick up. An out-of-range index is
    /// ignored.
    pub fn select_song(&mut self, num: usize) {
        if num < self.bank.song_count() {
            debug!(song = num, "Selected song.");
            self.song_num = num;
        }
    }

    /// Fades out every sounding channel.
    pub fn stop_playback(&mut self) {
        self.engine.lock().stop_all();
    }

    /// Silences every channel immediately.
    pub fn reset_playback(&mut self) {
        self.engine.lock().reset_all();
    }

    fn play_current(&mut self) {
        let mut engine = self.engine.lock();
        for (channel, note) in self.cur_step.notes().iter().enumerate() {
            let voice = engine.channel_mut(channel);
            voice.set_frequency(*note);
            voice.trigger_attack();
        }
    }
}
