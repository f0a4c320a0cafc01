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
use tracing::trace;

use crate::midi::{split_messages, OutputQueue};
use crate::player::{self, Player, HIGHLIGHT_COLOR, LOAD_PAD, RESET_POSITION_PAD};

use super::report_failure;

/// Interprets the pad surface's MIDI stream.
///
/// The surface reports pad presses as note-on messages and pad releases as
/// note-on with velocity zero. Everything else in the stream is skipped by
/// length so an uninteresting event can never shift the framing of the next
/// one.
pub struct Driver {
    /// Whether pad presses are currently song selections instead of steps.
    load_mode: bool,
    /// Tail bytes of a message whose remainder has not arrived yet.
    pending: Vec<u8>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            load_mode: false,
            pending: Vec::new(),
        }
    }

    /// Feeds one poll's worth of inbound bytes through the driver. A message
    /// split across polls is carried over and finished on the next call.
    pub fn handle_bytes(&mut self, bytes: &[u8], player: &mut Player, out: &mut OutputQueue) {
        let buffered;
        let data: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut carried = std::mem::take(&mut self.pending);
            carried.extend_from_slice(bytes);
            buffered = carried;
            &buffered
        };

        let mut messages = split_messages(data);
        for message in &mut messages {
            self.handle_message(message, player, out);
        }
        self.pending = messages.remainder().to_vec();
    }

    fn handle_message(&mut self, message: &[u8], player: &mut Player, out: &mut OutputQueue) {
        // Only note-on matters here; any channel is accepted.
        if message.len() < 3 || message[0] & 0xF0 != 0x90 {
            trace!(message = format!("{message:02X?}"), "Skipping MIDI event.");
            return;
        }
        let (pad, velocity) = (message[1], message[2]);

        // Velocity zero is how the surface reports a release.
        if velocity == 0 {
            player.release_pad(pad);
            if pad == LOAD_PAD {
                self.leave_load_mode(player, out);
            }
            return;
        }

        if pad == RESET_POSITION_PAD {
            if let Err(e) = player.reset_position(true, out) {
                report_failure(player, &e);
            }
            player.reset_playback();
            return;
        }

        if pad == LOAD_PAD {
            self.enter_load_mode(player, out);
            return;
        }

        if self.load_mode {
            self.select_song(pad, player);
            return;
        }

        if let Err(e) = player.press_pad(pad, out) {
            report_failure(player, &e);
        }
    }

    /// Entering load mode clears the surface and lights one pad per
    /// available song, eight songs to a row.
    fn enter_load_mode(&mut self, player: &mut Player, out: &mut OutputQueue) {
        player.reset_playback();
        player::reset_leds(out);
        for song in 0..player.song_count() {
            let pad = ((song / 8) * 0x10 + song % 8) as u8;
            out.note_on(pad, HIGHLIGHT_COLOR);
        }
        self.load_mode = true;
    }

    /// Releasing the load pad leaves load mode and loads whichever song was
    /// selected while it was held.
    fn leave_load_mode(&mut self, player: &mut Player, out: &mut OutputQueue) {
        self.load_mode = false;
        if let Err(e) = player.load_song(player.song_num(), out) {
            report_failure(player, &e);
        }
    }

    /// Maps a pad back to a song index, the inverse of the load-mode LED
    /// layout: the low nibble is the column, the high nibble the row.
    fn select_song(&mut self, pad: u8, player: &mut Player) {
        let column = (pad & 0x0F) as usize;
        let row = ((pad >> 4) & 0x0F) as usize;
        if column < 8 && row < 8 {
            player.select_song(row * 8 + column);
        }
    }
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}
