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

/// Typed error for song bank and playback failures so callers can distinguish
/// a plain out-of-range request from inconsistent song data without string
/// matching. Transport shortfalls are not represented here: they are logged
/// and the affected bytes stay queued for the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("song {song} is out of range (bank has {count} songs)")]
    SongOutOfRange { song: usize, count: usize },

    #[error("step {position} is out of range (song has {count} steps)")]
    StepOutOfRange { position: usize, count: usize },

    #[error("search start {start} is past the end of the song ({count} steps)")]
    StartPastEnd { start: usize, count: usize },

    #[error("no step in the song is assigned to pad {pad:#04x}")]
    PadNotFound { pad: u8 },

    /// The bank declared more data than it contains, or a sentinel note was
    /// reached before the declared step count. Either way the song data can't
    /// be trusted past this point.
    #[error("song data is inconsistent at word {index}")]
    CorruptSongData { index: usize },

    #[error("channel {channel} is out of range (synth has {count} channels)")]
    ChannelOutOfRange { channel: usize, count: usize },

    #[error("instrument {instrument} is out of range (table has {count} instruments)")]
    InstrumentOutOfRange { instrument: usize, count: usize },
}
