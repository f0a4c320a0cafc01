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
use crate::songs::SongBank;

/// Builds song bank word sequences for tests, the same shape the offline
/// song compiler produces.
pub struct BankBuilder {
    songs: Vec<Song>,
}

struct Song {
    instruments: Vec<u16>,
    steps: Vec<(Vec<u16>, u8, u8)>,
}

impl BankBuilder {
    pub fn new() -> BankBuilder {
        BankBuilder { songs: Vec::new() }
    }

    /// Adds a song with the given per-channel instrument ids and steps, each
    /// step being (notes, pad number, pad color).
    pub fn song(mut self, instruments: &[u16], steps: &[(&[u16], u8, u8)]) -> BankBuilder {
        self.songs.push(Song {
            instruments: instruments.to_vec(),
            steps: steps
                .iter()
                .map(|(notes, pad, color)| (notes.to_vec(), *pad, *color))
                .collect(),
        });
        self
    }

    pub fn build(self) -> SongBank {
        SongBank::new(self.build_words())
    }

    /// The raw word sequence, for tests that corrupt or truncate it.
    pub fn build_words(self) -> Vec<u16> {
        let mut words = vec![self.songs.len() as u16];
        words.resize(1 + self.songs.len(), 0);

        for (index, song) in self.songs.iter().enumerate() {
            words[1 + index] = words.len() as u16;
            words.push(song.instruments.len() as u16);
            words.push(song.steps.len() as u16);
            words.extend_from_slice(&song.instruments);
            for (notes, pad, color) in song.steps.iter() {
                assert_eq!(
                    notes.len(),
                    song.instruments.len(),
                    "a step must carry one note per channel"
                );
                words.extend_from_slice(notes);
                words.push(*pad as u16);
                words.push(*color as u16);
            }
        }

        words
    }
}
