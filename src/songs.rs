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
use crate::error::Error;
use crate::synth::CHANNEL_COUNT;

mod bank;

/// A note value that never appears as a legitimate frequency. Reaching one
/// before the declared step count means the song data is inconsistent.
pub const SENTINEL_NOTE: u16 = 0xFFFF;

/// A read-only bank of step-sequenced songs over a flat word sequence.
///
/// Layout of the word sequence:
///
/// ```text
/// | 0            | number of songs
/// | 1..=n        | word offset of each song record
/// | offset       | start of a song record:
/// |              |   channel count, step count,
/// |              |   one instrument id per channel,
/// |              |   then per step: one frequency (Hz) per channel,
/// |              |   pad number, pad color
/// ```
///
/// Every read is bounds checked against the sequence rather than trusting the
/// declared counts, and a [SENTINEL_NOTE] inside a step fails the lookup.
pub struct SongBank {
    data: Vec<u16>,
}

/// One position of a song, projected out of the bank on demand: the note for
/// every channel plus the control-surface pad the step is assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongStep {
    step_number: usize,
    step_count: usize,
    channel_count: usize,
    notes: [u16; CHANNEL_COUNT],
    pad_number: u8,
    pad_color: u8,
}

impl SongStep {
    /// The position of this step within its song.
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    /// The total number of steps in the song this step belongs to.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// The note frequencies for this step, one per channel, in Hz. A zero
    /// frequency silences the channel.
    pub fn notes(&self) -> &[u16] {
        &self.notes[..self.channel_count]
    }

    /// The control-surface pad this step is assigned to.
    pub fn pad_number(&self) -> u8 {
        self.pad_number
    }

    /// The pad's normal display color.
    pub fn pad_color(&self) -> u8 {
        self.pad_color
    }
}

impl SongBank {
    /// Creates a song bank over the given word sequence.
    pub fn new(data: Vec<u16>) -> SongBank {
        SongBank { data }
    }

    /// The bank of songs compiled into the binary.
    pub fn builtin() -> SongBank {
        SongBank::new(bank::SONG_DATA.to_vec())
    }

    /// The number of songs in the bank.
    pub fn song_count(&self) -> usize {
        self.data.first().map(|count| *count as usize).unwrap_or(0)
    }

    fn word(&self, index: usize) -> Result<u16, Error> {
        self.data
            .get(index)
            .copied()
            .ok_or(Error::CorruptSongData { index })
    }

    /// Decodes a song's header, returning the offset of its instrument ids
    /// together with its channel and step counts.
    fn header(&self, song: usize) -> Result<(usize, usize, usize), Error> {
        let count = self.song_count();
        if song >= count {
            return Err(Error::SongOutOfRange { song, count });
        }

        let pointer = self.word(1 + song)? as usize;
        let channel_count = self.word(pointer)? as usize;
        let step_count = self.word(pointer + 1)? as usize;
        if channel_count > CHANNEL_COUNT {
            return Err(Error::CorruptSongData { index: pointer });
        }

        Ok((pointer + 2, channel_count, step_count))
    }

    /// The channel and step counts of the given song.
    pub fn dimensions(&self, song: usize) -> Result<(usize, usize), Error> {
        let (_, channel_count, step_count) = self.header(song)?;
        Ok((channel_count, step_count))
    }

    /// The instrument ids of the given song, one per channel.
    pub fn instrument_ids(&self, song: usize) -> Result<Vec<u16>, Error> {
        let (pointer, channel_count, _) = self.header(song)?;
        (pointer..pointer + channel_count)
            .map(|index| self.word(index))
            .collect()
    }

    /// Decodes step `position` of the given song.
    pub fn get_step(&self, song: usize, position: usize) -> Result<SongStep, Error> {
        let (instruments, channel_count, step_count) = self.header(song)?;
        if position >= step_count {
            return Err(Error::StepOutOfRange {
                position,
                count: step_count,
            });
        }

        // Each step record is one note per channel plus pad number and color.
        let mut pointer = instruments + channel_count + position * (channel_count + 2);

        let mut notes = [0u16; CHANNEL_COUNT];
        for note in notes.iter_mut().take(channel_count) {
            let word = self.word(pointer)?;
            if word == SENTINEL_NOTE {
                return Err(Error::CorruptSongData { index: pointer });
            }
            *note = word;
            pointer += 1;
        }

        let pad_number = pad_byte(self.word(pointer)?, pointer)?;
        let pad_color = pad_byte(self.word(pointer + 1)?, pointer + 1)?;

        Ok(SongStep {
            step_number: position,
            step_count,
            channel_count,
            notes,
            pad_number,
            pad_color,
        })
    }

    /// Finds the first step assigned to the given pad, searching in ring
    /// order from `start_from`. A pad can legitimately repeat at several song
    /// positions (a chorus reusing a verse), so searching from the expected
    /// next position first yields the step nearest to the playback cursor.
    pub fn get_step_by_pad(
        &self,
        song: usize,
        start_from: usize,
        pad: u8,
    ) -> Result<SongStep, Error> {
        let step_count = self.get_step(song, 0)?.step_count;
        if start_from > step_count {
            return Err(Error::StartPastEnd {
                start: start_from,
                count: step_count,
            });
        }

        for position in (start_from..step_count).chain(0..start_from) {
            let step = self.get_step(song, position)?;
            if step.pad_number == pad {
                return Ok(step);
            }
        }

        Err(Error::PadNotFound { pad })
    }
}

fn pad_byte(word: u16, index: usize) -> Result<u8, Error> {
    u8::try_from(word).map_err(|_| Error::CorruptSongData { index })
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::testutil::BankBuilder;

    use super::{SongBank, SENTINEL_NOTE};

    #[test]
    fn builtin_bank_is_consistent() {
        let bank = SongBank::builtin();
        assert!(bank.song_count() > 0, "builtin bank should have songs");

        for song in 0..bank.song_count() {
            let (channels, steps) = bank.dimensions(song).expect("header should decode");
            assert_eq!(
                bank.instrument_ids(song).expect("ids should decode").len(),
                channels
            );
            for position in 0..steps {
                let step = bank.get_step(song, position).expect("step should decode");
                assert_eq!(step.step_number(), position);
                assert_eq!(step.step_count(), steps);
                assert_eq!(step.notes().len(), channels);
            }
        }
    }

    #[test]
    fn get_step_returns_encoded_notes() {
        let bank = BankBuilder::new()
            .song(
                &[0, 4],
                &[
                    (&[220, 110], 0x00, 0x0F),
                    (&[262, 131], 0x01, 0x0F),
                    (&[294, 147], 0x02, 0x0F),
                ],
            )
            .build();

        let step = bank.get_step(0, 1).expect("step should decode");
        assert_eq!(step.notes(), &[262, 131]);
        assert_eq!(step.pad_number(), 0x01);
        assert_eq!(step.pad_color(), 0x0F);
        assert_eq!(step.step_count(), 3);
    }

    #[test]
    fn get_step_rejects_out_of_range_requests() {
        let bank = BankBuilder::new()
            .song(&[0], &[(&[220], 0x00, 0x0F)])
            .build();

        assert!(matches!(
            bank.get_step(1, 0),
            Err(Error::SongOutOfRange { song: 1, count: 1 })
        ));
        assert!(matches!(
            bank.get_step(0, 1),
            Err(Error::StepOutOfRange {
                position: 1,
                count: 1
            })
        ));
    }

    #[test]
    fn sentinel_note_fails_the_lookup() {
        let mut words = BankBuilder::new()
            .song(
                &[0, 4],
                &[(&[220, 110], 0x00, 0x0F), (&[262, 131], 0x01, 0x0F)],
            )
            .build_words();

        // Overwrite the second note of step 1 with the sentinel.
        let position = words.len() - 3;
        words[position] = SENTINEL_NOTE;
        let bank = SongBank::new(words);

        assert!(bank.get_step(0, 0).is_ok());
        assert!(matches!(
            bank.get_step(0, 1),
            Err(Error::CorruptSongData { .. })
        ));
    }

    #[test]
    fn truncated_data_fails_rather_than_panics() {
        let mut words = BankBuilder::new()
            .song(&[0], &[(&[220], 0x00, 0x0F), (&[262], 0x01, 0x0F)])
            .build_words();
        words.truncate(words.len() - 3);
        let bank = SongBank::new(words);

        assert!(bank.get_step(0, 0).is_ok());
        assert!(matches!(
            bank.get_step(0, 1),
            Err(Error::CorruptSongData { .. })
        ));
    }

    #[test]
    fn ring_search_finds_a_unique_pad_from_any_start() {
        let bank = BankBuilder::new()
            .song(
                &[0],
                &[
                    (&[220], 0x10, 0x0F),
                    (&[262], 0x11, 0x0F),
                    (&[294], 0x12, 0x0F),
                    (&[330], 0x13, 0x0F),
                ],
            )
            .build();

        for start_from in 0..=4 {
            let step = bank
                .get_step_by_pad(0, start_from, 0x12)
                .expect("unique pad should always be found");
            assert_eq!(step.step_number(), 2, "start_from {start_from}");
        }
    }

    #[test]
    fn ring_search_prefers_the_position_nearest_the_cursor() {
        // The same pad at positions 0 and 2, as in a verse reused by a chorus.
        let bank = BankBuilder::new()
            .song(
                &[0],
                &[
                    (&[220], 0x10, 0x0F),
                    (&[262], 0x11, 0x0F),
                    (&[220], 0x10, 0x0F),
                    (&[330], 0x13, 0x0F),
                ],
            )
            .build();

        assert_eq!(bank.get_step_by_pad(0, 0, 0x10).unwrap().step_number(), 0);
        assert_eq!(bank.get_step_by_pad(0, 1, 0x10).unwrap().step_number(), 2);
        assert_eq!(bank.get_step_by_pad(0, 3, 0x10).unwrap().step_number(), 0);
    }

    #[test]
    fn ring_search_reports_missing_pads_and_bad_starts() {
        let bank = BankBuilder::new()
            .song(&[0], &[(&[220], 0x10, 0x0F), (&[262], 0x11, 0x0F)])
            .build();

        assert!(matches!(
            bank.get_step_by_pad(0, 0, 0x42),
            Err(Error::PadNotFound { pad: 0x42 })
        ));
        assert!(matches!(
            bank.get_step_by_pad(0, 3, 0x10),
            Err(Error::StartPastEnd { start: 3, count: 2 })
        ));
    }

    #[test]
    fn ring_search_propagates_corruption() {
        let mut words = BankBuilder::new()
            .song(&[0], &[(&[220], 0x10, 0x0F), (&[262], 0x11, 0x0F)])
            .build_words();
        let position = words.len() - 3;
        words[position] = SENTINEL_NOTE;
        let bank = SongBank::new(words);

        // Searching for a pad that sits past the corrupt step fails rather
        // than returning partial data.
        assert!(matches!(
            bank.get_step_by_pad(0, 0, 0x11),
            Err(Error::CorruptSongData { .. })
        ));
    }
}
