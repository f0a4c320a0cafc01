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
use std::collections::VecDeque;
use std::{error::Error, fmt};

use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;
use tracing::{error, warn};

pub mod midir;
pub mod mock;

/// How many outbound events are flushed per polling cycle. Control surfaces
/// are slow consumers; pushing more per cycle can saturate them.
pub const DRAIN_BATCH: usize = 3;

/// Outbound queue capacity, in events. The queue is expected to drain under
/// normal link conditions; overflow drops the newest event with a warning.
const QUEUE_CAPACITY: usize = 200;

/// A MIDI byte-stream transport. The underlying plumbing is expected to be
/// callback or interrupt driven; implementations invert that into this
/// poll-based shape so the control loop keeps its single-threaded ordering.
pub trait Transport: fmt::Display {
    /// Returns the name of the transport.
    fn name(&self) -> String;

    /// Whether the far end is attached and usable.
    fn is_connected(&self) -> bool;

    /// Returns all inbound bytes that have arrived since the last poll.
    fn read_available(&mut self) -> Vec<u8>;

    /// Writes the given bytes, returning how many were actually accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Box<dyn Error>>;

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut mock::Transport, Box<dyn Error>>;
}

/// Lists transports known to midir.
pub fn list_transports() -> Result<Vec<String>, Box<dyn Error>> {
    midir::list()
}

/// Gets a transport with the given name.
pub fn get_transport(name: &str) -> Result<Box<dyn Transport>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Box::new(mock::Transport::get(name)));
    }

    Ok(Box::new(midir::Transport::get(name)?))
}

/// The length in bytes of a channel-voice or system message, by status byte.
/// Getting this right for messages we never act on is what keeps the stream
/// from desynchronizing: miscounting one unrecognized event misframes every
/// event after it.
pub fn message_length(status: u8) -> usize {
    match status & 0xF0 {
        // Note off/on, polyphonic aftertouch, control change, pitch bend.
        0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => 3,
        // Program change, channel pressure.
        0xC0 | 0xD0 => 2,
        // System and realtime messages, and anything without a status bit.
        _ => 1,
    }
}

/// An iterator over the complete MIDI messages in a byte buffer. Stops ahead
/// of a message whose tail has not arrived; the unconsumed bytes stay
/// available through [Messages::remainder] so callers can carry them into the
/// next poll.
pub struct Messages<'a> {
    bytes: &'a [u8],
}

impl<'a> Messages<'a> {
    /// The bytes of a trailing incomplete message, if any.
    pub fn remainder(&self) -> &'a [u8] {
        self.bytes
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.bytes.is_empty() {
            return None;
        }

        let length = message_length(self.bytes[0]);
        if self.bytes.len() < length {
            return None;
        }

        let (message, rest) = self.bytes.split_at(length);
        self.bytes = rest;
        Some(message)
    }
}

/// Splits a buffer into complete MIDI messages.
pub fn split_messages(bytes: &[u8]) -> Messages<'_> {
    Messages { bytes }
}

/// One queued outbound event, at most three bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundEvent {
    length: u8,
    data: [u8; 3],
}

impl OutboundEvent {
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }
}

/// The bounded outbound MIDI queue. LED updates and surface commands are
/// staged here and flushed a small batch at a time by the control loop.
#[derive(Default)]
pub struct OutputQueue {
    events: VecDeque<OutboundEvent>,
}

impl OutputQueue {
    pub fn new() -> OutputQueue {
        OutputQueue {
            events: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundEvent> {
        self.events.iter()
    }

    /// Queues a live event. Events longer than three bytes and events past
    /// the queue capacity are dropped with a warning rather than blocking the
    /// control loop.
    pub fn push(&mut self, event: LiveEvent<'_>) {
        let mut bytes: Vec<u8> = Vec::with_capacity(4);
        if let Err(e) = event.write(&mut bytes) {
            warn!(err = format!("{e:?}"), "Could not serialize MIDI event.");
            return;
        }
        if bytes.len() > 3 {
            warn!(length = bytes.len(), "Dropping oversized MIDI event.");
            return;
        }
        if self.events.len() >= QUEUE_CAPACITY {
            warn!("Outbound MIDI queue is full, dropping event.");
            return;
        }

        let mut data = [0u8; 3];
        data[..bytes.len()].copy_from_slice(&bytes);
        self.events.push_back(OutboundEvent {
            length: bytes.len() as u8,
            data,
        });
    }

    /// Queues a note-on, the message shape control surfaces use for pad LED
    /// updates (key selects the pad, velocity selects the color).
    pub fn note_on(&mut self, key: u8, velocity: u8) {
        let (Some(channel), Some(key), Some(vel)) =
            (u4::try_from(0), u7::try_from(key), u7::try_from(velocity))
        else {
            warn!(key, velocity, "Dropping LED update outside the 7-bit range.");
            return;
        };

        self.push(LiveEvent::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        });
    }

    /// Queues the surface reset command (control change 0, value 0), which
    /// clears every pad LED at once instead of addressing them one by one.
    pub fn reset_surface(&mut self) {
        let (Some(channel), Some(zero)) = (u4::try_from(0), u7::try_from(0)) else {
            return;
        };

        self.push(LiveEvent::Midi {
            channel,
            message: MidiMessage::Controller {
                controller: zero,
                value: zero,
            },
        });
    }

    /// Flushes up to [DRAIN_BATCH] events through the transport. A shortfall
    /// from the transport is logged, not retried; events that were not part
    /// of this batch stay queued for the next cycle.
    pub fn flush(&mut self, transport: &mut dyn Transport) {
        if self.events.is_empty() || !transport.is_connected() {
            return;
        }

        let batch = self.events.len().min(DRAIN_BATCH);
        let mut bytes: Vec<u8> = Vec::with_capacity(batch * 3);
        for event in self.events.drain(..batch) {
            bytes.extend_from_slice(event.bytes());
        }

        match transport.write(&bytes) {
            Ok(written) if written < bytes.len() => {
                warn!(
                    dropped = bytes.len() - written,
                    "Transport accepted fewer bytes than requested."
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(err = e.to_string(), "Error writing to MIDI transport.");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{mock, split_messages, OutputQueue, DRAIN_BATCH, QUEUE_CAPACITY};

    #[test]
    fn splits_a_mixed_stream_without_desynchronizing() {
        // An aftertouch and a pitch bend we never act on, a program change,
        // a realtime tick, then the note-on we care about. A parser that
        // miscounts any of them would misread the note-on's data bytes.
        let bytes = [
            0xA5, 0x30, 0x40, // polyphonic aftertouch
            0xE0, 0x00, 0x40, // pitch bend
            0xC2, 0x07, // program change
            0xF8, // realtime clock
            0x90, 0x12, 0x7F, // note on
        ];

        let messages: Vec<&[u8]> = split_messages(&bytes).collect();
        assert_eq!(
            messages,
            vec![
                &[0xA5, 0x30, 0x40][..],
                &[0xE0, 0x00, 0x40][..],
                &[0xC2, 0x07][..],
                &[0xF8][..],
                &[0x90, 0x12, 0x7F][..],
            ]
        );
    }

    #[test]
    fn keeps_an_incomplete_tail_as_remainder() {
        let bytes = [0x90, 0x12, 0x7F, 0x90, 0x13];
        let mut messages = split_messages(&bytes);

        assert_eq!(messages.next(), Some(&[0x90, 0x12, 0x7F][..]));
        assert_eq!(messages.next(), None);
        assert_eq!(messages.remainder(), &[0x90, 0x13]);
    }

    #[test]
    fn note_on_events_serialize_to_three_bytes() {
        let mut queue = OutputQueue::new();
        queue.note_on(0x18, 0x3C);
        queue.reset_surface();

        let events: Vec<&[u8]> = queue.iter().map(|event| event.bytes()).collect();
        assert_eq!(events, vec![&[0x90, 0x18, 0x3C][..], &[0xB0, 0x00, 0x00][..]]);
    }

    #[test]
    fn flush_drains_a_bounded_batch() {
        let mut queue = OutputQueue::new();
        let mut transport = mock::Transport::get("mock-transport");
        for pad in 0..5 {
            queue.note_on(pad, 0x0F);
        }

        queue.flush(&mut transport);
        assert_eq!(queue.len(), 5 - DRAIN_BATCH);
        assert_eq!(transport.written().len(), 1);
        assert_eq!(transport.written()[0].len(), DRAIN_BATCH * 3);

        queue.flush(&mut transport);
        assert!(queue.is_empty());
    }

    #[test]
    fn flush_skips_a_disconnected_transport() {
        let mut queue = OutputQueue::new();
        let mut transport = mock::Transport::get("mock-transport");
        transport.set_connected(false);
        queue.note_on(0, 0x0F);

        queue.flush(&mut transport);
        assert_eq!(queue.len(), 1, "events must stay queued while disconnected");
        assert!(transport.written().is_empty());
    }

    #[test]
    fn shortfall_is_logged_not_fatal() {
        let mut queue = OutputQueue::new();
        let mut transport = mock::Transport::get("mock-transport");
        transport.set_accept_limit(4);
        for pad in 0..3 {
            queue.note_on(pad, 0x0F);
        }

        // The flush still completes and the queue still drains the batch.
        queue.flush(&mut transport);
        assert!(queue.is_empty());
        assert_eq!(transport.written()[0].len(), 4);
    }

    #[test]
    fn queue_overflow_drops_instead_of_growing() {
        let mut queue = OutputQueue::new();
        for pad in 0..=QUEUE_CAPACITY {
            queue.note_on((pad % 128) as u8, 0x0F);
        }
        assert_eq!(queue.len(), QUEUE_CAPACITY);
    }
}
