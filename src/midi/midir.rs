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
use std::{error::Error, fmt};

use crossbeam_channel::{unbounded, Receiver};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::warn;

/// A transport backed by midir. midir delivers inbound messages from its own
/// callback thread; the callback only forwards raw bytes into a channel which
/// [super::Transport::read_available] drains, so all interpretation happens
/// on the control loop's thread.
pub struct Transport {
    name: String,
    input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    inbound: Receiver<Vec<u8>>,
}

/// Lists the MIDI ports known to midir.
pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
    let mut names: Vec<String> = Vec::new();

    let input = MidiInput::new("padtrack input scan")?;
    for port in input.ports() {
        names.push(input.port_name(&port)?);
    }
    let output = MidiOutput::new("padtrack output scan")?;
    for port in output.ports() {
        let name = output.port_name(&port)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }

    Ok(names)
}

impl Transport {
    /// Connects to the ports whose names contain the given name. A missing
    /// input or output port is tolerated so a send-only or receive-only
    /// surface still works.
    pub fn get(name: &str) -> Result<Transport, Box<dyn Error>> {
        let (tx, rx) = unbounded::<Vec<u8>>();

        let input = MidiInput::new("padtrack input")?;
        let input_port = input
            .ports()
            .into_iter()
            .find(|port| matches_name(input.port_name(port).ok(), name));
        let input = match input_port {
            Some(port) => Some(input.connect(
                &port,
                "padtrack events",
                move |_, bytes, _| {
                    // Losing bytes here would desynchronize the stream, so
                    // the channel is unbounded; the control loop drains it
                    // every cycle.
                    let _ = tx.send(bytes.to_vec());
                },
                (),
            )?),
            None => {
                warn!(name, "No MIDI input port matched, not listening for events.");
                None
            }
        };

        let output = MidiOutput::new("padtrack output")?;
        let output_port = output
            .ports()
            .into_iter()
            .find(|port| matches_name(output.port_name(port).ok(), name));
        let output = match output_port {
            Some(port) => Some(output.connect(&port, "padtrack leds")?),
            None => {
                warn!(name, "No MIDI output port matched, LED updates will be dropped.");
                None
            }
        };

        if input.is_none() && output.is_none() {
            return Err(format!("no MIDI port matching '{}' was found", name).into());
        }

        Ok(Transport {
            name: name.to_string(),
            input,
            output,
            inbound: rx,
        })
    }
}

fn matches_name(port_name: Option<String>, name: &str) -> bool {
    port_name.is_some_and(|port_name| port_name.contains(name))
}

impl super::Transport for Transport {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_connected(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }

    fn read_available(&mut self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        while let Ok(mut chunk) = self.inbound.try_recv() {
            bytes.append(&mut chunk);
        }
        bytes
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Box<dyn Error>> {
        let output = match self.output.as_mut() {
            Some(output) => output,
            None => return Ok(0),
        };

        // midir wants one message per send, so reuse the framer.
        let mut accepted = 0;
        for message in super::split_messages(bytes) {
            output.send(message)?;
            accepted += message.len();
        }
        Ok(accepted)
    }

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut super::mock::Transport, Box<dyn Error>> {
        Err("not a mock transport".into())
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (midir)", self.name)
    }
}
