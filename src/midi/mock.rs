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

/// A mock transport. Inbound bytes are scripted, outbound writes are
/// captured.
pub struct Transport {
    name: String,
    connected: bool,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    accept_limit: Option<usize>,
}

impl Transport {
    /// Gets the given mock transport.
    pub fn get(name: &str) -> Transport {
        Transport {
            name: name.to_string(),
            connected: true,
            inbound: VecDeque::new(),
            written: Vec::new(),
            accept_limit: None,
        }
    }

    /// Scripts a chunk of inbound bytes for the next poll.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.inbound.push_back(bytes.to_vec());
    }

    /// The buffers written so far, one entry per write call.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Caps how many bytes a single write accepts, to exercise shortfall
    /// handling.
    pub fn set_accept_limit(&mut self, limit: usize) {
        self.accept_limit = Some(limit);
    }
}

impl super::Transport for Transport {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_available(&mut self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(mut chunk) = self.inbound.pop_front() {
            bytes.append(&mut chunk);
        }
        bytes
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Box<dyn Error>> {
        let accepted = match self.accept_limit {
            Some(limit) => bytes.len().min(limit),
            None => bytes.len(),
        };
        self.written.push(bytes[..accepted].to_vec());
        Ok(accepted)
    }

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut Transport, Box<dyn Error>> {
        Ok(self)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
