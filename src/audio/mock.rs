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

use crate::synth::SharedEngine;

/// A mock audio device. Doesn't pump anything on its own; tests pull frames
/// explicitly.
pub struct Device {
    name: String,
    engine: Option<SharedEngine>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            engine: None,
        }
    }

    /// Pulls the given number of frames from the engine, as the platform's
    /// buffer-fill routine would.
    pub fn pull(&self, frames: usize) -> Vec<i16> {
        match self.engine.as_ref() {
            Some(engine) => {
                let mut engine = engine.lock();
                (0..frames).map(|_| engine.next_frame()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Whether the engine has any audible channel.
    pub fn is_playing(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.lock().is_playing())
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn run(&mut self, engine: SharedEngine) -> Result<(), Box<dyn Error>> {
        self.engine = Some(engine);
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut Device, Box<dyn Error>> {
        Ok(self)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
