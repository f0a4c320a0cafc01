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
use std::fmt;
use std::io::BufRead;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use tracing::debug;

use super::Switches;

/// A pedalboard driven from standard input, for running the pedal surface on
/// a desk without hardware. Each line replaces the held switch set: `a`, `b`
/// and `r` hold the corresponding switches, an empty line releases them all.
pub struct Pedalboard {
    inbound: Receiver<Switches>,
    current: Switches,
}

impl Pedalboard {
    pub fn get() -> Pedalboard {
        let (tx, rx) = unbounded::<Switches>();

        // Reading stdin blocks, so it happens on its own thread; only the
        // parsed switch set crosses back to the control loop.
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => return,
                };

                let mut switches = Switches::NONE;
                for c in line.chars() {
                    match c.to_ascii_lowercase() {
                        'a' => switches |= Switches::PLAY_A,
                        'b' => switches |= Switches::PLAY_B,
                        'r' => switches |= Switches::RESET,
                        _ => {}
                    }
                }
                if tx.send(switches).is_err() {
                    return;
                }
            }
        });

        Pedalboard {
            inbound: rx,
            current: Switches::NONE,
        }
    }
}

impl super::Pedalboard for Pedalboard {
    fn read(&mut self) -> Switches {
        while let Ok(switches) = self.inbound.try_recv() {
            self.current = switches;
        }
        self.current
    }

    fn set_led(&mut self, on: bool) {
        debug!(on, "Pedal status LED.");
    }
}

impl fmt::Display for Pedalboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stdin (keyboard pedalboard)")
    }
}
