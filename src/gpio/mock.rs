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
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::Switches;

/// A mock pedalboard. Clones share state, so a test can keep one handle and
/// hand the other to the pedal driver.
#[derive(Clone)]
pub struct Pedalboard {
    name: String,
    state: Rc<RefCell<State>>,
}

struct State {
    pressed: Switches,
    led: bool,
}

impl Pedalboard {
    /// Gets the given mock pedalboard.
    pub fn get(name: &str) -> Pedalboard {
        Pedalboard {
            name: name.to_string(),
            state: Rc::new(RefCell::new(State {
                pressed: Switches::NONE,
                led: false,
            })),
        }
    }

    /// Scripts the raw switch state.
    pub fn press(&self, switches: Switches) {
        self.state.borrow_mut().pressed = switches;
    }

    /// The current status LED state.
    pub fn led(&self) -> bool {
        self.state.borrow().led
    }
}

impl super::Pedalboard for Pedalboard {
    fn read(&mut self) -> Switches {
        self.state.borrow().pressed
    }

    fn set_led(&mut self, on: bool) {
        self.state.borrow_mut().led = on;
    }
}

impl fmt::Display for Pedalboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
