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

pub mod cpal;
pub mod mock;

/// An audio output. Starting it hands the device a shared engine to pull one
/// signed 16-bit frame at a time from, at the engine's sample rate.
pub trait Device: fmt::Display {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Starts pumping audio from the given engine. The device keeps pulling
    /// until it is dropped.
    fn run(&mut self, engine: SharedEngine) -> Result<(), Box<dyn Error>>;

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut mock::Device, Box<dyn Error>>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Box<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Box::new(mock::Device::get(name)));
    }

    Ok(Box::new(cpal::Device::get(name)?))
}
