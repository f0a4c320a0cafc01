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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tracing::{error, info, warn};

use crate::synth::{SharedEngine, SAMPLE_RATE};

/// An audio device backed by cpal. The output callback runs on cpal's audio
/// thread and locks the shared engine for the duration of each buffer fill;
/// this is the one place samples are pulled from outside the control loop's
/// thread.
pub struct Device {
    name: String,
    device: cpal::Device,
    stream: Option<cpal::Stream>,
}

/// Lists the output devices known to cpal.
pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
    let host = cpal::default_host();
    let mut names: Vec<String> = Vec::new();
    for device in host.output_devices()? {
        names.push(device.name()?);
    }
    Ok(names)
}

impl Device {
    /// Gets the output device with the given name, or the host default for
    /// "default".
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();

        let device = if name == "default" {
            host.default_output_device()
                .ok_or("no default audio output device")?
        } else {
            host.output_devices()?
                .find(|device| {
                    device
                        .name()
                        .is_ok_and(|device_name| device_name.contains(name))
                })
                .ok_or_else(|| format!("no audio output device matching '{}'", name))?
        };

        Ok(Device {
            name: device.name()?,
            device,
            stream: None,
        })
    }

    /// Picks an f32 output configuration at the engine sample rate, falling
    /// back to the device default when the rate isn't supported.
    fn pick_config(&self) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
        for config in self.device.supported_output_configs()? {
            if config.sample_format() == SampleFormat::F32
                && config.min_sample_rate() <= SAMPLE_RATE
                && SAMPLE_RATE <= config.max_sample_rate()
            {
                return Ok(config.with_sample_rate(SAMPLE_RATE));
            }
        }

        let config = self.device.default_output_config()?;
        warn!(
            device = self.name,
            rate = config.sample_rate(),
            "Device does not support {}Hz; playback pitch will be off.",
            SAMPLE_RATE
        );
        Ok(config)
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn run(&mut self, engine: SharedEngine) -> Result<(), Box<dyn Error>> {
        if self.stream.is_some() {
            return Err("audio device is already running".into());
        }

        let supported = self.pick_config()?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(format!(
                "unsupported sample format {:?}",
                supported.sample_format()
            )
            .into());
        }

        let channels = supported.channels() as usize;
        info!(
            device = self.name,
            rate = supported.sample_rate(),
            channels,
            "Starting audio output."
        );

        let stream = self.device.build_output_stream(
            &supported.config(),
            move |data: &mut [f32], _| {
                let mut engine = engine.lock();
                for frame in data.chunks_mut(channels) {
                    let sample = engine.next_frame() as f32 / 32_768.0;
                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }
            },
            |err| error!(err = err.to_string(), "Audio stream error."),
            None,
        )?;
        stream.play()?;
        self.stream = Some(stream);

        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&mut self) -> Result<&mut super::mock::Device, Box<dyn Error>> {
        Err("not a mock device".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cpal)", self.name)
    }
}
