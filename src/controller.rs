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
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::error::Error;
use crate::midi::{OutputQueue, Transport};
use crate::player::Player;
use crate::songs::SongBank;
use crate::synth::SharedEngine;

pub mod launchpad;
pub mod pedal;

/// How long the control loop sleeps between polling cycles.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The uniform response to a playback failure: report it and force immediate
/// silence, so nothing keeps sounding against inconsistent state. The next
/// pad press is the retry.
pub(crate) fn report_failure(player: &mut Player, err: &Error) {
    error!(err = err.to_string(), "Playback error, silencing.");
    player.reset_playback();
}

/// The single-threaded control loop. Each cycle drains a bounded batch of
/// the outbound MIDI queue, feeds the available inbound bytes through the
/// launchpad driver, and samples the pedalboard if one is attached. Audio is
/// pulled from the shared engine by the audio device's own pump; everything
/// else happens here, in order, with no interleaving.
pub struct Controller {
    transport: Box<dyn Transport>,
    queue: OutputQueue,
    player: Player,
    launchpad: launchpad::Driver,
    pedal: Option<pedal::Driver>,
    started: Instant,
}

impl Controller {
    /// Creates a new controller and loads song 0 through the player.
    pub fn new(
        transport: Box<dyn Transport>,
        bank: SongBank,
        engine: SharedEngine,
        pedal: Option<pedal::Driver>,
    ) -> Result<Controller, Error> {
        let mut queue = OutputQueue::new();
        let player = Player::new(bank, engine, &mut queue)?;

        Ok(Controller {
            transport,
            queue,
            player,
            launchpad: launchpad::Driver::new(),
            pedal,
            started: Instant::now(),
        })
    }

    /// Runs one polling cycle.
    pub fn tick(&mut self) {
        self.queue.flush(self.transport.as_mut());

        let bytes = self.transport.read_available();
        if !bytes.is_empty() {
            self.launchpad
                .handle_bytes(&bytes, &mut self.player, &mut self.queue);
        }

        if let Some(pedal) = self.pedal.as_mut() {
            pedal.service(self.started.elapsed(), &mut self.player, &mut self.queue);
        }
    }

    /// Runs the control loop until the process is terminated.
    pub fn run(&mut self) -> ! {
        info!(
            transport = self.transport.name(),
            songs = self.player.song_count(),
            "Controller started."
        );

        loop {
            self.tick();
            spin_sleep::sleep(POLL_INTERVAL);
        }
    }

    #[cfg(test)]
    pub fn player(&self) -> &Player {
        &self.player
    }

    #[cfg(test)]
    pub fn queue(&self) -> &OutputQueue {
        &self.queue
    }

    #[cfg(test)]
    pub fn transport_mut(&mut self) -> &mut Box<dyn Transport> {
        &mut self.transport
    }
}
