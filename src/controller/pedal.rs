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
use std::time::Duration;

use crate::gpio::{Pedalboard, Switches};
use crate::midi::OutputQueue;
use crate::player::Player;

use super::report_failure;

/// How long a raw level must hold before a change is believed.
pub const DEBOUNCE: Duration = Duration::from_millis(30);

/// How long the reset switch must be held to rewind the song.
pub const HOLD_THRESHOLD: Duration = Duration::from_secs(2);

/// A debounced reading of the pedalboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedalReading {
    /// The switch combination in effect.
    pub value: Switches,
    /// Whether this reading is a confirmed state change.
    pub change_state: bool,
    /// The combination that was in effect before the change.
    pub change_value: Switches,
    /// Time elapsed between the previous confirmed change and this reading.
    /// On a release, this is how long the previous combination was held.
    pub dwell: Duration,
}

/// Suppresses contact bounce: a raw change within the debounce window of the
/// last confirmed change is reported as the previous stable value.
pub struct Debouncer {
    threshold: Duration,
    previous: Switches,
    last_change: Duration,
}

impl Debouncer {
    pub fn new(threshold: Duration) -> Debouncer {
        Debouncer {
            threshold,
            previous: Switches::NONE,
            last_change: Duration::ZERO,
        }
    }

    /// Folds a raw sample taken at `now` (monotonic, from any common epoch)
    /// into a debounced reading.
    pub fn sample(&mut self, raw: Switches, now: Duration) -> PedalReading {
        let dwell = now.saturating_sub(self.last_change);

        if raw != self.previous {
            if dwell < self.threshold {
                // A change this soon after the last one is a bounce; hold the
                // previous value.
                return PedalReading {
                    value: self.previous,
                    change_state: false,
                    change_value: self.previous,
                    dwell,
                };
            }

            let prior = self.previous;
            self.previous = raw;
            self.last_change = now;
            return PedalReading {
                value: raw,
                change_state: true,
                change_value: prior,
                dwell,
            };
        }

        PedalReading {
            value: raw,
            change_state: false,
            change_value: raw,
            dwell,
        }
    }
}

/// Drives playback from a three-switch foot pedalboard.
///
/// The two play switches alternate: whichever was not used for the last
/// advance is the "next" switch, so a performer can walk the song by rocking
/// between them, while re-pressing the same switch replays the current step.
/// Releasing everything fades playback out. Holding the reset switch for
/// [HOLD_THRESHOLD] and releasing rewinds the song.
pub struct Driver {
    board: Box<dyn Pedalboard>,
    debouncer: Debouncer,
    hold_threshold: Duration,
    /// The switch that advances the song next; NONE until the first press.
    next_switch: Switches,
}

impl Driver {
    pub fn new(board: Box<dyn Pedalboard>, debounce: Duration, hold_threshold: Duration) -> Driver {
        Driver {
            board,
            debouncer: Debouncer::new(debounce),
            hold_threshold,
            next_switch: Switches::NONE,
        }
    }

    /// Samples the pedalboard once and applies whatever changed.
    pub fn service(&mut self, now: Duration, player: &mut Player, out: &mut OutputQueue) {
        let raw = self.board.read();
        let reading = self.debouncer.sample(raw, now);
        self.board.set_led(!reading.value.is_empty());

        if !reading.change_state {
            return;
        }

        if reading.value == Switches::PLAY_A || reading.value == Switches::PLAY_B {
            // The first press after a reset claims "next" duty.
            if self.next_switch.is_empty() {
                self.next_switch = reading.value;
            }

            if reading.value == self.next_switch {
                if let Err(e) = player.advance(out) {
                    report_failure(player, &e);
                } else {
                    self.next_switch = if reading.value == Switches::PLAY_A {
                        Switches::PLAY_B
                    } else {
                        Switches::PLAY_A
                    };
                }
            } else {
                player.replay();
            }
        }

        if reading.value.is_empty() {
            player.stop_playback();

            // A long hold of the reset switch, detected on release.
            if reading.change_value.contains(Switches::RESET) && reading.dwell >= self.hold_threshold
            {
                if let Err(e) = player.reset_position(true, out) {
                    report_failure(player, &e);
                }
                player.reset_playback();
                self.next_switch = Switches::NONE;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::gpio::{mock, Switches};
    use crate::midi::OutputQueue;
    use crate::player::Player;
    use crate::synth::{AdsrPhase, Engine, SharedEngine};
    use crate::testutil::BankBuilder;

    use super::{Debouncer, Driver, DEBOUNCE, HOLD_THRESHOLD};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn bounces_are_suppressed_within_the_window() {
        let mut debouncer = Debouncer::new(DEBOUNCE);

        let reading = debouncer.sample(Switches::PLAY_A, ms(100));
        assert!(reading.change_state);
        assert_eq!(reading.value, Switches::PLAY_A);

        // The contact chatters 10ms later; the reading holds steady.
        let reading = debouncer.sample(Switches::NONE, ms(110));
        assert!(!reading.change_state);
        assert_eq!(reading.value, Switches::PLAY_A);

        // Past the window the release is believed, and the dwell reports how
        // long the press lasted.
        let reading = debouncer.sample(Switches::NONE, ms(400));
        assert!(reading.change_state);
        assert_eq!(reading.value, Switches::NONE);
        assert_eq!(reading.change_value, Switches::PLAY_A);
        assert_eq!(reading.dwell, ms(300));
    }

    #[test]
    fn steady_state_reports_no_change() {
        let mut debouncer = Debouncer::new(DEBOUNCE);

        debouncer.sample(Switches::PLAY_A, ms(100));
        let reading = debouncer.sample(Switches::PLAY_A, ms(500));
        assert!(!reading.change_state);
        assert_eq!(reading.value, Switches::PLAY_A);
    }

    struct Fixture {
        driver: Driver,
        board: mock::Pedalboard,
        player: Player,
        engine: SharedEngine,
        out: OutputQueue,
        now: Duration,
    }

    impl Fixture {
        fn new() -> Fixture {
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
            let engine: SharedEngine = Arc::new(Mutex::new(Engine::new()));
            let mut out = OutputQueue::new();
            let player = Player::new(bank, engine.clone(), &mut out).expect("player should load");

            let board = mock::Pedalboard::get("mock-pedal");
            let driver = Driver::new(Box::new(board.clone()), DEBOUNCE, HOLD_THRESHOLD);
            Fixture {
                driver,
                board,
                player,
                engine,
                out: OutputQueue::new(),
                now: Duration::ZERO,
            }
        }

        /// Scripts a switch state and services the driver `after` later.
        fn step(&mut self, switches: Switches, after: Duration) {
            self.now += after;
            self.board.press(switches);
            self.driver
                .service(self.now, &mut self.player, &mut self.out);
        }
    }

    #[test]
    fn alternating_play_switches_walk_the_song() {
        let mut fixture = Fixture::new();

        // The first press claims "next" duty and advances to step 1.
        fixture.step(Switches::PLAY_A, ms(100));
        assert_eq!(fixture.player.next_step_number(), 1);
        assert_eq!(fixture.player.cur_step().step_number(), 0);
        assert!(fixture.board.led());

        // Pressing the same switch again replays the step without advancing.
        fixture.step(Switches::NONE, ms(500));
        fixture.step(Switches::PLAY_A, ms(500));
        assert_eq!(fixture.player.next_step_number(), 1);
        assert_eq!(fixture.engine.lock().channel(0).phase(), AdsrPhase::Attack);

        // The other switch is "next" now.
        fixture.step(Switches::NONE, ms(500));
        fixture.step(Switches::PLAY_B, ms(500));
        assert_eq!(fixture.player.next_step_number(), 2);
        assert_eq!(fixture.player.cur_step().step_number(), 1);
    }

    #[test]
    fn releasing_the_pedals_fades_playback_out() {
        let mut fixture = Fixture::new();

        fixture.step(Switches::PLAY_A, ms(100));
        assert_eq!(fixture.engine.lock().channel(0).phase(), AdsrPhase::Attack);

        fixture.step(Switches::NONE, ms(500));
        assert_eq!(fixture.engine.lock().channel(0).phase(), AdsrPhase::Release);
        assert!(!fixture.board.led());
    }

    #[test]
    fn a_long_reset_hold_rewinds_the_song() {
        let mut fixture = Fixture::new();

        fixture.step(Switches::PLAY_A, ms(100));
        fixture.step(Switches::NONE, ms(500));
        assert_eq!(fixture.player.next_step_number(), 1);

        fixture.step(Switches::RESET, ms(500));
        fixture.step(Switches::NONE, ms(2000));

        assert_eq!(fixture.player.next_step_number(), 0);
        assert_eq!(fixture.engine.lock().channel(0).phase(), AdsrPhase::Off);

        // "Next" duty is up for grabs again: either switch advances.
        fixture.step(Switches::PLAY_B, ms(500));
        assert_eq!(fixture.player.next_step_number(), 1);
    }

    #[test]
    fn a_short_reset_tap_does_nothing_extra() {
        let mut fixture = Fixture::new();

        fixture.step(Switches::PLAY_A, ms(100));
        fixture.step(Switches::NONE, ms(500));
        assert_eq!(fixture.player.next_step_number(), 1);

        fixture.step(Switches::RESET, ms(500));
        fixture.step(Switches::NONE, ms(500));

        assert_eq!(fixture.player.next_step_number(), 1, "position must not reset");
    }
}
