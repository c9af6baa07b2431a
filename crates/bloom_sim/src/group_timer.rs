//! Anchor group timers
//!
//! Each anchor group stays alive for a random 15-25s after its last refresh.
//! A group that has never been observed this session has no timer at all,
//! so it can neither fade nor expire.

use crate::anchor::{AnchorRole, ANCHOR_COUNT};
use crate::palette::{Rgb, NEUTRAL_GRAY};
use bloom_core::time::Millis;
use rand::Rng;

/// Active countdown of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerRun {
    pub last_refresh: Millis,
    pub duration: Millis,
}

impl TimerRun {
    fn elapsed(&self, now: Millis) -> Millis {
        now - self.last_refresh
    }

    fn is_expired(&self, now: Millis) -> bool {
        self.elapsed(now) >= self.duration
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupTimer {
    run: Option<TimerRun>,
}

impl GroupTimer {
    pub fn is_started(&self) -> bool {
        self.run.is_some()
    }

    pub fn run(&self) -> Option<TimerRun> {
        self.run
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        self.run.is_some_and(|run| run.is_expired(now))
    }

    /// Start counting down if not yet started. Returns true if it started.
    pub fn start(&mut self, now: Millis, duration: Millis) -> bool {
        if self.run.is_some() {
            return false;
        }
        self.run = Some(TimerRun {
            last_refresh: now,
            duration,
        });
        true
    }

    /// Restart the countdown from `now`.
    ///
    /// An expired group stays expired until the session resets; returns
    /// false in that case and leaves the timer untouched.
    pub fn refresh(&mut self, now: Millis, duration: Millis) -> bool {
        if self.is_expired(now) {
            return false;
        }
        self.run = Some(TimerRun {
            last_refresh: now,
            duration,
        });
        true
    }

    /// Fraction of the countdown used, in [0, 1]. Zero when not started.
    pub fn fade_ratio(&self, now: Millis) -> f32 {
        match self.run {
            Some(run) if run.elapsed(now) > 0.0 => {
                (run.elapsed(now) / run.duration).clamp(0.0, 1.0) as f32
            }
            _ => 0.0,
        }
    }

    /// `base` blended toward neutral gray by the elapsed fraction.
    pub fn fade_color(&self, base: Rgb, now: Millis) -> Rgb {
        match self.run {
            None => base,
            Some(run) if run.is_expired(now) => NEUTRAL_GRAY,
            Some(_) => base.lerp(NEUTRAL_GRAY, self.fade_ratio(now)),
        }
    }

    pub fn reset(&mut self) {
        self.run = None;
    }
}

/// Timers for all five anchor groups of the current session.
#[derive(Debug, Clone)]
pub struct GroupTimers {
    timers: [GroupTimer; ANCHOR_COUNT],
    min_duration: Millis,
    max_duration: Millis,
}

impl GroupTimers {
    pub fn new(min_duration: Millis, max_duration: Millis) -> Self {
        Self {
            timers: Default::default(),
            min_duration,
            max_duration,
        }
    }

    fn draw_duration<R: Rng + ?Sized>(&self, rng: &mut R) -> Millis {
        if self.max_duration > self.min_duration {
            rng.gen_range(self.min_duration..self.max_duration)
        } else {
            self.min_duration
        }
    }

    pub fn get(&self, role: AnchorRole) -> &GroupTimer {
        &self.timers[role.index()]
    }

    /// The anchor was seen this tick; start its timer if it has none yet.
    pub fn observe<R: Rng + ?Sized>(&mut self, role: AnchorRole, now: Millis, rng: &mut R) -> bool {
        if self.timers[role.index()].is_started() {
            return false;
        }
        let duration = self.draw_duration(rng);
        self.timers[role.index()].start(now, duration)
    }

    /// A particle bonded to the group: restart its countdown with a fresh
    /// random duration.
    pub fn refresh<R: Rng + ?Sized>(&mut self, role: AnchorRole, now: Millis, rng: &mut R) -> bool {
        let duration = self.draw_duration(rng);
        self.timers[role.index()].refresh(now, duration)
    }

    pub fn is_expired(&self, role: AnchorRole, now: Millis) -> bool {
        self.get(role).is_expired(now)
    }

    /// True once every group has expired: the body is dead.
    pub fn all_expired(&self, now: Millis) -> bool {
        self.timers.iter().all(|t| t.is_expired(now))
    }

    pub fn fade_color(&self, role: AnchorRole, base: Rgb, now: Millis) -> Rgb {
        self.get(role).fade_color(base, now)
    }

    /// Back to "not started" for every group.
    pub fn reset(&mut self) {
        for timer in &mut self.timers {
            timer.reset();
        }
    }
}
