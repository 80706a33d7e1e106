//! Category rotation
//!
//! A repeating timer walks a circular list of categories. A second, 1 s
//! timer only feeds the on-screen countdown.

use serde::{Deserialize, Serialize};

use super::timer::{TimerId, Timers};
use crate::consts::COUNTDOWN_TICK_MS;
use crate::settings::RotatorConfig;

/// Emitted whenever the active category changes (and once on start)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySwitch {
    pub from: String,
    pub to: String,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Switch,
    Countdown,
}

#[derive(Debug, Clone)]
pub struct CategoryRotator {
    config: RotatorConfig,
    index: usize,
    remaining_ms: i64,
    timers: Timers<Tick>,
    switch_timer: Option<TimerId>,
    countdown_timer: Option<TimerId>,
}

impl CategoryRotator {
    pub fn new(mut config: RotatorConfig) -> Self {
        if config.categories.is_empty() {
            config.categories = RotatorConfig::default().categories;
        }
        let remaining_ms = i64::from(config.switch_interval_ms);
        Self {
            config,
            index: 0,
            remaining_ms,
            timers: Timers::new(),
            switch_timer: None,
            countdown_timer: None,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.config.categories
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &str {
        &self.config.categories[self.index]
    }

    pub fn is_running(&self) -> bool {
        self.switch_timer.is_some()
    }

    /// Start (or restart) both timers and announce the current category
    pub fn start(&mut self) -> CategorySwitch {
        self.restart_timers();
        let len = self.config.categories.len();
        let from = self.config.categories[(self.index + len - 1) % len].clone();
        log::info!("Category rotation started at `{}`", self.current());
        CategorySwitch {
            from,
            to: self.current().to_string(),
            index: self.index,
        }
    }

    pub fn stop(&mut self) {
        for id in [self.switch_timer.take(), self.countdown_timer.take()]
            .into_iter()
            .flatten()
        {
            self.timers.cancel(id);
        }
    }

    /// Switch now (e.g. the countdown was tapped). The countdown and the
    /// switch cycle restart from a full interval.
    pub fn force_switch(&mut self) -> CategorySwitch {
        if self.is_running() {
            self.restart_timers();
        }
        self.perform_switch()
    }

    /// Advance both timers; returns the switches that happened
    pub fn advance(&mut self, dt_ms: f64) -> Vec<CategorySwitch> {
        let mut switches = Vec::new();
        for tick in self.timers.advance(dt_ms) {
            match tick {
                Tick::Switch => switches.push(self.perform_switch()),
                Tick::Countdown => self.sync_countdown(),
            }
        }
        switches
    }

    pub fn remaining_ms(&self) -> i64 {
        self.remaining_ms
    }

    /// Whole seconds left, rounded up, for display
    pub fn remaining_secs(&self) -> u32 {
        ((self.remaining_ms.max(0) + 999) / 1000) as u32
    }

    /// Countdown is close enough to a switch to be highlighted
    pub fn in_warning(&self) -> bool {
        self.remaining_ms <= i64::from(self.config.warning_ms)
    }

    fn restart_timers(&mut self) {
        self.stop();
        self.switch_timer = Some(self.timers.repeat(self.config.switch_interval_ms, Tick::Switch));
        self.countdown_timer = Some(self.timers.repeat(COUNTDOWN_TICK_MS, Tick::Countdown));
        self.remaining_ms = i64::from(self.config.switch_interval_ms);
    }

    /// Read the countdown off the switch timer, so a tick that lands on the
    /// same instant as a switch shows the new cycle
    fn sync_countdown(&mut self) {
        if let Some(due) = self.switch_timer.and_then(|id| self.timers.due_in(id)) {
            self.remaining_ms = due.ceil() as i64;
        }
    }

    fn perform_switch(&mut self) -> CategorySwitch {
        let from = self.current().to_string();
        self.index = (self.index + 1) % self.config.categories.len();
        self.remaining_ms = i64::from(self.config.switch_interval_ms);
        let to = self.current().to_string();
        log::info!("Switching category from {from} to {to}");
        CategorySwitch {
            from,
            to,
            index: self.index,
        }
    }
}
