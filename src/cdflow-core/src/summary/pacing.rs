//! Request pacing for summary calls.
//!
//! Three states: idle, one request in flight, or cooling down after the
//! collaborator reported a quota or availability problem. Time comes from an
//! injected [`Clock`] so the transitions can be driven without waiting.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::SummaryConfig;
use crate::error::{CooldownReason, ProviderError, SummaryError};

/// Source of "now" for the pacer.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pacing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Minimum spacing between the starts of two calls.
    pub min_interval: Duration,
    pub rate_limit_cooldown: Duration,
    pub unavailable_cooldown: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::from(&SummaryConfig::default())
    }
}

impl From<&SummaryConfig> for PacingConfig {
    fn from(config: &SummaryConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            rate_limit_cooldown: config.rate_limit_cooldown(),
            unavailable_cooldown: config.unavailable_cooldown(),
        }
    }
}

/// Where the pacer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    Idle,
    InFlight { ticket: u64 },
    CoolingDown { reason: CooldownReason, until: Instant },
}

/// Permission to make one call, after waiting `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    pub ticket: u64,
    pub delay: Duration,
}

/// The pacing state machine.
#[derive(Debug)]
pub struct Pacer {
    config: PacingConfig,
    state: PacerState,
    last_start: Option<Instant>,
    next_ticket: u64,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            state: PacerState::Idle,
            last_start: None,
            next_ticket: 1,
        }
    }

    /// Current state, with expired cooldowns reported as idle.
    pub fn state(&self, now: Instant) -> PacerState {
        match self.state {
            PacerState::CoolingDown { until, .. } if now >= until => PacerState::Idle,
            state => state,
        }
    }

    pub fn can_trigger(&self, now: Instant) -> bool {
        self.state(now) == PacerState::Idle
    }

    /// Remaining cooldown, if one is active.
    pub fn cooldown(&self, now: Instant) -> Option<(CooldownReason, Duration)> {
        match self.state(now) {
            PacerState::CoolingDown { reason, until } => Some((reason, until - now)),
            _ => None,
        }
    }

    /// Claim the single in-flight slot. Calls that come too soon after the
    /// previous one are delayed rather than refused.
    pub fn try_begin(&mut self, now: Instant) -> Result<Permit, SummaryError> {
        match self.state(now) {
            PacerState::InFlight { .. } => return Err(SummaryError::Busy),
            PacerState::CoolingDown { reason, until } => {
                return Err(SummaryError::CoolingDown {
                    reason,
                    remaining: until - now,
                });
            }
            PacerState::Idle => {}
        }

        let delay = self
            .last_start
            .map(|last| (last + self.config.min_interval).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.last_start = Some(now + delay);
        self.state = PacerState::InFlight { ticket };
        Ok(Permit { ticket, delay })
    }

    /// Record how the call for `ticket` ended.
    pub fn finish<T>(&mut self, ticket: u64, outcome: &Result<T, SummaryError>, now: Instant) {
        if self.state != (PacerState::InFlight { ticket }) {
            return;
        }

        self.state = match outcome {
            Err(SummaryError::Provider(ProviderError::RateLimited(_))) => PacerState::CoolingDown {
                reason: CooldownReason::RateLimited,
                until: now + self.config.rate_limit_cooldown,
            },
            Err(SummaryError::Provider(ProviderError::Unavailable(_))) => PacerState::CoolingDown {
                reason: CooldownReason::Unavailable,
                until: now + self.config.unavailable_cooldown,
            },
            _ => PacerState::Idle,
        };

        if let PacerState::CoolingDown { reason, .. } = self.state {
            tracing::warn!(?reason, "Summary trigger cooling down");
        }
    }

    /// Free the slot held by `ticket` without recording an outcome. Does
    /// nothing once the call has finished.
    pub fn abandon(&mut self, ticket: u64) {
        if self.state == (PacerState::InFlight { ticket }) {
            tracing::debug!(ticket, "Summary request abandoned");
            self.state = PacerState::Idle;
        }
    }
}
