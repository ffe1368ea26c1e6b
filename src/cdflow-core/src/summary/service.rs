//! Running a summary request end to end.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::Config;
use crate::error::{CooldownReason, SummaryError, cooldown_message};
use crate::model::DebateRound;
use crate::summary::pacing::{Clock, Pacer, PacerState, PacingConfig, SystemClock};
use crate::summary::parse::parse_summary;
use crate::summary::provider::SummaryProvider;
use crate::summary::request::{SummaryPrompt, SummaryRequest};
use crate::summary::types::DebateSummary;

/// Whether a summary can be requested right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerStatus {
    Ready,
    Busy,
    CoolingDown {
        reason: CooldownReason,
        remaining: Duration,
    },
}

impl TriggerStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, TriggerStatus::Ready)
    }

    /// User-facing explanation when the trigger is disabled.
    pub fn message(&self) -> Option<String> {
        match self {
            TriggerStatus::Ready => None,
            TriggerStatus::Busy => Some("A summary is already being generated.".to_string()),
            TriggerStatus::CoolingDown { reason, remaining } => {
                Some(cooldown_message(*reason, *remaining))
            }
        }
    }
}

/// Sends rounds to a [`SummaryProvider`] under the pacing rules.
pub struct SummaryService {
    provider: Arc<dyn SummaryProvider>,
    config: Config,
    pacer: Mutex<Pacer>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SummaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryService")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl SummaryService {
    pub fn new(provider: Arc<dyn SummaryProvider>, config: Config) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn SummaryProvider>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pacer = Pacer::new(PacingConfig::from(&config.summary));
        Self {
            provider,
            config,
            pacer: Mutex::new(pacer),
            clock,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn pacer(&self) -> MutexGuard<'_, Pacer> {
        self.pacer.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn trigger_status(&self) -> TriggerStatus {
        let now = self.clock.now();
        match self.pacer().state(now) {
            PacerState::Idle => TriggerStatus::Ready,
            PacerState::InFlight { .. } => TriggerStatus::Busy,
            PacerState::CoolingDown { reason, until } => TriggerStatus::CoolingDown {
                reason,
                remaining: until.saturating_duration_since(now),
            },
        }
    }

    /// Summarize `round`.
    ///
    /// A round with no content fails before anything is sent. Calls made too
    /// soon after the previous one wait out the minimum interval first.
    pub async fn summarize(&self, round: &DebateRound) -> Result<DebateSummary, SummaryError> {
        let request = SummaryRequest::from_round(round)?;
        let prompt = SummaryPrompt::build(&request, &self.config)?;

        let permit = self.pacer().try_begin(self.clock.now())?;
        // Frees the slot if this future is dropped before the call finishes.
        let _slot = InFlightSlot {
            service: self,
            ticket: permit.ticket,
        };
        if !permit.delay.is_zero() {
            tracing::debug!(delay_ms = permit.delay.as_millis() as u64, "Pacing summary request");
            tokio::time::sleep(permit.delay).await;
        }

        tracing::info!(
            provider = self.provider.name(),
            round = %round.id,
            arguments = request.argument_count(),
            "Requesting summary"
        );

        let outcome = match self.provider.complete(&prompt).await {
            Ok(text) => parse_summary(&text),
            Err(e) => Err(SummaryError::from(e)),
        };

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Summary request failed");
        }

        self.pacer().finish(permit.ticket, &outcome, self.clock.now());
        outcome
    }
}

struct InFlightSlot<'a> {
    service: &'a SummaryService,
    ticket: u64,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.service.pacer().abandon(self.ticket);
    }
}
