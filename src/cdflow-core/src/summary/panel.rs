//! View state for the summary panel.

use crate::error::SummaryError;
use crate::summary::types::DebateSummary;

/// Tracks the displayed summary, the pending request, and the last error.
///
/// Each request gets a ticket. Results that arrive for an older ticket, or
/// after the panel was cleared, are dropped.
#[derive(Debug, Default, Clone)]
pub struct SummaryPanel {
    summary: Option<DebateSummary>,
    error: Option<SummaryError>,
    pending: Option<u64>,
    next_ticket: u64,
}

impl SummaryPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request and return its ticket.
    pub fn begin(&mut self) -> u64 {
        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        self.error = None;
        self.next_ticket
    }

    /// Drop the current summary and start over.
    pub fn regenerate(&mut self) -> u64 {
        self.summary = None;
        self.begin()
    }

    /// Close the panel, discarding any pending request.
    pub fn clear(&mut self) {
        self.summary = None;
        self.error = None;
        self.pending = None;
    }

    /// Deliver a result. Returns false if it was stale and ignored.
    pub fn apply(&mut self, ticket: u64, result: Result<DebateSummary, SummaryError>) -> bool {
        if self.pending != Some(ticket) {
            tracing::debug!(ticket, "Dropping stale summary result");
            return false;
        }
        self.pending = None;
        match result {
            Ok(summary) => {
                self.summary = Some(summary);
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    pub fn summary(&self) -> Option<&DebateSummary> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&SummaryError> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}
