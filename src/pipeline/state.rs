//! Pipeline state machine.

use serde::{Deserialize, Serialize};

use crate::convert::ConversionResult;

/// Current state of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Idle,
    Converting,
}

/// State machine tracking conversions and output-failure streaks.
#[derive(Debug, Clone)]
pub struct PipelineStateMachine {
    state: PipelineState,
    attempted: usize,
    succeeded: usize,
    failed: usize,
    consecutive_output_failures: u32,
    alert_threshold: u32,
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new(3)
    }
}

impl PipelineStateMachine {
    /// `alert_threshold` of zero disables alerts.
    #[must_use]
    pub fn new(alert_threshold: u32) -> Self {
        Self {
            state: PipelineState::Idle,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            consecutive_output_failures: 0,
            alert_threshold,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn transition(&mut self, new_state: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
    }

    /// Record a finished conversion.
    ///
    /// Returns `true` when the output-failure streak hits a multiple of the
    /// alert threshold.
    pub fn record(&mut self, result: &ConversionResult) -> bool {
        self.attempted = self.attempted.saturating_add(1);
        match result.error() {
            None => {
                self.succeeded = self.succeeded.saturating_add(1);
                self.consecutive_output_failures = 0;
                false
            }
            Some(err) => {
                self.failed = self.failed.saturating_add(1);
                if !err.is_output_error() {
                    return false;
                }
                self.consecutive_output_failures =
                    self.consecutive_output_failures.saturating_add(1);
                self.alert_threshold > 0
                    && self.consecutive_output_failures % self.alert_threshold == 0
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failed,
            consecutive_output_failures: self.consecutive_output_failures,
        }
    }
}

/// Pipeline statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub consecutive_output_failures: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::convert::{ConversionOutcome, ConvertError};

    fn result(outcome: ConversionOutcome) -> ConversionResult {
        ConversionResult {
            source: PathBuf::from("/d/ALINAN.xlsx"),
            destination: PathBuf::from("/d/orders.csv"),
            outcome,
        }
    }

    fn write_failure() -> ConversionResult {
        result(ConversionOutcome::Failed(ConvertError::OutputWrite {
            path: PathBuf::from("/d/orders.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }))
    }

    #[test]
    fn test_starts_idle() {
        let machine = PipelineStateMachine::default();
        assert_eq!(machine.state(), PipelineState::Idle);
        assert_eq!(machine.stats(), PipelineStats::default());
    }

    #[test]
    fn test_transition() {
        let mut machine = PipelineStateMachine::default();
        machine.transition(PipelineState::Converting);
        assert_eq!(machine.state(), PipelineState::Converting);
        machine.transition(PipelineState::Idle);
        assert_eq!(machine.state(), PipelineState::Idle);
    }

    #[test]
    fn test_counts_success_and_failure() {
        let mut machine = PipelineStateMachine::default();
        assert!(!machine.record(&result(ConversionOutcome::Succeeded { rows: 2 })));
        assert!(!machine.record(&result(ConversionOutcome::Failed(
            ConvertError::InputNotFound(PathBuf::from("/d/ALINAN.xlsx"))
        ))));

        let stats = machine.stats();
        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.consecutive_output_failures, 0);
    }

    #[test]
    fn test_alert_on_threshold_multiples() {
        let mut machine = PipelineStateMachine::new(2);
        assert!(!machine.record(&write_failure()));
        assert!(machine.record(&write_failure()));
        assert!(!machine.record(&write_failure()));
        assert!(machine.record(&write_failure()));
        assert_eq!(machine.stats().consecutive_output_failures, 4);
    }

    #[test]
    fn test_success_resets_streak() {
        let mut machine = PipelineStateMachine::new(2);
        machine.record(&write_failure());
        machine.record(&result(ConversionOutcome::Succeeded { rows: 1 }));
        assert_eq!(machine.stats().consecutive_output_failures, 0);
        assert!(!machine.record(&write_failure()));
    }

    #[test]
    fn test_zero_threshold_never_alerts() {
        let mut machine = PipelineStateMachine::new(0);
        for _ in 0..5 {
            assert!(!machine.record(&write_failure()));
        }
    }
}
