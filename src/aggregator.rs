use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::fine::{calculate_fine, DEFAULT_FINE_RATE};
use crate::models::{Fine, Subject};
use crate::stats::pooled_percentage;

/// Target used for the overall figure when there are no subjects to average.
pub const DEFAULT_OVERALL_TARGET: f64 = 75.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FineConfigError {
    #[error("fine rate cannot be negative (got {0})")]
    NegativeRate(i64),
    #[error("fine rate must be a whole number (got {0:?})")]
    NotANumber(String),
    #[error("fine rate {0} is too large")]
    TooLarge(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineConfig {
    pub fine_rate: u32,
    pub show_fines: bool,
}

impl Default for FineConfig {
    fn default() -> Self {
        FineConfig {
            fine_rate: DEFAULT_FINE_RATE,
            show_fines: true,
        }
    }
}

pub fn validate_fine_rate(rate: i64) -> Result<u32, FineConfigError> {
    if rate < 0 {
        return Err(FineConfigError::NegativeRate(rate));
    }
    u32::try_from(rate).map_err(|_| FineConfigError::TooLarge(rate))
}

pub fn parse_fine_rate(input: &str) -> Result<u32, FineConfigError> {
    let rate: i64 = input
        .trim()
        .parse()
        .map_err(|_| FineConfigError::NotANumber(input.to_string()))?;
    validate_fine_rate(rate)
}

/// Snapshot produced by one recalculation. Replaced whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineSnapshot {
    pub fines: HashMap<String, Fine>,
    pub total_fine_amount: u64,
    pub overall_shortfall: Option<f64>,
}

/// Owns the fine rate and the per-subject fines derived from it.
#[derive(Debug, Clone, Default)]
pub struct FineAggregator {
    config: FineConfig,
    snapshot: FineSnapshot,
}

impl FineAggregator {
    pub fn new(config: FineConfig) -> Self {
        FineAggregator {
            config,
            snapshot: FineSnapshot::default(),
        }
    }

    pub fn fine_rate(&self) -> u32 {
        self.config.fine_rate
    }

    pub fn show_fines(&self) -> bool {
        self.config.show_fines
    }

    pub fn set_show_fines(&mut self, show: bool) {
        self.config.show_fines = show;
    }

    /// Rejects negative rates and leaves the current rate untouched on error.
    pub fn set_fine_rate(&mut self, rate: i64, subjects: &[Subject]) -> Result<(), FineConfigError> {
        let rate = match validate_fine_rate(rate) {
            Ok(rate) => rate,
            Err(err) => {
                tracing::warn!(error = %err, current = self.config.fine_rate, "rejected fine rate");
                return Err(err);
            }
        };

        tracing::info!(from = self.config.fine_rate, to = rate, "fine rate updated");
        self.config.fine_rate = rate;
        self.recalculate(subjects);
        Ok(())
    }

    pub fn recalculate(&mut self, subjects: &[Subject]) {
        let rate = self.config.fine_rate;
        let mut fines = HashMap::new();
        let mut total_fine_amount = 0u64;

        for subject in subjects {
            if let Some(fine) = calculate_fine(subject.percentage(), subject.target_attendance as f64, rate) {
                total_fine_amount += fine.amount;
                fines.insert(subject.id.clone(), fine);
            }
        }

        let overall_shortfall = overall_fine(subjects, rate).map(|fine| fine.shortfall);

        tracing::debug!(
            subjects = subjects.len(),
            fined = fines.len(),
            total = total_fine_amount,
            rate,
            "recalculated fines"
        );

        self.snapshot = FineSnapshot {
            fines,
            total_fine_amount,
            overall_shortfall,
        };
    }

    pub fn fine_for(&self, subject_id: &str) -> Option<&Fine> {
        self.snapshot.fines.get(subject_id)
    }

    pub fn fines(&self) -> &HashMap<String, Fine> {
        &self.snapshot.fines
    }

    pub fn total_fine_amount(&self) -> u64 {
        self.snapshot.total_fine_amount
    }

    pub fn overall_shortfall(&self) -> Option<f64> {
        self.snapshot.overall_shortfall
    }

    pub fn snapshot(&self) -> &FineSnapshot {
        &self.snapshot
    }
}

/// Fine over pooled attendance against the mean target of all subjects.
pub fn overall_fine(subjects: &[Subject], fine_rate: u32) -> Option<Fine> {
    let attended: u64 = subjects.iter().map(|s| s.attended_classes as u64).sum();
    let total: u64 = subjects.iter().map(|s| s.total_classes as u64).sum();

    let target = if subjects.is_empty() {
        DEFAULT_OVERALL_TARGET
    } else {
        subjects.iter().map(|s| s.target_attendance as f64).sum::<f64>() / subjects.len() as f64
    };

    calculate_fine(pooled_percentage(attended, total), target, fine_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_track() -> Subject {
        Subject::new("Electrical", "EE101", 75).with_counts(16, 20)
    }

    fn short() -> Subject {
        Subject::new("Physics", "PHY101", 75).with_counts(10, 15)
    }

    #[test]
    fn defaults_to_four_hundred() {
        let aggregator = FineAggregator::default();
        assert_eq!(aggregator.fine_rate(), 400);
        assert!(aggregator.show_fines());
        assert_eq!(aggregator.total_fine_amount(), 0);
    }

    #[test]
    fn only_short_subjects_are_fined() {
        let subjects = vec![on_track(), short()];
        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&subjects);

        assert_eq!(aggregator.total_fine_amount(), 3320);
        assert_eq!(aggregator.fines().len(), 1);
        assert!(aggregator.fine_for(&subjects[0].id).is_none());
        let fine = aggregator.fine_for(&subjects[1].id).unwrap();
        assert_eq!(fine.amount, 3320);
        assert_eq!(fine.shortfall, 8.3);
    }

    #[test]
    fn negative_rate_is_rejected_and_rate_kept() {
        let subjects = vec![short()];
        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&subjects);

        let err = aggregator.set_fine_rate(-5, &subjects).unwrap_err();
        assert_eq!(err, FineConfigError::NegativeRate(-5));
        assert_eq!(aggregator.fine_rate(), 400);
        assert_eq!(aggregator.total_fine_amount(), 3320);
    }

    #[test]
    fn rate_change_recomputes_every_fine() {
        let subjects = vec![on_track(), short()];
        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&subjects);

        aggregator.set_fine_rate(100, &subjects).unwrap();
        assert_eq!(aggregator.fine_rate(), 100);
        assert_eq!(aggregator.total_fine_amount(), 830);
    }

    #[test]
    fn recalculation_replaces_previous_map() {
        let removed = short();
        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&[on_track(), removed.clone()]);
        assert!(aggregator.fine_for(&removed.id).is_some());

        aggregator.recalculate(&[on_track()]);
        assert!(aggregator.fines().is_empty());
        assert_eq!(aggregator.total_fine_amount(), 0);
    }

    #[test]
    fn stale_cached_percentage_is_ignored() {
        let mut subject = short();
        subject.current_attendance = Some(95.0);
        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&[subject.clone()]);
        assert_eq!(aggregator.fine_for(&subject.id).map(|f| f.amount), Some(3320));
    }

    #[test]
    fn overall_shortfall_pools_attendance() {
        // 26 / 35 = 74.29% against a mean target of 75
        let subjects = vec![on_track(), short()];
        let fine = overall_fine(&subjects, 400).unwrap();
        assert_eq!(fine.shortfall, 0.7);

        let mut aggregator = FineAggregator::default();
        aggregator.recalculate(&subjects);
        assert_eq!(aggregator.overall_shortfall(), Some(0.7));
    }

    #[test]
    fn overall_shortfall_for_empty_set_uses_default_target() {
        let fine = overall_fine(&[], 400).unwrap();
        assert_eq!(fine.shortfall, 75.0);
    }

    #[test]
    fn parses_rate_from_text() {
        assert_eq!(parse_fine_rate(" 250 "), Ok(250));
        assert_eq!(
            parse_fine_rate("abc"),
            Err(FineConfigError::NotANumber("abc".to_string()))
        );
        assert_eq!(parse_fine_rate("-1"), Err(FineConfigError::NegativeRate(-1)));
        assert!(parse_fine_rate("2.5").is_err());
        assert_eq!(
            parse_fine_rate("99999999999"),
            Err(FineConfigError::TooLarge(99_999_999_999))
        );
    }
}
