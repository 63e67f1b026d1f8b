use crate::models::{AttendanceStats, AttendanceStatus, AttendanceSummary, StatusBreakdown, Subject};

/// Points below target that still count as at-risk rather than below-target.
pub const AT_RISK_BUFFER: f64 = 5.0;

pub fn compute_stats(subject: &Subject) -> AttendanceStats {
    let current_percentage = subject.percentage();
    let required = required_class_count(subject.target_attendance, subject.total_classes);

    AttendanceStats {
        current_percentage,
        target_percentage: subject.target_attendance,
        classes_needed: required.saturating_sub(subject.attended_classes),
        can_miss_classes: subject.total_classes.saturating_sub(required),
        status: classify(current_percentage, subject.target_attendance as f64),
    }
}

/// Smallest attended count out of `total_classes` that meets `target` percent.
/// Integer ceiling on purpose: `ceil(0.7 * 10.0)` drifts to 8 in floating point.
pub fn required_class_count(target: u32, total_classes: u32) -> u32 {
    let scaled = target as u64 * total_classes as u64;
    let required = scaled.div_ceil(100);
    u32::try_from(required).unwrap_or(u32::MAX)
}

pub fn classify(current_percentage: f64, target: f64) -> AttendanceStatus {
    if current_percentage >= target {
        AttendanceStatus::OnTrack
    } else if current_percentage >= target - AT_RISK_BUFFER {
        AttendanceStatus::AtRisk
    } else {
        AttendanceStatus::BelowTarget
    }
}

pub fn summarize(subjects: &[Subject]) -> AttendanceSummary {
    let mut breakdown = StatusBreakdown::default();
    let mut total_attended = 0u64;
    let mut total_classes = 0u64;

    for subject in subjects {
        total_attended += subject.attended_classes as u64;
        total_classes += subject.total_classes as u64;

        match compute_stats(subject).status {
            AttendanceStatus::OnTrack => breakdown.on_track += 1,
            AttendanceStatus::AtRisk => breakdown.at_risk += 1,
            AttendanceStatus::BelowTarget => breakdown.below_target += 1,
        }
    }

    AttendanceSummary {
        subject_count: subjects.len(),
        total_attended,
        total_classes,
        overall_percentage: pooled_percentage(total_attended, total_classes),
        needing_attention: breakdown.at_risk + breakdown.below_target,
        breakdown,
    }
}

pub fn pooled_percentage(attended: u64, total: u64) -> f64 {
    if total > 0 {
        attended as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(attended: u32, total: u32, target: u32) -> Subject {
        Subject::new("Physics", "PHY101", target).with_counts(attended, total)
    }

    #[test]
    fn comfortably_above_target_is_on_track() {
        let stats = compute_stats(&subject(16, 20, 75));
        assert!((stats.current_percentage - 80.0).abs() < 1e-9);
        assert_eq!(required_class_count(75, 20), 15);
        assert_eq!(stats.classes_needed, 0);
        assert_eq!(stats.can_miss_classes, 5);
        assert_eq!(stats.status, AttendanceStatus::OnTrack);
    }

    #[test]
    fn well_below_target_needs_classes() {
        let stats = compute_stats(&subject(10, 15, 75));
        assert!((stats.current_percentage - 66.666).abs() < 0.01);
        assert_eq!(required_class_count(75, 15), 12);
        assert_eq!(stats.classes_needed, 2);
        assert_eq!(stats.can_miss_classes, 3);
        assert_eq!(stats.status, AttendanceStatus::BelowTarget);
    }

    #[test]
    fn within_buffer_is_at_risk() {
        // 16 / 22 = 72.7%
        let stats = compute_stats(&subject(16, 22, 75));
        assert_eq!(stats.status, AttendanceStatus::AtRisk);
        assert_eq!(stats.classes_needed, 1);
    }

    #[test]
    fn exact_band_edges() {
        assert_eq!(classify(75.0, 75.0), AttendanceStatus::OnTrack);
        assert_eq!(classify(70.0, 75.0), AttendanceStatus::AtRisk);
        assert_eq!(classify(69.99, 75.0), AttendanceStatus::BelowTarget);
    }

    #[test]
    fn no_classes_held_is_below_target() {
        let stats = compute_stats(&subject(0, 0, 75));
        assert_eq!(stats.current_percentage, 0.0);
        assert_eq!(stats.classes_needed, 0);
        assert_eq!(stats.can_miss_classes, 0);
        assert_eq!(stats.status, AttendanceStatus::BelowTarget);
    }

    #[test]
    fn required_count_has_no_float_drift() {
        assert_eq!(required_class_count(70, 10), 7);
        assert_eq!(required_class_count(80, 18), 15);
        assert_eq!(required_class_count(100, 0), 0);
    }

    #[test]
    fn attended_above_total_is_not_clamped() {
        let stats = compute_stats(&subject(12, 10, 75));
        assert!((stats.current_percentage - 120.0).abs() < 1e-9);
        assert_eq!(stats.classes_needed, 0);
        assert_eq!(stats.status, AttendanceStatus::OnTrack);
    }

    #[test]
    fn summary_pools_counts_and_breaks_down_status() {
        let subjects = vec![
            subject(16, 20, 75),
            subject(10, 15, 75),
            subject(16, 18, 80),
            subject(16, 22, 75),
            subject(15, 25, 70),
        ];

        let summary = summarize(&subjects);
        assert_eq!(summary.subject_count, 5);
        assert_eq!(summary.total_attended, 73);
        assert_eq!(summary.total_classes, 100);
        assert!((summary.overall_percentage - 73.0).abs() < 1e-9);
        assert_eq!(
            summary.breakdown,
            StatusBreakdown {
                on_track: 2,
                at_risk: 1,
                below_target: 2,
            }
        );
        assert_eq!(summary.needing_attention, 3);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = summarize(&[]);
        assert_eq!(summary.overall_percentage, 0.0);
        assert_eq!(summary.breakdown, StatusBreakdown::default());
    }
}
