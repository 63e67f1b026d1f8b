use std::fmt::Write;

use chrono::NaiveDate;

use crate::aggregator::FineAggregator;
use crate::fine::{format_fine_amount, format_percentage};
use crate::models::Subject;
use crate::stats::{compute_stats, summarize};

pub fn build_report(generated_on: NaiveDate, subjects: &[Subject], fines: &FineAggregator) -> String {
    let summary = summarize(subjects);
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    if subjects.is_empty() {
        let _ = writeln!(output, "No subjects tracked yet.");
        return output;
    }

    let _ = writeln!(
        output,
        "- {} of {} classes attended ({})",
        summary.total_attended,
        summary.total_classes,
        format_percentage(summary.overall_percentage)
    );
    let _ = writeln!(
        output,
        "- {} of {} subjects need attention",
        summary.needing_attention, summary.subject_count
    );
    let _ = writeln!(
        output,
        "- Status mix: {} on track, {} at risk, {} below target",
        summary.breakdown.on_track, summary.breakdown.at_risk, summary.breakdown.below_target
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    let _ = writeln!(output, "| Code | Subject | Attended | Current | Target | Need | Can miss | Status |");
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");

    for subject in subjects {
        let stats = compute_stats(subject);
        let _ = writeln!(
            output,
            "| {} | {} | {}/{} | {} | {}% | {} | {} | {} |",
            subject.code,
            subject.name,
            subject.attended_classes,
            subject.total_classes,
            format_percentage(stats.current_percentage),
            stats.target_percentage,
            stats.classes_needed,
            stats.can_miss_classes,
            stats.status
        );
    }

    if !fines.show_fines() {
        return output;
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fines");
    let _ = writeln!(
        output,
        "Rate: {} per percentage point below target",
        format_fine_amount(fines.fine_rate() as u64)
    );

    let mut fined: Vec<(&Subject, _)> = subjects
        .iter()
        .filter_map(|subject| fines.fine_for(&subject.id).map(|fine| (subject, fine)))
        .collect();

    if fined.is_empty() {
        let _ = writeln!(output, "No fines due.");
        return output;
    }

    fined.sort_by(|a, b| b.1.amount.cmp(&a.1.amount));
    for (subject, fine) in fined {
        let _ = writeln!(
            output,
            "- {} ({}): {} for a {}% shortfall",
            subject.name,
            subject.code,
            format_fine_amount(fine.amount),
            fine.shortfall
        );
    }
    let _ = writeln!(output, "- Total: {}", format_fine_amount(fines.total_fine_amount()));
    if let Some(shortfall) = fines.overall_shortfall() {
        let _ = writeln!(output, "- Overall shortfall against mean target: {}%", shortfall);
    }

    output
}

/// Plain-text fine listing for the terminal.
pub fn render_fines(subjects: &[Subject], fines: &FineAggregator) -> String {
    let mut output = String::new();

    if !fines.show_fines() {
        let _ = writeln!(output, "Fines are hidden.");
        return output;
    }

    let _ = writeln!(
        output,
        "Fine rate {} per percentage point below target.",
        format_fine_amount(fines.fine_rate() as u64)
    );

    let mut any = false;
    for subject in subjects {
        if let Some(fine) = fines.fine_for(&subject.id) {
            any = true;
            let _ = writeln!(
                output,
                "- {} ({}): {} for a {}% shortfall",
                subject.name,
                subject.code,
                format_fine_amount(fine.amount),
                fine.shortfall
            );
        }
    }

    if any {
        let _ = writeln!(output, "Total due: {}", format_fine_amount(fines.total_fine_amount()));
    } else {
        let _ = writeln!(output, "No fines due.");
    }
    output
}

/// JSON view of the fine snapshot. Hidden fines carry only the flag.
pub fn fines_json(fines: &FineAggregator) -> serde_json::Value {
    if !fines.show_fines() {
        return serde_json::json!({ "showFines": false });
    }

    let snapshot = fines.snapshot();
    serde_json::json!({
        "showFines": true,
        "fineRate": fines.fine_rate(),
        "fines": snapshot.fines,
        "totalFineAmount": snapshot.total_fine_amount,
        "overallShortfall": snapshot.overall_shortfall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::FineConfig;
    use crate::store::demo_subjects;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn empty_roster_report() {
        let report = build_report(day(), &[], &FineAggregator::default());
        assert!(report.contains("No subjects tracked yet."));
        assert!(!report.contains("## Fines"));
    }

    #[test]
    fn report_lists_subjects_and_fines() {
        let subjects = demo_subjects();
        let mut fines = FineAggregator::default();
        fines.recalculate(&subjects);

        let report = build_report(day(), &subjects, &fines);
        assert!(report.contains("73 of 100 classes attended (73.0%)"));
        assert!(report.contains("| PHY101 | Physics | 10/15 | 66.7% | 75% | 2 | 3 | below-target |"));
        assert!(report.contains("Physics (PHY101): ₹3,320 for a 8.3% shortfall"));
        assert!(report.contains("## Fines"));
    }

    #[test]
    fn fine_listing_shows_short_subjects_and_total() {
        let subjects = demo_subjects();
        let mut fines = FineAggregator::default();
        fines.recalculate(&subjects);

        let text = render_fines(&subjects, &fines);
        assert!(text.contains("Fine rate ₹400 per percentage point below target."));
        assert!(text.contains("- Physics (PHY101): ₹3,320 for a 8.3% shortfall"));
        assert!(!text.contains("EE101"));
        assert!(text.contains(&format!("Total due: {}", format_fine_amount(fines.total_fine_amount()))));

        let json = fines_json(&fines);
        assert_eq!(json["showFines"], true);
        assert_eq!(json["totalFineAmount"], fines.total_fine_amount());
        assert_eq!(json["fines"][subjects[1].id.as_str()]["amount"], 3320);
    }

    #[test]
    fn hidden_fines_stay_out_of_listing_and_json() {
        let subjects = demo_subjects();
        let mut fines = FineAggregator::new(FineConfig {
            show_fines: false,
            ..FineConfig::default()
        });
        fines.recalculate(&subjects);
        assert!(fines.total_fine_amount() > 0);

        assert_eq!(render_fines(&subjects, &fines), "Fines are hidden.\n");

        let json = fines_json(&fines);
        assert_eq!(json, serde_json::json!({ "showFines": false }));
    }

    #[test]
    fn hidden_fines_are_left_out() {
        let subjects = demo_subjects();
        let mut fines = FineAggregator::new(FineConfig {
            show_fines: false,
            ..FineConfig::default()
        });
        fines.recalculate(&subjects);

        let report = build_report(day(), &subjects, &fines);
        assert!(!report.contains("## Fines"));
        assert!(report.contains("## Subjects"));
    }
}
