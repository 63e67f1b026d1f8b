use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subject as held by the roster. The analytics only ever read the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub instructor: Option<String>,
    pub target_attendance: u32,
    pub total_classes: u32,
    pub attended_classes: u32,
    /// Cached percentage written back by the store. Never read by the analytics.
    #[serde(default)]
    pub current_attendance: Option<f64>,
}

impl Subject {
    pub fn new(name: &str, code: &str, target_attendance: u32) -> Self {
        Subject {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            code: code.to_string(),
            instructor: None,
            target_attendance,
            total_classes: 0,
            attended_classes: 0,
            current_attendance: None,
        }
    }

    pub fn with_counts(mut self, attended_classes: u32, total_classes: u32) -> Self {
        self.attended_classes = attended_classes;
        self.total_classes = total_classes;
        self
    }

    /// Attended over held, as a percentage. Zero when no class has been held.
    pub fn percentage(&self) -> f64 {
        if self.total_classes > 0 {
            self.attended_classes as f64 / self.total_classes as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn record_class(&mut self, outcome: ClassOutcome) {
        match outcome {
            ClassOutcome::Present => {
                self.attended_classes = self.attended_classes.saturating_add(1);
                self.total_classes = self.total_classes.saturating_add(1);
            }
            ClassOutcome::Absent => self.total_classes = self.total_classes.saturating_add(1),
            ClassOutcome::Cancelled => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    OnTrack,
    AtRisk,
    BelowTarget,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::OnTrack => "on-track",
            AttendanceStatus::AtRisk => "at-risk",
            AttendanceStatus::BelowTarget => "below-target",
        }
    }

    pub fn needs_attention(&self) -> bool {
        !matches!(self, AttendanceStatus::OnTrack)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub current_percentage: f64,
    pub target_percentage: u32,
    pub classes_needed: u32,
    pub can_miss_classes: u32,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fine {
    pub amount: u64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub on_track: usize,
    pub at_risk: usize,
    pub below_target: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub subject_count: usize,
    pub total_attended: u64,
    pub total_classes: u64,
    pub overall_percentage: f64,
    pub needing_attention: usize,
    pub breakdown: StatusBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOutcome {
    Present,
    Absent,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: Uuid,
    pub subject_id: String,
    pub date: NaiveDate,
    pub attended: bool,
    pub class_cancelled: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ClassRecord {
    pub fn new(subject_id: &str, date: NaiveDate, outcome: ClassOutcome, notes: Option<String>) -> Self {
        ClassRecord {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            date,
            attended: outcome == ClassOutcome::Present,
            class_cancelled: outcome == ClassOutcome::Cancelled,
            notes,
        }
    }
}
