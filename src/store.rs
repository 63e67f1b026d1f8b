use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ClassOutcome, ClassRecord, Subject};

const SUBJECTS_FILE: &str = "subjects.csv";
const RECORDS_FILE: &str = "attendance.csv";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no subject matches {0:?}")]
    UnknownSubject(String),
    #[error("subject code {0} already exists")]
    DuplicateCode(String),
    #[error("subject {code} has {attended} attended out of {total} classes")]
    CountsExceedTotal { code: String, attended: u32, total: u32 },
}

/// CSV-backed roster and attendance log living in one directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(Store {
            dir: dir.to_path_buf(),
        })
    }

    fn subjects_path(&self) -> PathBuf {
        self.dir.join(SUBJECTS_FILE)
    }

    fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE)
    }

    pub fn load_subjects(&self) -> anyhow::Result<Vec<Subject>> {
        let path = self.subjects_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut subjects = Vec::new();

        for result in reader.deserialize::<Subject>() {
            let subject = result.with_context(|| format!("malformed row in {}", path.display()))?;
            check_counts(&subject)?;
            subjects.push(subject);
        }

        tracing::debug!(count = subjects.len(), path = %path.display(), "loaded subjects");
        Ok(subjects)
    }

    /// Rewrites the roster, refreshing each cached percentage from the counters.
    pub fn save_subjects(&self, subjects: &[Subject]) -> anyhow::Result<()> {
        let path = self.subjects_path();
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        for subject in subjects {
            let mut row = subject.clone();
            row.current_attendance = Some(subject.percentage());
            writer.serialize(&row)?;
        }
        writer.flush()?;

        tracing::debug!(count = subjects.len(), path = %path.display(), "saved subjects");
        Ok(())
    }

    pub fn add_subject(&self, subject: Subject) -> anyhow::Result<Subject> {
        let mut subjects = self.load_subjects()?;
        check_counts(&subject)?;
        if subjects
            .iter()
            .any(|existing| existing.code.eq_ignore_ascii_case(&subject.code))
        {
            return Err(StoreError::DuplicateCode(subject.code).into());
        }

        subjects.push(subject.clone());
        self.save_subjects(&subjects)?;
        tracing::info!(code = %subject.code, id = %subject.id, "subject added");
        Ok(subject)
    }

    /// Applies the set fields of `edit` to one subject. The id never changes.
    pub fn update_subject(&self, key: &str, edit: SubjectEdit) -> anyhow::Result<Subject> {
        let mut subjects = self.load_subjects()?;
        let index = find_subject(&subjects, key)?;

        let mut updated = subjects[index].clone();
        edit.apply(&mut updated);
        check_counts(&updated)?;

        if subjects.iter().enumerate().any(|(i, existing)| {
            i != index && existing.code.eq_ignore_ascii_case(&updated.code)
        }) {
            return Err(StoreError::DuplicateCode(updated.code).into());
        }

        subjects[index] = updated.clone();
        self.save_subjects(&subjects)?;
        tracing::info!(code = %updated.code, id = %updated.id, "subject updated");
        Ok(updated)
    }

    /// Removes a subject and its attendance log. Returns the subject and how many log rows went with it.
    pub fn delete_subject(&self, key: &str) -> anyhow::Result<(Subject, usize)> {
        let mut subjects = self.load_subjects()?;
        let index = find_subject(&subjects, key)?;
        let removed = subjects.remove(index);

        let records = self.read_records()?;
        let before = records.len();
        let kept: Vec<ClassRecord> = records
            .into_iter()
            .filter(|record| record.subject_id != removed.id)
            .collect();
        let dropped = before - kept.len();

        if dropped > 0 {
            self.write_records(&kept)?;
        }
        self.save_subjects(&subjects)?;

        tracing::info!(code = %removed.code, id = %removed.id, dropped, "subject deleted");
        Ok((removed, dropped))
    }

    /// Adds the demo roster, skipping codes that already exist. Returns how many were added.
    pub fn seed(&self) -> anyhow::Result<usize> {
        let mut subjects = self.load_subjects()?;
        let mut inserted = 0usize;

        for subject in demo_subjects() {
            if subjects
                .iter()
                .any(|existing| existing.code.eq_ignore_ascii_case(&subject.code))
            {
                continue;
            }
            subjects.push(subject);
            inserted += 1;
        }

        self.save_subjects(&subjects)?;
        Ok(inserted)
    }

    pub fn record_attendance(
        &self,
        key: &str,
        outcome: ClassOutcome,
        date: NaiveDate,
        notes: Option<String>,
    ) -> anyhow::Result<Subject> {
        let mut subjects = self.load_subjects()?;
        let index = find_subject(&subjects, key)?;

        let subject = &mut subjects[index];
        subject.record_class(outcome);
        let updated = subject.clone();

        self.append_record(&ClassRecord::new(&updated.id, date, outcome, notes))?;
        self.save_subjects(&subjects)?;

        tracing::info!(
            code = %updated.code,
            ?outcome,
            %date,
            attended = updated.attended_classes,
            total = updated.total_classes,
            "attendance recorded"
        );
        Ok(updated)
    }

    fn append_record(&self, record: &ClassRecord) -> anyhow::Result<()> {
        let path = self.records_path();
        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    fn read_records(&self) -> anyhow::Result<Vec<ClassRecord>> {
        let path = self.records_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut records = Vec::new();

        for result in reader.deserialize::<ClassRecord>() {
            records.push(result.with_context(|| format!("malformed row in {}", path.display()))?);
        }

        Ok(records)
    }

    /// Rewrites the log. An empty log removes the file so the next append writes headers.
    fn write_records(&self, records: &[ClassRecord]) -> anyhow::Result<()> {
        let path = self.records_path();
        if records.is_empty() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            return Ok(());
        }

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Log entries for one subject, newest first. Same-day entries keep the latest recording first.
    pub fn history(&self, subject_id: &str) -> anyhow::Result<Vec<ClassRecord>> {
        let mut records: Vec<ClassRecord> = self
            .read_records()?
            .into_iter()
            .filter(|record| record.subject_id == subject_id)
            .collect();

        records.reverse();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }
}

/// Fields to change on an existing subject. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct SubjectEdit {
    pub name: Option<String>,
    pub code: Option<String>,
    pub instructor: Option<String>,
    pub target_attendance: Option<u32>,
    pub attended_classes: Option<u32>,
    pub total_classes: Option<u32>,
}

impl SubjectEdit {
    fn apply(self, subject: &mut Subject) {
        if let Some(name) = self.name {
            subject.name = name;
        }
        if let Some(code) = self.code {
            subject.code = code;
        }
        if let Some(instructor) = self.instructor {
            subject.instructor = Some(instructor);
        }
        if let Some(target) = self.target_attendance {
            subject.target_attendance = target;
        }
        if let Some(attended) = self.attended_classes {
            subject.attended_classes = attended;
        }
        if let Some(total) = self.total_classes {
            subject.total_classes = total;
        }
    }
}

fn check_counts(subject: &Subject) -> Result<(), StoreError> {
    if subject.attended_classes > subject.total_classes {
        return Err(StoreError::CountsExceedTotal {
            code: subject.code.clone(),
            attended: subject.attended_classes,
            total: subject.total_classes,
        });
    }
    Ok(())
}

/// Matches on id first, then on course code ignoring case.
pub fn find_subject(subjects: &[Subject], key: &str) -> Result<usize, StoreError> {
    subjects
        .iter()
        .position(|subject| subject.id == key)
        .or_else(|| {
            subjects
                .iter()
                .position(|subject| subject.code.eq_ignore_ascii_case(key))
        })
        .ok_or_else(|| StoreError::UnknownSubject(key.to_string()))
}

pub fn demo_subjects() -> Vec<Subject> {
    let roster = [
        ("Electrical", "EE101", "Dr. Johnson", 75, 16, 20),
        ("Physics", "PHY101", "Prof. Smith", 75, 10, 15),
        ("Mathematics", "MATH102", "Dr. Williams", 80, 16, 18),
        ("PPS", "CS101", "Prof. Garcia", 75, 16, 22),
        ("EVS", "ENV205", "Dr. Chen", 70, 15, 25),
    ];

    roster
        .into_iter()
        .map(|(name, code, instructor, target, attended, total)| {
            let mut subject = Subject::new(name, code, target).with_counts(attended, total);
            subject.instructor = Some(instructor.to_string());
            subject
        })
        .collect()
}
