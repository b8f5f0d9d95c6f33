use serde::Serialize;

use crate::db::{
    models::{Note, Progress},
    subjects::SubjectSummary,
};

#[derive(Debug, Clone, Serialize)]
pub struct SubjectStat {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub note_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressBreakdown {
    pub unread: usize,
    pub reading: usize,
    pub mastered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_subjects: usize,
    pub total_notes: usize,
    pub total_words: usize,
    /// Rounded to one decimal
    pub avg_notes_per_subject: f64,
    /// Most notes first
    pub subjects: Vec<SubjectStat>,
    pub progress: ProgressBreakdown,
}

/// One decimal, ties to even: 1 note over 4 subjects is 0.2
fn average(notes: usize, subjects: usize) -> f64 {
    if subjects == 0 {
        return 0.0;
    }
    (notes as f64 / subjects as f64 * 10.0).round_ties_even() / 10.0
}

pub fn compute(subjects: &[SubjectSummary], notes: &[Note]) -> Statistics {
    let total_subjects = subjects.len();
    let total_notes = notes.len();

    let avg_notes_per_subject = average(total_notes, total_subjects);

    let mut per_subject: Vec<SubjectStat> = subjects
        .iter()
        .map(|s| SubjectStat {
            id: s.subject.id,
            name: s.subject.name.clone(),
            color: s.subject.color.clone(),
            note_count: s.note_count,
        })
        .collect();
    per_subject.sort_by(|a, b| b.note_count.cmp(&a.note_count));

    let progress = notes
        .iter()
        .fold(ProgressBreakdown::default(), |mut acc, note| {
            match note.progress {
                Progress::Unread => acc.unread += 1,
                Progress::Reading => acc.reading += 1,
                Progress::Mastered => acc.mastered += 1,
            }
            acc
        });

    Statistics {
        total_subjects,
        total_notes,
        total_words: notes.iter().map(Note::word_count).sum(),
        avg_notes_per_subject,
        subjects: per_subject,
        progress,
    }
}
