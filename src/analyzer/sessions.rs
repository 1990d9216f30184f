use crate::analyzer::muscle::MuscleRules;
use crate::db::{LoggedValue, SetLogRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSet {
    pub set_log_id: Option<String>,
    pub weight_kg: f64,
    pub reps: f64,
    pub reps_l: Option<f64>,
    pub reps_r: Option<f64>,
    pub time_seconds: Option<i64>,
    pub is_pb: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl LoggedSet {
    pub fn volume(&self) -> f64 {
        self.weight_kg * self.reps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseGroup {
    pub exercise_id: String,
    pub exercise_name: String,
    pub muscle_group: String,
    pub sets: Vec<LoggedSet>,
}

impl ExerciseGroup {
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(LoggedSet::volume).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    /// `None` for an ad-hoc session started without a template.
    pub template_name: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_label: Option<String>,
    pub exercises: Vec<ExerciseGroup>,
    pub exercise_count: usize,
    pub total_volume: f64,
}

impl SessionSummary {
    fn from_row(row: &SetLogRow) -> Self {
        Self {
            id: row.session_id.clone(),
            template_name: row.template_name.clone(),
            session_date: row.session_date,
            completed_at: row.completed_at,
            duration_label: row.duration_label.clone(),
            exercises: Vec::new(),
            exercise_count: 0,
            total_volume: 0.0,
        }
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|exercise| exercise.sets.len()).sum()
    }
}

/// Weight-and-reps gate: both present, numeric and non-zero.
pub fn qualifying_set(row: &SetLogRow) -> Option<LoggedSet> {
    let weight = row.weight_kg.as_ref().filter(|value| value.is_truthy_number())?;
    let reps = row.reps.as_ref().filter(|value| value.is_truthy_number())?;

    Some(LoggedSet {
        set_log_id: row.set_log_id.clone(),
        weight_kg: weight.parse_or_zero(),
        reps: reps.parse_or_zero(),
        reps_l: row.reps_l.as_ref().and_then(LoggedValue::as_number),
        reps_r: row.reps_r.as_ref().and_then(LoggedValue::as_number),
        time_seconds: row.time_seconds,
        is_pb: row.is_pb,
        created_at: row.created_at,
    })
}

/// Reshapes flat set-log rows into sessions of per-exercise set lists.
///
/// Sessions keep the order in which they first appear in `rows`, exercises
/// the order of their first qualifying set. Sets failing the weight-and-reps
/// gate are dropped, and exercises left without sets are not listed.
pub fn transform_sessions(
    rows: &[SetLogRow],
    canonical: &[String],
    rules: &MuscleRules,
) -> Vec<SessionSummary> {
    let mut session_index = HashMap::<String, usize>::new();
    let mut exercise_index = HashMap::<(usize, String), usize>::new();
    let mut sessions = Vec::<SessionSummary>::new();

    for row in rows {
        let position = *session_index
            .entry(row.session_id.clone())
            .or_insert_with(|| {
                sessions.push(SessionSummary::from_row(row));
                sessions.len() - 1
            });

        let Some(exercise_id) = row.exercise_id.as_ref() else {
            continue;
        };
        let Some(set) = qualifying_set(row) else {
            continue;
        };

        let session = &mut sessions[position];
        let slot = *exercise_index
            .entry((position, exercise_id.clone()))
            .or_insert_with(|| {
                let label = row.main_muscle.as_deref().unwrap_or_default();
                session.exercises.push(ExerciseGroup {
                    exercise_id: exercise_id.clone(),
                    exercise_name: row
                        .exercise_name
                        .clone()
                        .unwrap_or_else(|| exercise_id.clone()),
                    muscle_group: rules.normalize(label, canonical),
                    sets: Vec::new(),
                });
                session.exercises.len() - 1
            });

        session.total_volume += set.volume();
        session.exercises[slot].sets.push(set);
    }

    sessions
        .into_iter()
        .map(|session| SessionSummary {
            exercise_count: session.exercises.len(),
            ..session
        })
        .collect()
}
