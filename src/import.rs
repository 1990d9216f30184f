use crate::db::{Database, ExerciseDefinition, NewWorkoutSession};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Exercise catalog and session history exported from a client.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkoutExport {
    pub exercises: Vec<ExerciseDefinition>,
    pub sessions: Vec<NewWorkoutSession>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub exercises: usize,
    pub sessions: usize,
    pub set_logs: usize,
}

impl WorkoutExport {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read export file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse export file: {}", path.display()))
    }
}

pub fn import_export(
    database: &mut Database,
    default_user_id: &str,
    export: &WorkoutExport,
) -> Result<ImportSummary> {
    export
        .exercises
        .iter()
        .try_for_each(|exercise| database.upsert_exercise(exercise))?;

    let set_logs = export
        .sessions
        .iter()
        .map(|session| {
            database
                .insert_session(default_user_id, session)
                .map(|_| session.set_logs.len())
        })
        .sum::<Result<usize>>()?;

    let summary = ImportSummary {
        exercises: export.exercises.len(),
        sessions: export.sessions.len(),
        set_logs,
    };

    info!(
        exercises = summary.exercises,
        sessions = summary.sessions,
        set_logs = summary.set_logs,
        "workout export imported"
    );

    Ok(summary)
}
