pub mod queries;
pub mod value;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub use value::LoggedValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    /// Single canonical label ("Quads") or a compound one ("Abs, Core").
    pub main_muscle: String,
    #[serde(default)]
    pub movement_pattern: Option<String>,
    #[serde(default)]
    pub exercise_type: Option<String>,
}

/// One row of sessions joined with their set logs and exercise definitions.
/// The set columns are empty for a completed session that has no set logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetLogRow {
    pub session_id: String,
    pub template_name: Option<String>,
    pub session_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_label: Option<String>,
    pub set_log_id: Option<String>,
    pub exercise_id: Option<String>,
    pub exercise_name: Option<String>,
    pub main_muscle: Option<String>,
    pub weight_kg: Option<LoggedValue>,
    pub reps: Option<LoggedValue>,
    pub reps_l: Option<LoggedValue>,
    pub reps_r: Option<LoggedValue>,
    pub time_seconds: Option<i64>,
    pub is_pb: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSetLog {
    #[serde(default)]
    pub id: Option<String>,
    pub exercise_id: String,
    #[serde(default)]
    pub weight_kg: Option<LoggedValue>,
    #[serde(default)]
    pub reps: Option<LoggedValue>,
    #[serde(default)]
    pub reps_l: Option<LoggedValue>,
    #[serde(default)]
    pub reps_r: Option<LoggedValue>,
    #[serde(default)]
    pub time_seconds: Option<i64>,
    #[serde(default)]
    pub is_pb: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWorkoutSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub template_name: Option<String>,
    pub session_date: NaiveDate,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_label: Option<String>,
    #[serde(default)]
    pub set_logs: Vec<NewSetLog>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    AllTime,
    LastDays(u32),
}

impl HistoryWindow {
    /// `None` clears all history; `Some(n)` the last `n` days.
    pub fn from_days(days: Option<u32>) -> Result<Self> {
        match days {
            None => Ok(HistoryWindow::AllTime),
            Some(0) => bail!("days must be at least 1"),
            Some(days) => Ok(HistoryWindow::LastDays(days)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExerciseSelection {
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearedHistory {
    pub set_logs_deleted: usize,
    pub sessions_deleted: usize,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn upsert_exercise(&self, exercise: &ExerciseDefinition) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO exercise_definitions (id, name, main_muscle, movement_pattern, exercise_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id)
                 DO UPDATE SET name=excluded.name, main_muscle=excluded.main_muscle,
                               movement_pattern=excluded.movement_pattern, exercise_type=excluded.exercise_type",
                params![
                    exercise.id,
                    exercise.name,
                    exercise.main_muscle,
                    exercise.movement_pattern,
                    exercise.exercise_type
                ],
            )
            .with_context(|| format!("Failed to upsert exercise: {}", exercise.id))?;

        Ok(())
    }

    pub fn list_exercises(&self) -> Result<Vec<ExerciseDefinition>> {
        let mut statement = self.conn.prepare(
            "SELECT id, name, main_muscle, movement_pattern, exercise_type
             FROM exercise_definitions
             ORDER BY name ASC",
        )?;

        let rows = statement
            .query_map([], |row| {
                Ok(ExerciseDefinition {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    main_muscle: row.get(2)?,
                    movement_pattern: row.get(3)?,
                    exercise_type: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list exercises")?;

        Ok(rows)
    }

    /// Distinct single-group labels of the catalog. Compound labels are excluded.
    pub fn canonical_muscle_groups(&self) -> Result<Vec<String>> {
        let mut statement = self.conn.prepare(
            "SELECT DISTINCT TRIM(main_muscle)
             FROM exercise_definitions
             WHERE main_muscle NOT LIKE '%,%' AND TRIM(main_muscle) <> ''
             ORDER BY TRIM(main_muscle) ASC",
        )?;

        let groups = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query canonical muscle groups")?;

        Ok(groups)
    }

    pub fn insert_session(
        &mut self,
        default_user_id: &str,
        session: &NewWorkoutSession,
    ) -> Result<String> {
        let session_id = session
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_id = session.user_id.as_deref().unwrap_or(default_user_id);
        let fallback_created_at = session.completed_at.unwrap_or_else(Utc::now).timestamp();

        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        transaction
            .execute(
                "INSERT INTO workout_sessions (id, user_id, template_name, session_date, completed_at, duration_label)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session_id,
                    user_id,
                    session.template_name,
                    session.session_date,
                    session.completed_at.map(|at| at.timestamp()),
                    session.duration_label
                ],
            )
            .with_context(|| format!("Failed to insert workout session: {session_id}"))?;

        session.set_logs.iter().try_for_each(|set_log| {
            let set_log_id = set_log
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            transaction
                .execute(
                    "INSERT INTO set_logs (id, session_id, exercise_id, weight_kg, reps, reps_l, reps_r, time_seconds, is_pb, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        set_log_id,
                        session_id,
                        set_log.exercise_id,
                        set_log.weight_kg,
                        set_log.reps,
                        set_log.reps_l,
                        set_log.reps_r,
                        set_log.time_seconds,
                        set_log.is_pb,
                        set_log
                            .created_at
                            .map(|at| at.timestamp())
                            .unwrap_or(fallback_created_at)
                    ],
                )
                .with_context(|| format!("Failed to insert set log: {set_log_id}"))
                .map(|_| ())
        })?;

        transaction
            .commit()
            .context("Failed to commit workout session")?;

        Ok(session_id)
    }

    /// Completed sessions of `user_id` since `since`, flattened with their set logs.
    pub fn recent_session_rows(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SetLogRow>> {
        let mut statement = self.conn.prepare(queries::SELECT_RECENT_SESSION_ROWS)?;

        let rows = statement
            .query_map(params![user_id, since.timestamp()], map_set_log_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query recent sessions")?;

        Ok(rows)
    }

    /// Completion timestamps of every completed session of `user_id`, newest first.
    pub fn completion_timestamps(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let mut statement = self.conn.prepare(
            "SELECT completed_at FROM workout_sessions
             WHERE user_id = ?1 AND completed_at IS NOT NULL
             ORDER BY completed_at DESC",
        )?;

        let timestamps = statement
            .query_map(params![user_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query completion timestamps")?
            .into_iter()
            .filter_map(|seconds| DateTime::from_timestamp(seconds, 0))
            .collect();

        Ok(timestamps)
    }

    pub fn session_count(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM workout_sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .context("Failed to count sessions")?;

        Ok(count.max(0) as usize)
    }

    pub fn latest_completed_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let seconds: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(completed_at) FROM workout_sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .context("Failed to query latest completion")?
            .flatten();

        Ok(seconds.and_then(|value| DateTime::from_timestamp(value, 0)))
    }

    /// Deletes the set logs of `user_id` inside `window` for the selected
    /// exercises, then the sessions this emptied. Sessions that had no set
    /// logs beforehand are kept.
    pub fn clear_exercise_history(
        &mut self,
        user_id: &str,
        window: HistoryWindow,
        selection: &ExerciseSelection,
        now: DateTime<Utc>,
    ) -> Result<ClearedHistory> {
        if let ExerciseSelection::Only(ids) = selection {
            if ids.is_empty() {
                bail!("No exercises selected for history clearing");
            }
        }

        let threshold = match window {
            HistoryWindow::AllTime => Value::Null,
            HistoryWindow::LastDays(days) => {
                Value::Integer((now - Duration::days(i64::from(days))).timestamp())
            }
        };

        let mut filter = String::from(
            "session_id IN (
               SELECT id FROM workout_sessions
               WHERE user_id = ?1 AND (?2 IS NULL OR completed_at >= ?2)
             )",
        );
        let mut filter_params = vec![Value::Text(user_id.to_string()), threshold];

        if let ExerciseSelection::Only(ids) = selection {
            let placeholders = (0..ids.len())
                .map(|index| format!("?{}", index + 3))
                .collect::<Vec<_>>()
                .join(", ");
            filter.push_str(&format!(" AND exercise_id IN ({placeholders})"));
            filter_params.extend(ids.iter().cloned().map(Value::Text));
        }

        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let touched_sessions = {
            let mut statement = transaction
                .prepare(&format!("SELECT DISTINCT session_id FROM set_logs WHERE {filter}"))?;
            statement
                .query_map(params_from_iter(filter_params.iter()), |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to query sessions to clear")?
        };

        let set_logs_deleted = transaction
            .execute(
                &format!("DELETE FROM set_logs WHERE {filter}"),
                params_from_iter(filter_params.iter()),
            )
            .context("Failed to delete set logs")?;

        let sessions_deleted = touched_sessions.iter().try_fold(0, |deleted, session_id| {
            transaction
                .execute(
                    "DELETE FROM workout_sessions
                     WHERE id = ?1
                       AND NOT EXISTS (SELECT 1 FROM set_logs l WHERE l.session_id = workout_sessions.id)",
                    params![session_id],
                )
                .with_context(|| format!("Failed to delete emptied session: {session_id}"))
                .map(|removed| deleted + removed)
        })?;

        transaction
            .commit()
            .context("Failed to commit history clearing")?;

        Ok(ClearedHistory {
            set_logs_deleted,
            sessions_deleted,
        })
    }
}

fn map_set_log_row(row: &Row<'_>) -> rusqlite::Result<SetLogRow> {
    Ok(SetLogRow {
        session_id: row.get(0)?,
        template_name: row.get(1)?,
        session_date: row.get(2)?,
        completed_at: row
            .get::<_, Option<i64>>(3)?
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        duration_label: row.get(4)?,
        set_log_id: row.get(5)?,
        exercise_id: row.get(6)?,
        exercise_name: row.get(7)?,
        main_muscle: row.get(8)?,
        weight_kg: row.get(9)?,
        reps: row.get(10)?,
        reps_l: row.get(11)?,
        reps_r: row.get(12)?,
        time_seconds: row.get(13)?,
        is_pb: row.get::<_, Option<bool>>(14)?.unwrap_or_default(),
        created_at: row
            .get::<_, Option<i64>>(15)?
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
    })
}
