pub const CREATE_EXERCISE_DEFINITIONS: &str = r#"
CREATE TABLE IF NOT EXISTS exercise_definitions (
  id               TEXT PRIMARY KEY,
  name             TEXT NOT NULL,
  main_muscle      TEXT NOT NULL DEFAULT '',
  movement_pattern TEXT,
  exercise_type    TEXT
);
"#;

pub const CREATE_WORKOUT_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS workout_sessions (
  id             TEXT PRIMARY KEY,
  user_id        TEXT NOT NULL,
  template_name  TEXT,
  session_date   TEXT NOT NULL,
  completed_at   INTEGER,
  duration_label TEXT
);
"#;

// weight_kg and reps columns carry no type so text entries survive as logged.
pub const CREATE_SET_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS set_logs (
  id           TEXT PRIMARY KEY,
  session_id   TEXT NOT NULL REFERENCES workout_sessions(id) ON DELETE CASCADE,
  exercise_id  TEXT NOT NULL,
  weight_kg,
  reps,
  reps_l,
  reps_r,
  time_seconds INTEGER,
  is_pb        INTEGER NOT NULL DEFAULT 0,
  created_at   INTEGER NOT NULL
);
"#;

pub const INDEX_SESSIONS_USER_COMPLETED: &str = "CREATE INDEX IF NOT EXISTS idx_sessions_user_completed ON workout_sessions(user_id, completed_at);";

pub const INDEX_SET_LOGS_SESSION: &str =
    "CREATE INDEX IF NOT EXISTS idx_set_logs_session ON set_logs(session_id);";

pub const INDEX_SET_LOGS_EXERCISE: &str =
    "CREATE INDEX IF NOT EXISTS idx_set_logs_exercise ON set_logs(exercise_id);";

pub const SELECT_RECENT_SESSION_ROWS: &str = r#"
SELECT s.id, s.template_name, s.session_date, s.completed_at, s.duration_label,
       l.id, l.exercise_id, e.name, e.main_muscle,
       l.weight_kg, l.reps, l.reps_l, l.reps_r, l.time_seconds, l.is_pb, l.created_at
FROM workout_sessions s
LEFT JOIN set_logs l ON l.session_id = s.id
LEFT JOIN exercise_definitions e ON e.id = l.exercise_id
WHERE s.user_id = ?1
  AND s.completed_at IS NOT NULL
  AND s.completed_at >= ?2
ORDER BY s.completed_at DESC, s.id ASC, l.created_at ASC, l.rowid ASC
"#;

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_EXERCISE_DEFINITIONS,
        CREATE_WORKOUT_SESSIONS,
        CREATE_SET_LOGS,
        INDEX_SESSIONS_USER_COMPLETED,
        INDEX_SET_LOGS_SESSION,
        INDEX_SET_LOGS_EXERCISE,
    ]
}
