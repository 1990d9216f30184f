pub mod muscle;
pub mod report;
pub mod sessions;
pub mod streak;
pub mod weekly;

use crate::analyzer::muscle::MuscleRules;
use crate::analyzer::sessions::SessionSummary;
use crate::analyzer::streak::{StreakSummary, TargetProgress};
use crate::analyzer::weekly::WeeklyAggregate;
use crate::config::Config;
use crate::db::{Database, SetLogRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Everything one dashboard load fetches from storage.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub rows: Vec<SetLogRow>,
    pub canonical: Vec<String>,
    pub completions: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyDashboard {
    #[serde(flatten)]
    pub aggregate: WeeklyAggregate,
    pub recent_sessions: Vec<SessionSummary>,
    pub target: TargetProgress,
    pub streak: StreakSummary,
}

/// Weekly aggregation memoized on a content hash of its inputs.
#[derive(Debug, Default)]
pub struct MemoizedAggregator {
    cached: Option<(String, WeeklyAggregate)>,
    computations: usize,
}

impl MemoizedAggregator {
    pub fn aggregate<Tz: TimeZone>(
        &mut self,
        sessions: &[SessionSummary],
        canonical: &[String],
        now: &DateTime<Tz>,
    ) -> WeeklyAggregate {
        let key = content_key(sessions, canonical, now)
            .map_err(|error| debug!(error = %error, "memo key unavailable"))
            .ok();

        if let (Some(key), Some((cached_key, aggregate))) = (&key, &self.cached) {
            if key == cached_key {
                return aggregate.clone();
            }
        }

        let aggregate = weekly::aggregate_week(sessions, canonical, now);
        self.computations += 1;
        debug!(
            computations = self.computations,
            sessions = sessions.len(),
            "weekly aggregate recomputed"
        );
        self.cached = key.map(|key| (key, aggregate.clone()));
        aggregate
    }
}

fn content_key<Tz: TimeZone>(
    sessions: &[SessionSummary],
    canonical: &[String],
    now: &DateTime<Tz>,
) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(sessions).context("Failed to serialize sessions")?);
    hasher.update(serde_json::to_vec(canonical).context("Failed to serialize muscle groups")?);
    hasher.update(weekly::week_start(now).to_string());
    hasher.update(format!("{:?}", now.offset()));

    Ok(format!("{:x}", hasher.finalize()))
}

/// Last-known dashboard plus the loading flag and flat error string a client renders.
#[derive(Debug, Default, Serialize)]
pub struct DashboardState {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<WeeklyDashboard>,
    #[serde(skip)]
    memo: MemoizedAggregator,
}

impl DashboardState {
    /// Re-fetches and recomputes. A failed fetch keeps the previous data and
    /// records the error message instead.
    pub fn refresh<Tz, F>(
        &mut self,
        fetch: F,
        rules: &MuscleRules,
        weekly_target: u32,
        now: &DateTime<Tz>,
    ) where
        Tz: TimeZone,
        F: FnOnce() -> Result<DashboardSnapshot>,
    {
        self.loading = true;

        match fetch() {
            Ok(snapshot) => {
                let dashboard =
                    build_dashboard(&snapshot, rules, weekly_target, now, &mut self.memo);
                self.data = Some(dashboard);
                self.error = None;
            }
            Err(error) => {
                warn!(error = %error, "dashboard fetch failed");
                self.error = Some(format!("{error:#}"));
            }
        }

        self.loading = false;
    }
}

pub fn build_dashboard<Tz: TimeZone>(
    snapshot: &DashboardSnapshot,
    rules: &MuscleRules,
    weekly_target: u32,
    now: &DateTime<Tz>,
    memo: &mut MemoizedAggregator,
) -> WeeklyDashboard {
    let recent_sessions = sessions::transform_sessions(&snapshot.rows, &snapshot.canonical, rules);
    let aggregate = memo.aggregate(&recent_sessions, &snapshot.canonical, now);
    let target = streak::target_progress(aggregate.weekly_workout_count, weekly_target);
    let streak = streak::streak_summary(&snapshot.completions, now);

    WeeklyDashboard {
        aggregate,
        recent_sessions,
        target,
        streak,
    }
}

pub fn fetch_snapshot(
    database: &Database,
    user_id: &str,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<DashboardSnapshot> {
    let since = now - Duration::days(i64::from(window_days));

    Ok(DashboardSnapshot {
        rows: database.recent_session_rows(user_id, since)?,
        canonical: database.canonical_muscle_groups()?,
        completions: database.completion_timestamps(user_id)?,
    })
}

pub fn load_weekly_dashboard<Tz: TimeZone>(
    config: &Config,
    user_id: &str,
    now: &DateTime<Tz>,
) -> Result<WeeklyDashboard> {
    let rules = load_muscle_rules(config)?;
    let database = Database::open(&config.db_path)?;
    let snapshot = fetch_snapshot(
        &database,
        user_id,
        config.recent_window_days,
        now.with_timezone(&Utc),
    )?;

    debug!(
        user = user_id,
        rows = snapshot.rows.len(),
        "dashboard snapshot fetched"
    );

    Ok(build_dashboard(
        &snapshot,
        &rules,
        config.weekly_target_workouts,
        now,
        &mut MemoizedAggregator::default(),
    ))
}

pub fn load_recent_sessions(config: &Config, user_id: &str) -> Result<Vec<SessionSummary>> {
    let rules = load_muscle_rules(config)?;
    let database = Database::open(&config.db_path)?;
    let since = Utc::now() - Duration::days(i64::from(config.recent_window_days));
    let rows = database.recent_session_rows(user_id, since)?;
    let canonical = database.canonical_muscle_groups()?;

    Ok(sessions::transform_sessions(&rows, &canonical, &rules))
}

pub fn load_muscle_rules(config: &Config) -> Result<MuscleRules> {
    if !config.muscle_rules_path.exists() {
        debug!(
            path = %config.muscle_rules_path.display(),
            "muscle rules file missing, using built-in rules"
        );
        return Ok(MuscleRules::default());
    }

    MuscleRules::load(&config.muscle_rules_path).with_context(|| {
        format!(
            "Failed to load muscle rules: {}",
            config.muscle_rules_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{DashboardSnapshot, DashboardState, MemoizedAggregator, build_dashboard};
    use crate::analyzer::muscle::MuscleRules;
    use crate::analyzer::sessions::transform_sessions;
    use crate::analyzer::streak::TrainingStatus;
    use crate::db::SetLogRow;
    use anyhow::anyhow;
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 15, 30, 0)
            .single()
            .expect("valid time")
    }

    fn snapshot() -> DashboardSnapshot {
        let completed_at = Utc
            .with_ymd_and_hms(2026, 3, 10, 18, 0, 0)
            .single()
            .expect("valid time");

        DashboardSnapshot {
            rows: vec![SetLogRow {
                session_id: "s1".to_string(),
                completed_at: Some(completed_at),
                set_log_id: Some("l1".to_string()),
                exercise_id: Some("curl".to_string()),
                exercise_name: Some("Curl".to_string()),
                main_muscle: Some("Biceps".to_string()),
                weight_kg: Some(20.0.into()),
                reps: Some(10.0.into()),
                ..SetLogRow::default()
            }],
            canonical: vec!["Biceps".to_string(), "Chest".to_string()],
            completions: vec![completed_at],
        }
    }

    #[test]
    fn memo_reuses_result_for_identical_input() {
        let data = snapshot();
        let sessions = transform_sessions(&data.rows, &data.canonical, &MuscleRules::default());
        let mut memo = MemoizedAggregator::default();

        let first = memo.aggregate(&sessions, &data.canonical, &now());
        let second = memo.aggregate(&sessions.clone(), &data.canonical, &now());

        assert_eq!(first, second);
        assert_eq!(memo.computations, 1);

        memo.aggregate(&[], &data.canonical, &now());
        assert_eq!(memo.computations, 2);
    }

    #[test]
    fn dashboard_combines_aggregate_target_and_streak() {
        let dashboard = build_dashboard(
            &snapshot(),
            &MuscleRules::default(),
            3,
            &now(),
            &mut MemoizedAggregator::default(),
        );

        assert_eq!(dashboard.aggregate.weekly_volume_totals["Biceps"], 200.0);
        assert_eq!(dashboard.aggregate.weekly_volume_totals["Chest"], 0.0);
        assert_eq!(dashboard.recent_sessions.len(), 1);
        assert_eq!(dashboard.target.remaining, 2);
        assert_eq!(dashboard.streak.current_days, 1);
        assert_eq!(dashboard.streak.status, TrainingStatus::Active);

        let json = serde_json::to_value(&dashboard).expect("json");
        assert_eq!(json["weekly_workout_count"], 1);
        assert_eq!(json["daily_volume_data"].as_array().map(Vec::len), Some(7));
    }

    #[test]
    fn failed_refresh_keeps_last_known_data() {
        let mut state = DashboardState::default();
        let rules = MuscleRules::default();

        state.refresh(|| Ok(snapshot()), &rules, 3, &now());
        assert!(state.error.is_none());
        let loaded = state.data.clone();

        state.refresh(
            || Err(anyhow!("connection refused")),
            &rules,
            3,
            &now(),
        );

        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("connection refused"));
        assert_eq!(state.data, loaded);
    }

    #[test]
    fn repeated_refresh_reuses_the_memoized_aggregate() {
        let mut state = DashboardState::default();
        let rules = MuscleRules::default();

        state.refresh(|| Ok(snapshot()), &rules, 3, &now());
        state.refresh(|| Ok(snapshot()), &rules, 3, &now());

        assert_eq!(state.memo.computations, 1);
        assert!(state.data.is_some());
    }

    #[test]
    fn empty_snapshot_is_not_an_error() {
        let mut state = DashboardState::default();

        state.refresh(
            || Ok(DashboardSnapshot::default()),
            &MuscleRules::default(),
            3,
            &now(),
        );

        let dashboard = state.data.expect("dashboard");
        assert!(state.error.is_none());
        assert_eq!(dashboard.aggregate.total_volume, 0.0);
        assert_eq!(dashboard.aggregate.weekly_workout_count, 0);
        assert!(dashboard.recent_sessions.is_empty());
    }
}
