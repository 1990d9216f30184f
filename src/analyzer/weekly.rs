use crate::analyzer::sessions::SessionSummary;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVolume {
    pub label: String,
    pub volume: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregate {
    pub week_start: NaiveDate,
    pub weekly_volume_totals: BTreeMap<String, f64>,
    pub weekly_sets_totals: BTreeMap<String, u64>,
    pub daily_volume_data: Vec<DailyVolume>,
    pub total_volume: f64,
    pub total_sets: u64,
    pub weekly_workout_count: usize,
    /// Always zero: PR detection is not wired into the weekly aggregate yet.
    pub weekly_pr_count: u32,
}

/// Midnight of the most recent Monday in `now`'s timezone. Sunday belongs to
/// the week that started six days earlier.
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDateTime {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    monday.and_time(chrono::NaiveTime::MIN)
}

/// Folds sessions completed since the start of `now`'s week into
/// per-muscle-group totals and a Monday-to-Sunday volume series.
pub fn aggregate_week<Tz: TimeZone>(
    sessions: &[SessionSummary],
    canonical: &[String],
    now: &DateTime<Tz>,
) -> WeeklyAggregate {
    let start = week_start(now);
    let timezone = now.timezone();

    let mut daily_volume_data = WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(offset, label)| DailyVolume {
            label: label.to_string(),
            volume: 0.0,
            date: start.date() + Duration::days(offset as i64),
        })
        .collect::<Vec<_>>();

    let mut weekly_volume_totals = BTreeMap::<String, f64>::new();
    let mut weekly_sets_totals = BTreeMap::<String, u64>::new();
    let mut counted_sessions = HashSet::<&str>::new();
    let mut total_volume = 0.0;
    let mut total_sets = 0_u64;

    let this_week = sessions.iter().filter_map(|session| {
        let completed = session
            .completed_at?
            .with_timezone(&timezone)
            .naive_local();
        (completed >= start).then_some((session, completed))
    });

    for (session, completed) in this_week {
        if !counted_sessions.insert(session.id.as_str()) {
            continue;
        }

        for exercise in &session.exercises {
            *weekly_volume_totals
                .entry(exercise.muscle_group.clone())
                .or_default() += exercise.volume();
            *weekly_sets_totals
                .entry(exercise.muscle_group.clone())
                .or_default() += exercise.sets.len() as u64;
            total_sets += exercise.sets.len() as u64;
        }
        total_volume += session.total_volume;

        let offset = (completed - start).num_days();
        match usize::try_from(offset)
            .ok()
            .and_then(|index| daily_volume_data.get_mut(index))
        {
            Some(day) => day.volume += session.total_volume,
            None => debug!(
                session = %session.id,
                offset, "session outside the current week's daily series"
            ),
        }
    }

    for group in canonical {
        weekly_volume_totals.entry(group.clone()).or_insert(0.0);
        weekly_sets_totals.entry(group.clone()).or_insert(0);
    }

    WeeklyAggregate {
        week_start: start.date(),
        weekly_volume_totals,
        weekly_sets_totals,
        daily_volume_data,
        total_volume,
        total_sets,
        weekly_workout_count: counted_sessions.len(),
        weekly_pr_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate_week, week_start};
    use crate::analyzer::muscle::MuscleRules;
    use crate::analyzer::sessions::{SessionSummary, transform_sessions};
    use crate::db::{LoggedValue, SetLogRow};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    // 2026-03-11 is a Wednesday; its week starts on Monday 2026-03-09.
    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 11, 15, 30, 0).single().expect("valid time")
    }

    fn utc(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, second)
            .single()
            .expect("valid time")
    }

    fn canonical() -> Vec<String> {
        vec!["Biceps".to_string(), "Pectorals".to_string()]
    }

    fn set_row(
        session: &str,
        completed_at: DateTime<Utc>,
        weight: LoggedValue,
        reps: LoggedValue,
    ) -> SetLogRow {
        SetLogRow {
            session_id: session.to_string(),
            completed_at: Some(completed_at),
            set_log_id: Some(format!("{session}-set")),
            exercise_id: Some("bench".to_string()),
            exercise_name: Some("Bench Press".to_string()),
            main_muscle: Some("Pectorals".to_string()),
            weight_kg: Some(weight),
            reps: Some(reps),
            ..SetLogRow::default()
        }
    }

    fn sessions(rows: &[SetLogRow]) -> Vec<SessionSummary> {
        transform_sessions(rows, &canonical(), &MuscleRules::default())
    }

    #[test]
    fn week_starts_on_monday_midnight() {
        let start = week_start(&wednesday());
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2026, 3, 9).expect("date"));
        assert_eq!(start.time(), chrono::NaiveTime::MIN);

        let sunday = utc(15, 23, 0, 0);
        assert_eq!(
            week_start(&sunday).date(),
            NaiveDate::from_ymd_opt(2026, 3, 9).expect("date")
        );

        let monday = utc(9, 0, 0, 0);
        assert_eq!(week_start(&monday), monday.naive_utc());
    }

    #[test]
    fn week_start_follows_the_callers_timezone() {
        let offset = chrono::FixedOffset::east_opt(9 * 3600).expect("offset");
        // Sunday 20:00 UTC is already Monday 05:00 at UTC+9.
        let now = utc(15, 20, 0, 0).with_timezone(&offset);

        assert_eq!(
            week_start(&now).date(),
            NaiveDate::from_ymd_opt(2026, 3, 16).expect("date")
        );
    }

    #[test]
    fn bench_press_scenario() {
        let monday = utc(9, 7, 0, 0);
        let rows = vec![
            set_row("s1", monday, 100.0.into(), 5.0.into()),
            set_row("s1", monday, 0.0.into(), 5.0.into()),
        ];

        let aggregate = aggregate_week(&sessions(&rows), &canonical(), &wednesday());

        assert_eq!(aggregate.weekly_volume_totals["Pectorals"], 500.0);
        assert_eq!(aggregate.weekly_sets_totals["Pectorals"], 1);
        assert_eq!(aggregate.weekly_workout_count, 1);
        assert_eq!(aggregate.total_volume, 500.0);
        assert_eq!(aggregate.total_sets, 1);
        assert_eq!(aggregate.daily_volume_data[0].volume, 500.0);
        assert_eq!(aggregate.weekly_pr_count, 0);
    }

    #[test]
    fn week_boundary_is_inclusive_of_monday_midnight() {
        let rows = vec![
            set_row("monday", utc(9, 0, 0, 0), 50.0.into(), 2.0.into()),
            set_row("sunday", utc(8, 23, 59, 59), 70.0.into(), 2.0.into()),
        ];

        let aggregate = aggregate_week(&sessions(&rows), &canonical(), &wednesday());

        assert_eq!(aggregate.weekly_workout_count, 1);
        assert_eq!(aggregate.total_volume, 100.0);
        assert_eq!(aggregate.daily_volume_data[0].volume, 100.0);
    }

    #[test]
    fn empty_input_yields_zero_filled_aggregate() {
        let aggregate = aggregate_week(&[], &canonical(), &wednesday());

        assert_eq!(aggregate.weekly_volume_totals.len(), 2);
        assert!(aggregate.weekly_volume_totals.values().all(|volume| *volume == 0.0));
        assert!(aggregate.weekly_sets_totals.values().all(|sets| *sets == 0));
        assert_eq!(aggregate.daily_volume_data.len(), 7);
        assert!(aggregate.daily_volume_data.iter().all(|day| day.volume == 0.0));
        assert_eq!(aggregate.total_volume, 0.0);
        assert_eq!(aggregate.total_sets, 0);
        assert_eq!(aggregate.weekly_workout_count, 0);

        let labels = aggregate
            .daily_volume_data
            .iter()
            .map(|day| day.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(
            aggregate.daily_volume_data[6].date,
            NaiveDate::from_ymd_opt(2026, 3, 15).expect("date")
        );
    }

    #[test]
    fn two_sessions_on_the_same_day_add_up() {
        let rows = vec![
            set_row("morning", utc(10, 7, 0, 0), 100.0.into(), 3.0.into()),
            set_row("evening", utc(10, 19, 0, 0), 60.0.into(), 5.0.into()),
        ];

        let aggregate = aggregate_week(&sessions(&rows), &canonical(), &wednesday());

        assert_eq!(aggregate.daily_volume_data[1].volume, 600.0);
        assert_eq!(aggregate.weekly_workout_count, 2);
    }

    #[test]
    fn repeated_session_is_counted_once() {
        let session = sessions(&[set_row("s1", utc(10, 7, 0, 0), 100.0.into(), 3.0.into())]);
        let doubled = [session.clone(), session].concat();

        let aggregate = aggregate_week(&doubled, &canonical(), &wednesday());

        assert_eq!(aggregate.weekly_workout_count, 1);
        assert_eq!(aggregate.total_volume, 300.0);
    }

    #[test]
    fn future_sessions_count_in_totals_but_not_in_daily_series() {
        let rows = vec![set_row("skewed", utc(20, 9, 0, 0), 100.0.into(), 1.0.into())];

        let aggregate = aggregate_week(&sessions(&rows), &canonical(), &wednesday());

        assert_eq!(aggregate.total_volume, 100.0);
        assert_eq!(aggregate.weekly_workout_count, 1);
        assert!(aggregate.daily_volume_data.iter().all(|day| day.volume == 0.0));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let rows = vec![
            set_row("a", utc(9, 8, 0, 0), 80.0.into(), 8.0.into()),
            set_row("b", utc(11, 8, 0, 0), "42.5".into(), "10".into()),
        ];
        let input = sessions(&rows);

        let first = aggregate_week(&input, &canonical(), &wednesday());
        let second = aggregate_week(&input, &canonical(), &wednesday());

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json")
        );
    }
}
