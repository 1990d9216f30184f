use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Active,
    Resting,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub target: u32,
    pub completed: u32,
    pub remaining: u32,
    pub met: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current_days: u32,
    pub last_workout_date: Option<NaiveDate>,
    pub status: TrainingStatus,
}

pub fn target_progress(completed: usize, target: u32) -> TargetProgress {
    let completed = u32::try_from(completed).unwrap_or(u32::MAX);

    TargetProgress {
        target,
        completed,
        remaining: target.saturating_sub(completed),
        met: completed >= target,
    }
}

/// Consecutive training days ending today or yesterday, in `now`'s timezone.
pub fn streak_summary<Tz: TimeZone>(
    completions: &[DateTime<Utc>],
    now: &DateTime<Tz>,
) -> StreakSummary {
    let timezone = now.timezone();
    let today = now.date_naive();
    let days = completions
        .iter()
        .map(|completed| completed.with_timezone(&timezone).date_naive())
        .filter(|date| *date <= today)
        .collect::<BTreeSet<_>>();

    let Some(last) = days.last().copied() else {
        return StreakSummary {
            current_days: 0,
            last_workout_date: None,
            status: TrainingStatus::Inactive,
        };
    };

    let days_since = (today - last).num_days();
    let status = match days_since {
        0..=1 => TrainingStatus::Active,
        2..=6 => TrainingStatus::Resting,
        _ => TrainingStatus::Inactive,
    };

    let current_days = if days_since > 1 {
        0
    } else {
        (0_u32..)
            .take_while(|back| days.contains(&(last - Duration::days(i64::from(*back)))))
            .count() as u32
    };

    StreakSummary {
        current_days,
        last_workout_date: Some(last),
        status,
    }
}
