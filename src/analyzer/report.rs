use crate::analyzer::WeeklyDashboard;
use crate::analyzer::sessions::SessionSummary;
use crate::analyzer::streak::TrainingStatus;

pub fn render_markdown(dashboard: &WeeklyDashboard) -> String {
    let aggregate = &dashboard.aggregate;

    let muscle_rows = aggregate
        .weekly_volume_totals
        .iter()
        .map(|(group, volume)| {
            let sets = aggregate
                .weekly_sets_totals
                .get(group)
                .copied()
                .unwrap_or_default();
            let share = if aggregate.total_volume > 0.0 {
                volume / aggregate.total_volume * 100.0
            } else {
                0.0
            };

            format!(
                "| {} | {} | {} | {:.0}% |",
                group,
                format_volume(*volume),
                sets,
                share
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let peak_volume = aggregate
        .daily_volume_data
        .iter()
        .map(|day| day.volume)
        .fold(0.0_f64, f64::max);
    let daily_rows = aggregate
        .daily_volume_data
        .iter()
        .map(|day| {
            format!(
                "{} {} {:<20} {}",
                day.label,
                day.date.format("%m-%d"),
                volume_bar(day.volume, peak_volume, 20),
                format_volume(day.volume)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let target = &dashboard.target;
    let streak = &dashboard.streak;
    let last_workout = streak
        .last_workout_date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "# Week of {}\n\n\
## Summary\n\
- Workouts: {} / {} target{}\n\
- Sets: {}\n\
- Volume: {}\n\
- PRs: {}\n\
- Streak: {} day(s), {} (last workout: {})\n\n\
## Muscle groups\n\
| Group | Volume | Sets | Share |\n\
|---|---|---|---|\n\
{}\n\n\
## Daily volume\n\
```\n{}\n```\n\n\
## Recent sessions\n\
{}\n",
        aggregate.week_start.format("%Y-%m-%d"),
        aggregate.weekly_workout_count,
        target.target,
        if target.met { " (met)" } else { "" },
        aggregate.total_sets,
        format_volume(aggregate.total_volume),
        aggregate.weekly_pr_count,
        streak.current_days,
        status_label(streak.status),
        last_workout,
        muscle_rows,
        daily_rows,
        list_sessions(&dashboard.recent_sessions, 10)
    )
}

pub fn list_sessions(sessions: &[SessionSummary], limit: usize) -> String {
    if sessions.is_empty() {
        return "- No sessions".to_string();
    }

    sessions
        .iter()
        .take(limit)
        .map(|session| {
            let when = session
                .completed_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .or_else(|| session.session_date.map(|date| date.to_string()))
                .unwrap_or_else(|| "-".to_string());

            format!(
                "- {} {} - {} exercise(s), {} set(s), {}{}",
                when,
                session.template_name.as_deref().unwrap_or("Ad-hoc workout"),
                session.exercise_count,
                session.set_count(),
                format_volume(session.total_volume),
                session
                    .duration_label
                    .as_deref()
                    .map(|duration| format!(" ({duration})"))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_label(status: TrainingStatus) -> &'static str {
    match status {
        TrainingStatus::Active => "active",
        TrainingStatus::Resting => "resting",
        TrainingStatus::Inactive => "inactive",
    }
}

fn volume_bar(volume: f64, peak: f64, width: usize) -> String {
    if peak <= 0.0 || volume <= 0.0 {
        return String::new();
    }

    let filled = ((volume / peak) * width as f64).round().max(1.0) as usize;
    "#".repeat(filled.min(width))
}

fn format_volume(volume: f64) -> String {
    if volume >= 1000.0 {
        format!("{:.1}t", volume / 1000.0)
    } else if volume.fract() == 0.0 {
        format!("{volume:.0}kg")
    } else {
        format!("{volume:.1}kg")
    }
}
