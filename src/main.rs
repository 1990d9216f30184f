mod analyzer;
mod api;
mod cli;
mod config;
mod db;
mod import;

use crate::analyzer::muscle::MuscleRules;
use crate::analyzer::report;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::db::{Database, ExerciseSelection, HistoryWindow};
use crate::import::WorkoutExport;
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => handle_init(),
        Commands::Config { command } => handle_config_command(command),
        Commands::Status { user } => handle_status(user),
        Commands::Doctor => handle_doctor(),
        Commands::Import { file } => handle_import(&file),
        Commands::Dashboard { user, json } => handle_dashboard(user, json),
        Commands::Sessions { user, limit } => handle_sessions(user, limit),
        Commands::ClearHistory {
            user,
            days,
            exercises,
        } => handle_clear_history(user, days, exercises),
        Commands::Serve => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_init() -> Result<()> {
    let config = load_or_default_config()?;
    let _ = Database::open(&config.db_path)?;

    println!("liftlens initialized");
    println!("- config: {}", Config::config_path()?.display());
    println!("- database: {}", config.db_path.display());
    println!("- muscle rules: {}", config.muscle_rules_path.display());
    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status(user: Option<String>) -> Result<()> {
    let config = load_config()?;
    let user_id = user.unwrap_or_else(|| config.user_id.clone());
    let database = Database::open(&config.db_path)?;

    println!("liftlens status");
    println!("- user: {user_id}");
    println!("- sessions: {}", database.session_count(&user_id)?);
    println!(
        "- last_completed_at: {}",
        database
            .latest_completed_at(&user_id)?
            .map(|timestamp| timestamp.with_timezone(&Local).to_rfc3339())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "- canonical muscle groups: {}",
        database.canonical_muscle_groups()?.join(", ")
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(database) => {
            println!("[OK] SQLite reachable: {}", config.db_path.display());
            match database.canonical_muscle_groups() {
                Ok(groups) if groups.is_empty() => {
                    println!("[WARN] exercise catalog is empty; run `liftlens import` first");
                    issues.push("empty catalog".to_string());
                }
                Ok(groups) => println!("[OK] {} canonical muscle group(s)", groups.len()),
                Err(error) => {
                    println!("[WARN] catalog query failed: {error}");
                    issues.push("catalog unreadable".to_string());
                }
            }
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    match check_muscle_rules(&config.muscle_rules_path) {
        Ok(message) => println!("[OK] {message}"),
        Err(error) => {
            println!("[WARN] muscle rules unusable, built-in rules apply: {error:#}");
            issues.push("muscle rules invalid".to_string());
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn check_muscle_rules(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(format!(
            "muscle rules file not found, built-in rules apply: {}",
            path.display()
        ));
    }

    let rules = MuscleRules::load(path)?;
    Ok(format!(
        "muscle rules loaded: {} synonym(s), {} keyword rule(s)",
        rules.synonyms.len(),
        rules.keywords.len()
    ))
}

fn handle_import(file: &Path) -> Result<()> {
    let config = load_config()?;
    let export = WorkoutExport::load(file)?;
    let mut database = Database::open(&config.db_path)?;

    let summary = import::import_export(&mut database, &config.user_id, &export)?;

    println!("Import complete: {}", file.display());
    println!("- exercises: {}", summary.exercises);
    println!("- sessions: {}", summary.sessions);
    println!("- set logs: {}", summary.set_logs);
    Ok(())
}

fn handle_dashboard(user: Option<String>, json: bool) -> Result<()> {
    let config = load_config()?;
    let user_id = user.unwrap_or_else(|| config.user_id.clone());
    let dashboard = analyzer::load_weekly_dashboard(&config, &user_id, &Local::now())?;

    if json {
        let content =
            serde_json::to_string_pretty(&dashboard).context("Failed to serialize dashboard")?;
        println!("{content}");
    } else {
        println!("{}", report::render_markdown(&dashboard));
    }

    Ok(())
}

fn handle_sessions(user: Option<String>, limit: usize) -> Result<()> {
    let config = load_config()?;
    let user_id = user.unwrap_or_else(|| config.user_id.clone());
    let sessions = analyzer::load_recent_sessions(&config, &user_id)?;

    println!(
        "Sessions in the last {} day(s): {}",
        config.recent_window_days,
        sessions.len()
    );
    println!("{}", report::list_sessions(&sessions, limit));
    Ok(())
}

fn handle_clear_history(
    user: Option<String>,
    days: Option<u32>,
    exercises: Vec<String>,
) -> Result<()> {
    let config = load_config()?;
    let user_id = user.unwrap_or_else(|| config.user_id.clone());
    let window = HistoryWindow::from_days(days)?;
    let selection = if exercises.is_empty() {
        ExerciseSelection::All
    } else {
        ExerciseSelection::Only(exercises)
    };

    let mut database = Database::open(&config.db_path)?;
    let cleared = database.clear_exercise_history(&user_id, window, &selection, Utc::now())?;

    println!("History cleared for {user_id}");
    println!("- set logs deleted: {}", cleared.set_logs_deleted);
    println!("- sessions deleted: {}", cleared.sessions_deleted);
    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let api_config = Arc::new(config);

    info!("liftlens service started");

    tokio::select! {
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `liftlens init` first.".to_string())
}
