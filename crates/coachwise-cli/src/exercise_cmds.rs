//! Operator CLI handlers for `coachwise exercise` subcommands.
//!
//! Implements:
//! - `coachwise exercise create <file>` -- create a shared exercise from JSON
//! - `coachwise exercise show <id>`     -- print one exercise and its sets
//! - `coachwise exercise list`          -- list exercises

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use coachwise_core::exercise::{self, ExerciseSpec};
use coachwise_db::models::{ExerciseSet, ExerciseWithSets, SetKind};
use coachwise_db::queries::exercises::{ExerciseFilter, Visibility};

use crate::ExerciseCommands;

/// Dispatch an `ExerciseCommands` variant to its handler.
pub async fn run_exercise_command(command: ExerciseCommands, pool: &PgPool) -> Result<()> {
    match command {
        ExerciseCommands::Create { file } => cmd_create(pool, &file).await,
        ExerciseCommands::Show { exercise_id } => cmd_show(pool, &exercise_id).await,
        ExerciseCommands::List { public, name } => cmd_list(pool, public, name).await,
    }
}

// -----------------------------------------------------------------------
// coachwise exercise create <file>
// -----------------------------------------------------------------------

/// Create an exercise with no owner from a JSON request body on disk.
async fn cmd_create(pool: &PgPool, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read exercise file: {file_path}"))?;
    let spec: ExerciseSpec = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse exercise file: {file_path}"))?;

    let created = exercise::create_exercise(pool, None, &spec).await?;

    println!("Exercise created.");
    println!();
    print_exercise(&created);
    Ok(())
}

// -----------------------------------------------------------------------
// coachwise exercise show <id>
// -----------------------------------------------------------------------

async fn cmd_show(pool: &PgPool, exercise_id: &str) -> Result<()> {
    let id = Uuid::parse_str(exercise_id)
        .with_context(|| format!("invalid exercise ID: {exercise_id}"))?;
    let aggregate = exercise::get_exercise(pool, id).await?;
    print_exercise(&aggregate);
    Ok(())
}

// -----------------------------------------------------------------------
// coachwise exercise list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool, public: Option<bool>, name: Option<String>) -> Result<()> {
    let filter = ExerciseFilter {
        visibility: Visibility::All,
        public,
        name,
    };
    let exercises = exercise::list_exercises(pool, &filter).await?;

    if exercises.is_empty() {
        println!("No exercises found.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = exercises
        .iter()
        .map(|e| e.exercise.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<id_w$}  {:<name_w$}  {:<6}  {:>4}  UPDATED",
        "ID", "NAME", "PUBLIC", "SETS",
    );
    for aggregate in &exercises {
        let e = &aggregate.exercise;
        println!(
            "{:<id_w$}  {:<name_w$}  {:<6}  {:>4}  {}",
            e.id,
            e.name,
            if e.public { "yes" } else { "no" },
            aggregate.sets.len(),
            e.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Formatting
// -----------------------------------------------------------------------

fn print_exercise(aggregate: &ExerciseWithSets) {
    let e = &aggregate.exercise;
    println!("  ID:          {}", e.id);
    println!("  Name:        {}", e.name);
    if let Some(description) = &e.description {
        println!("  Description: {description}");
    }
    match e.owner_id {
        Some(owner) => println!("  Owner:       {owner}"),
        None => println!("  Owner:       (shared)"),
    }
    println!("  Public:      {}", e.public);
    println!("  Updated:     {}", e.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if aggregate.sets.is_empty() {
        println!("  Sets:        none");
        return;
    }
    println!("  Sets:");
    for set in &aggregate.sets {
        println!("    {}", describe_set(set));
    }
}

/// One-line summary such as `#2 Working: 8 reps, rest 1m30s`.
fn describe_set(set: &ExerciseSet) -> String {
    let mut line = format!("#{}", set.set_number);
    if let Some(name) = &set.name {
        line.push(' ');
        line.push_str(name);
    }
    line.push(':');
    match set.kind {
        Some(SetKind::Reps { rep_count }) => line.push_str(&format!(" {rep_count} reps,")),
        Some(SetKind::Timed { duration }) => {
            line.push_str(&format!(" hold {},", format_nanos(duration)));
        }
        None => {}
    }
    line.push_str(&format!(" rest {}", format_nanos(set.rest_time)));
    line
}

/// Render a nanosecond duration at second precision, e.g. `1m30s`.
fn format_nanos(nanos: i64) -> String {
    let total_secs = nanos / 1_000_000_000;
    let (hours, minutes, seconds) = (total_secs / 3600, total_secs / 60 % 60, total_secs % 60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m{seconds}s"),
        _ => format!("{hours}h{minutes}m{seconds}s"),
    }
}
