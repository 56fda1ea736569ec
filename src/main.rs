//! dayplan CLI: validates input, calls the store, prints JSON.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use dayplan::cli::{Cli, Command, ScheduleArgs, SubtaskCommand};
use dayplan::config::PlannerConfig;
use dayplan::db::stats::StatsPeriod;
use dayplan::db::Database;
use dayplan::error::Error;
use dayplan::logging;
use dayplan::types::{Schedule, SubtaskDraft, TaskDraft, TaskFilter, TaskPatch};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = PlannerConfig::load(cli.config.as_deref())?;
    let db_path = config.database_path(cli.database.as_deref());
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(database = %db_path.display(), "opening database");
    let db = Database::open(&db_path)?;

    let user = cli.user;

    match cli.command {
        Command::Add(args) => {
            let schedule = schedule_from_args(&args.schedule)?;
            let draft = TaskDraft {
                user_id: user,
                title: args.title,
                category: args.category,
                spiciness: args.spiciness,
                schedule,
                subtasks: args
                    .subtasks
                    .into_iter()
                    .map(|title| SubtaskDraft {
                        title,
                        order_index: None,
                        estimated_minutes: None,
                        is_completed: false,
                    })
                    .collect(),
            };
            let task = db.create_task(draft, config.someday_placement)?;
            print_json(&task)
        }
        Command::List(args) => {
            let filter = TaskFilter {
                kind: args.kind.map(Into::into),
                day: args.day,
                include_subtasks: args.subtasks,
            };
            let tasks = db.list_tasks(&user, &filter)?;
            print_json(&tasks)
        }
        Command::Show { id } => match db.get_task(&user, &id)? {
            Some(task) => print_json(&task),
            None => Err(Error::task_not_found(&id).into()),
        },
        Command::Done { id, undo } => {
            let task = db.set_task_completed(&user, &id, !undo)?;
            print_json(&task)
        }
        Command::Remove { id } => {
            let shifts = db.delete_task(&user, &id)?;
            print_json(&json!({ "deleted": id, "shifted": shifts }))
        }
        Command::Reorder { ids } => {
            let updates = db.reorder_tasks(&user, &ids)?;
            print_json(&updates)
        }
        Command::Move(args) => {
            let schedule = schedule_from_args(&args.schedule)?;
            let patch = TaskPatch {
                schedule: Some(schedule),
                ..Default::default()
            };
            let task = db.update_task(&user, &args.id, patch, config.someday_placement)?;
            print_json(&task)
        }
        Command::Subtask { action } => match action {
            SubtaskCommand::Add {
                task_id,
                title,
                position,
                minutes,
            } => {
                let draft = SubtaskDraft {
                    title,
                    order_index: position,
                    estimated_minutes: minutes,
                    is_completed: false,
                };
                let subtask = db.add_subtask(&user, &task_id, draft)?;
                print_json(&subtask)
            }
            SubtaskCommand::Done { id, undo } => {
                let subtask = db.set_subtask_completed(&user, &id, !undo)?;
                print_json(&subtask)
            }
            SubtaskCommand::Remove { id } => {
                let shifts = db.delete_subtask(&user, &id)?;
                print_json(&json!({ "deleted": id, "shifted": shifts }))
            }
        },
        Command::Stats { period } => {
            let period: StatsPeriod = period.into();
            let (start, end) = period.range_containing(Utc::now());
            let stats = db.completion_stats(&user, start, end)?;
            print_json(&stats)
        }
    }
}

/// Build a schedule from the shared CLI flags. Exactly one of --at, --on,
/// --someday must be present (clap enforces mutual exclusion; absence of
/// all three is caught here).
fn schedule_from_args(args: &ScheduleArgs) -> Result<Schedule> {
    if let Some(start_at) = args.at {
        return Ok(Schedule::Planned {
            start_at,
            end_at: args.end,
        });
    }
    if let Some(date) = args.on {
        return Ok(Schedule::AllDay { date });
    }
    if args.someday {
        return Ok(Schedule::Someday);
    }
    Err(Error::invalid_value("schedule", "one of --at, --on, --someday is required").into())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
