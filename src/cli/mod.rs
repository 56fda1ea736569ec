//! CLI command definitions for dayplan.
//!
//! This module defines the CLI structure using clap's derive macros; the
//! binary entry point dispatches on [`Command`].

use crate::db::stats::StatsPeriod;
use crate::types::TaskKind;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Daily task planner with per-day ordering.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// User the command acts for
    #[arg(short, long, global = true, default_value = "local")]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task
    Add(AddArgs),
    /// List tasks
    List(ListArgs),
    /// Show one task with its subtasks
    Show {
        /// Task id
        id: String,
    },
    /// Mark a task done (or pending again with --undo)
    Done {
        /// Task id
        id: String,
        /// Mark pending instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a task and close the gap in its day
    Remove {
        /// Task id
        id: String,
    },
    /// Apply an explicit order to a set of tasks (drag-and-drop by hand)
    Reorder {
        /// Task ids in the desired order
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Reschedule a task, re-slotting it into the target day
    Move(MoveArgs),
    /// Work with subtasks
    Subtask {
        #[command(subcommand)]
        action: SubtaskCommand,
    },
    /// Created/completed counts for a period
    Stats {
        /// Reporting period
        #[arg(long, value_enum, default_value_t = PeriodArg::Monthly)]
        period: PeriodArg,
    },
}

/// Schedule flags shared by `add` and `move`: exactly one of --at, --on,
/// --someday.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Start instant for a planned task (RFC 3339, e.g. 2025-06-03T10:00:00Z)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// End instant for a planned task (requires --at)
    #[arg(long, requires = "at")]
    pub end: Option<DateTime<Utc>>,

    /// Calendar date for an all-day task (YYYY-MM-DD)
    #[arg(long, conflicts_with = "at")]
    pub on: Option<NaiveDate>,

    /// No date at all
    #[arg(long, conflicts_with_all = ["at", "on"])]
    pub someday: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    #[command(flatten)]
    pub schedule: ScheduleArgs,

    /// Category label
    #[arg(long)]
    pub category: Option<String>,

    /// Effort rating 1-5
    #[arg(long)]
    pub spiciness: Option<i32>,

    /// Subtask title (repeatable, kept in given order)
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Task id
    pub id: String,

    #[command(flatten)]
    pub schedule: ScheduleArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only this calendar day (YYYY-MM-DD)
    #[arg(long)]
    pub day: Option<NaiveDate>,

    /// Only this kind of task
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    /// Include each task's subtasks
    #[arg(long)]
    pub subtasks: bool,
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Add a subtask to a task
    Add {
        /// Parent task id
        task_id: String,
        /// Subtask title
        title: String,
        /// Position among existing subtasks (appends when absent)
        #[arg(long)]
        position: Option<i64>,
        /// Estimated minutes
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Mark a subtask done (or pending again with --undo)
    Done {
        /// Subtask id
        id: String,
        /// Mark pending instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a subtask and renumber its siblings
    Remove {
        /// Subtask id
        id: String,
    },
}

/// Task kind filter for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Planned,
    Allday,
    Someday,
}

impl From<KindArg> for TaskKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Planned => TaskKind::Planned,
            KindArg::Allday => TaskKind::AllDay,
            KindArg::Someday => TaskKind::Someday,
        }
    }
}

/// Stats period for `stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Weekly,
    Monthly,
    Yearly,
}

impl From<PeriodArg> for StatsPeriod {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Weekly => StatsPeriod::Weekly,
            PeriodArg::Monthly => StatsPeriod::Monthly,
            PeriodArg::Yearly => StatsPeriod::Yearly,
        }
    }
}
