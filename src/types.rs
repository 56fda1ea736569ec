//! Core types for the planner store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task kind discriminant, stored as text in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "planned")]
    Planned,
    #[serde(rename = "allday")]
    AllDay,
    #[serde(rename = "someday")]
    Someday,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Planned => "planned",
            TaskKind::AllDay => "allday",
            TaskKind::Someday => "someday",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(TaskKind::Planned),
            "allday" => Some(TaskKind::AllDay),
            "someday" => Some(TaskKind::Someday),
            _ => None,
        }
    }
}

/// When a task happens. Each variant carries only the fields meaningful to
/// it: a planned task has a start instant, an all-day task has a calendar
/// date, a someday task has neither.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Schedule {
    #[serde(rename = "planned")]
    Planned {
        start_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_at: Option<DateTime<Utc>>,
    },
    #[serde(rename = "allday")]
    AllDay { date: NaiveDate },
    #[serde(rename = "someday")]
    Someday,
}

impl Schedule {
    pub fn kind(&self) -> TaskKind {
        match self {
            Schedule::Planned { .. } => TaskKind::Planned,
            Schedule::AllDay { .. } => TaskKind::AllDay,
            Schedule::Someday => TaskKind::Someday,
        }
    }

    /// The UTC calendar day this task belongs to, if any.
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Planned { start_at, .. } => Some(start_at.date_naive()),
            Schedule::AllDay { date } => Some(*date),
            Schedule::Someday => None,
        }
    }

    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Planned { start_at, .. } => Some(*start_at),
            _ => None,
        }
    }

    /// The ordering bucket this schedule falls into.
    pub fn bucket(&self) -> Bucket {
        match self.day() {
            Some(d) => Bucket::Day(d),
            None => Bucket::Someday,
        }
    }
}

/// Ordering bucket: one user's calendar day, or their someday pile.
/// `order_index` values are dense and zero-based within (user, bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Day(NaiveDate),
    Someday,
}

/// Effort rating carried over from the capture flow (1 = trivial,
/// 5 = daunting).
pub const SPICINESS_DEFAULT: i32 = 3;

/// Clamp a spiciness rating to the valid 1..=5 range.
pub fn clamp_spiciness(s: i32) -> i32 {
    s.clamp(1, 5)
}

/// A task row with its subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    pub spiciness: i32,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub order_index: i64,
    pub is_completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// A subtask, owned by exactly one task. `order_index` is dense and
/// zero-based among the task's subtasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub order_index: i64,
    pub is_completed: bool,
    pub estimated_minutes: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDraft {
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    /// Defaults to [`SPICINESS_DEFAULT`]; out-of-range values are clamped.
    pub spiciness: Option<i32>,
    #[serde(flatten)]
    pub schedule: Schedule,
    #[serde(default)]
    pub subtasks: Vec<SubtaskDraft>,
}

/// Input for creating a subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskDraft {
    pub title: String,
    /// Explicit position among existing subtasks; appended when absent.
    pub order_index: Option<i64>,
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub is_completed: bool,
}

/// Field updates for a task. `None` leaves the field unchanged. Changing
/// the schedule may move the task to another ordering bucket.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub category: Option<Option<String>>,
    pub spiciness: Option<i32>,
    pub schedule: Option<Schedule>,
}

/// One entry of a full subtask replacement list. Rows with an `id` update
/// that subtask; rows without one are inserted. Subtasks of the parent not
/// present in the list are deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskUpsert {
    pub id: Option<String>,
    pub title: String,
    /// Relative position; the store renumbers densely after sorting by this.
    pub order_index: i64,
    #[serde(default)]
    pub is_completed: bool,
    pub estimated_minutes: Option<i64>,
}

/// Filters for listing a user's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub kind: Option<TaskKind>,
    pub day: Option<NaiveDate>,
    pub include_subtasks: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn planned_schedule_derives_day_from_start() {
        let start = Utc.with_ymd_and_hms(2025, 6, 3, 10, 30, 0).unwrap();
        let s = Schedule::Planned {
            start_at: start,
            end_at: None,
        };
        assert_eq!(s.day(), NaiveDate::from_ymd_opt(2025, 6, 3));
        assert_eq!(s.bucket(), Bucket::Day(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()));
    }

    #[test]
    fn someday_schedule_has_no_day() {
        assert_eq!(Schedule::Someday.day(), None);
        assert_eq!(Schedule::Someday.bucket(), Bucket::Someday);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [TaskKind::Planned, TaskKind::AllDay, TaskKind::Someday] {
            assert_eq!(TaskKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TaskKind::from_str("weekly"), None);
    }

    #[test]
    fn spiciness_is_clamped() {
        assert_eq!(clamp_spiciness(0), 1);
        assert_eq!(clamp_spiciness(3), 3);
        assert_eq!(clamp_spiciness(9), 5);
    }
}
