//! Task CRUD and ordering operations.
//!
//! Every mutation here runs as a single transaction: read the scope
//! snapshot, compute placement/shifts via [`crate::order`], persist the
//! shifts together with the triggering write. Density of `order_index`
//! within each (user, bucket) scope is restored before commit.

use super::{now_ms, subtasks, Database};
use crate::error::{Error, Result};
use crate::order::{self, OrderShift, SiblingSlot, SomedayPlacement};
use crate::types::{
    clamp_spiciness, Bucket, Schedule, Task, TaskDraft, TaskFilter, TaskKind, TaskPatch,
    SPICINESS_DEFAULT,
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Raw column values of one `tasks` row.
#[derive(Debug)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    category: Option<String>,
    spiciness: i32,
    kind: String,
    day: Option<String>,
    start_at: Option<i64>,
    end_at: Option<i64>,
    order_index: i64,
    is_completed: bool,
    completed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

fn read_task_row(row: &Row) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        category: row.get("category")?,
        spiciness: row.get("spiciness")?,
        kind: row.get("kind")?,
        day: row.get("day")?,
        start_at: row.get("start_at")?,
        end_at: row.get("end_at")?,
        order_index: row.get("order_index")?,
        is_completed: row.get("is_completed")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn task_from_row(row: TaskRow) -> Result<Task> {
    let schedule = schedule_from_columns(&row.kind, row.day.as_deref(), row.start_at, row.end_at)?;
    Ok(Task {
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        category: row.category,
        spiciness: row.spiciness,
        schedule,
        order_index: row.order_index,
        is_completed: row.is_completed,
        completed_at: row.completed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        subtasks: Vec::new(),
    })
}

fn schedule_from_columns(
    kind: &str,
    day: Option<&str>,
    start_at: Option<i64>,
    end_at: Option<i64>,
) -> Result<Schedule> {
    match kind {
        "planned" => {
            let ms = start_at.ok_or_else(|| Error::internal("planned task row missing start_at"))?;
            Ok(Schedule::Planned {
                start_at: dt_from_ms(ms)?,
                end_at: end_at.map(dt_from_ms).transpose()?,
            })
        }
        "allday" => {
            let d = day.ok_or_else(|| Error::internal("allday task row missing day"))?;
            Ok(Schedule::AllDay { date: parse_day(d)? })
        }
        "someday" => Ok(Schedule::Someday),
        other => Err(Error::internal(format!("unknown task kind: {}", other))),
    }
}

fn dt_from_ms(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::internal(format!("timestamp out of range: {}", ms)))
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::internal(format!("bad day column {:?}: {}", s, e)))
}

pub(crate) fn day_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Internal helper to get a task row using an existing connection.
fn get_task_row(conn: &Connection, user_id: &str, task_id: &str) -> Result<Option<TaskRow>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1 AND user_id = ?2")?;

    match stmt.query_row(params![task_id, user_id], read_task_row) {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read the scope snapshot for (user, bucket), sorted by `order_index`.
fn scope_slots(conn: &Connection, user_id: &str, bucket: &Bucket) -> Result<Vec<SiblingSlot>> {
    scope_slots_excluding(conn, user_id, bucket, "")
}

/// Same as [`scope_slots`] but leaves out one task id (for re-placement of
/// an existing row).
fn scope_slots_excluding(
    conn: &Connection,
    user_id: &str,
    bucket: &Bucket,
    skip_id: &str,
) -> Result<Vec<SiblingSlot>> {
    let (sql, key) = match bucket {
        Bucket::Day(d) => (
            "SELECT id, order_index, kind, start_at FROM tasks
             WHERE user_id = ?1 AND day = ?2 AND id <> ?3
             ORDER BY order_index ASC",
            day_str(*d),
        ),
        Bucket::Someday => (
            "SELECT id, order_index, kind, start_at FROM tasks
             WHERE user_id = ?1 AND kind = ?2 AND id <> ?3
             ORDER BY order_index ASC",
            "someday".to_string(),
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id, key, skip_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut slots = Vec::with_capacity(rows.len());
    for (id, order_index, kind, start) in rows {
        let kind = TaskKind::from_str(&kind)
            .ok_or_else(|| Error::internal(format!("unknown task kind: {}", kind)))?;
        slots.push(SiblingSlot {
            id,
            order_index,
            kind,
            start_at: start.map(dt_from_ms).transpose()?,
        });
    }
    Ok(slots)
}

/// Persist sibling order moves, scoped to the owning user.
fn apply_shifts(conn: &Connection, user_id: &str, shifts: &[OrderShift], now: i64) -> Result<()> {
    for shift in shifts {
        conn.execute(
            "UPDATE tasks SET order_index = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![shift.order_index, now, shift.id, user_id],
        )?;
    }
    Ok(())
}

/// True when a schedule change leaves the task's slot untouched (same
/// bucket, same kind group, same start instant).
fn slot_unchanged(old: &Schedule, new: &Schedule) -> bool {
    old.bucket() == new.bucket() && old.kind() == new.kind() && old.start_at() == new.start_at()
}

impl Database {
    /// Create a new task, slotting it into its scope and shifting siblings
    /// to make room. Subtask drafts are renumbered densely after sorting
    /// by their supplied order values.
    pub fn create_task(&self, draft: TaskDraft, someday: SomedayPlacement) -> Result<Task> {
        let TaskDraft {
            user_id,
            title,
            category,
            spiciness,
            schedule,
            subtasks: subtask_drafts,
        } = draft;

        if user_id.trim().is_empty() {
            return Err(Error::missing_field("user_id"));
        }
        if title.trim().is_empty() {
            return Err(Error::missing_field("title"));
        }
        for sub in &subtask_drafts {
            if sub.title.trim().is_empty() {
                return Err(Error::missing_field("subtasks.title"));
            }
        }

        let spiciness = clamp_spiciness(spiciness.unwrap_or(SPICINESS_DEFAULT));
        let task_id = Uuid::now_v7().to_string();
        let now = now_ms();

        // Stable sort by the caller-supplied order (position when absent),
        // then renumber 0..N-1.
        let mut drafts: Vec<(i64, crate::types::SubtaskDraft)> = subtask_drafts
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s.order_index.unwrap_or(i as i64), s))
            .collect();
        drafts.sort_by_key(|(key, _)| *key);

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let slots = scope_slots(&tx, &user_id, &schedule.bucket())?;
            let placement = order::place_new(&schedule, &slots, someday);
            apply_shifts(&tx, &user_id, &placement.shifts, now)?;

            tx.execute(
                "INSERT INTO tasks (
                    id, user_id, title, category, spiciness, kind, day,
                    start_at, end_at, order_index, is_completed, completed_at,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    &task_id,
                    &user_id,
                    &title,
                    &category,
                    spiciness,
                    schedule.kind().as_str(),
                    schedule.day().map(day_str),
                    schedule.start_at().map(|t| t.timestamp_millis()),
                    match schedule {
                        Schedule::Planned { end_at, .. } => end_at.map(|t| t.timestamp_millis()),
                        _ => None,
                    },
                    placement.order_index,
                    false,
                    Option::<i64>::None,
                    now,
                    now,
                ],
            )?;

            let mut saved = Vec::with_capacity(drafts.len());
            for (idx, (_, sub)) in drafts.into_iter().enumerate() {
                saved.push(subtasks::insert_subtask_row(
                    &tx,
                    &task_id,
                    &sub.title,
                    idx as i64,
                    sub.is_completed,
                    sub.estimated_minutes,
                    now,
                )?);
            }

            tx.commit()?;

            Ok(Task {
                id: task_id,
                user_id,
                title,
                category,
                spiciness,
                schedule,
                order_index: placement.order_index,
                is_completed: false,
                completed_at: None,
                created_at: now,
                updated_at: now,
                subtasks: saved,
            })
        })
    }

    /// Get a task (with its subtasks) by id, scoped to the owning user.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let row = get_task_row(conn, user_id, task_id)?;
            match row {
                None => Ok(None),
                Some(row) => {
                    let mut task = task_from_row(row)?;
                    task.subtasks = subtasks::subtasks_for_task(conn, &task.id)?;
                    Ok(Some(task))
                }
            }
        })
    }

    /// List a user's tasks with optional kind/day filters, in scope order.
    pub fn list_tasks(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT * FROM tasks WHERE user_id = ?");
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
                vec![Box::new(user_id.to_string())];

            if let Some(kind) = filter.kind {
                sql.push_str(" AND kind = ?");
                params_vec.push(Box::new(kind.as_str().to_string()));
            }

            if let Some(day) = filter.day {
                sql.push_str(" AND day = ?");
                params_vec.push(Box::new(day_str(day)));
            }

            // Dated scopes first (chronologically), someday pile last.
            sql.push_str(" ORDER BY day IS NULL, day ASC, order_index ASC");

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_refs.as_slice(), read_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut tasks = Vec::with_capacity(rows.len());
            for row in rows {
                tasks.push(task_from_row(row)?);
            }

            if filter.include_subtasks && !tasks.is_empty() {
                let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
                let mut by_task = subtasks::subtasks_by_task(conn, &ids)?;
                for task in &mut tasks {
                    if let Some(subs) = by_task.remove(&task.id) {
                        task.subtasks = subs;
                    }
                }
            }

            Ok(tasks)
        })
    }

    /// Update a task's fields. A schedule change that moves the task (new
    /// day, new kind group, or new start instant) closes the gap in the
    /// old scope and computes a fresh placement in the new one.
    pub fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        patch: TaskPatch,
        someday: SomedayPlacement,
    ) -> Result<Task> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(Error::invalid_value("title", "title must not be empty"));
            }
        }

        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row = get_task_row(&tx, user_id, task_id)?
                .ok_or_else(|| Error::task_not_found(task_id))?;
            let current = task_from_row(row)?;

            let title = patch.title.unwrap_or_else(|| current.title.clone());
            let category = patch.category.unwrap_or_else(|| current.category.clone());
            let spiciness = patch
                .spiciness
                .map(clamp_spiciness)
                .unwrap_or(current.spiciness);

            let (schedule, order_index) = match patch.schedule {
                None => (current.schedule, current.order_index),
                Some(new) if slot_unchanged(&current.schedule, &new) => {
                    (new, current.order_index)
                }
                Some(new) => {
                    let old_bucket = current.schedule.bucket();
                    let old_slots = scope_slots_excluding(&tx, user_id, &old_bucket, task_id)?;
                    let closing = order::close_gap(current.order_index, &old_slots);
                    apply_shifts(&tx, user_id, &closing, now)?;

                    let slots = scope_slots_excluding(&tx, user_id, &new.bucket(), task_id)?;
                    let placement = order::place_new(&new, &slots, someday);
                    apply_shifts(&tx, user_id, &placement.shifts, now)?;
                    (new, placement.order_index)
                }
            };

            tx.execute(
                "UPDATE tasks SET
                    title = ?1, category = ?2, spiciness = ?3, kind = ?4,
                    day = ?5, start_at = ?6, end_at = ?7, order_index = ?8,
                    updated_at = ?9
                 WHERE id = ?10 AND user_id = ?11",
                params![
                    &title,
                    &category,
                    spiciness,
                    schedule.kind().as_str(),
                    schedule.day().map(day_str),
                    schedule.start_at().map(|t| t.timestamp_millis()),
                    match schedule {
                        Schedule::Planned { end_at, .. } => end_at.map(|t| t.timestamp_millis()),
                        _ => None,
                    },
                    order_index,
                    now,
                    task_id,
                    user_id,
                ],
            )?;

            let subtasks = subtasks::subtasks_for_task(&tx, task_id)?;

            tx.commit()?;

            Ok(Task {
                id: task_id.to_string(),
                user_id: user_id.to_string(),
                title,
                category,
                spiciness,
                schedule,
                order_index,
                updated_at: now,
                subtasks,
                ..current
            })
        })
    }

    /// Mark a task complete or pending. Never touches ordering.
    pub fn set_task_completed(&self, user_id: &str, task_id: &str, done: bool) -> Result<Task> {
        let now = now_ms();
        let completed_at = if done { Some(now) } else { None };

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET is_completed = ?1, completed_at = ?2, updated_at = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![done, completed_at, now, task_id, user_id],
            )?;
            if changed == 0 {
                return Err(Error::task_not_found(task_id));
            }

            let row = get_task_row(conn, user_id, task_id)?
                .ok_or_else(|| Error::task_not_found(task_id))?;
            let mut task = task_from_row(row)?;
            task.subtasks = subtasks::subtasks_for_task(conn, task_id)?;
            Ok(task)
        })
    }

    /// Delete a task (subtasks cascade) and close the gap it leaves in its
    /// scope. Returns the sibling moves that were persisted.
    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<Vec<OrderShift>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row = get_task_row(&tx, user_id, task_id)?
                .ok_or_else(|| Error::task_not_found(task_id))?;
            let task = task_from_row(row)?;

            tx.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;

            let remaining = scope_slots(&tx, user_id, &task.schedule.bucket())?;
            let shifts = order::close_gap(task.order_index, &remaining);
            apply_shifts(&tx, user_id, &shifts, now)?;

            tx.commit()?;
            Ok(shifts)
        })
    }

    /// Apply an explicit order: each id gets its position in the sequence.
    /// The caller's sequence is trusted to cover one scope's member set;
    /// duplicate ids are rejected, and an id that does not resolve for
    /// this user rolls the whole batch back.
    pub fn reorder_tasks(&self, user_id: &str, ordered_ids: &[String]) -> Result<Vec<OrderShift>> {
        if user_id.trim().is_empty() {
            return Err(Error::missing_field("user_id"));
        }
        order::check_reorder_ids(ordered_ids)?;

        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut updates = Vec::with_capacity(ordered_ids.len());
            for (position, id) in ordered_ids.iter().enumerate() {
                let changed = tx.execute(
                    "UPDATE tasks SET order_index = ?1, updated_at = ?2
                     WHERE id = ?3 AND user_id = ?4",
                    params![position as i64, now, id, user_id],
                )?;
                if changed == 0 {
                    return Err(Error::task_not_found(id));
                }
                updates.push(OrderShift {
                    id: id.clone(),
                    order_index: position as i64,
                });
            }

            tx.commit()?;
            Ok(updates)
        })
    }
}
