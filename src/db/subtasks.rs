//! Subtask operations: same dense renumbering discipline as tasks, scoped
//! to one parent task instead of one day.

use super::{now_ms, Database};
use crate::error::{Error, Result};
use crate::order::OrderShift;
use crate::types::{Subtask, SubtaskDraft, SubtaskUpsert};
use rusqlite::{params, Connection, Row};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

fn read_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        order_index: row.get("order_index")?,
        is_completed: row.get("is_completed")?,
        estimated_minutes: row.get("estimated_minutes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Verify the task exists and belongs to `user_id`.
fn ensure_task_owned(conn: &Connection, user_id: &str, task_id: &str) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
            |_| Ok(true),
        )
        .unwrap_or(false);

    if exists {
        Ok(())
    } else {
        Err(Error::task_not_found(task_id))
    }
}

/// Insert one subtask row at the given order. Used by task creation too.
pub(crate) fn insert_subtask_row(
    conn: &Connection,
    task_id: &str,
    title: &str,
    order_index: i64,
    is_completed: bool,
    estimated_minutes: Option<i64>,
    now: i64,
) -> Result<Subtask> {
    let id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO subtasks (id, task_id, title, order_index, is_completed, estimated_minutes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &id,
            task_id,
            title,
            order_index,
            is_completed,
            estimated_minutes,
            now,
            now,
        ],
    )?;

    Ok(Subtask {
        id,
        task_id: task_id.to_string(),
        title: title.to_string(),
        order_index,
        is_completed,
        estimated_minutes,
        created_at: now,
        updated_at: now,
    })
}

/// A task's subtasks in order.
pub(crate) fn subtasks_for_task(conn: &Connection, task_id: &str) -> Result<Vec<Subtask>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM subtasks WHERE task_id = ?1 ORDER BY order_index ASC",
    )?;
    let subtasks = stmt
        .query_map(params![task_id], read_subtask_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(subtasks)
}

/// Subtasks for several tasks at once, grouped by parent id.
pub(crate) fn subtasks_by_task(
    conn: &Connection,
    task_ids: &[String],
) -> Result<HashMap<String, Vec<Subtask>>> {
    if task_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = task_ids.iter().map(|_| "?".to_string()).collect();
    let sql = format!(
        "SELECT * FROM subtasks WHERE task_id IN ({}) ORDER BY task_id, order_index",
        placeholders.join(", ")
    );

    let params_vec: Vec<Box<dyn rusqlite::ToSql>> = task_ids
        .iter()
        .map(|id| Box::new(id.clone()) as Box<dyn rusqlite::ToSql>)
        .collect();
    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_refs.as_slice(), read_subtask_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut by_task: HashMap<String, Vec<Subtask>> = HashMap::new();
    for subtask in rows {
        by_task.entry(subtask.task_id.clone()).or_default().push(subtask);
    }
    Ok(by_task)
}

impl Database {
    /// Add a subtask. Appends at the end unless the draft carries an
    /// explicit position, which is clamped and makes room by shifting
    /// later siblings up.
    pub fn add_subtask(
        &self,
        user_id: &str,
        task_id: &str,
        draft: SubtaskDraft,
    ) -> Result<Subtask> {
        if draft.title.trim().is_empty() {
            return Err(Error::missing_field("title"));
        }

        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            ensure_task_owned(&tx, user_id, task_id)?;

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM subtasks WHERE task_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;

            let target = match draft.order_index {
                None => count,
                Some(k) => k.clamp(0, count),
            };

            if target < count {
                tx.execute(
                    "UPDATE subtasks SET order_index = order_index + 1, updated_at = ?1
                     WHERE task_id = ?2 AND order_index >= ?3",
                    params![now, task_id, target],
                )?;
            }

            let subtask = insert_subtask_row(
                &tx,
                task_id,
                &draft.title,
                target,
                draft.is_completed,
                draft.estimated_minutes,
                now,
            )?;

            tx.commit()?;
            Ok(subtask)
        })
    }

    /// Mark a subtask complete or pending.
    pub fn set_subtask_completed(
        &self,
        user_id: &str,
        subtask_id: &str,
        done: bool,
    ) -> Result<Subtask> {
        let now = now_ms();

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE subtasks SET is_completed = ?1, updated_at = ?2
                 WHERE id = ?3
                 AND task_id IN (SELECT id FROM tasks WHERE user_id = ?4)",
                params![done, now, subtask_id, user_id],
            )?;
            if changed == 0 {
                return Err(Error::subtask_not_found(subtask_id));
            }

            let mut stmt = conn.prepare("SELECT * FROM subtasks WHERE id = ?1")?;
            let subtask = stmt.query_row(params![subtask_id], read_subtask_row)?;
            Ok(subtask)
        })
    }

    /// Delete a subtask and renumber the remaining siblings down by one.
    pub fn delete_subtask(&self, user_id: &str, subtask_id: &str) -> Result<Vec<OrderShift>> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let found: Option<(String, i64)> = match tx.query_row(
                "SELECT task_id, order_index FROM subtasks
                 WHERE id = ?1
                 AND task_id IN (SELECT id FROM tasks WHERE user_id = ?2)",
                params![subtask_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            ) {
                Ok(pair) => Some(pair),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };

            let (task_id, removed_order) =
                found.ok_or_else(|| Error::subtask_not_found(subtask_id))?;

            tx.execute("DELETE FROM subtasks WHERE id = ?1", params![subtask_id])?;

            let mut stmt = tx.prepare(
                "SELECT id, order_index FROM subtasks
                 WHERE task_id = ?1 AND order_index > ?2
                 ORDER BY order_index ASC",
            )?;
            let shifts = stmt
                .query_map(params![&task_id, removed_order], |row| {
                    Ok(OrderShift {
                        id: row.get(0)?,
                        order_index: row.get::<_, i64>(1)? - 1,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            tx.execute(
                "UPDATE subtasks SET order_index = order_index - 1, updated_at = ?1
                 WHERE task_id = ?2 AND order_index > ?3",
                params![now, &task_id, removed_order],
            )?;

            tx.commit()?;
            Ok(shifts)
        })
    }

    /// Replace a task's subtask list wholesale: rows with an id are
    /// updated, rows without one are inserted, and subtasks missing from
    /// the list are deleted. The final orders are 0..N-1 after sorting by
    /// the caller-supplied order values.
    pub fn replace_subtasks(
        &self,
        user_id: &str,
        task_id: &str,
        items: Vec<SubtaskUpsert>,
    ) -> Result<Vec<Subtask>> {
        for item in &items {
            if item.title.trim().is_empty() {
                return Err(Error::missing_field("title"));
            }
        }
        {
            let mut seen = HashSet::new();
            for item in &items {
                if let Some(id) = &item.id {
                    if !seen.insert(id.as_str()) {
                        return Err(Error::invalid_value(
                            "subtasks",
                            format!("duplicate subtask id: {}", id),
                        ));
                    }
                }
            }
        }

        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            ensure_task_owned(&tx, user_id, task_id)?;

            let existing: HashSet<String> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM subtasks WHERE task_id = ?1")?;
                let ids = stmt
                    .query_map(params![task_id], |row| row.get(0))?
                    .collect::<rusqlite::Result<HashSet<String>>>()?;
                ids
            };

            let mentioned: HashSet<&str> = items
                .iter()
                .filter_map(|i| i.id.as_deref())
                .collect();

            for id in &mentioned {
                if !existing.contains(*id) {
                    return Err(Error::subtask_not_found(id));
                }
            }

            for id in &existing {
                if !mentioned.contains(id.as_str()) {
                    tx.execute("DELETE FROM subtasks WHERE id = ?1", params![id])?;
                }
            }

            let mut sorted = items;
            sorted.sort_by_key(|item| item.order_index);

            for (position, item) in sorted.into_iter().enumerate() {
                match item.id {
                    Some(id) => {
                        tx.execute(
                            "UPDATE subtasks SET title = ?1, order_index = ?2,
                                is_completed = ?3, estimated_minutes = ?4, updated_at = ?5
                             WHERE id = ?6",
                            params![
                                &item.title,
                                position as i64,
                                item.is_completed,
                                item.estimated_minutes,
                                now,
                                &id,
                            ],
                        )?;
                    }
                    None => {
                        insert_subtask_row(
                            &tx,
                            task_id,
                            &item.title,
                            position as i64,
                            item.is_completed,
                            item.estimated_minutes,
                            now,
                        )?;
                    }
                }
            }

            let final_list = subtasks_for_task(&tx, task_id)?;

            tx.commit()?;
            Ok(final_list)
        })
    }
}
