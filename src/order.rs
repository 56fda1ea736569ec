//! Placement engine for dense per-scope ordering.
//!
//! Pure functions: callers read the scope snapshot from the store, compute
//! a placement here, and persist the resulting shifts in the same
//! transaction as the triggering write. Within a scope (user + day, or
//! user + someday pile) the active `order_index` values are always exactly
//! `{0, 1, ..., N-1}`; these functions keep them that way.

use crate::error::{Error, Result};
use crate::types::{Schedule, TaskKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A sibling row in the scope, sorted ascending by `order_index`.
#[derive(Debug, Clone)]
pub struct SiblingSlot {
    pub id: String,
    pub order_index: i64,
    pub kind: TaskKind,
    pub start_at: Option<DateTime<Utc>>,
}

/// A single (id, new order) assignment to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShift {
    pub id: String,
    pub order_index: i64,
}

/// Where a new task lands, plus the sibling moves that make room.
#[derive(Debug, Clone)]
pub struct Placement {
    pub order_index: i64,
    pub shifts: Vec<OrderShift>,
}

/// Where a new someday task goes relative to its siblings.
///
/// The reference behavior is `First` (new someday items lead the pile),
/// though that placement reads more like an accident of the capture flow
/// than a product decision, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SomedayPlacement {
    #[default]
    First,
    Last,
}

/// Compute the slot for a new task among `siblings`.
///
/// Planned tasks slot in chronologically among the other planned tasks of
/// the day; the all-day group sits at the head of the day, and a new
/// all-day task lands right after the last existing one. Everything at or
/// past the chosen slot shifts up by one.
pub fn place_new(
    schedule: &Schedule,
    siblings: &[SiblingSlot],
    someday: SomedayPlacement,
) -> Placement {
    if siblings.is_empty() {
        return Placement {
            order_index: 0,
            shifts: Vec::new(),
        };
    }

    match schedule {
        Schedule::AllDay { .. } => {
            let target = siblings
                .iter()
                .filter(|s| s.kind == TaskKind::AllDay)
                .next_back()
                .map(|s| s.order_index + 1)
                .unwrap_or(0);
            Placement {
                order_index: target,
                shifts: shift_up(siblings, target),
            }
        }
        Schedule::Planned { start_at, .. } => {
            let later = siblings
                .iter()
                .find(|s| s.kind == TaskKind::Planned && s.start_at.is_some_and(|t| t > *start_at));
            match later {
                Some(slot) => Placement {
                    order_index: slot.order_index,
                    shifts: shift_up(siblings, slot.order_index),
                },
                None => Placement {
                    order_index: siblings.len() as i64,
                    shifts: Vec::new(),
                },
            }
        }
        Schedule::Someday => match someday {
            SomedayPlacement::First => Placement {
                order_index: 0,
                shifts: shift_up(siblings, 0),
            },
            SomedayPlacement::Last => Placement {
                order_index: siblings.len() as i64,
                shifts: Vec::new(),
            },
        },
    }
}

/// Shifts that close the gap left by removing the row at `removed_order`.
/// `siblings` must not include the removed row.
pub fn close_gap(removed_order: i64, siblings: &[SiblingSlot]) -> Vec<OrderShift> {
    siblings
        .iter()
        .filter(|s| s.order_index > removed_order)
        .map(|s| OrderShift {
            id: s.id.clone(),
            order_index: s.order_index - 1,
        })
        .collect()
}

/// Validate an explicit reorder sequence: non-empty, no duplicate ids.
pub fn check_reorder_ids(ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::missing_field("tasks"));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(Error::invalid_value(
                "tasks",
                format!("duplicate task id: {}", id),
            ));
        }
    }
    Ok(())
}

fn shift_up(siblings: &[SiblingSlot], from: i64) -> Vec<OrderShift> {
    siblings
        .iter()
        .filter(|s| s.order_index >= from)
        .map(|s| OrderShift {
            id: s.id.clone(),
            order_index: s.order_index + 1,
        })
        .collect()
}
