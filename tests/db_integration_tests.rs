//! Integration tests for the planner store.
//!
//! These tests verify ordering behavior against an in-memory SQLite
//! database. Tests are organized by operation family.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use dayplan::db::Database;
use dayplan::error::Error;
use dayplan::order::SomedayPlacement;
use dayplan::types::{
    Schedule, SubtaskDraft, SubtaskUpsert, TaskDraft, TaskFilter, TaskKind, TaskPatch,
};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
}

fn other_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 3, hour, 0, 0).unwrap()
}

fn at_on(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
}

fn draft(user: &str, title: &str, schedule: Schedule) -> TaskDraft {
    TaskDraft {
        user_id: user.to_string(),
        title: title.to_string(),
        category: None,
        spiciness: None,
        schedule,
        subtasks: Vec::new(),
    }
}

fn planned(user: &str, title: &str, hour: u32) -> TaskDraft {
    draft(
        user,
        title,
        Schedule::Planned {
            start_at: at(hour),
            end_at: None,
        },
    )
}

fn allday(user: &str, title: &str) -> TaskDraft {
    draft(user, title, Schedule::AllDay { date: day() })
}

fn someday(user: &str, title: &str) -> TaskDraft {
    draft(user, title, Schedule::Someday)
}

fn create(db: &Database, draft: TaskDraft) -> dayplan::types::Task {
    db.create_task(draft, SomedayPlacement::First)
        .expect("Failed to create task")
}

/// (title, order) pairs for one user's day, sorted by order.
fn day_orders(db: &Database, user: &str, date: NaiveDate) -> Vec<(String, i64)> {
    let filter = TaskFilter {
        day: Some(date),
        ..Default::default()
    };
    db.list_tasks(user, &filter)
        .unwrap()
        .into_iter()
        .map(|t| (t.title, t.order_index))
        .collect()
}

fn someday_orders(db: &Database, user: &str) -> Vec<(String, i64)> {
    let filter = TaskFilter {
        kind: Some(TaskKind::Someday),
        ..Default::default()
    };
    db.list_tasks(user, &filter)
        .unwrap()
        .into_iter()
        .map(|t| (t.title, t.order_index))
        .collect()
}

/// Order values in a scope must be exactly {0, 1, ..., N-1}.
fn assert_dense(orders: &[(String, i64)]) {
    let mut values: Vec<i64> = orders.iter().map(|(_, o)| *o).collect();
    values.sort_unstable();
    let expected: Vec<i64> = (0..orders.len() as i64).collect();
    assert_eq!(values, expected, "scope orders are not dense: {:?}", orders);
}

mod create_ordering_tests {
    use super::*;

    #[test]
    fn empty_scope_task_starts_at_zero() {
        let db = setup_db();

        let task = create(&db, planned("ada", "standup", 10));

        assert_eq!(task.order_index, 0);
    }

    #[test]
    fn earlier_planned_task_takes_the_front() {
        let db = setup_db();
        create(&db, planned("ada", "late", 10));

        let early = create(&db, planned("ada", "early", 9));

        assert_eq!(early.order_index, 0);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![("early".to_string(), 0), ("late".to_string(), 1)]
        );
    }

    #[test]
    fn planned_between_two_instants_lands_between() {
        let db = setup_db();
        create(&db, planned("ada", "nine", 9));
        create(&db, planned("ada", "noon", 12));

        let mid = create(&db, planned("ada", "ten", 10));

        assert_eq!(mid.order_index, 1);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![
                ("nine".to_string(), 0),
                ("ten".to_string(), 1),
                ("noon".to_string(), 2),
            ]
        );
    }

    #[test]
    fn planned_later_than_all_appends() {
        let db = setup_db();
        create(&db, planned("ada", "nine", 9));
        create(&db, planned("ada", "noon", 12));

        let late = create(&db, planned("ada", "evening", 19));

        assert_eq!(late.order_index, 2);
    }

    #[test]
    fn first_allday_leads_the_day() {
        let db = setup_db();
        create(&db, planned("ada", "nine", 9));
        create(&db, planned("ada", "noon", 12));

        let chores = create(&db, allday("ada", "chores"));

        assert_eq!(chores.order_index, 0);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![
                ("chores".to_string(), 0),
                ("nine".to_string(), 1),
                ("noon".to_string(), 2),
            ]
        );
    }

    #[test]
    fn allday_appends_after_the_allday_group() {
        let db = setup_db();
        create(&db, allday("ada", "laundry"));
        create(&db, planned("ada", "nine", 9));

        let second = create(&db, allday("ada", "groceries"));

        assert_eq!(second.order_index, 1);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![
                ("laundry".to_string(), 0),
                ("groceries".to_string(), 1),
                ("nine".to_string(), 2),
            ]
        );
    }

    #[test]
    fn someday_prepends_and_stays_dense() {
        let db = setup_db();
        create(&db, someday("ada", "first"));
        create(&db, someday("ada", "second"));
        create(&db, someday("ada", "third"));

        let orders = someday_orders(&db, "ada");
        assert_eq!(
            orders,
            vec![
                ("third".to_string(), 0),
                ("second".to_string(), 1),
                ("first".to_string(), 2),
            ]
        );
        assert_dense(&orders);
    }

    #[test]
    fn someday_last_policy_appends() {
        let db = setup_db();
        db.create_task(someday("ada", "first"), SomedayPlacement::Last)
            .unwrap();
        let second = db
            .create_task(someday("ada", "second"), SomedayPlacement::Last)
            .unwrap();

        assert_eq!(second.order_index, 1);
    }

    #[test]
    fn different_days_do_not_interact() {
        let db = setup_db();
        create(&db, planned("ada", "today", 10));

        let tomorrow = draft(
            "ada",
            "tomorrow",
            Schedule::Planned {
                start_at: at_on(other_day(), 9),
                end_at: None,
            },
        );
        let task = create(&db, tomorrow);

        assert_eq!(task.order_index, 0);
        assert_eq!(day_orders(&db, "ada", day()).len(), 1);
    }

    #[test]
    fn different_users_do_not_interact() {
        let db = setup_db();
        create(&db, planned("ada", "hers", 10));

        let task = create(&db, planned("bob", "his", 9));

        assert_eq!(task.order_index, 0);
        assert_eq!(day_orders(&db, "ada", day()), vec![("hers".to_string(), 0)]);
    }

    #[test]
    fn empty_title_is_rejected() {
        let db = setup_db();

        let result = db.create_task(planned("ada", "   ", 10), SomedayPlacement::First);

        assert!(matches!(result, Err(Error::Validation { .. })));
    }
}

mod density_tests {
    use super::*;

    #[test]
    fn mixed_operations_keep_every_scope_dense() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        let _b = create(&db, allday("ada", "b"));
        let c = create(&db, planned("ada", "c", 14));
        create(&db, planned("ada", "d", 11));
        create(&db, allday("ada", "e"));
        assert_dense(&day_orders(&db, "ada", day()));

        db.delete_task("ada", &a.id).unwrap();
        assert_dense(&day_orders(&db, "ada", day()));

        db.delete_task("ada", &c.id).unwrap();
        assert_dense(&day_orders(&db, "ada", day()));

        create(&db, planned("ada", "f", 8));
        create(&db, someday("ada", "g"));
        create(&db, someday("ada", "h"));
        assert_dense(&day_orders(&db, "ada", day()));
        assert_dense(&someday_orders(&db, "ada"));
    }
}

mod removal_tests {
    use super::*;

    #[test]
    fn removing_middle_task_closes_the_gap() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));
        create(&db, planned("ada", "c", 14));

        let shifts = db.delete_task("ada", &b.id).unwrap();

        assert_eq!(shifts.len(), 1);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![("a".to_string(), 0), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn removing_last_task_shifts_nothing() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));

        let shifts = db.delete_task("ada", &b.id).unwrap();

        assert!(shifts.is_empty());
    }

    #[test]
    fn removing_unknown_task_is_not_found() {
        let db = setup_db();

        let result = db.delete_task("ada", "no-such-id");

        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn removing_another_users_task_is_not_found() {
        let db = setup_db();
        let task = create(&db, planned("ada", "hers", 10));

        let result = db.delete_task("bob", &task.id);

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(db.get_task("ada", &task.id).unwrap().is_some());
    }
}

mod reorder_tests {
    use super::*;

    #[test]
    fn explicit_reorder_applies_positions() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        let c = create(&db, planned("ada", "c", 14));

        db.reorder_tasks("ada", &[c.id.clone(), a.id.clone()])
            .unwrap();

        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![("c".to_string(), 0), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn reorder_is_idempotent() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));
        let sequence = vec![b.id.clone(), a.id.clone()];

        let first = db.reorder_tasks("ada", &sequence).unwrap();
        let orders_after_first = day_orders(&db, "ada", day());
        let second = db.reorder_tasks("ada", &sequence).unwrap();

        assert_eq!(first, second);
        assert_eq!(orders_after_first, day_orders(&db, "ada", day()));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));

        let result = db.reorder_tasks("ada", &[a.id.clone(), a.id.clone()]);

        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let db = setup_db();

        let result = db.reorder_tasks("ada", &[]);

        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn foreign_users_task_fails_with_no_writes() {
        let db = setup_db();
        let hers = create(&db, planned("ada", "hers", 9));
        let his = create(&db, planned("bob", "his", 9));

        let result = db.reorder_tasks("ada", &[his.id.clone(), hers.id.clone()]);

        assert!(matches!(result, Err(Error::NotFound { .. })));
        // Nothing moved for either user.
        assert_eq!(day_orders(&db, "ada", day()), vec![("hers".to_string(), 0)]);
        assert_eq!(day_orders(&db, "bob", day()), vec![("his".to_string(), 0)]);
    }

    #[test]
    fn unknown_id_rolls_the_whole_batch_back() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));

        // b would be written to position 0 before the bad id fails.
        let result =
            db.reorder_tasks("ada", &[b.id.clone(), "no-such-id".to_string(), a.id.clone()]);

        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![("a".to_string(), 0), ("b".to_string(), 1)]
        );
    }
}

mod update_tests {
    use super::*;

    #[test]
    fn retitle_keeps_the_slot() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));

        let patch = TaskPatch {
            title: Some("b renamed".to_string()),
            ..Default::default()
        };
        let updated = db
            .update_task("ada", &b.id, patch, SomedayPlacement::First)
            .unwrap();

        assert_eq!(updated.title, "b renamed");
        assert_eq!(updated.order_index, 1);
    }

    #[test]
    fn changing_start_time_reslots_within_the_day() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        create(&db, planned("ada", "b", 12));
        create(&db, planned("ada", "c", 15));

        let patch = TaskPatch {
            schedule: Some(Schedule::Planned {
                start_at: at(13),
                end_at: None,
            }),
            ..Default::default()
        };
        let updated = db
            .update_task("ada", &a.id, patch, SomedayPlacement::First)
            .unwrap();

        assert_eq!(updated.order_index, 1);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![
                ("b".to_string(), 0),
                ("a".to_string(), 1),
                ("c".to_string(), 2),
            ]
        );
    }

    #[test]
    fn moving_to_another_day_fixes_both_scopes() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));
        create(&db, planned("ada", "c", 15));
        let d = draft(
            "ada",
            "d",
            Schedule::Planned {
                start_at: at_on(other_day(), 9),
                end_at: None,
            },
        );
        create(&db, d);

        let patch = TaskPatch {
            schedule: Some(Schedule::Planned {
                start_at: at_on(other_day(), 8),
                end_at: None,
            }),
            ..Default::default()
        };
        let moved = db
            .update_task("ada", &b.id, patch, SomedayPlacement::First)
            .unwrap();

        assert_eq!(moved.order_index, 0);
        assert_eq!(
            day_orders(&db, "ada", day()),
            vec![("a".to_string(), 0), ("c".to_string(), 1)]
        );
        assert_eq!(
            day_orders(&db, "ada", other_day()),
            vec![("b".to_string(), 0), ("d".to_string(), 1)]
        );
    }

    #[test]
    fn moving_to_someday_drops_out_of_the_day() {
        let db = setup_db();
        let a = create(&db, planned("ada", "a", 9));
        create(&db, planned("ada", "b", 11));
        create(&db, someday("ada", "later"));

        let patch = TaskPatch {
            schedule: Some(Schedule::Someday),
            ..Default::default()
        };
        let moved = db
            .update_task("ada", &a.id, patch, SomedayPlacement::First)
            .unwrap();

        assert_eq!(moved.order_index, 0);
        assert_eq!(day_orders(&db, "ada", day()), vec![("b".to_string(), 0)]);
        assert_dense(&someday_orders(&db, "ada"));
    }

    #[test]
    fn completing_a_task_does_not_touch_ordering() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));

        let done = db.set_task_completed("ada", &b.id, true).unwrap();

        assert!(done.is_completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.order_index, 1);

        let undone = db.set_task_completed("ada", &b.id, false).unwrap();
        assert!(!undone.is_completed);
        assert!(undone.completed_at.is_none());
    }

    #[test]
    fn updating_unknown_task_is_not_found() {
        let db = setup_db();

        let patch = TaskPatch::default();
        let result = db.update_task("ada", "no-such-id", patch, SomedayPlacement::First);

        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}

mod subtask_tests {
    use super::*;

    fn sub(title: &str, order: Option<i64>) -> SubtaskDraft {
        SubtaskDraft {
            title: title.to_string(),
            order_index: order,
            estimated_minutes: None,
            is_completed: false,
        }
    }

    #[test]
    fn create_with_subtasks_renumbers_by_supplied_order() {
        let db = setup_db();
        let mut draft = planned("ada", "project", 10);
        draft.subtasks = vec![sub("second", Some(5)), sub("first", Some(2))];

        let task = create(&db, draft);

        let titles: Vec<(String, i64)> = task
            .subtasks
            .iter()
            .map(|s| (s.title.clone(), s.order_index))
            .collect();
        assert_eq!(
            titles,
            vec![("first".to_string(), 0), ("second".to_string(), 1)]
        );
    }

    #[test]
    fn add_appends_by_default() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));
        db.add_subtask("ada", &task.id, sub("one", None)).unwrap();

        let two = db.add_subtask("ada", &task.id, sub("two", None)).unwrap();

        assert_eq!(two.order_index, 1);
    }

    #[test]
    fn add_at_position_shifts_later_siblings() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));
        db.add_subtask("ada", &task.id, sub("one", None)).unwrap();
        db.add_subtask("ada", &task.id, sub("two", None)).unwrap();

        let wedged = db
            .add_subtask("ada", &task.id, sub("wedge", Some(1)))
            .unwrap();

        assert_eq!(wedged.order_index, 1);
        let full = db.get_task("ada", &task.id).unwrap().unwrap();
        let titles: Vec<(String, i64)> = full
            .subtasks
            .iter()
            .map(|s| (s.title.clone(), s.order_index))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("one".to_string(), 0),
                ("wedge".to_string(), 1),
                ("two".to_string(), 2),
            ]
        );
    }

    #[test]
    fn delete_renumbers_remaining_siblings() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));
        db.add_subtask("ada", &task.id, sub("one", None)).unwrap();
        let two = db.add_subtask("ada", &task.id, sub("two", None)).unwrap();
        db.add_subtask("ada", &task.id, sub("three", None)).unwrap();

        let shifts = db.delete_subtask("ada", &two.id).unwrap();

        assert_eq!(shifts.len(), 1);
        let full = db.get_task("ada", &task.id).unwrap().unwrap();
        let orders: Vec<i64> = full.subtasks.iter().map(|s| s.order_index).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn replace_list_upserts_and_renumbers() {
        let db = setup_db();
        let mut draft = planned("ada", "project", 10);
        draft.subtasks = vec![sub("keep", None), sub("drop", None)];
        let task = create(&db, draft);
        let keep_id = task.subtasks[0].id.clone();

        let items = vec![
            SubtaskUpsert {
                id: Some(keep_id.clone()),
                title: "keep renamed".to_string(),
                order_index: 10,
                is_completed: true,
                estimated_minutes: Some(20),
            },
            SubtaskUpsert {
                id: None,
                title: "fresh".to_string(),
                order_index: 5,
                is_completed: false,
                estimated_minutes: None,
            },
        ];
        let result = db.replace_subtasks("ada", &task.id, items).unwrap();

        let titles: Vec<(String, i64)> = result
            .iter()
            .map(|s| (s.title.clone(), s.order_index))
            .collect();
        assert_eq!(
            titles,
            vec![("fresh".to_string(), 0), ("keep renamed".to_string(), 1)]
        );
        assert!(result.iter().any(|s| s.id == keep_id && s.is_completed));
        assert_eq!(result.len(), 2); // "drop" is gone
    }

    #[test]
    fn replace_rejects_unknown_subtask_id() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));

        let items = vec![SubtaskUpsert {
            id: Some("no-such-subtask".to_string()),
            title: "ghost".to_string(),
            order_index: 0,
            is_completed: false,
            estimated_minutes: None,
        }];
        let result = db.replace_subtasks("ada", &task.id, items);

        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn subtask_completion_toggles() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));
        let one = db.add_subtask("ada", &task.id, sub("one", None)).unwrap();

        let done = db.set_subtask_completed("ada", &one.id, true).unwrap();
        assert!(done.is_completed);

        let undone = db.set_subtask_completed("ada", &one.id, false).unwrap();
        assert!(!undone.is_completed);
    }

    #[test]
    fn foreign_user_cannot_touch_subtasks() {
        let db = setup_db();
        let task = create(&db, planned("ada", "project", 10));
        let one = db.add_subtask("ada", &task.id, sub("one", None)).unwrap();

        assert!(matches!(
            db.add_subtask("bob", &task.id, sub("sneaky", None)),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            db.set_subtask_completed("bob", &one.id, true),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            db.delete_subtask("bob", &one.id),
            Err(Error::NotFound { .. })
        ));
    }
}

mod stats_tests {
    use super::*;

    #[test]
    fn counts_created_and_completed_in_range() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));
        let b = create(&db, planned("ada", "b", 11));
        db.set_task_completed("ada", &b.id, true).unwrap();

        let now = Utc::now();
        let stats = db
            .completion_stats("ada", now - Duration::days(1), now + Duration::days(1))
            .unwrap();

        assert_eq!(stats.created, 2);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn stats_are_scoped_per_user() {
        let db = setup_db();
        create(&db, planned("ada", "hers", 9));
        create(&db, planned("bob", "his", 9));

        let now = Utc::now();
        let stats = db
            .completion_stats("bob", now - Duration::days(1), now + Duration::days(1))
            .unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(stats.completed, 0);
    }

    #[test]
    fn tasks_outside_the_range_are_not_counted() {
        let db = setup_db();
        create(&db, planned("ada", "a", 9));

        let now = Utc::now();
        let stats = db
            .completion_stats("ada", now + Duration::days(1), now + Duration::days(2))
            .unwrap();

        assert_eq!(stats.created, 0);
    }
}

mod listing_tests {
    use super::*;

    #[test]
    fn list_filters_by_kind_and_day() {
        let db = setup_db();
        create(&db, planned("ada", "meeting", 10));
        create(&db, allday("ada", "chores"));
        create(&db, someday("ada", "dream"));

        let planned_only = db
            .list_tasks(
                "ada",
                &TaskFilter {
                    kind: Some(TaskKind::Planned),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(planned_only.len(), 1);
        assert_eq!(planned_only[0].title, "meeting");

        let today = db
            .list_tasks(
                "ada",
                &TaskFilter {
                    day: Some(day()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(today.len(), 2);
    }

    #[test]
    fn list_includes_subtasks_when_asked() {
        let db = setup_db();
        let mut d = planned("ada", "project", 10);
        d.subtasks = vec![SubtaskDraft {
            title: "step".to_string(),
            order_index: None,
            estimated_minutes: None,
            is_completed: false,
        }];
        create(&db, d);

        let without = db.list_tasks("ada", &TaskFilter::default()).unwrap();
        assert!(without[0].subtasks.is_empty());

        let with = db
            .list_tasks(
                "ada",
                &TaskFilter {
                    include_subtasks: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(with[0].subtasks.len(), 1);
    }

    #[test]
    fn get_task_is_scoped_to_the_owner() {
        let db = setup_db();
        let task = create(&db, planned("ada", "hers", 10));

        assert!(db.get_task("ada", &task.id).unwrap().is_some());
        assert!(db.get_task("bob", &task.id).unwrap().is_none());
    }
}
