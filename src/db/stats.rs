//! Aggregation queries for completion statistics.

use super::Database;
use crate::error::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Created/completed counts for one user over a UTC range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionStats {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created: i64,
    pub completed: i64,
}

/// Reporting period for completion stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl StatsPeriod {
    /// The half-open UTC range [start, end) containing `now`. Weeks start
    /// on Monday.
    pub fn range_containing(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let (start, end) = match self {
            StatsPeriod::Weekly => {
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7))
            }
            StatsPeriod::Monthly => {
                let first = first_of(today.year(), today.month());
                let next = if today.month() == 12 {
                    first_of(today.year() + 1, 1)
                } else {
                    first_of(today.year(), today.month() + 1)
                };
                (first, next)
            }
            StatsPeriod::Yearly => (first_of(today.year(), 1), first_of(today.year() + 1, 1)),
        };
        (day_start(start), day_start(end))
    }
}

fn first_of(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

fn day_start(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())
}

impl Database {
    /// Count tasks created and tasks completed inside [start, end).
    pub fn completion_stats(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CompletionStats> {
        let start_ms = start.timestamp_millis();
        let end_ms = end.timestamp_millis();

        self.with_conn(|conn| {
            let created: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks
                 WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3",
                params![user_id, start_ms, end_ms],
                |row| row.get(0),
            )?;

            let completed: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks
                 WHERE user_id = ?1 AND is_completed = 1
                 AND completed_at >= ?2 AND completed_at < ?3",
                params![user_id, start_ms, end_ms],
                |row| row.get(0),
            )?;

            Ok(CompletionStats {
                start,
                end,
                created,
                completed,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap()
    }

    #[test]
    fn weekly_range_starts_on_monday() {
        // 2025-06-04 is a Wednesday.
        let (start, end) = StatsPeriod::Weekly.range_containing(at(2025, 6, 4));
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(end - start, Duration::days(7));
    }

    #[test]
    fn monthly_range_covers_whole_month() {
        let (start, end) = StatsPeriod::Monthly.range_containing(at(2025, 12, 15));
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn yearly_range_covers_whole_year() {
        let (start, end) = StatsPeriod::Yearly.range_containing(at(2025, 6, 4));
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
