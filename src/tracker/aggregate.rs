use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::error::AppResult;

use super::data::{TaskID, TimeLog};
use super::store::Store;

pub const WEEK_WINDOW_DAYS: i64 = 7;
pub const MONTH_WINDOW_DAYS: i64 = 30;

/// Minutes logged across all entries. Zero for an empty slice.
pub fn total_minutes(logs: &[TimeLog]) -> i64 {
    logs.iter().map(|log| log.minutes).sum()
}

/// Groups logs by calendar day, summing minutes per day. Day keys come back
/// unsorted; presentation orders them.
pub fn minutes_by_day(logs: &[TimeLog]) -> HashMap<NaiveDate, i64> {
    let mut by_day = HashMap::new();
    for log in logs {
        *by_day.entry(log.day).or_insert(0) += log.minutes;
    }
    by_day
}

/// Per-day minutes for a task over the trailing window ending at `today`,
/// inclusive of `today - days`. A task with no logs in the window yields an
/// empty map.
pub fn trailing_window(
    store: &dyn Store,
    task_id: TaskID,
    today: NaiveDate,
    days: i64,
) -> AppResult<HashMap<NaiveDate, i64>> {
    let start = today - Duration::days(days);
    let logs = store.timelogs_since(task_id, start)?;
    Ok(minutes_by_day(&logs))
}
