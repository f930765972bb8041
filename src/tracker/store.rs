use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};

use super::data::{
    Frequency, Goal, GoalID, GoalType, NewGoal, NewTask, NewTimeLog, Pillar, Task, TaskID,
    TaskUpdate, TimeLog, TimeLogID,
};

/// Persistence boundary for goals, tasks, and time logs. Everything mutable
/// lives behind this trait; handlers and aggregation never touch SQL.
pub trait Store {
    fn insert_goal(&self, goal: &NewGoal) -> AppResult<GoalID>;
    fn get_goal(&self, id: GoalID) -> AppResult<Option<Goal>>;
    fn list_goals(&self) -> AppResult<Vec<Goal>>;

    fn insert_task(&self, task: &NewTask) -> AppResult<TaskID>;
    fn get_task(&self, id: TaskID) -> AppResult<Option<Task>>;
    fn list_tasks(&self) -> AppResult<Vec<Task>>;
    /// Applies the editable fields to an existing task. Returns false when
    /// the id does not exist.
    fn update_task(&self, id: TaskID, update: &TaskUpdate) -> AppResult<bool>;
    /// Re-parents a task. Rejects a parent that does not exist and any
    /// assignment that would close a cycle in the task tree.
    fn set_task_parent(&self, id: TaskID, parent: Option<TaskID>) -> AppResult<bool>;
    /// Direct children of a task, one level deep.
    fn child_task_ids(&self, id: TaskID) -> AppResult<Vec<TaskID>>;

    fn insert_timelog(&self, log: &NewTimeLog) -> AppResult<TimeLogID>;
    fn timelogs_for_task(&self, task_id: TaskID) -> AppResult<Vec<TimeLog>>;
    fn timelogs_since(&self, task_id: TaskID, since: NaiveDate) -> AppResult<Vec<TimeLog>>;
}

pub fn init_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            goal_type TEXT NOT NULL DEFAULT 'week',
            description TEXT,
            target_minutes INTEGER NOT NULL DEFAULT 0,
            used_minutes INTEGER NOT NULL DEFAULT 0,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            pillar TEXT NOT NULL,
            frequency TEXT NOT NULL DEFAULT 'daily',
            success_target_percent INTEGER NOT NULL DEFAULT 90,
            ideal_gap_days INTEGER,
            goal_id INTEGER REFERENCES goal(id),
            parent_task_id INTEGER REFERENCES task(id),
            is_daily_followup INTEGER NOT NULL DEFAULT 0,
            is_separately_monitored INTEGER NOT NULL DEFAULT 0,
            archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timelog (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL REFERENCES task(id),
            day TEXT NOT NULL,
            slot_start TEXT,
            slot_end TEXT,
            minutes INTEGER NOT NULL DEFAULT 0,
            note TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_task_parent ON task(parent_task_id);
        CREATE INDEX IF NOT EXISTS idx_task_goal ON task(goal_id);
        CREATE INDEX IF NOT EXISTS idx_timelog_task_day ON timelog(task_id, day);",
    )?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    Ok(())
}

impl ToSql for Pillar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Pillar {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Pillar::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown pillar: {}", text).into()))
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Frequency::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown frequency: {}", text).into()))
    }
}

impl ToSql for GoalType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GoalType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        GoalType::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown goal type: {}", text).into()))
    }
}

const GOAL_COLUMNS: &str =
    "id, name, goal_type, description, target_minutes, used_minutes, due_date, \
     created_at, updated_at";

const TASK_COLUMNS: &str =
    "id, name, pillar, frequency, success_target_percent, ideal_gap_days, goal_id, \
     parent_task_id, is_daily_followup, is_separately_monitored, archived, \
     created_at, updated_at";

const TIMELOG_COLUMNS: &str =
    "id, task_id, day, slot_start, slot_end, minutes, note, created_at";

fn goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        goal_type: row.get(2)?,
        description: row.get(3)?,
        target_minutes: row.get(4)?,
        used_minutes: row.get(5)?,
        due_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        name: row.get(1)?,
        pillar: row.get(2)?,
        frequency: row.get(3)?,
        success_target_percent: row.get(4)?,
        ideal_gap_days: row.get(5)?,
        goal_id: row.get(6)?,
        parent_task_id: row.get(7)?,
        is_daily_followup: row.get(8)?,
        is_separately_monitored: row.get(9)?,
        archived: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn timelog_from_row(row: &Row) -> rusqlite::Result<TimeLog> {
    Ok(TimeLog {
        id: row.get(0)?,
        task_id: row.get(1)?,
        day: row.get(2)?,
        slot_start: row.get(3)?,
        slot_end: row.get(4)?,
        minutes: row.get(5)?,
        note: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// `Store` over a borrowed SQLite connection. Each request constructs one
/// around the connection it holds for the duration of the request.
pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> SqliteStore<'c> {
        SqliteStore { conn }
    }
}

impl Store for SqliteStore<'_> {
    fn insert_goal(&self, goal: &NewGoal) -> AppResult<GoalID> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO goal (name, goal_type, description, target_minutes, used_minutes, \
             due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)",
            params![
                goal.name,
                goal.goal_type,
                goal.description,
                goal.target_minutes,
                goal.due_date,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_goal(&self, id: GoalID) -> AppResult<Option<Goal>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {} FROM goal WHERE id = ?1", GOAL_COLUMNS))?;
        let goal = statement.query_row(params![id], goal_from_row).optional()?;

        Ok(goal)
    }

    fn list_goals(&self) -> AppResult<Vec<Goal>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {} FROM goal ORDER BY id", GOAL_COLUMNS))?;
        let goals = statement
            .query_map([], goal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    fn insert_task(&self, task: &NewTask) -> AppResult<TaskID> {
        if let Some(goal_id) = task.goal_id {
            if self.get_goal(goal_id)?.is_none() {
                return Err(AppError::not_found(format!("goal {}", goal_id)));
            }
        }
        if let Some(parent_id) = task.parent_task_id {
            if self.get_task(parent_id)?.is_none() {
                return Err(AppError::not_found(format!("task {}", parent_id)));
            }
        }

        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO task (name, pillar, frequency, success_target_percent, ideal_gap_days, \
             goal_id, parent_task_id, is_daily_followup, is_separately_monitored, archived, \
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
            params![
                task.name,
                task.pillar,
                task.frequency,
                task.success_target_percent,
                task.ideal_gap_days,
                task.goal_id,
                task.parent_task_id,
                task.is_daily_followup,
                task.is_separately_monitored,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_task(&self, id: TaskID) -> AppResult<Option<Task>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {} FROM task WHERE id = ?1", TASK_COLUMNS))?;
        let task = statement.query_row(params![id], task_from_row).optional()?;

        Ok(task)
    }

    fn list_tasks(&self) -> AppResult<Vec<Task>> {
        let mut statement = self
            .conn
            .prepare(&format!("SELECT {} FROM task ORDER BY id", TASK_COLUMNS))?;
        let tasks = statement
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    fn update_task(&self, id: TaskID, update: &TaskUpdate) -> AppResult<bool> {
        let changed = self.conn.execute(
            "UPDATE task SET name = ?1, pillar = ?2, is_daily_followup = ?3, \
             is_separately_monitored = ?4, updated_at = ?5 WHERE id = ?6",
            params![
                update.name,
                update.pillar,
                update.is_daily_followup,
                update.is_separately_monitored,
                Utc::now(),
                id
            ],
        )?;

        Ok(changed > 0)
    }

    fn set_task_parent(&self, id: TaskID, parent: Option<TaskID>) -> AppResult<bool> {
        if self.get_task(id)?.is_none() {
            return Ok(false);
        }

        if let Some(parent_id) = parent {
            let parent_task = self
                .get_task(parent_id)?
                .ok_or_else(|| AppError::not_found(format!("task {}", parent_id)))?;

            // Walk the proposed parent's ancestor chain; finding `id` there
            // means the assignment would close a cycle.
            let mut cursor = Some(parent_task);
            while let Some(task) = cursor {
                if task.id == id {
                    return Err(AppError::invalid(format!(
                        "task {} cannot become a child of its descendant {}",
                        id, parent_id
                    )));
                }
                cursor = match task.parent_task_id {
                    Some(ancestor_id) => self.get_task(ancestor_id)?,
                    None => None,
                };
            }
        }

        let changed = self.conn.execute(
            "UPDATE task SET parent_task_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![parent, Utc::now(), id],
        )?;

        Ok(changed > 0)
    }

    fn child_task_ids(&self, id: TaskID) -> AppResult<Vec<TaskID>> {
        let mut statement = self
            .conn
            .prepare("SELECT id FROM task WHERE parent_task_id = ?1 ORDER BY id")?;
        let ids = statement
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    fn insert_timelog(&self, log: &NewTimeLog) -> AppResult<TimeLogID> {
        if self.get_task(log.task_id)?.is_none() {
            return Err(AppError::not_found(format!("task {}", log.task_id)));
        }

        self.conn.execute(
            "INSERT INTO timelog (task_id, day, slot_start, slot_end, minutes, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.task_id,
                log.day,
                log.slot_start,
                log.slot_end,
                log.minutes,
                log.note,
                Utc::now()
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn timelogs_for_task(&self, task_id: TaskID) -> AppResult<Vec<TimeLog>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {} FROM timelog WHERE task_id = ?1 ORDER BY day, id",
            TIMELOG_COLUMNS
        ))?;
        let logs = statement
            .query_map(params![task_id], timelog_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    fn timelogs_since(&self, task_id: TaskID, since: NaiveDate) -> AppResult<Vec<TimeLog>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {} FROM timelog WHERE task_id = ?1 AND day >= ?2 ORDER BY day, id",
            TIMELOG_COLUMNS
        ))?;
        let logs = statement
            .query_map(params![task_id, since], timelog_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::data::{Frequency, GoalType, Pillar};
    use chrono::{Duration, Local, NaiveTime};
    use tempfile::tempdir;

    fn setup_test_db() -> (Connection, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let conn = Connection::open(dir.path().join("test.db")).unwrap();
        init_tables(&conn).unwrap();
        (conn, dir)
    }

    fn new_task(name: &str) -> NewTask {
        NewTask {
            name: name.to_string(),
            pillar: Pillar::HardWork,
            frequency: Frequency::Daily,
            success_target_percent: 90,
            ideal_gap_days: None,
            goal_id: None,
            parent_task_id: None,
            is_daily_followup: false,
            is_separately_monitored: false,
        }
    }

    #[test]
    fn task_round_trips_through_the_store() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let mut task = new_task("Morning pages");
        task.pillar = Pillar::Calmness;
        task.frequency = Frequency::Weekly;
        task.ideal_gap_days = Some(3);
        let id = store.insert_task(&task).unwrap();

        let fetched = store.get_task(id).unwrap().unwrap();
        assert_eq!(fetched.name, "Morning pages");
        assert_eq!(fetched.pillar, Pillar::Calmness);
        assert_eq!(fetched.frequency, Frequency::Weekly);
        assert_eq!(fetched.ideal_gap_days, Some(3));
        assert_eq!(fetched.success_target_percent, 90);
        assert!(!fetched.archived);
    }

    #[test]
    fn get_task_returns_none_for_unknown_id() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        assert!(store.get_task(99999).unwrap().is_none());
    }

    #[test]
    fn list_tasks_returns_all_in_id_order() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        store.insert_task(&new_task("First")).unwrap();
        store.insert_task(&new_task("Second")).unwrap();

        let tasks = store.list_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "First");
        assert_eq!(tasks[1].name, "Second");
    }

    #[test]
    fn update_task_changes_only_the_editable_fields() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let id = store.insert_task(&new_task("Stretch")).unwrap();
        let changed = store
            .update_task(
                id,
                &TaskUpdate {
                    name: String::from("Stretch and breathe"),
                    pillar: Pillar::Family,
                    is_daily_followup: true,
                    is_separately_monitored: false,
                },
            )
            .unwrap();
        assert!(changed);

        let task = store.get_task(id).unwrap().unwrap();
        assert_eq!(task.name, "Stretch and breathe");
        assert_eq!(task.pillar, Pillar::Family);
        assert!(task.is_daily_followup);
        assert_eq!(task.frequency, Frequency::Daily);
    }

    #[test]
    fn update_task_reports_missing_ids() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let changed = store
            .update_task(
                12345,
                &TaskUpdate {
                    name: String::from("Ghost"),
                    pillar: Pillar::HardWork,
                    is_daily_followup: false,
                    is_separately_monitored: false,
                },
            )
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn insert_task_rejects_a_missing_parent() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let mut task = new_task("Orphan");
        task.parent_task_id = Some(777);
        assert!(matches!(
            store.insert_task(&task),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn reparenting_to_a_descendant_is_rejected() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let root = store.insert_task(&new_task("Root")).unwrap();
        let mut child = new_task("Child");
        child.parent_task_id = Some(root);
        let child = store.insert_task(&child).unwrap();
        let mut grandchild = new_task("Grandchild");
        grandchild.parent_task_id = Some(child);
        let grandchild = store.insert_task(&grandchild).unwrap();

        assert!(matches!(
            store.set_task_parent(root, Some(grandchild)),
            Err(AppError::Invalid(_))
        ));
        assert!(matches!(
            store.set_task_parent(root, Some(root)),
            Err(AppError::Invalid(_))
        ));

        // Detaching and legal moves still work.
        assert!(store.set_task_parent(grandchild, None).unwrap());
        assert!(store.set_task_parent(grandchild, Some(root)).unwrap());
    }

    #[test]
    fn child_task_ids_lists_direct_children_only() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let root = store.insert_task(&new_task("Root")).unwrap();
        let mut child = new_task("Child");
        child.parent_task_id = Some(root);
        let child = store.insert_task(&child).unwrap();
        let mut grandchild = new_task("Grandchild");
        grandchild.parent_task_id = Some(child);
        store.insert_task(&grandchild).unwrap();

        assert_eq!(store.child_task_ids(root).unwrap(), vec![child]);
    }

    #[test]
    fn goal_round_trips_through_the_store() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let id = store
            .insert_goal(&NewGoal {
                name: String::from("Ship the draft"),
                goal_type: GoalType::Quarter,
                description: Some(String::from("Finish part one")),
                target_minutes: 600,
                due_date: Some("2025-09-30".parse().unwrap()),
            })
            .unwrap();

        let goal = store.get_goal(id).unwrap().unwrap();
        assert_eq!(goal.name, "Ship the draft");
        assert_eq!(goal.goal_type, GoalType::Quarter);
        assert_eq!(goal.target_minutes, 600);
        assert_eq!(goal.used_minutes, 0);
        assert_eq!(goal.due_date, Some("2025-09-30".parse().unwrap()));
        assert_eq!(store.list_goals().unwrap().len(), 1);
    }

    #[test]
    fn timelog_insert_requires_an_existing_task() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let log = NewTimeLog {
            task_id: 42,
            day: Local::now().date_naive(),
            slot_start: None,
            slot_end: None,
            minutes: 10,
            note: None,
        };
        assert!(matches!(
            store.insert_timelog(&log),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn timelogs_since_filters_by_window_start() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let id = store.insert_task(&new_task("Reading")).unwrap();
        let today = Local::now().date_naive();
        for (days_ago, minutes) in [(0, 20), (3, 30), (10, 40), (40, 50)] {
            store
                .insert_timelog(&NewTimeLog {
                    task_id: id,
                    day: today - Duration::days(days_ago),
                    slot_start: None,
                    slot_end: None,
                    minutes,
                    note: None,
                })
                .unwrap();
        }

        let last_week = store
            .timelogs_since(id, today - Duration::days(7))
            .unwrap();
        assert_eq!(last_week.len(), 2);

        let last_month = store
            .timelogs_since(id, today - Duration::days(30))
            .unwrap();
        assert_eq!(last_month.len(), 3);

        assert_eq!(store.timelogs_for_task(id).unwrap().len(), 4);
    }

    #[test]
    fn timelog_slots_and_notes_round_trip() {
        let (conn, _dir) = setup_test_db();
        let store = SqliteStore::new(&conn);

        let id = store.insert_task(&new_task("Focus block")).unwrap();
        let today = Local::now().date_naive();
        store
            .insert_timelog(&NewTimeLog {
                task_id: id,
                day: today,
                slot_start: Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
                slot_end: Some(NaiveTime::from_hms_opt(9, 45, 0).unwrap()),
                minutes: 45,
                note: Some(String::from("went well")),
            })
            .unwrap();

        let logs = store.timelogs_for_task(id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].minutes, 45);
        assert_eq!(logs[0].slot_start, Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert_eq!(logs[0].note.as_deref(), Some("went well"));
    }
}
