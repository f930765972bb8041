use chrono::Local;
use rocket::form::Form;
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use tracing::info;

use crate::data::DBConnection;
use crate::error::{AppError, AppResult};

use super::aggregate::{self, MONTH_WINDOW_DAYS, WEEK_WINDOW_DAYS};
use super::data::*;
use super::store::{SqliteStore, Store};
use super::views;

#[get("/")]
pub fn welcome() -> Json<Welcome> {
    Json(Welcome {
        message: String::from("Welcome to MakingMeHappier!"),
    })
}

#[get("/makingmehappier")]
pub fn welcome_alias() -> Json<Welcome> {
    welcome()
}

#[get("/add_task")]
pub fn add_task_form() -> RawHtml<String> {
    RawHtml(views::add_task_page())
}

#[post("/add_task", data = "<form>")]
pub fn create_task(
    form: Form<TaskForm>,
    db_connection: &State<DBConnection>,
) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let form = form.into_inner();
    // Recurring tasks will eventually link to a matching goal; every task
    // starts unlinked for now.
    let goal_id = None;

    let task_id = store.insert_task(&NewTask {
        name: form.name.clone(),
        pillar: form.pillar,
        frequency: form.frequency,
        success_target_percent: form.success_target_percent,
        ideal_gap_days: form.ideal_gap_days,
        goal_id,
        parent_task_id: None,
        is_daily_followup: form.is_daily_followup,
        is_separately_monitored: form.is_separately_monitored,
    })?;
    info!(task_id, name = %form.name, "task created");

    Ok(RawHtml(views::success_page(&format!(
        "Task '{}' added successfully!",
        form.name
    ))))
}

#[get("/tasks")]
pub fn list_tasks(db_connection: &State<DBConnection>) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let tasks = store.list_tasks()?;

    Ok(RawHtml(views::tasks_page(&tasks)))
}

#[get("/task/<task_id>")]
pub fn task_detail(
    task_id: TaskID,
    db_connection: &State<DBConnection>,
) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let task = store
        .get_task(task_id)?
        .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;

    let logs = store.timelogs_for_task(task_id)?;
    let today = Local::now().date_naive();
    let week_data = aggregate::trailing_window(&store, task_id, today, WEEK_WINDOW_DAYS)?;
    let month_data = aggregate::trailing_window(&store, task_id, today, MONTH_WINDOW_DAYS)?;

    let mut subtasks = Vec::new();
    for child_id in store.child_task_ids(task_id)? {
        if let Some(child) = store.get_task(child_id)? {
            subtasks.push(child);
        }
    }

    Ok(RawHtml(views::task_detail_page(
        &task,
        aggregate::total_minutes(&logs),
        &week_data,
        &month_data,
        &subtasks,
    )))
}

#[get("/task/<task_id>/edit")]
pub fn edit_task_form(
    task_id: TaskID,
    db_connection: &State<DBConnection>,
) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let task = store
        .get_task(task_id)?
        .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;

    Ok(RawHtml(views::edit_task_page(&task)))
}

#[post("/task/<task_id>/edit", data = "<form>")]
pub fn edit_task_submit(
    task_id: TaskID,
    form: Form<EditTaskForm>,
    db_connection: &State<DBConnection>,
) -> AppResult<Redirect> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let form = form.into_inner();
    let changed = store.update_task(
        task_id,
        &TaskUpdate {
            name: form.name,
            pillar: form.pillar,
            is_daily_followup: form.is_daily_followup,
            is_separately_monitored: form.is_separately_monitored,
        },
    )?;
    if !changed {
        return Err(AppError::not_found(format!("task {}", task_id)));
    }

    Ok(Redirect::to(uri!(task_detail(task_id))))
}

#[post("/task/<task_id>/log_time", data = "<form>")]
pub fn log_time(
    task_id: TaskID,
    form: Form<TimeLogForm>,
    db_connection: &State<DBConnection>,
) -> AppResult<Redirect> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    if store.get_task(task_id)?.is_none() {
        return Err(AppError::not_found(format!("task {}", task_id)));
    }

    let form = form.into_inner();
    store.insert_timelog(&NewTimeLog {
        task_id,
        day: form
            .day
            .map(|d| d.0)
            .unwrap_or_else(|| Local::now().date_naive()),
        slot_start: form.slot_start.map(|t| t.0),
        slot_end: form.slot_end.map(|t| t.0),
        minutes: form.minutes,
        note: form.note.filter(|note| !note.is_empty()),
    })?;
    info!(task_id, minutes = form.minutes, "time logged");

    Ok(Redirect::to(uri!(task_detail(task_id))))
}

#[get("/add_goal")]
pub fn add_goal_form() -> RawHtml<String> {
    RawHtml(views::add_goal_page())
}

#[post("/add_goal", data = "<form>")]
pub fn create_goal(
    form: Form<GoalForm>,
    db_connection: &State<DBConnection>,
) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let form = form.into_inner();
    let goal_id = store.insert_goal(&NewGoal {
        name: form.name.clone(),
        goal_type: form.goal_type,
        description: form.description.filter(|d| !d.is_empty()),
        target_minutes: form.target_minutes,
        due_date: form.due_date.map(|d| d.0),
    })?;
    info!(goal_id, name = %form.name, "goal created");

    Ok(RawHtml(views::success_page(&format!(
        "Goal '{}' added successfully!",
        form.name
    ))))
}

#[get("/goals")]
pub fn list_goals(db_connection: &State<DBConnection>) -> AppResult<RawHtml<String>> {
    let db_connection = db_connection.lock()?;
    let store = SqliteStore::new(&db_connection);

    let goals = store.list_goals()?;

    Ok(RawHtml(views::goals_page(&goals)))
}
