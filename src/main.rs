#[macro_use]
extern crate rocket;

use rusqlite::Connection;

use std::env;
use std::error::Error;
use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod data;
mod error;
mod tracker;

use data::DBConnection;
use tracker::endpoints;

pub fn build_app(db_connection: DBConnection) -> rocket::Rocket<rocket::Build> {
    rocket::build().manage(db_connection).mount(
        "/",
        routes![
            endpoints::welcome,
            endpoints::welcome_alias,
            endpoints::add_task_form,
            endpoints::create_task,
            endpoints::list_tasks,
            endpoints::task_detail,
            endpoints::edit_task_form,
            endpoints::edit_task_submit,
            endpoints::log_time,
            endpoints::add_goal_form,
            endpoints::create_goal,
            endpoints::list_goals,
        ],
    )
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let db_path = env::var("HAPPIER_DB").unwrap_or_else(|_| String::from("happier.db"));
    let connection = Connection::open(&db_path)?;
    tracker::store::init_tables(&connection)?;
    info!(path = %db_path, "database ready");

    let connection = Arc::new(Mutex::new(connection));

    build_app(connection).launch().await?;

    Ok(())
}
