use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;

use super::data::{Frequency, Goal, GoalType, Pillar, Task};

pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n<nav><a href=\"/tasks\">Tasks</a> | <a href=\"/add_task\">Add task</a> | \
         <a href=\"/goals\">Goals</a> | <a href=\"/add_goal\">Add goal</a></nav>\n{}\n</body>\n</html>",
        escape(title),
        body
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn add_task_page() -> String {
    let mut body = String::from("<h1>Add task</h1>\n<form method=\"post\" action=\"/add_task\">\n");
    body.push_str("<label>Name <input type=\"text\" name=\"name\" required></label><br>\n");

    body.push_str("<label>Pillar <select name=\"pillar\">\n");
    for pillar in Pillar::ALL {
        let _ = writeln!(body, "<option value=\"{0}\">{0}</option>", pillar);
    }
    body.push_str("</select></label><br>\n");

    body.push_str(
        "<label>Allocated time (minutes) \
         <input type=\"number\" name=\"allocated_time\" value=\"30\" required></label><br>\n",
    );

    body.push_str("<label>Frequency <select name=\"frequency\">\n");
    for frequency in Frequency::ALL {
        let _ = writeln!(body, "<option value=\"{0}\">{0}</option>", frequency);
    }
    body.push_str("</select></label><br>\n");

    body.push_str(
        "<label>Success target (%) \
         <input type=\"number\" name=\"success_target_percent\" value=\"90\"></label><br>\n\
         <label>Ideal gap (days) <input type=\"number\" name=\"ideal_gap_days\"></label><br>\n\
         <label>Daily follow-up <input type=\"checkbox\" name=\"is_daily_followup\" value=\"true\"></label><br>\n\
         <label>Separately monitored \
         <input type=\"checkbox\" name=\"is_separately_monitored\" value=\"true\"></label><br>\n\
         <button type=\"submit\">Add task</button>\n</form>",
    );

    page("Add task", &body)
}

pub fn success_page(message: &str) -> String {
    let body = format!(
        "<h1>Done</h1>\n<p>{}</p>\n<p><a href=\"/tasks\">Back to tasks</a></p>",
        escape(message)
    );
    page("Done", &body)
}

pub fn tasks_page(tasks: &[Task]) -> String {
    let mut body = String::from("<h1>Tasks</h1>\n");

    if tasks.is_empty() {
        body.push_str("<p>No tasks yet.</p>");
    } else {
        body.push_str(
            "<table>\n<tr><th>Name</th><th>Pillar</th><th>Frequency</th>\
             <th>Archived</th><th></th></tr>\n",
        );
        for task in tasks {
            let _ = writeln!(
                body,
                "<tr><td><a href=\"/task/{id}\">{name}</a></td><td>{pillar}</td>\
                 <td>{frequency}</td><td>{archived}</td>\
                 <td><a href=\"/task/{id}/edit\">edit</a></td></tr>",
                id = task.id,
                name = escape(&task.name),
                pillar = task.pillar,
                frequency = task.frequency,
                archived = yes_no(task.archived),
            );
        }
        body.push_str("</table>");
    }

    page("Tasks", &body)
}

fn window_table(body: &mut String, heading: &str, data: &HashMap<NaiveDate, i64>) {
    let _ = writeln!(body, "<h2>{}</h2>", heading);
    if data.is_empty() {
        body.push_str("<p>No time logged in this window.</p>\n");
        return;
    }

    let mut days: Vec<_> = data.iter().collect();
    days.sort_by_key(|(day, _)| **day);

    body.push_str("<table>\n<tr><th>Day</th><th>Minutes</th></tr>\n");
    for (day, minutes) in days {
        let _ = writeln!(body, "<tr><td>{}</td><td>{}</td></tr>", day, minutes);
    }
    body.push_str("</table>\n");
}

pub fn task_detail_page(
    task: &Task,
    total_minutes: i64,
    week_data: &HashMap<NaiveDate, i64>,
    month_data: &HashMap<NaiveDate, i64>,
    subtasks: &[Task],
) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape(&task.name));
    let _ = writeln!(
        body,
        "<p>Pillar: {} | Frequency: {} | Success target: {}% | Total logged: {} minutes</p>",
        task.pillar, task.frequency, task.success_target_percent, total_minutes
    );
    let _ = writeln!(
        body,
        "<p>Daily follow-up: {} | Separately monitored: {} | Archived: {}</p>",
        yes_no(task.is_daily_followup),
        yes_no(task.is_separately_monitored),
        yes_no(task.archived),
    );
    if let Some(gap) = task.ideal_gap_days {
        let _ = writeln!(body, "<p>Ideal gap: {} days</p>", gap);
    }
    let _ = writeln!(body, "<p><a href=\"/task/{}/edit\">Edit this task</a></p>", task.id);

    window_table(&mut body, "Last 7 days", week_data);
    window_table(&mut body, "Last 30 days", month_data);

    if !subtasks.is_empty() {
        body.push_str("<h2>Subtasks</h2>\n<ul>\n");
        for subtask in subtasks {
            let _ = writeln!(
                body,
                "<li><a href=\"/task/{}\">{}</a></li>",
                subtask.id,
                escape(&subtask.name)
            );
        }
        body.push_str("</ul>\n");
    }

    let _ = write!(
        body,
        "<h2>Log time</h2>\n<form method=\"post\" action=\"/task/{}/log_time\">\n\
         <label>Minutes <input type=\"number\" name=\"minutes\" required></label><br>\n\
         <label>Day <input type=\"text\" name=\"day\" placeholder=\"YYYY-MM-DD\"></label><br>\n\
         <label>From <input type=\"text\" name=\"slot_start\" placeholder=\"HH:MM\"></label>\n\
         <label>To <input type=\"text\" name=\"slot_end\" placeholder=\"HH:MM\"></label><br>\n\
         <label>Note <input type=\"text\" name=\"note\"></label><br>\n\
         <button type=\"submit\">Log</button>\n</form>",
        task.id
    );

    page(&task.name, &body)
}

pub fn edit_task_page(task: &Task) -> String {
    let mut body = format!(
        "<h1>Edit task</h1>\n<form method=\"post\" action=\"/task/{}/edit\">\n",
        task.id
    );
    let _ = writeln!(
        body,
        "<label>Name <input type=\"text\" name=\"name\" value=\"{}\" required></label><br>",
        escape(&task.name)
    );

    body.push_str("<label>Pillar <select name=\"pillar\">\n");
    for pillar in Pillar::ALL {
        let selected = if pillar == task.pillar { " selected" } else { "" };
        let _ = writeln!(body, "<option value=\"{0}\"{1}>{0}</option>", pillar, selected);
    }
    body.push_str("</select></label><br>\n");

    let followup_checked = if task.is_daily_followup { " checked" } else { "" };
    let monitored_checked = if task.is_separately_monitored { " checked" } else { "" };
    let _ = write!(
        body,
        "<label>Daily follow-up \
         <input type=\"checkbox\" name=\"is_daily_followup\" value=\"true\"{}></label><br>\n\
         <label>Separately monitored \
         <input type=\"checkbox\" name=\"is_separately_monitored\" value=\"true\"{}></label><br>\n\
         <button type=\"submit\">Save</button>\n</form>",
        followup_checked, monitored_checked
    );

    page("Edit task", &body)
}

pub fn add_goal_page() -> String {
    let mut body = String::from("<h1>Add goal</h1>\n<form method=\"post\" action=\"/add_goal\">\n");
    body.push_str("<label>Name <input type=\"text\" name=\"name\" required></label><br>\n");

    body.push_str("<label>Period <select name=\"goal_type\">\n");
    for goal_type in GoalType::ALL {
        let _ = writeln!(body, "<option value=\"{0}\">{0}</option>", goal_type);
    }
    body.push_str("</select></label><br>\n");

    body.push_str(
        "<label>Description <input type=\"text\" name=\"description\"></label><br>\n\
         <label>Target (minutes) \
         <input type=\"number\" name=\"target_minutes\" value=\"0\"></label><br>\n\
         <label>Due date <input type=\"text\" name=\"due_date\" placeholder=\"YYYY-MM-DD\"></label><br>\n\
         <button type=\"submit\">Add goal</button>\n</form>",
    );

    page("Add goal", &body)
}

pub fn goals_page(goals: &[Goal]) -> String {
    let mut body = String::from("<h1>Goals</h1>\n");

    if goals.is_empty() {
        body.push_str("<p>No goals yet.</p>");
    } else {
        body.push_str(
            "<table>\n<tr><th>Name</th><th>Period</th><th>Target</th><th>Used</th>\
             <th>Progress</th><th>Remaining</th><th>Due</th></tr>\n",
        );
        for goal in goals {
            let due = goal
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| String::from("-"));
            let _ = writeln!(
                body,
                "<tr><td>{name}</td><td>{period}</td><td>{target}</td><td>{used}</td>\
                 <td>{progress:.1}%</td><td>{remaining}</td><td>{due}</td></tr>",
                name = escape(&goal.name),
                period = goal.goal_type,
                target = goal.target_minutes,
                used = goal.used_minutes,
                progress = goal.progress_percent(),
                remaining = goal.remaining_minutes(),
                due = due,
            );
        }
        body.push_str("</table>");
    }

    page("Goals", &body)
}
