use anyhow::Result;
use prettytable::Table;
use std::io::{BufRead, Write};
use tracing::{debug, info};

use crate::dates::{display_date, format_duration, parse_due_date};
use crate::model::{Task, TaskState, TodoList};

/// Width at which task titles wrap in the time report.
const TITLE_WIDTH: usize = 40;

/// What a command did to the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The list changed and has to be saved.
    Modified,
    /// Read only command, or nothing to do.
    Unchanged,
    /// The command was refused; the process exits with status 1.
    Refused,
}

/// Which tasks `list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    Active,
    All,
    Upcoming(i64),
    Overdue,
}

fn not_found(out: &mut dyn Write, id: i64) -> Result<Outcome> {
    writeln!(out, "Task #{} not found.", id)?;
    Ok(Outcome::Refused)
}

/// One line of `list` output: `#3 [ ] Title ⏰ (due 2024-06-16 23:59, 1d 11h remaining)`.
fn task_line(list: &TodoList, task: &Task) -> String {
    let clock = list.clock();
    let mut line = format!(
        "#{} [{}] {}",
        task.id(),
        if task.done { "x" } else { " " },
        task.title()
    );
    if task.is_timer_running() {
        line.push_str(" ⏰");
    }
    if let Some(due) = task.due_date {
        if task.done {
            line.push_str(&format!(" (due {})", display_date(&due)));
        } else {
            line.push_str(&format!(
                " (due {}, {})",
                display_date(&due),
                task.format_remaining_time(clock)
            ));
        }
    }
    if task.time_spent > 0.0 {
        line.push_str(&format!(" [{}]", task.format_time_spent()));
    }
    if task.is_overdue(clock) {
        line.push_str(" OVERDUE");
    }
    line
}

pub fn add_task(
    list: &mut TodoList,
    title: &str,
    due: Option<&str>,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let due_date = match due {
        Some(text) => Some(parse_due_date(text, list.clock())?),
        None => None,
    };

    let id = list.add_task(title, due_date)?.id();
    info!(id, "added task");

    if let Some(task) = list.find_task(id) {
        writeln!(out, "Added task #{}: {}", task.id(), task.title())?;
        if let Some(due) = task.due_date {
            writeln!(
                out,
                "  Due: {} ({})",
                display_date(&due),
                task.format_remaining_time(list.clock())
            )?;
        }
    }
    Ok(Outcome::Modified)
}

pub fn list(list: &TodoList, filter: ListFilter, out: &mut dyn Write) -> Result<Outcome> {
    let (heading, tasks) = match filter {
        ListFilter::Active => ("Active Tasks".to_string(), list.list_tasks(false)),
        ListFilter::All => ("All Tasks".to_string(), list.list_tasks(true)),
        ListFilter::Upcoming(days) => (
            format!("Upcoming Tasks (next {} days)", days),
            list.get_upcoming_tasks(days),
        ),
        ListFilter::Overdue => ("Overdue Tasks".to_string(), list.get_overdue_tasks()),
    };
    debug!(?filter, count = tasks.len(), "listing tasks");

    if tasks.is_empty() {
        writeln!(out, "No tasks found.")?;
        return Ok(Outcome::Unchanged);
    }

    writeln!(out, "{}:", heading)?;
    for task in tasks {
        writeln!(out, "{}", task_line(list, task))?;
    }
    Ok(Outcome::Unchanged)
}

pub fn mark_done(list: &mut TodoList, id: i64, out: &mut dyn Write) -> Result<Outcome> {
    match list.find_task(id) {
        None => return not_found(out, id),
        Some(task) if task.done => {
            writeln!(out, "Task #{} is already completed.", id)?;
            return Ok(Outcome::Refused);
        }
        Some(_) => {}
    }

    match list.mark_done(id) {
        Some(task) => {
            info!(id, "completed task");
            writeln!(out, "Completed task #{}: {}", task.id(), task.title())?;
            if task.time_spent > 0.0 {
                writeln!(out, "  Total time: {}", task.format_time_spent())?;
            }
            Ok(Outcome::Modified)
        }
        None => not_found(out, id),
    }
}

pub fn delete_task(
    list: &mut TodoList,
    id: i64,
    confirm: bool,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let title = match list.find_task(id) {
        Some(task) => task.title().to_string(),
        None => return not_found(out, id),
    };

    if confirm {
        write!(out, "Delete task #{} '{}'? [y/N] ", id, title)?;
        out.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        let answer = answer.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            writeln!(out, "Deletion cancelled.")?;
            return Ok(Outcome::Unchanged);
        }
    }

    match list.delete_task(id) {
        Some(task) => {
            info!(id, "deleted task");
            writeln!(out, "Deleted task #{}: {}", task.id(), task.title())?;
            Ok(Outcome::Modified)
        }
        None => not_found(out, id),
    }
}

pub fn start_timer(list: &mut TodoList, id: i64, out: &mut dyn Write) -> Result<Outcome> {
    match list.find_task(id) {
        None => return not_found(out, id),
        Some(task) if task.done => {
            writeln!(out, "Cannot start timer for completed task #{}.", id)?;
            return Ok(Outcome::Refused);
        }
        Some(_) => {}
    }

    if !list.start_timer(id) {
        writeln!(out, "Timer already running for task #{}.", id)?;
        return Ok(Outcome::Refused);
    }

    info!(id, "started timer");
    if let Some(task) = list.find_task(id) {
        writeln!(out, "Started timer for task #{}: {}", task.id(), task.title())?;
    }
    Ok(Outcome::Modified)
}

pub fn stop_timer(list: &mut TodoList, id: i64, out: &mut dyn Write) -> Result<Outcome> {
    match list.find_task(id) {
        None => return not_found(out, id),
        Some(task) if !task.is_timer_running() => {
            writeln!(out, "No timer running for task #{}.", id)?;
            return Ok(Outcome::Refused);
        }
        Some(_) => {}
    }

    let elapsed = list.stop_timer(id);
    info!(id, elapsed, "stopped timer");
    if let Some(task) = list.find_task(id) {
        writeln!(out, "Stopped timer for task #{}: {}", task.id(), task.title())?;
        writeln!(out, "  Session time: {}", format_duration(elapsed))?;
        writeln!(out, "  Total time: {}", task.format_time_spent())?;
    }
    Ok(Outcome::Modified)
}

pub fn time_report(list: &TodoList, summary: bool, out: &mut dyn Write) -> Result<Outcome> {
    let total = format_duration(list.get_total_time_spent());
    if summary {
        writeln!(out, "Total time: {}", total)?;
        return Ok(Outcome::Unchanged);
    }

    writeln!(out, "Time Tracking Report")?;
    let mut table = Table::new();
    table.add_row(row!["id", "task", "status", "time spent"]);
    for task in list.list_tasks(true) {
        let status = match task.state() {
            TaskState::Done => "done".to_string(),
            TaskState::Pending => "pending".to_string(),
            TaskState::Running => match task.timer_start() {
                Some(start) => format!("running since {}", start.format("%H:%M")),
                None => "running".to_string(),
            },
        };
        table.add_row(row![
            task.id(),
            textwrap::fill(task.title(), TITLE_WIDTH),
            status,
            task.format_time_spent()
        ]);
    }
    write!(out, "{}", table)?;
    writeln!(out, "Total time spent: {}", total)?;
    Ok(Outcome::Unchanged)
}

pub fn remaining(list: &TodoList, id: i64, out: &mut dyn Write) -> Result<Outcome> {
    let task = match list.find_task(id) {
        Some(task) => task,
        None => return not_found(out, id),
    };

    if task.done {
        writeln!(out, "Task #{} is completed.", id)?;
        return Ok(Outcome::Unchanged);
    }
    match task.due_date {
        None => writeln!(out, "Task #{} has no deadline.", id)?,
        Some(due) => {
            writeln!(out, "Task #{}: {}", task.id(), task.title())?;
            writeln!(out, "Due: {}", display_date(&due))?;
            writeln!(out, "Status: {}", task.format_remaining_time(list.clock()))?;
        }
    }
    Ok(Outcome::Unchanged)
}
