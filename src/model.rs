use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::clock::Clock;
use crate::dates::{format_duration, from_iso, seconds_between, to_iso, SECONDS_PER_MINUTE};
use crate::error::{Result, TaskError};

/// Largest upcoming window `chrono::Duration::days` can represent safely.
const MAX_WINDOW_DAYS: i64 = 100_000_000;

/// A single task: a title, a completion flag, an optional deadline and the
/// time worked on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: i64,
    title: String,
    pub done: bool,
    pub due_date: Option<NaiveDateTime>,
    /// Seconds accumulated over every finished timer session.
    pub time_spent: f64,
    /// Set while a timer session is in progress.
    timer_start: Option<NaiveDateTime>,
}

/// The state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Done,
    Running,
    Pending,
}

/// Flat form of a task as it is written to and read from storage.
///
/// `id` and `title` are optional here only so that a missing value can be
/// reported as bad data instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_done")]
    pub done: bool,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub time_spent: f64,
    #[serde(default)]
    pub timer_start: Option<String>,
}

/// Read the done flag from a JSON bool or from text. Text counts as done
/// only when it spells `true` in any case, so hand edited CSV files with
/// `True` or `TRUE` still load.
fn deserialize_done<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct DoneVisitor;

    impl<'de> de::Visitor<'de> for DoneVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a boolean or a string")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<bool, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<bool, E> {
            Ok(v.trim().eq_ignore_ascii_case("true"))
        }

        fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<bool, E> {
            Ok(false)
        }

        fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<bool, E> {
            Ok(false)
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<bool, E> {
            Ok(false)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(DoneVisitor)
}

impl Task {
    /// Build a task. The title is stored trimmed; a non positive id or a
    /// blank title is refused.
    pub fn new(id: i64, title: &str, done: bool, due_date: Option<NaiveDateTime>) -> Result<Task> {
        if id <= 0 {
            return Err(TaskError::InvalidArgument(
                "Task ID must be a positive integer".to_string(),
            ));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::InvalidArgument(
                "Task title cannot be empty".to_string(),
            ));
        }

        Ok(Task {
            id,
            title: title.to_string(),
            done,
            due_date,
            time_spent: 0.0,
            timer_start: None,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn timer_start(&self) -> Option<NaiveDateTime> {
        self.timer_start
    }

    /// Start a timer session. Does nothing and returns false if the task is
    /// done or a session is already running.
    pub fn start_timer(&mut self, clock: &dyn Clock) -> bool {
        if self.done || self.timer_start.is_some() {
            return false;
        }
        self.timer_start = Some(clock.now());
        true
    }

    /// Stop the running session, fold it into `time_spent` and return its
    /// length in seconds. Returns 0.0 when no session was running, which
    /// cannot be told apart from a session of zero length.
    pub fn stop_timer(&mut self, clock: &dyn Clock) -> f64 {
        match self.timer_start.take() {
            Some(started_at) => {
                // A clock set backwards mid session counts as no work.
                let elapsed = seconds_between(started_at, clock.now()).max(0.0);
                self.time_spent += elapsed;
                elapsed
            }
            None => 0.0,
        }
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer_start.is_some()
    }

    /// Mark the task done, closing any running session first.
    fn complete(&mut self, clock: &dyn Clock) {
        self.done = true;
        if self.is_timer_running() {
            self.stop_timer(clock);
        }
    }

    pub fn state(&self) -> TaskState {
        if self.done {
            TaskState::Done
        } else if self.is_timer_running() {
            TaskState::Running
        } else {
            TaskState::Pending
        }
    }

    /// True for an unfinished task whose deadline is strictly in the past.
    pub fn is_overdue(&self, clock: &dyn Clock) -> bool {
        match self.due_date {
            Some(due) if !self.done => clock.now() > due,
            _ => false,
        }
    }

    /// Seconds left until the deadline, negative once it has passed. None
    /// for done tasks and tasks without a deadline.
    pub fn remaining_time_seconds(&self, clock: &dyn Clock) -> Option<f64> {
        if self.done {
            return None;
        }
        self.due_date.map(|due| seconds_between(clock.now(), due))
    }

    pub fn format_time_spent(&self) -> String {
        format_duration(self.time_spent)
    }

    pub fn format_remaining_time(&self, clock: &dyn Clock) -> String {
        match self.remaining_time_seconds(clock) {
            None => "No deadline".to_string(),
            Some(remaining) if remaining < 0.0 => {
                format!("Overdue by {}", format_duration(remaining.abs()))
            }
            Some(remaining) if remaining < SECONDS_PER_MINUTE as f64 => {
                "Due very soon".to_string()
            }
            Some(remaining) => format!("{} remaining", format_duration(remaining)),
        }
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: Some(self.id),
            title: Some(self.title.clone()),
            done: self.done,
            due_date: self.due_date.as_ref().map(to_iso),
            time_spent: self.time_spent,
            timer_start: self.timer_start.as_ref().map(to_iso),
        }
    }

    /// Rebuild a task from storage. Missing or invalid `id`/`title` and
    /// unreadable dates are rejected; a negative `time_spent` is clamped to
    /// zero.
    pub fn from_record(record: &TaskRecord) -> Result<Task> {
        let id = record
            .id
            .ok_or_else(|| TaskError::InvalidData("missing field 'id'".to_string()))?;
        let title = record
            .title
            .as_deref()
            .ok_or_else(|| TaskError::InvalidData("missing field 'title'".to_string()))?;
        let due_date = read_timestamp("due_date", record.due_date.as_deref())?;
        let timer_start = read_timestamp("timer_start", record.timer_start.as_deref())?;

        let mut task = Task::new(id, title, record.done, due_date).map_err(|e| match e {
            TaskError::InvalidArgument(msg) => TaskError::InvalidData(msg),
            other => other,
        })?;
        task.time_spent = record.time_spent.max(0.0);
        if !task.done {
            task.timer_start = timer_start;
        }
        Ok(task)
    }
}

/// Empty strings count as unset; CSV files write them for missing dates.
fn read_timestamp(field: &str, value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => from_iso(text).map(Some).ok_or_else(|| {
            TaskError::InvalidData(format!("'{}' is not a valid {} timestamp", text, field))
        }),
    }
}

/// The ordered set of tasks held in one task file.
///
/// Tasks keep their insertion order. Every operation addresses a task by id
/// and works on the slot the list owns.
pub struct TodoList {
    tasks: Vec<Task>,
    next_id: i64,
    clock: Box<dyn Clock>,
}

impl TodoList {
    pub fn with_clock(clock: Box<dyn Clock>) -> TodoList {
        TodoList {
            tasks: Vec::new(),
            next_id: 1,
            clock,
        }
    }

    /// Rebuild a list from stored records. The id counter restarts just
    /// past the highest loaded id.
    pub fn from_records(records: &[TaskRecord], clock: Box<dyn Clock>) -> Result<TodoList> {
        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let task = Task::from_record(record)?;
            if !seen.insert(task.id) {
                return Err(TaskError::InvalidData(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
            tasks.push(task);
        }

        let highest = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        let next_id = highest.checked_add(1).ok_or_else(|| {
            TaskError::InvalidData(format!("task id {} leaves no room for new tasks", highest))
        })?;

        let mut list = TodoList::with_clock(clock);
        list.next_id = next_id;
        list.tasks = tasks;
        Ok(list)
    }

    pub fn to_records(&self) -> Vec<TaskRecord> {
        self.tasks.iter().map(Task::to_record).collect()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    #[cfg(test)]
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn add_task(&mut self, title: &str, due_date: Option<NaiveDateTime>) -> Result<&Task> {
        let following = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| TaskError::InvalidArgument("No task ids left".to_string()))?;
        let task = Task::new(self.next_id, title, false, due_date)?;
        self.tasks.push(task);
        self.next_id = following;
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    pub fn find_task(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[cfg(test)]
    pub fn find_task_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Every task when `show_all`, otherwise only unfinished ones.
    pub fn list_tasks(&self, show_all: bool) -> Vec<&Task> {
        self.tasks.iter().filter(|t| show_all || !t.done).collect()
    }

    /// Mark a task done and stop its timer. None when the id is unknown or
    /// the task was already done.
    pub fn mark_done(&mut self, id: i64) -> Option<&Task> {
        let index = self.position(id)?;
        if self.tasks[index].done {
            return None;
        }
        let clock = self.clock.as_ref();
        self.tasks[index].complete(clock);
        Some(&self.tasks[index])
    }

    /// Remove a task. Ids of the remaining tasks and the id counter are left
    /// untouched.
    pub fn delete_task(&mut self, id: i64) -> Option<Task> {
        let index = self.position(id)?;
        Some(self.tasks.remove(index))
    }

    /// False when the id is unknown, same as for a refused start.
    pub fn start_timer(&mut self, id: i64) -> bool {
        let clock = self.clock.as_ref();
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.start_timer(clock),
            None => false,
        }
    }

    /// 0.0 when the id is unknown, same as for a task with no running timer.
    pub fn stop_timer(&mut self, id: i64) -> f64 {
        let clock = self.clock.as_ref();
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.stop_timer(clock),
            None => 0.0,
        }
    }

    pub fn get_total_time_spent(&self) -> f64 {
        self.tasks.iter().map(|t| t.time_spent).sum()
    }

    /// Unfinished tasks due between now and `days` days from now, soonest
    /// first. Empty for a non positive window.
    pub fn get_upcoming_tasks(&self, days: i64) -> Vec<&Task> {
        if days <= 0 {
            return Vec::new();
        }
        let now = self.clock.now();
        // Past the calendar's range every future date is inside the window.
        let cutoff = now.checked_add_signed(Duration::days(days.min(MAX_WINDOW_DAYS)));
        let within = |due: NaiveDateTime| now <= due && cutoff.map_or(true, |c| due <= c);

        let mut upcoming: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| !t.done)
            .filter(|t| t.due_date.map_or(false, &within))
            .collect();
        upcoming.sort_by_key(|t| t.due_date);
        upcoming
    }

    pub fn get_overdue_tasks(&self) -> Vec<&Task> {
        let clock = self.clock.as_ref();
        self.tasks.iter().filter(|t| t.is_overdue(clock)).collect()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
