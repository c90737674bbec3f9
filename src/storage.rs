use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::TaskRecord;

const CSV_HEADERS: [&str; 6] = ["id", "title", "done", "due_date", "time_spent", "timer_start"];

/// The on-disk layout of a task file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
    Sqlite,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Format> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("csv") => Ok(Format::Csv),
            Some("db") | Some("sqlite") | Some("sqlite3") => Ok(Format::Sqlite),
            _ => Err(anyhow!(
                "Unsupported task file '{}': use a .json, .csv or .db extension.",
                path.display()
            )),
        }
    }
}

/// Read every record from a task file. A file that does not exist yet
/// holds no tasks. One bad record fails the whole load.
pub fn load(path: &Path) -> Result<Vec<TaskRecord>> {
    let format = Format::from_path(path)?;
    if !path.exists() {
        debug!(path = %path.display(), "task file does not exist yet");
        return Ok(Vec::new());
    }

    let records = match format {
        Format::Json => load_json(path),
        Format::Csv => load_csv(path),
        Format::Sqlite => load_sqlite(path),
    }
    .with_context(|| format!("Error loading tasks from {}", path.display()))?;

    debug!(path = %path.display(), count = records.len(), "loaded tasks");
    Ok(records)
}

/// Write every record to a task file, replacing what was there.
pub fn save(records: &[TaskRecord], path: &Path) -> Result<()> {
    let format = Format::from_path(path)?;
    if format != Format::Sqlite {
        backup(path);
    }

    match format {
        Format::Json => save_json(records, path),
        Format::Csv => save_csv(records, path),
        Format::Sqlite => save_sqlite(records, path),
    }
    .with_context(|| format!("Error saving tasks to {}", path.display()))?;

    debug!(path = %path.display(), count = records.len(), "saved tasks");
    Ok(())
}

/// Where the previous version of a task file is kept.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Move the current file aside before it gets overwritten. Failing to do so
/// does not stop the save.
fn backup(path: &Path) {
    if !path.exists() {
        return;
    }
    let target = backup_path(path);
    if let Err(e) = fs::rename(path, &target) {
        warn!(path = %path.display(), error = %e, "could not back up task file");
    }
}

fn load_json(path: &Path) -> Result<Vec<TaskRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records = serde_json::from_str(&content).context("Failed to decode JSON task list.")?;
    Ok(records)
}

fn save_json(records: &[TaskRecord], path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(records)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Vec<TaskRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<TaskRecord>().enumerate() {
        let record = row.with_context(|| format!("Failed to decode CSV row {}.", line + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn save_csv(records: &[TaskRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(&CSV_HEADERS)?;
    for record in records {
        writer.write_record(&[
            record.id.map(|id| id.to_string()).unwrap_or_default(),
            record.title.clone().unwrap_or_default(),
            record.done.to_string(),
            record.due_date.clone().unwrap_or_default(),
            record.time_spent.to_string(),
            record.timer_start.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Create the task table if the database does not have it yet.
fn init_database(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists task (
                  position        INTEGER PRIMARY KEY,
                  id              INTEGER,
                  title           TEXT,
                  done            INTEGER NOT NULL,
                  due_date        TEXT,
                  time_spent      REAL NOT NULL,
                  timer_start     TEXT
                  )",
        [],
    )
    .context("Failed to create task table.")?;
    Ok(())
}

/// Return a record from a row in this order: [id, title, done, due_date,
/// time_spent, timer_start]
fn record_from_row(row: &Row) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        done: row.get(2)?,
        due_date: row.get(3)?,
        time_spent: row.get(4)?,
        timer_start: row.get(5)?,
    })
}

fn load_sqlite(path: &Path) -> Result<Vec<TaskRecord>> {
    let db = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    init_database(&db)?;

    let mut stmt = db
        .prepare("SELECT id, title, done, due_date, time_spent, timer_start FROM task ORDER BY position")
        .context("Failed to fetch tasks from database.")?;
    let rows = stmt
        .query_map([], |row| record_from_row(row))
        .context("Failed to fetch tasks from database.")?;

    let mut records = Vec::new();
    for record in rows {
        records.push(record.context("Failed to decode task row.")?);
    }
    Ok(records)
}

fn save_sqlite(records: &[TaskRecord], path: &Path) -> Result<()> {
    let mut db = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    init_database(&db)?;

    let tx = db.transaction().context("Failed to start transaction.")?;
    tx.execute("DELETE FROM task", [])
        .context("Failed to clear task table.")?;
    for (position, record) in records.iter().enumerate() {
        tx.execute(
            "INSERT INTO task (position, id, title, done, due_date, time_spent, timer_start) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                position as i64,
                record.id,
                record.title,
                record.done,
                record.due_date,
                record.time_spent,
                record.timer_start
            ],
        )
        .context("Failed to insert task to database.")?;
    }
    tx.commit().context("Failed to commit tasks to database.")?;
    Ok(())
}
