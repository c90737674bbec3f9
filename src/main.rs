#[macro_use]
extern crate prettytable;

use anyhow::{anyhow, bail, Context};
use directories::ProjectDirs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod clock;
mod dates;
mod error;
mod interface;
mod model;
mod storage;

use clock::SystemClock;
use interface::{ListFilter, Outcome};
use model::TodoList;

use cli::{Command::*, CommandLineArgs};

fn find_default_task_file() -> anyhow::Result<PathBuf> {
    let base_dirs = ProjectDirs::from("com", "gozque", "tasktrack")
        .ok_or_else(|| anyhow!("Failed to find a home directory for the task file."))?;
    let root_dir = base_dirs.data_dir();
    if !root_dir.exists() {
        std::fs::create_dir_all(root_dir)
            .with_context(|| format!("Failed to create directory {}.", root_dir.display()))?;
    }
    Ok(root_dir.join("tasks.json"))
}

/// Send logs to stderr. `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Load the task list stored at the given path.
fn load_list(task_file: &Path) -> anyhow::Result<TodoList> {
    let records = storage::load(task_file)?;
    let list = TodoList::from_records(&records, Box::new(SystemClock))
        .with_context(|| format!("Error loading tasks from {}", task_file.display()))?;
    Ok(list)
}

fn main() -> anyhow::Result<()> {
    // Get the command-line arguments.
    let CommandLineArgs {
        action,
        task_file,
        verbose,
    } = CommandLineArgs::from_args();

    init_logging(verbose);

    if let Some(id) = action.task_id() {
        if id <= 0 {
            bail!("Task ID must be a positive integer");
        }
    }

    // Unpack the task file.
    let task_file = match task_file {
        Some(path) => path,
        None => find_default_task_file()?,
    };
    debug!(path = %task_file.display(), "using task file");

    let mut list = load_list(&task_file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Perform the action.
    let outcome = match action {
        Add { title, due } => interface::add_task(&mut list, &title, due.as_deref(), &mut out),
        List {
            all,
            upcoming,
            overdue,
            days,
        } => {
            let filter = if all {
                ListFilter::All
            } else if upcoming {
                ListFilter::Upcoming(days)
            } else if overdue {
                ListFilter::Overdue
            } else {
                ListFilter::Active
            };
            interface::list(&list, filter, &mut out)
        }
        Done { task_id } => interface::mark_done(&mut list, task_id, &mut out),
        Delete {
            task_id,
            no_confirm,
        } => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            interface::delete_task(&mut list, task_id, !no_confirm, &mut input, &mut out)
        }
        Start { task_id } => interface::start_timer(&mut list, task_id, &mut out),
        Stop { task_id } => interface::stop_timer(&mut list, task_id, &mut out),
        Time { summary } => interface::time_report(&list, summary, &mut out),
        Remaining { task_id } => interface::remaining(&list, task_id, &mut out),
    }?;

    match outcome {
        Outcome::Modified => storage::save(&list.to_records(), &task_file)?,
        Outcome::Unchanged => {}
        Outcome::Refused => {
            out.flush()?;
            drop(out);
            std::process::exit(1);
        }
    }
    Ok(())
}
