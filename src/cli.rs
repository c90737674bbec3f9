use std::path::PathBuf;
use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Add a new task.
    Add {
        /// The task description text.
        #[structopt()]
        title: String,

        /// Due date: today, tomorrow, YYYY-MM-DD [HH:MM[:SS]], MM/DD/YYYY [HH:MM] or DD.MM.YYYY [HH:MM].
        #[structopt(short, long)]
        due: Option<String>,
    },
    /// List tasks (unfinished ones by default).
    List {
        /// Show completed tasks too.
        #[structopt(short, long, conflicts_with_all = &["upcoming", "overdue"])]
        all: bool,

        /// Show unfinished tasks due in the next few days, soonest first.
        #[structopt(short, long, conflicts_with = "overdue")]
        upcoming: bool,

        /// Show unfinished tasks past their due date.
        #[structopt(short, long)]
        overdue: bool,

        /// Size of the upcoming window, in days.
        #[structopt(long, default_value = "3")]
        days: i64,
    },
    /// Mark a task as completed.
    Done {
        task_id: i64,
    },
    /// Delete a task.
    Delete {
        task_id: i64,

        /// Do not ask for confirmation.
        #[structopt(long)]
        no_confirm: bool,
    },
    /// Start the work timer of a task.
    Start {
        task_id: i64,
    },
    /// Stop the work timer of a task.
    Stop {
        task_id: i64,
    },
    /// Show the time spent on tasks.
    Time {
        /// Only print the total.
        #[structopt(short, long)]
        summary: bool,
    },
    /// Show the time left until a task is due.
    Remaining {
        task_id: i64,
    },
}

impl Command {
    /// The task id the command works on, if any.
    pub fn task_id(&self) -> Option<i64> {
        match self {
            Command::Done { task_id }
            | Command::Delete { task_id, .. }
            | Command::Start { task_id }
            | Command::Stop { task_id }
            | Command::Remaining { task_id } => Some(*task_id),
            _ => None,
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tasktrack",
    about = "A minimalistic task tracker with deadlines and work timers.",
    global_settings = &[AppSettings::AllowNegativeNumbers]
)]
pub struct CommandLineArgs {
    #[structopt(subcommand)]
    pub action: Command,

    /// Use a different task file (.json, .csv or .db).
    #[structopt(parse(from_os_str), short = "f", long = "file", global = true)]
    pub task_file: Option<PathBuf>,

    /// Log what the tool is doing on stderr.
    #[structopt(short, long, global = true)]
    pub verbose: bool,
}
