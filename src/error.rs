use thiserror::Error;

/// Failures raised by the task model and the due date parser.
///
/// A missing task is not an error: lookups by id return `None` and the
/// caller decides what that means.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Bad constructor input, such as a non positive id or a blank title.
    #[error("{0}")]
    InvalidArgument(String),

    /// A stored record that cannot be turned back into a task.
    #[error("Invalid task data: {0}")]
    InvalidData(String),

    /// Due date text that matches none of the accepted formats. Holds the
    /// text exactly as the user typed it.
    #[error("Unrecognized date format: '{0}'")]
    UnrecognizedDateFormat(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;
