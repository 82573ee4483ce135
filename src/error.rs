//! Errors surfaced by graph invocation and the build collaborators.
//!
//! Nothing recovers from these locally (the one exception being a stale
//! dependency listing, which is regenerated once); they all propagate to the
//! caller of `Work::invoke`.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A task name that no definition provides.
    #[error("don't know how to build task '{0}'")]
    NotFound(String),

    #[error("circular dependency detected: {}", .0.join(" => "))]
    CircularDependency(Vec<String>),

    /// The dependency listing was written in a shape that can't be keyed to
    /// the current object files, and must be regenerated.
    #[error("dependency listing {path} must be regenerated: {reason}")]
    StaleDependencyFormat { path: String, reason: String },

    /// A task's action returned an error.
    #[error("task '{task}' failed")]
    ActionFailure {
        task: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("command failed ({status}): {command}\n{output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    /// A file task without an action whose file doesn't exist.
    #[error("'{0}' is missing and there is no way to create it")]
    MissingInput(String),

    #[error("'{0}' not created")]
    TargetNotCreated(String),

    #[error(
        "compilation cannot proceed as the following header files are missing:\n{}",
        .0.join("\n")
    )]
    MissingHeaders(Vec<String>),

    #[error("required tool '{0}' not found")]
    MissingTool(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
