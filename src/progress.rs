//! Build progress reporting, for the purpose of display to the user.

use crate::graph::{Node, NodeKind};
use std::time::Instant;

/// Compute the message to display on the console for a given task.
pub fn task_message(node: &Node) -> &str {
    match &node.description {
        Some(desc) if !desc.is_empty() => desc,
        _ => &node.name,
    }
}

/// Trait for build progress notifications.
pub trait Progress {
    /// Called right before a task's action runs.
    fn task_started(&mut self, node: &Node);

    /// Called when a task's action returns.
    fn task_finished(&mut self, node: &Node, success: bool);

    /// Log a line of output.
    fn log(&mut self, msg: &str);
}

/// Progress implementation that prints nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn task_started(&mut self, _node: &Node) {}
    fn task_finished(&mut self, _node: &Node, _success: bool) {}
    fn log(&mut self, _msg: &str) {}
}

/// Progress implementation for a plain console: one line per task, no
/// overprinting.
pub struct ConsoleProgress {
    /// Whether to announce every task, rather than only those producing
    /// files.
    verbose: bool,
    started: Option<Instant>,
}

impl ConsoleProgress {
    pub fn new(verbose: bool) -> Self {
        ConsoleProgress {
            verbose,
            started: None,
        }
    }

    fn announces(&self, node: &Node) -> bool {
        self.verbose || matches!(node.kind, NodeKind::File { .. } | NodeKind::Directory { .. })
    }
}

impl Progress for ConsoleProgress {
    fn task_started(&mut self, node: &Node) {
        if self.announces(node) {
            self.log(task_message(node));
        }
        self.started = Some(Instant::now());
    }

    fn task_finished(&mut self, node: &Node, success: bool) {
        if !success {
            self.log(&format!("failed: {}", task_message(node)));
        } else if self.verbose {
            if let Some(start) = self.started {
                self.log(&format!(
                    "  done in {:.2}s: {}",
                    start.elapsed().as_secs_f64(),
                    node.name
                ));
            }
        }
        self.started = None;
    }

    fn log(&mut self, msg: &str) {
        println!("{}", msg);
    }
}
