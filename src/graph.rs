//! The task graph: named tasks, their prerequisites, and their actions.

use crate::canon::canon_path;
use crate::error::{Error, Result};
use crate::stamp::Stamp;
use rustc_hash::FxHashMap;
use std::time::SystemTime;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);
impl TaskId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The work done when a task is stale.  Actions can't reach into the graph
/// while it is being walked; instead they record extra prerequisite edges in
/// the `Enhancements`, which the scheduler applies once the action returns.
pub type Action = Box<dyn FnMut(&mut Enhancements) -> anyhow::Result<()>>;

/// What a task stands for, which decides its staleness rule.
#[derive(Debug)]
pub enum NodeKind {
    /// Needed whenever it has an action; a grouping task without an action is
    /// needed only when one of its prerequisites is.
    Plain,
    /// Backed by the file named like the task.
    File { stamp: Stamp },
    /// Backed by a directory, which executing the task creates.
    Directory { path: String, stamp: Stamp },
    /// Needed until it has executed once in this process.
    RunOnce { invoked: bool, stamp: Stamp },
}

impl NodeKind {
    pub fn stamp(&self) -> Option<&Stamp> {
        match self {
            NodeKind::Plain => None,
            NodeKind::File { stamp }
            | NodeKind::Directory { stamp, .. }
            | NodeKind::RunOnce { stamp, .. } => Some(stamp),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            NodeKind::Plain => "task",
            NodeKind::File { .. } => "file",
            NodeKind::Directory { .. } => "directory",
            NodeKind::RunOnce { .. } => "once",
        }
    }
}

pub struct Node {
    pub name: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    prerequisites: Vec<String>,
    actions: Vec<Action>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("prerequisites", &self.prerequisites)
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Node {
    pub fn prerequisites(&self) -> &[String] {
        &self.prerequisites
    }

    pub fn has_action(&self) -> bool {
        !self.actions.is_empty()
    }

    /// The recorded timestamp, for kinds that carry one.
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.kind.stamp().and_then(|stamp| stamp.get())
    }

    pub fn kind_label(&self) -> &'static str {
        self.kind.label()
    }

    pub(crate) fn run_actions(&mut self, enhancements: &mut Enhancements) -> anyhow::Result<()> {
        for action in self.actions.iter_mut() {
            action(enhancements)?;
        }
        Ok(())
    }

    fn add_prerequisites(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.prerequisites.contains(&name) {
                self.prerequisites.push(name);
            }
        }
    }
}

/// A task definition, built up and then handed to `Graph::define`.
pub struct Task {
    name: String,
    kind: NodeKind,
    prerequisites: Vec<String>,
    description: Option<String>,
    action: Option<Action>,
}

impl Task {
    fn new(name: &str, kind: NodeKind) -> Self {
        Task {
            name: canon_path(name),
            kind,
            prerequisites: Vec::new(),
            description: None,
            action: None,
        }
    }

    pub fn plain(name: &str) -> Self {
        Task::new(name, NodeKind::Plain)
    }

    pub fn file(name: &str) -> Self {
        Task::new(
            name,
            NodeKind::File {
                stamp: Stamp::default(),
            },
        )
    }

    pub fn directory(path: &str) -> Self {
        let path = canon_path(path);
        Task::new(
            &path,
            NodeKind::Directory {
                path: path.clone(),
                stamp: Stamp::default(),
            },
        )
    }

    pub fn once(name: &str) -> Self {
        Task::new(
            name,
            NodeKind::RunOnce {
                invoked: false,
                stamp: Stamp::default(),
            },
        )
    }

    pub fn prerequisites<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prerequisites
            .extend(names.into_iter().map(|name| canon_path(name.as_ref())));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn action(
        mut self,
        action: impl FnMut(&mut Enhancements) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.action = Some(Box::new(action));
        self
    }
}

/// Graph edits requested by an action, applied after it returns.
#[derive(Debug, Default)]
pub struct Enhancements {
    files: Vec<String>,
    edges: Vec<(String, Vec<String>)>,
}

impl Enhancements {
    /// Declare a plain file task (no action) unless the name is already known.
    pub fn file(&mut self, name: &str) {
        self.files.push(canon_path(name));
    }

    /// Append prerequisites to an existing task.
    pub fn enhance<I, S>(&mut self, task: &str, prerequisites: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prerequisites = prerequisites
            .into_iter()
            .map(|name| canon_path(name.as_ref()))
            .collect();
        self.edges.push((canon_path(task), prerequisites));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.edges.is_empty()
    }
}

/// All tasks of one build definition, looked up by name.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,
    by_name: FxHashMap<String, TaskId>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Adds a task.  Defining a name twice extends the first definition:
    /// prerequisites and actions accumulate, and the first kind is kept.
    pub fn define(&mut self, task: Task) -> TaskId {
        if let Some(&id) = self.by_name.get(&task.name) {
            let node = &mut self.nodes[id.index()];
            node.add_prerequisites(task.prerequisites);
            if let Some(action) = task.action {
                node.actions.push(action);
            }
            if task.description.is_some() {
                node.description = task.description;
            }
            return id;
        }

        let id = TaskId(self.nodes.len());
        let mut node = Node {
            name: task.name.clone(),
            description: task.description,
            kind: task.kind,
            prerequisites: Vec::new(),
            actions: task.action.into_iter().collect(),
        };
        node.add_prerequisites(task.prerequisites);
        self.nodes.push(node);
        self.by_name.insert(task.name, id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<TaskId> {
        match self.by_name.get(name) {
            Some(&id) => Some(id),
            None => self.by_name.get(&canon_path(name)).copied(),
        }
    }

    /// Like lookup, failing with NotFound.
    pub fn resolve(&self, name: &str) -> Result<TaskId> {
        self.lookup(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn node(&self, id: TaskId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: TaskId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> {
        (0..self.nodes.len()).map(TaskId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Declares a plain file task for `name` unless the name is already known.
    pub fn ensure_file(&mut self, name: &str) -> TaskId {
        match self.lookup(name) {
            Some(id) => id,
            None => self.define(Task::file(name)),
        }
    }

    /// Appends prerequisites to an existing task, skipping names it already
    /// lists.  Existing prerequisites are never removed.
    pub fn enhance<I, S>(&mut self, id: TaskId, prerequisites: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.nodes[id.index()].add_prerequisites(
            prerequisites
                .into_iter()
                .map(|name| canon_path(name.as_ref())),
        );
    }

    /// Applies edits recorded by an action.
    pub fn apply(&mut self, enhancements: Enhancements) -> Result<()> {
        for file in &enhancements.files {
            self.ensure_file(file);
        }
        for (task, prerequisites) in enhancements.edges {
            let id = self.resolve(&task)?;
            self.enhance(id, prerequisites);
        }
        Ok(())
    }

    /// Forgets every timestamp that was read from disk rather than recorded
    /// by an execution.
    pub fn forget_loaded_stamps(&self) {
        for node in &self.nodes {
            if let Some(stamp) = node.kind.stamp() {
                stamp.forget_loaded();
            }
        }
    }

    /// Drops every task, to start an independent build definition.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.by_name.clear();
    }
}
