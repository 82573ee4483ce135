//! Walks the graph from a requested task, executing whatever is stale.
//!
//! The walk is depth first and synchronous: every prerequisite is invoked (in
//! the order listed) before its dependent's staleness is decided, and a task
//! reachable along several paths is visited once per `invoke` call.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::graph::{Enhancements, Graph, NodeKind, TaskId};
use crate::progress::Progress;
use crate::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use std::time::SystemTime;
use tracing::debug;

fn circular(graph: &Graph, chain: &[TaskId], id: TaskId) -> Error {
    let start = chain.iter().position(|&c| c == id).unwrap_or(0);
    let mut names: Vec<String> = chain[start..]
        .iter()
        .map(|&c| graph.node(c).name.clone())
        .collect();
    names.push(graph.node(id).name.clone());
    Error::CircularDependency(names)
}

/// Decides whether a task's action must run before the task is satisfied.
///
/// Apart from caching timestamps on first read this does not change anything,
/// so it also serves as a "would this do work" query.
pub fn needed(graph: &Graph, fs: &dyn FileSystem, id: TaskId) -> Result<bool> {
    Check::new(graph, fs, true, &mut FxHashMap::default()).needed(id)
}

/// One staleness evaluation.  Answers are memoised, so a task reached along
/// many paths is examined once.
struct Check<'a> {
    graph: &'a Graph,
    fs: &'a dyn FileSystem,
    /// Whether a run-once task that hasn't run yet counts as needed.
    pending_once: bool,
    known: &'a mut FxHashMap<TaskId, bool>,
    times: FxHashMap<TaskId, Option<SystemTime>>,
    stack: Vec<TaskId>,
}

impl<'a> Check<'a> {
    fn new(
        graph: &'a Graph,
        fs: &'a dyn FileSystem,
        pending_once: bool,
        known: &'a mut FxHashMap<TaskId, bool>,
    ) -> Self {
        Check {
            graph,
            fs,
            pending_once,
            known,
            times: FxHashMap::default(),
            stack: Vec::new(),
        }
    }

    fn needed(&mut self, id: TaskId) -> Result<bool> {
        if let Some(&known) = self.known.get(&id) {
            return Ok(known);
        }
        if self.stack.contains(&id) {
            return Err(circular(self.graph, &self.stack, id));
        }
        self.stack.push(id);
        let result = self.decide(id);
        self.stack.pop();
        let result = result?;
        self.known.insert(id, result);
        Ok(result)
    }

    fn decide(&mut self, id: TaskId) -> Result<bool> {
        let graph = self.graph;
        let node = graph.node(id);
        match &node.kind {
            NodeKind::RunOnce { invoked, .. } => Ok(!*invoked && self.pending_once),
            NodeKind::Plain => {
                if node.has_action() {
                    return Ok(true);
                }
                self.any_prerequisite_needed(id)
            }
            NodeKind::File { stamp } => {
                if !self.fs.exists(&node.name)? {
                    debug!(task = %node.name, "needed: file missing");
                    return Ok(true);
                }
                match stamp.get_or_load(self.fs, &node.name)? {
                    Some(own) => self.prerequisites_newer(id, own),
                    None => Ok(true),
                }
            }
            NodeKind::Directory { path, stamp } => {
                if !self.fs.is_dir(path) {
                    debug!(task = %node.name, "needed: directory missing");
                    return Ok(true);
                }
                match stamp.get_or_load(self.fs, path)? {
                    Some(own) => self.prerequisites_newer(id, own),
                    None => Ok(true),
                }
            }
        }
    }

    /// The grouping rule: needed iff some prerequisite is.
    fn any_prerequisite_needed(&mut self, id: TaskId) -> Result<bool> {
        let graph = self.graph;
        for name in graph.node(id).prerequisites() {
            let pid = graph.resolve(name)?;
            if self.needed(pid)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The timestamp a prerequisite counts with: its own for timestamped
    /// kinds, the newest of its prerequisites' for a grouping task, and none
    /// for a plain task with an action.
    fn effective_timestamp(&mut self, id: TaskId) -> Result<Option<SystemTime>> {
        let graph = self.graph;
        let node = graph.node(id);
        if !matches!(node.kind, NodeKind::Plain) {
            return Ok(node.timestamp());
        }
        if node.has_action() {
            return Ok(None);
        }
        if let Some(&time) = self.times.get(&id) {
            return Ok(time);
        }
        if self.stack.contains(&id) {
            return Err(circular(graph, &self.stack, id));
        }
        self.stack.push(id);
        let result = self.newest_member(id);
        self.stack.pop();
        let newest = result?;
        self.times.insert(id, newest);
        Ok(newest)
    }

    fn newest_member(&mut self, id: TaskId) -> Result<Option<SystemTime>> {
        let graph = self.graph;
        let mut newest = None;
        for name in graph.node(id).prerequisites() {
            let pid = graph.resolve(name)?;
            newest = newest.max(self.effective_timestamp(pid)?);
        }
        Ok(newest)
    }

    /// The timestamped rule: needed if some prerequisite is needed, or counts
    /// with a timestamp strictly newer than `own`.
    fn prerequisites_newer(&mut self, id: TaskId, own: SystemTime) -> Result<bool> {
        let graph = self.graph;
        let node = graph.node(id);
        for name in node.prerequisites() {
            let pid = graph.resolve(name)?;
            if self.needed(pid)? {
                debug!(task = %node.name, prerequisite = %name, "needed: prerequisite needed");
                return Ok(true);
            }
            if let Some(time) = self.effective_timestamp(pid)? {
                if time > own {
                    debug!(task = %node.name, prerequisite = %name, "needed: prerequisite newer");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// One scheduling session over a graph.
pub struct Work<'a> {
    graph: &'a mut Graph,
    fs: &'a dyn FileSystem,
    clock: &'a dyn Clock,
    progress: &'a mut dyn Progress,
    /// Number of actions run by this session.
    executed: usize,
    /// Of those, the ones that were not run-once tasks.
    tasks_run: usize,
    /// Staleness answers given since an action last ran.
    known: FxHashMap<TaskId, bool>,
}

impl<'a> Work<'a> {
    /// Starts a session.  Timestamps read from disk by earlier sessions are
    /// dropped so files edited in between are noticed.
    pub fn new(
        graph: &'a mut Graph,
        fs: &'a dyn FileSystem,
        clock: &'a dyn Clock,
        progress: &'a mut dyn Progress,
    ) -> Self {
        graph.forget_loaded_stamps();
        Work {
            graph,
            fs,
            clock,
            progress,
            executed: 0,
            tasks_run: 0,
            known: FxHashMap::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Number of actions executed so far in this session, not counting
    /// run-once tasks.
    pub fn tasks_run(&self) -> usize {
        self.tasks_run
    }

    /// Whether invoking `name` would execute anything at its root.
    pub fn is_needed(&self, name: &str) -> Result<bool> {
        let id = self.graph.resolve(name)?;
        needed(self.graph, self.fs, id)
    }

    /// Like `is_needed`, except that run-once tasks still waiting to run
    /// don't count: this asks whether anything would be built.
    pub fn has_work(&self, name: &str) -> Result<bool> {
        let id = self.graph.resolve(name)?;
        Check::new(self.graph, self.fs, false, &mut FxHashMap::default()).needed(id)
    }

    /// Brings the named task up to date.  Returns the number of actions
    /// executed, 0 meaning everything was already up to date.
    ///
    /// On error, whatever already ran stays done; the failed task and its
    /// dependents did not complete.
    pub fn invoke(&mut self, name: &str) -> Result<usize> {
        let id = self.graph.resolve(name)?;
        let before = self.executed;
        let mut visited = FxHashSet::default();
        let mut chain = Vec::new();
        self.invoke_id(id, &mut visited, &mut chain)?;
        Ok(self.executed - before)
    }

    fn invoke_id(
        &mut self,
        id: TaskId,
        visited: &mut FxHashSet<TaskId>,
        chain: &mut Vec<TaskId>,
    ) -> Result<()> {
        if chain.contains(&id) {
            return Err(circular(self.graph, chain, id));
        }
        if !visited.insert(id) {
            return Ok(());
        }

        chain.push(id);
        // Copied: an action run below may append to this list, and the
        // appended names are meant for the next invocation.
        let prerequisites = self.graph.node(id).prerequisites().to_vec();
        let mut seen = FxHashSet::default();
        for name in &prerequisites {
            if !seen.insert(name) {
                continue;
            }
            let pid = self.graph.resolve(name)?;
            self.invoke_id(pid, visited, chain)?;
        }
        chain.pop();

        let stale = Check::new(self.graph, self.fs, true, &mut self.known).needed(id)?;
        if stale {
            self.execute(id)?;
        }
        Ok(())
    }

    fn execute(&mut self, id: TaskId) -> Result<()> {
        self.known.clear();
        let node = self.graph.node_mut(id);
        if let NodeKind::File { .. } = node.kind {
            if !node.has_action() {
                if !self.fs.exists(&node.name)? {
                    return Err(Error::MissingInput(node.name.clone()));
                }
                // Newer prerequisites, but nothing to run.
                return Ok(());
            }
        }
        if let NodeKind::Directory { path, .. } = &node.kind {
            self.fs.create_dir_all(path)?;
        }
        if !node.has_action() && !matches!(node.kind, NodeKind::Directory { .. }) {
            // A group whose prerequisites were needed; they have run by now.
            return Ok(());
        }

        debug!(task = %node.name, kind = node.kind_label(), "execute");
        self.progress.task_started(node);
        let mut enhancements = Enhancements::default();
        let name = node.name.clone();
        let result = trace::scope(&name, || node.run_actions(&mut enhancements));
        if let Err(err) = result {
            self.progress.task_finished(node, false);
            return Err(Error::ActionFailure {
                task: name,
                source: err.into(),
            });
        }

        match &mut node.kind {
            NodeKind::Plain => {}
            NodeKind::File { stamp } | NodeKind::Directory { stamp, .. } => {
                stamp.mark_now(self.clock);
            }
            NodeKind::RunOnce { invoked, stamp } => {
                *invoked = true;
                stamp.mark_now(self.clock);
            }
        }
        let run_once = matches!(node.kind, NodeKind::RunOnce { .. });
        self.progress.task_finished(node, true);

        self.executed += 1;
        if !run_once {
            self.tasks_run += 1;
        }
        if !enhancements.is_empty() {
            self.graph.apply(enhancements)?;
        }
        Ok(())
    }
}
