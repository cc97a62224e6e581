//! Section and generator trackers
//!
//! A test body is run in passes. During a pass the body walks its sections
//! and generators; the tracker tree remembers what has already run, so the
//! next pass can pick the next unexplored path:
//!
//! - every pass enters at most one section that has not completed yet;
//!   once a section closes, later sections of the same pass are skipped
//! - a generator keeps its current value until everything nested after it
//!   has completed, then advances and the sections after it run again
//! - a generator followed by sections none of which has started waits for
//!   them instead of advancing
//! - the body is run again until the root completes
//!
//! Sections are identified by name within their parent, generators by the
//! source location of the `generate` call.
//!
//! Nodes live in an arena owned by the [`TrackerContext`] of one test case.
//! Children dropped when a generator advances stay in the arena unreachable.

use std::any::Any;
use std::panic::Location;

/// Index of a node in the tracker arena
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// Progress of one tracker node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Never entered
    NotStarted,
    /// Entered in the current pass
    Executing,
    /// A child was entered in the current pass
    ExecutingChildren,
    /// A child failed; the node must be entered again
    NeedsAnotherRun,
    /// Done, nothing left to run below it
    CompletedSuccessfully,
    /// Ended by an error
    Failed,
}

enum Kind {
    Section { name: String },
    Generator {
        location: &'static Location<'static>,
        values: Box<dyn Any>,
        index: usize,
        len: usize,
    },
}

struct Node {
    kind: Kind,
    state: RunState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn is_complete(&self) -> bool {
        matches!(
            self.state,
            RunState::CompletedSuccessfully | RunState::Failed
        )
    }

    fn has_started(&self) -> bool {
        self.state != RunState::NotStarted
    }

    fn is_open(&self) -> bool {
        self.has_started() && !self.is_complete()
    }

    fn is_section(&self) -> bool {
        matches!(self.kind, Kind::Section { .. })
    }
}

/// Tracker tree of one test case.
pub struct TrackerContext {
    nodes: Vec<Node>,
    current: NodeId,
    cycle_completed: bool,
    passes: usize,
}

impl TrackerContext {
    /// Fresh tree whose root section is the test case itself.
    pub fn new(test_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: Kind::Section {
                    name: test_name.to_string(),
                },
                state: RunState::NotStarted,
                parent: None,
                children: Vec::new(),
            }],
            current: ROOT,
            cycle_completed: false,
            passes: 0,
        }
    }

    /// Whether every path through the test case has run
    pub fn is_complete(&self) -> bool {
        self.nodes[ROOT].state == RunState::CompletedSuccessfully
    }

    /// Number of passes started so far
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Begin a pass: enter the root.
    pub fn start_pass(&mut self) {
        self.passes += 1;
        self.current = ROOT;
        self.cycle_completed = false;
        self.open(ROOT);
    }

    /// End a pass: close everything still open, innermost first.
    pub fn end_pass(&mut self) {
        self.close(ROOT);
    }

    /// End a pass whose body stopped early (error or panic) while sections
    /// were open. The innermost open section fails; the ones enclosing it
    /// are closed and marked as needing another run.
    pub fn abandon_pass(&mut self, mut first_failure: bool) {
        while let Some(section) = self.innermost_open_section() {
            self.end_section_early(section, first_failure);
            first_failure = false;
        }
        self.end_pass();
    }

    /// Try to enter the section `name` below the current node. Returns the
    /// section's id when the body should run it in this pass.
    pub fn enter_section(&mut self, name: &str) -> Option<NodeId> {
        let id = match self.find_child(|kind| matches!(kind, Kind::Section { name: n } if n == name)) {
            Some(id) => id,
            None => self.add_child(Kind::Section {
                name: name.to_string(),
            }),
        };
        if !self.cycle_completed && !self.nodes[id].is_complete() {
            self.open(id);
            return Some(id);
        }
        None
    }

    /// Leave a section whose body returned normally.
    pub fn leave_section(&mut self, id: NodeId) {
        self.close(id);
    }

    /// Leave a section whose body returned an error. `first_failure` is true
    /// for the innermost section the error passes through.
    pub fn end_section_early(&mut self, id: NodeId, first_failure: bool) {
        if first_failure {
            self.fail(id);
        } else {
            self.close(id);
        }
    }

    /// Acquire the generator at `location`. On first acquisition the
    /// generator stores `len` and the values built by `make_values`; later
    /// acquisitions reuse them.
    pub fn acquire_generator(
        &mut self,
        location: &'static Location<'static>,
        len: usize,
        make_values: impl FnOnce() -> Box<dyn Any>,
    ) -> NodeId {
        let existing = self.find_child(|kind| {
            matches!(kind, Kind::Generator { location: l, .. } if l == &location)
        });
        let id = match existing {
            Some(id) => id,
            None => self.add_child(Kind::Generator {
                location,
                values: make_values(),
                index: 0,
                len,
            }),
        };
        if !self.nodes[id].is_complete() {
            self.open(id);
        }
        id
    }

    /// Stored values and current index of a generator
    pub fn generator_value(&self, id: NodeId) -> Option<(&dyn Any, usize)> {
        match &self.nodes[id].kind {
            Kind::Generator { values, index, .. } => Some((values.as_ref(), *index)),
            Kind::Section { .. } => None,
        }
    }

    /// Names of the open sections from the root down, excluding the root
    pub fn section_path(&self) -> Vec<String> {
        let mut path = Vec::new();
        let mut node = Some(self.current);
        while let Some(id) = node {
            if let Kind::Section { name } = &self.nodes[id].kind {
                if id != ROOT && self.nodes[id].is_open() {
                    path.push(name.clone());
                }
            }
            node = self.nodes[id].parent;
        }
        path.reverse();
        path
    }

    /// State of a node
    pub fn state(&self, id: NodeId) -> RunState {
        self.nodes[id].state
    }

    fn find_child(&self, pred: impl Fn(&Kind) -> bool) -> Option<NodeId> {
        self.nodes[self.current]
            .children
            .iter()
            .copied()
            .find(|&id| pred(&self.nodes[id].kind))
    }

    fn add_child(&mut self, kind: Kind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            state: RunState::NotStarted,
            parent: Some(self.current),
            children: Vec::new(),
        });
        self.nodes[self.current].children.push(id);
        id
    }

    fn innermost_open_section(&self) -> Option<NodeId> {
        let mut node = Some(self.current);
        while let Some(id) = node {
            if id == ROOT {
                return None;
            }
            if self.nodes[id].is_section() && self.nodes[id].is_open() {
                return Some(id);
            }
            node = self.nodes[id].parent;
        }
        None
    }

    fn open(&mut self, id: NodeId) {
        self.nodes[id].state = RunState::Executing;
        self.current = id;
        if let Some(parent) = self.nodes[id].parent {
            self.open_child(parent);
        }
    }

    fn open_child(&mut self, id: NodeId) {
        if self.nodes[id].state != RunState::ExecutingChildren {
            self.nodes[id].state = RunState::ExecutingChildren;
            if let Some(parent) = self.nodes[id].parent {
                self.open_child(parent);
            }
        }
    }

    fn close(&mut self, id: NodeId) {
        // Close still-open descendants first (generators, abandoned sections)
        while self.current != id {
            let inner = self.current;
            if self.nodes[inner].parent.is_none() {
                break;
            }
            self.close(inner);
        }

        let completed = match self.nodes[id].state {
            RunState::Executing => true,
            RunState::ExecutingChildren => self.nodes[id]
                .children
                .iter()
                .all(|&child| self.nodes[child].is_complete()),
            RunState::NeedsAnotherRun
            | RunState::NotStarted
            | RunState::CompletedSuccessfully
            | RunState::Failed => false,
        };
        if completed {
            self.nodes[id].state = RunState::CompletedSuccessfully;
        }
        self.move_to_parent(id);
        self.cycle_completed = true;

        if matches!(self.nodes[id].kind, Kind::Generator { .. }) {
            self.close_generator(id);
        }
    }

    fn close_generator(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let should_wait_for_child = !node.children.is_empty()
            && !node
                .children
                .iter()
                .any(|&child| self.nodes[child].has_started());
        let completed = node.state == RunState::CompletedSuccessfully;
        let advanced = !should_wait_for_child && completed && self.advance_generator(id);
        if should_wait_for_child || advanced {
            let node = &mut self.nodes[id];
            node.children.clear();
            node.state = RunState::Executing;
        }
    }

    fn advance_generator(&mut self, id: NodeId) -> bool {
        match &mut self.nodes[id].kind {
            Kind::Generator { index, len, .. } if *index + 1 < *len => {
                *index += 1;
                true
            }
            _ => false,
        }
    }

    fn fail(&mut self, id: NodeId) {
        self.nodes[id].state = RunState::Failed;
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].state = RunState::NeedsAnotherRun;
        }
        self.move_to_parent(id);
        self.cycle_completed = true;
    }

    fn move_to_parent(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent {
            self.current = parent;
        }
    }
}

impl std::fmt::Debug for TrackerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerContext")
            .field("nodes", &self.nodes.len())
            .field("current", &self.current)
            .field("passes", &self.passes)
            .finish()
    }
}
