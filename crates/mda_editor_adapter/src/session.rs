// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing session: command queue, compile requests, and result handoff.
//!
//! Mutation stays on one logical thread; a compile request captures an
//! immutable snapshot that can be validated and compiled anywhere. At
//! most one request is outstanding per snapshot, and a completed result
//! is discarded if the graph has moved on since it was captured.

use crate::commands::{CommandError, CommandOutcome, GraphCommand};
use mda_editor_graph::{
    compile, validate, CompiledPlan, Graph, GraphSnapshot, ValidationError,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The outstanding compile request, tracked at the snapshot handoff
/// boundary. Each request gets its own identity so a finished request
/// can only clear its own marker.
#[derive(Debug, Clone, Copy, PartialEq)]
struct InFlight {
    request: u64,
    revision: u64,
}

/// A compile request over one immutable snapshot.
///
/// `run` may execute on a background worker; the session only sees the
/// finished [`CompileResult`].
pub struct CompileRequest {
    request: u64,
    revision: u64,
    snapshot: GraphSnapshot,
    in_flight: Arc<Mutex<Option<InFlight>>>,
}

impl CompileRequest {
    /// Revision of the snapshot being compiled
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The captured snapshot
    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// Validate and compile the snapshot.
    pub fn run(self) -> CompileResult {
        let outcome = validate(&self.snapshot).map(|validated| compile(&validated));
        let mut in_flight = self.in_flight.lock();
        if in_flight.is_some_and(|f| f.request == self.request) {
            *in_flight = None;
        }
        drop(in_flight);
        CompileResult {
            revision: self.revision,
            outcome,
        }
    }
}

/// Finished compilation of one snapshot
pub struct CompileResult {
    revision: u64,
    outcome: Result<CompiledPlan, Vec<ValidationError>>,
}

impl CompileResult {
    /// Revision of the snapshot this result was produced from
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// What the session did with a completed compile result
#[derive(Debug, PartialEq)]
pub enum CompileCompletion {
    /// The plan is current and was stored
    Accepted,
    /// The graph changed since the snapshot; the result was discarded
    Stale,
    /// The snapshot failed validation
    Invalid(Vec<ValidationError>),
}

/// An editing session for one MDA graph asset
pub struct EditSession {
    graph: Graph,
    pending: VecDeque<GraphCommand>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    next_request: u64,
    plan: Option<(u64, CompiledPlan)>,
}

impl EditSession {
    /// Open a session on an empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self::open(Graph::new(name))
    }

    /// Open a session on an existing graph (e.g. a loaded asset)
    pub fn open(graph: Graph) -> Self {
        Self {
            graph,
            pending: VecDeque::new(),
            in_flight: Arc::new(Mutex::new(None)),
            next_request: 0,
            plan: None,
        }
    }

    /// The live graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Queue an edit for the next [`Self::apply_pending`]
    pub fn submit(&mut self, command: GraphCommand) {
        debug!(?command, "queued edit");
        self.pending.push_back(command);
    }

    /// Apply all queued edits in order.
    ///
    /// Each failed command is recovered locally (the graph is unchanged
    /// by it) and reported so the caller can surface it.
    pub fn apply_pending(&mut self) -> Vec<Result<CommandOutcome, CommandError>> {
        let mut results = Vec::with_capacity(self.pending.len());
        while let Some(command) = self.pending.pop_front() {
            let result = command.apply(&mut self.graph);
            if let Err(err) = &result {
                warn!(%err, "edit rejected");
            }
            results.push(result);
        }
        results
    }

    /// Capture a snapshot and issue a compile request for it.
    ///
    /// Returns `None` when a request for this exact snapshot is already
    /// outstanding, or when the accepted plan is already current.
    pub fn request_compile(&mut self) -> Option<CompileRequest> {
        let revision = self.graph.revision();
        if self.plan.as_ref().is_some_and(|(rev, _)| *rev == revision) {
            return None;
        }
        if self.in_flight.lock().is_some_and(|f| f.revision == revision) {
            return None;
        }
        info!(revision, "compile requested");
        Some(self.issue_request())
    }

    /// Register and build a request for the current snapshot.
    fn issue_request(&mut self) -> CompileRequest {
        let revision = self.graph.revision();
        let request = self.next_request;
        self.next_request += 1;
        *self.in_flight.lock() = Some(InFlight { request, revision });
        CompileRequest {
            request,
            revision,
            snapshot: self.graph.snapshot(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Accept a finished compile result.
    ///
    /// A result produced from an older snapshot than the live graph is
    /// discarded; a newer snapshot has either been requested already or
    /// will be on the next trigger.
    pub fn accept(&mut self, result: CompileResult) -> CompileCompletion {
        if result.revision != self.graph.revision() {
            debug!(
                result = result.revision,
                live = self.graph.revision(),
                "discarding stale compile result"
            );
            return CompileCompletion::Stale;
        }
        match result.outcome {
            Ok(plan) => {
                info!(
                    revision = result.revision,
                    instructions = plan.len(),
                    "compile accepted"
                );
                self.plan = Some((result.revision, plan));
                CompileCompletion::Accepted
            }
            Err(errors) => {
                warn!(
                    revision = result.revision,
                    count = errors.len(),
                    "graph failed validation"
                );
                CompileCompletion::Invalid(errors)
            }
        }
    }

    /// The most recent accepted plan, if it matches the live graph
    pub fn current_plan(&self) -> Option<&CompiledPlan> {
        let (revision, plan) = self.plan.as_ref()?;
        (*revision == self.graph.revision()).then_some(plan)
    }

    /// Validate and compile the live graph synchronously.
    pub fn compile_now(&mut self) -> Result<&CompiledPlan, Vec<ValidationError>> {
        let request = self.issue_request();
        match self.accept(request.run()) {
            CompileCompletion::Accepted => Ok(self
                .current_plan()
                .expect("plan was just accepted")),
            CompileCompletion::Invalid(errors) => Err(errors),
            CompileCompletion::Stale => unreachable!("no edits can interleave"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mda_editor_graph::node::{NodeKind, WeightClamp};
    use mda_editor_graph::{NodeId, PinRef};

    fn build_blend_session() -> (EditSession, NodeId) {
        let mut session = EditSession::new("locomotion");
        for kind in [
            NodeKind::Clip {
                clip: "walk".to_string(),
            },
            NodeKind::Clip {
                clip: "run".to_string(),
            },
            NodeKind::Blend {
                clamp: WeightClamp::default(),
            },
        ] {
            session.submit(GraphCommand::AddNode { kind });
        }
        session.apply_pending();
        let (walk, run, mix) = (NodeId(0), NodeId(1), NodeId(2));
        session.submit(GraphCommand::AddLink {
            from: PinRef::new(walk, "out"),
            to: PinRef::new(mix, "a"),
        });
        session.submit(GraphCommand::AddLink {
            from: PinRef::new(run, "out"),
            to: PinRef::new(mix, "b"),
        });
        session.submit(GraphCommand::SetRoot {
            name: "pose".to_string(),
            node: mix,
        });
        session.apply_pending();
        (session, mix)
    }

    #[test]
    fn test_commands_flow_through_the_queue() {
        let (session, mix) = build_blend_session();
        assert_eq!(session.graph().node_count(), 3);
        assert_eq!(session.graph().link_count(), 2);
        assert_eq!(
            session.graph().roots().collect::<Vec<_>>(),
            vec![("pose", mix)]
        );
    }

    #[test]
    fn test_rejected_edit_is_reported_not_fatal() {
        let (mut session, mix) = build_blend_session();
        session.submit(GraphCommand::RemoveNode { node: NodeId(99) });
        session.submit(GraphCommand::RenameNode {
            node: mix,
            name: "Locomotion Mix".to_string(),
        });

        let results = session.apply_pending();
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
        assert_eq!(session.graph().node(mix).unwrap().name, "Locomotion Mix");
    }

    #[test]
    fn test_compile_request_round_trip() {
        let (mut session, mix) = build_blend_session();
        let request = session.request_compile().unwrap();
        let result = request.run();
        assert_eq!(session.accept(result), CompileCompletion::Accepted);

        let plan = session.current_plan().unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.outputs()[0].slot, plan.slot_of(mix).unwrap());
    }

    #[test]
    fn test_one_request_per_snapshot() {
        let (mut session, mix) = build_blend_session();
        let first = session.request_compile().unwrap();
        assert!(session.request_compile().is_none());

        // Once the result is accepted the plan is current, so there is
        // nothing new to compile until the graph changes
        session.accept(first.run());
        assert!(session.request_compile().is_none());

        session.submit(GraphCommand::RenameNode {
            node: mix,
            name: "renamed".to_string(),
        });
        session.apply_pending();
        assert!(session.request_compile().is_some());
    }

    #[test]
    fn test_sync_compile_leaves_outstanding_request_tracked() {
        let (mut session, _) = build_blend_session();
        let background = session.request_compile().unwrap();

        // A synchronous compile while the request is still in flight
        // must not free the request slot for this snapshot
        session.compile_now().unwrap();
        assert!(session.request_compile().is_none());

        // The outstanding request eventually lands; its result matches
        // the live graph and is simply accepted again
        assert_eq!(session.accept(background.run()), CompileCompletion::Accepted);
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let (mut session, mix) = build_blend_session();
        let request = session.request_compile().unwrap();

        // An edit lands while the compile is in flight
        session.submit(GraphCommand::RenameNode {
            node: mix,
            name: "renamed".to_string(),
        });
        session.apply_pending();

        let result = request.run();
        assert_eq!(session.accept(result), CompileCompletion::Stale);
        assert!(session.current_plan().is_none());
    }

    #[test]
    fn test_invalid_graph_surfaces_all_errors() {
        let mut session = EditSession::new("broken");
        session.submit(GraphCommand::AddNode {
            kind: NodeKind::Blend {
                clamp: WeightClamp::default(),
            },
        });
        session.apply_pending();
        session.submit(GraphCommand::SetRoot {
            name: "pose".to_string(),
            node: NodeId(0),
        });
        session.apply_pending();

        let errors = session.compile_now().unwrap_err();
        // Both motion inputs dangle
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_compile_now_stores_current_plan() {
        let (mut session, _) = build_blend_session();
        assert!(session.current_plan().is_none());
        session.compile_now().unwrap();
        assert!(session.current_plan().is_some());
    }
}
