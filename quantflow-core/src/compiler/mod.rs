//! Strategy compiler — turns a node/edge graph into an executable strategy.
//!
//! Compilation merges parameter overrides into node data, validates the graph
//! structure (exactly one price source, required inputs wired, no cycles),
//! and builds the adjacency indexes the evaluator needs: a node arena indexed
//! by id and incoming edges indexed by `(target, target_handle)`. Nodes are
//! always referenced by arena index after compilation, never by live
//! reference, so a [`CompiledStrategy`] is trivially cloneable and shareable
//! across parallel optimizer runs.

pub mod eval;
pub mod frame;

pub use eval::{Epoch, Value};
pub use frame::{Frame, IndicatorSnapshot};

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{
    Edge, Node, NodeId, NodeKind, Parameters, Position, Signal, SignalAction, StrategyGraph,
};
use crate::fingerprint::strategy_fingerprint;
use crate::indicators::IndicatorSpec;

use eval::EvalCache;

/// Why a graph failed to compile. Fatal; surfaced to the caller immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("graph has no price node")]
    MissingPriceNode,
    #[error("graph has more than one price node")]
    MultiplePriceNodes,
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),
    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),
    #[error("price node '{0}' must not have inputs")]
    PriceNodeHasInputs(String),
    #[error("node '{node}' is missing required input '{handle}'")]
    MissingInput { node: String, handle: String },
    #[error("logic node '{node}' requires at least 2 inputs, found {found}")]
    LogicArity { node: String, found: usize },
    #[error("cycle detected through node '{0}'")]
    CycleDetected(String),
}

/// An executable strategy: the validated, parameter-merged graph plus its
/// adjacency indexes.
#[derive(Debug, Clone)]
pub struct CompiledStrategy {
    /// Node arena with overrides applied.
    nodes: Vec<Node>,
    by_id: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    /// Incoming edge indices per `(target, target_handle)`.
    incoming_by_handle: HashMap<(usize, String), Vec<usize>>,
    /// All incoming edge indices per target, any handle (logic nodes take
    /// every wired input).
    incoming_all: Vec<Vec<usize>>,
    entries: Vec<usize>,
    exits: Vec<usize>,
    indicator_specs: Vec<(NodeId, IndicatorSpec)>,
    fingerprint: String,
}

/// Compiles a strategy graph with the given parameter overrides.
pub fn compile(
    graph: &StrategyGraph,
    parameters: &Parameters,
) -> Result<CompiledStrategy, CompileError> {
    let mut nodes = graph.nodes.clone();

    // Arena index
    let mut by_id = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        if by_id.insert(node.id.clone(), idx).is_some() {
            return Err(CompileError::DuplicateNodeId(node.id.clone()));
        }
    }

    // Overrides merge: `<nodeId>_<paramName>`, override wins over node data.
    for (key, &value) in parameters {
        let applied = key.rsplit_once('_').is_some_and(|(node_id, param)| {
            by_id
                .get(node_id)
                .is_some_and(|&idx| nodes[idx].set_param(param, value))
        });
        if !applied {
            tracing::warn!(key = %key, "ignoring parameter override with no matching node parameter");
        }
    }

    // Exactly one price source
    let price_nodes: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| matches!(n.kind, NodeKind::Price))
        .map(|(idx, _)| idx)
        .collect();
    match price_nodes.len() {
        0 => return Err(CompileError::MissingPriceNode),
        1 => {}
        _ => return Err(CompileError::MultiplePriceNodes),
    }

    // Edge indexes
    let edges = graph.edges.clone();
    let mut incoming_by_handle: HashMap<(usize, String), Vec<usize>> = HashMap::new();
    let mut incoming_all: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (edge_idx, edge) in edges.iter().enumerate() {
        if !by_id.contains_key(&edge.source) {
            return Err(CompileError::UnknownNode(edge.source.clone()));
        }
        let Some(&target) = by_id.get(&edge.target) else {
            return Err(CompileError::UnknownNode(edge.target.clone()));
        };
        incoming_by_handle
            .entry((target, edge.target_handle.clone()))
            .or_default()
            .push(edge_idx);
        incoming_all[target].push(edge_idx);
    }

    // Structural checks per node kind
    let mut entries = Vec::new();
    let mut exits = Vec::new();
    let mut indicator_specs = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        match &node.kind {
            NodeKind::Price => {
                if !incoming_all[idx].is_empty() {
                    return Err(CompileError::PriceNodeHasInputs(node.id.clone()));
                }
            }
            NodeKind::Indicator { data } => {
                indicator_specs.push((node.id.clone(), IndicatorSpec::from_data(data)));
            }
            NodeKind::Condition { data } => {
                let has = |handle: &str| {
                    incoming_by_handle.contains_key(&(idx, handle.to_string()))
                };
                if !has("a") {
                    return Err(CompileError::MissingInput {
                        node: node.id.clone(),
                        handle: "a".into(),
                    });
                }
                if data.threshold.is_none() && !has("b") {
                    return Err(CompileError::MissingInput {
                        node: node.id.clone(),
                        handle: "b".into(),
                    });
                }
            }
            NodeKind::Logic { .. } => {
                let found = incoming_all[idx].len();
                if found < 2 {
                    return Err(CompileError::LogicArity {
                        node: node.id.clone(),
                        found,
                    });
                }
            }
            NodeKind::Entry { .. } => entries.push(idx),
            NodeKind::Exit { .. } => exits.push(idx),
        }
    }

    detect_cycles(&nodes, &edges, &by_id)?;

    let fingerprint = strategy_fingerprint(graph, parameters);

    Ok(CompiledStrategy {
        nodes,
        by_id,
        edges,
        incoming_by_handle,
        incoming_all,
        entries,
        exits,
        indicator_specs,
        fingerprint,
    })
}

/// Three-color DFS over the source→target direction.
fn detect_cycles(
    nodes: &[Node],
    edges: &[Edge],
    by_id: &HashMap<NodeId, usize>,
) -> Result<(), CompileError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        White,
        Gray,
        Black,
    }

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in edges {
        outgoing[by_id[&edge.source]].push(by_id[&edge.target]);
    }

    let mut marks = vec![Mark::White; nodes.len()];

    fn visit(
        idx: usize,
        outgoing: &[Vec<usize>],
        marks: &mut [Mark],
        nodes: &[Node],
    ) -> Result<(), CompileError> {
        marks[idx] = Mark::Gray;
        for &next in &outgoing[idx] {
            match marks[next] {
                Mark::Gray => return Err(CompileError::CycleDetected(nodes[next].id.clone())),
                Mark::White => visit(next, outgoing, marks, nodes)?,
                Mark::Black => {}
            }
        }
        marks[idx] = Mark::Black;
        Ok(())
    }

    for idx in 0..nodes.len() {
        if marks[idx] == Mark::White {
            visit(idx, &outgoing, &mut marks, nodes)?;
        }
    }
    Ok(())
}

impl CompiledStrategy {
    /// Indicator nodes the engine must snapshot per bar, with their resolved
    /// parameters.
    pub fn indicator_nodes(&self) -> &[(NodeId, IndicatorSpec)] {
        &self.indicator_specs
    }

    /// Deterministic BLAKE3 identity of (graph, parameters).
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Evaluates one bar: exit signals first (position side must match),
    /// then entry signals while flat. First match wins; `None` means no
    /// signal.
    pub fn execute(&self, frame: &Frame, position: Option<&Position>) -> Option<Signal> {
        let mut cache = EvalCache::new();

        for &exit_idx in &self.exits {
            let NodeKind::Exit { data } = &self.nodes[exit_idx].kind else {
                continue;
            };
            if self.first_incoming(exit_idx, "signal").is_none() {
                continue;
            }
            let fired = self
                .eval_input(exit_idx, "signal", Epoch::Current, frame, &mut cache)
                .is_true();
            if fired && position.is_some_and(|p| p.side == data.position_type) {
                return Some(Signal {
                    action: SignalAction::Exit,
                    side: data.position_type,
                    price: frame.current.close,
                });
            }
        }

        if position.is_none() {
            for &entry_idx in &self.entries {
                let NodeKind::Entry { data } = &self.nodes[entry_idx].kind else {
                    continue;
                };
                if self.first_incoming(entry_idx, "signal").is_none() {
                    continue;
                }
                let fired = self
                    .eval_input(entry_idx, "signal", Epoch::Current, frame, &mut cache)
                    .is_true();
                if fired {
                    return Some(Signal {
                        action: SignalAction::Entry,
                        side: data.position_type,
                        price: frame.current.close,
                    });
                }
            }
        }

        None
    }

    fn first_incoming(&self, target: usize, handle: &str) -> Option<usize> {
        self.incoming_by_handle
            .get(&(target, handle.to_string()))
            .and_then(|edges| edges.first().copied())
    }
}
