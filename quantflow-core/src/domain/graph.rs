//! Strategy graph — the declarative node/edge form produced by the visual editor.
//!
//! The editor serializes strategies as a React-Flow document: a node list
//! (each with a `type` tag and a type-specific `data` object) and an edge
//! list wiring named output handles to named input handles. Node variants are
//! a tagged sum type here so evaluation can pattern-match exhaustively
//! instead of branching on type strings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::position::PositionSide;

/// Node identifier, unique within a graph (e.g. `indicator_1`).
pub type NodeId = String;

/// Parameter overrides keyed `<nodeId>_<paramName>` (e.g. `indicator_1_period`).
///
/// Node ids may themselves contain underscores; parameter names never do, so
/// the split is taken at the last underscore.
pub type Parameters = BTreeMap<String, f64>;

/// A complete strategy definition: nodes plus the edges wiring them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl StrategyGraph {
    /// Parses a graph from the editor's JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A directed connection from one node's output handle to another's input handle.
///
/// Handles default to `result`, the single-output convention used by the
/// editor when a node has only one port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    #[serde(rename = "sourceHandle", default = "default_handle")]
    pub source_handle: String,
    pub target: NodeId,
    #[serde(rename = "targetHandle", default = "default_handle")]
    pub target_handle: String,
}

fn default_handle() -> String {
    "result".to_string()
}

/// One node of the strategy graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Node variants, tagged the way the editor tags them.
///
/// Unknown keys in a node document (layout position, display label, …) are
/// ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// The market-data source. Exactly one per graph; no inputs; output
    /// handles `open`, `high`, `low`, `close`, `volume`.
    #[serde(rename = "priceNode")]
    Price,
    #[serde(rename = "indicatorNode")]
    Indicator { data: IndicatorData },
    #[serde(rename = "conditionNode")]
    Condition { data: ConditionData },
    #[serde(rename = "logicNode")]
    Logic { data: LogicData },
    #[serde(rename = "entryNode")]
    Entry { data: ActionData },
    #[serde(rename = "exitNode")]
    Exit { data: ActionData },
}

impl NodeKind {
    /// Short name used in error and log messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Price => "price",
            NodeKind::Indicator { .. } => "indicator",
            NodeKind::Condition { .. } => "condition",
            NodeKind::Logic { .. } => "logic",
            NodeKind::Entry { .. } => "entry",
            NodeKind::Exit { .. } => "exit",
        }
    }
}

/// Indicator node parameters.
///
/// The indicator type is kept as the editor's string (`SMA`, `EMA`, `RSI`,
/// `MACD`, `BBANDS`, `STOCH`); an unrecognized type is a warm-up-style
/// non-fatal condition, not a parse error. Period fields are optional here —
/// per-indicator defaults are resolved when the indicator spec is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorData {
    #[serde(rename = "indicatorType")]
    pub indicator_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
    #[serde(rename = "fastPeriod", default, skip_serializing_if = "Option::is_none")]
    pub fast_period: Option<usize>,
    #[serde(rename = "slowPeriod", default, skip_serializing_if = "Option::is_none")]
    pub slow_period: Option<usize>,
    #[serde(rename = "signalPeriod", default, skip_serializing_if = "Option::is_none")]
    pub signal_period: Option<usize>,
    #[serde(rename = "stdDev", default, skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(rename = "kPeriod", default, skip_serializing_if = "Option::is_none")]
    pub k_period: Option<usize>,
    #[serde(rename = "dPeriod", default, skip_serializing_if = "Option::is_none")]
    pub d_period: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowing: Option<usize>,
}

/// Comparison operators available on condition nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "CROSS_ABOVE")]
    CrossAbove,
    #[serde(rename = "CROSS_BELOW")]
    CrossBelow,
}

impl ConditionOp {
    pub fn is_crossover(self) -> bool {
        matches!(self, ConditionOp::CrossAbove | ConditionOp::CrossBelow)
    }
}

/// Condition node parameters.
///
/// A numeric `threshold` supplies input B as a constant and takes priority
/// over any edge wired to the `b` handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionData {
    #[serde(rename = "conditionType", default = "default_condition")]
    pub condition_type: ConditionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

fn default_condition() -> ConditionOp {
    ConditionOp::Gt
}

/// Boolean combinators available on logic nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Logic node parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicData {
    #[serde(rename = "logicType", default = "default_logic")]
    pub logic_type: LogicOp,
}

fn default_logic() -> LogicOp {
    LogicOp::And
}

/// Entry/exit node parameters: which position side the action applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(rename = "positionType")]
    pub position_type: PositionSide,
}

impl Node {
    /// Applies a single parameter override to this node's data.
    ///
    /// Returns `false` if the named parameter does not exist on this node
    /// type, so the caller can warn about dangling override keys.
    pub fn set_param(&mut self, name: &str, value: f64) -> bool {
        match &mut self.kind {
            NodeKind::Indicator { data } => match name {
                "period" => data.period = Some(value as usize),
                "fastPeriod" => data.fast_period = Some(value as usize),
                "slowPeriod" => data.slow_period = Some(value as usize),
                "signalPeriod" => data.signal_period = Some(value as usize),
                "stdDev" => data.std_dev = Some(value),
                "kPeriod" => data.k_period = Some(value as usize),
                "dPeriod" => data.d_period = Some(value as usize),
                "slowing" => data.slowing = Some(value as usize),
                _ => return false,
            },
            NodeKind::Condition { data } => match name {
                "threshold" => data.threshold = Some(value),
                _ => return false,
            },
            _ => return false,
        }
        true
    }
}
