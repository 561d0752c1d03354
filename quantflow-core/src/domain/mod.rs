//! Domain types: bars, the strategy graph, positions, signals, trades.

pub mod bar;
pub mod graph;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{validate_series, Bar, SeriesError};
pub use graph::{
    ActionData, ConditionData, ConditionOp, Edge, IndicatorData, LogicData, LogicOp, Node,
    NodeId, NodeKind, Parameters, StrategyGraph,
};
pub use position::{Position, PositionSide};
pub use signal::{Signal, SignalAction};
pub use trade::Trade;
