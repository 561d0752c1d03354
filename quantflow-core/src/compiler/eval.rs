//! Node evaluation: values, the per-call memo cache, and the recursive walk.
//!
//! Evaluation is memoized per `execute` call — the cache never survives a
//! bar, so compiled strategies stay stateless with respect to the engine loop
//! and safe to share across parallel optimizer runs. A fault inside a node is
//! absorbed at that node's boundary as [`Value::Null`] (conditions downstream
//! read it as false); only graph structure problems are surfaced earlier, at
//! compile time.

use std::collections::HashMap;

use crate::domain::{ConditionOp, LogicOp, NodeKind};

use super::{CompiledStrategy, Frame};

/// Which frame a node is being evaluated against. Crossover conditions
/// re-enter the walk under [`Epoch::Previous`] to read prior-bar operands;
/// the epoch is part of the cache key so the two never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Epoch {
    Current,
    Previous,
}

/// Result of evaluating one node output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    /// Missing data: indicator warm-up, absent prior bar, or an absorbed
    /// evaluation fault.
    Null,
}

impl Value {
    /// Numeric view; NaN counts as missing.
    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(n),
            _ => None,
        }
    }

    /// Strict truth: only `Bool(true)` is true.
    pub fn is_true(self) -> bool {
        self == Value::Bool(true)
    }
}

/// Memo cache for one `execute` call: `(node, output handle, epoch)` → value.
///
/// `InProgress` marks a node currently on the evaluation stack; hitting one
/// again means the graph has a cycle the compile-time check did not see
/// (it always does see them — this is the runtime backstop).
pub(super) enum CacheSlot {
    InProgress,
    Done(Value),
}

pub(super) type EvalCache = HashMap<(usize, String, Epoch), CacheSlot>;

impl CompiledStrategy {
    /// Evaluates the value flowing into `(target, handle)`, i.e. the output
    /// of the first edge wired to that input. Null when nothing is wired.
    pub(super) fn eval_input(
        &self,
        target: usize,
        handle: &str,
        epoch: Epoch,
        frame: &Frame,
        cache: &mut EvalCache,
    ) -> Value {
        match self.first_incoming(target, handle) {
            Some(edge_idx) => {
                let edge = &self.edges[edge_idx];
                let source = self.by_id[&edge.source];
                self.eval_node(source, &edge.source_handle, epoch, frame, cache)
            }
            None => Value::Null,
        }
    }

    /// Recursive, memoized evaluation of one node output handle.
    pub(super) fn eval_node(
        &self,
        idx: usize,
        handle: &str,
        epoch: Epoch,
        frame: &Frame,
        cache: &mut EvalCache,
    ) -> Value {
        let key = (idx, handle.to_string(), epoch);
        match cache.get(&key) {
            Some(CacheSlot::Done(value)) => return *value,
            Some(CacheSlot::InProgress) => {
                tracing::warn!(node = %self.nodes[idx].id, "evaluation cycle detected, treating as null");
                return Value::Null;
            }
            None => {}
        }
        cache.insert(key.clone(), CacheSlot::InProgress);

        let value = self.eval_node_inner(idx, handle, epoch, frame, cache);

        cache.insert(key, CacheSlot::Done(value));
        value
    }

    fn eval_node_inner(
        &self,
        idx: usize,
        handle: &str,
        epoch: Epoch,
        frame: &Frame,
        cache: &mut EvalCache,
    ) -> Value {
        let node = &self.nodes[idx];
        match &node.kind {
            NodeKind::Price => {
                let bar = match epoch {
                    Epoch::Current => Some(frame.current),
                    Epoch::Previous => frame.previous,
                };
                let Some(bar) = bar else {
                    return Value::Null;
                };
                match bar.field(handle) {
                    Some(v) => Value::Number(v),
                    None => {
                        tracing::warn!(node = %node.id, handle, "unknown price field");
                        Value::Null
                    }
                }
            }

            NodeKind::Indicator { .. } => {
                let snapshot = match epoch {
                    Epoch::Current => frame.indicators,
                    Epoch::Previous => frame.previous_indicators,
                };
                let Some(result) = snapshot.get(&node.id) else {
                    tracing::warn!(node = %node.id, "indicator data missing from frame");
                    return Value::Null;
                };
                let latest = result.latest(handle);
                if latest.is_nan() {
                    Value::Null
                } else {
                    Value::Number(latest)
                }
            }

            NodeKind::Condition { data } => {
                let a = self.eval_input(idx, "a", epoch, frame, cache);
                let b = match data.threshold {
                    // A numeric threshold is input B and wins over any edge.
                    Some(t) => Value::Number(t),
                    None => self.eval_input(idx, "b", epoch, frame, cache),
                };
                let (Some(a), Some(b)) = (a.as_number(), b.as_number()) else {
                    return Value::Bool(false);
                };

                let op = data.condition_type;
                match op {
                    ConditionOp::Gt => Value::Bool(a > b),
                    ConditionOp::Lt => Value::Bool(a < b),
                    ConditionOp::Eq => Value::Bool(a == b),
                    ConditionOp::Gte => Value::Bool(a >= b),
                    ConditionOp::Lte => Value::Bool(a <= b),
                    ConditionOp::CrossAbove | ConditionOp::CrossBelow => {
                        if epoch == Epoch::Previous {
                            // Only one bar of history exists; a crossover two
                            // bars back is unknowable.
                            return Value::Bool(false);
                        }
                        let prev_a =
                            self.eval_input(idx, "a", Epoch::Previous, frame, cache).as_number();
                        let prev_b = match data.threshold {
                            Some(t) => Some(t),
                            None => self
                                .eval_input(idx, "b", Epoch::Previous, frame, cache)
                                .as_number(),
                        };
                        match (prev_a, prev_b) {
                            (Some(pa), Some(pb)) => match op {
                                ConditionOp::CrossAbove => Value::Bool(pa <= pb && a > b),
                                _ => Value::Bool(pa >= pb && a < b),
                            },
                            _ => Value::Bool(false),
                        }
                    }
                }
            }

            NodeKind::Logic { data } => {
                let inputs: Vec<Value> = self.incoming_all[idx]
                    .iter()
                    .map(|&edge_idx| {
                        let edge = &self.edges[edge_idx];
                        let source = self.by_id[&edge.source];
                        self.eval_node(source, &edge.source_handle, epoch, frame, cache)
                    })
                    .collect();
                match data.logic_type {
                    LogicOp::And => Value::Bool(inputs.iter().all(|v| v.is_true())),
                    LogicOp::Or => Value::Bool(inputs.iter().any(|v| v.is_true())),
                }
            }

            NodeKind::Entry { .. } | NodeKind::Exit { .. } => {
                // Terminal nodes have no output value.
                tracing::warn!(node = %node.id, "action node used as a value source");
                Value::Null
            }
        }
    }
}
