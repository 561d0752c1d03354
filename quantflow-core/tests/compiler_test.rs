//! Integration tests for the strategy compiler: evaluation semantics over
//! hand-built frames.
//!
//! Covers:
//! 1. Crossover detection against previous-bar snapshots
//! 2. Threshold-vs-edge priority on condition input B
//! 3. Logic node combination (AND / OR)
//! 4. Null-operand and missing-data behavior (fail-safe, never panic)
//! 5. Multi-output indicator handle wiring (MACD)

use chrono::{TimeZone, Utc};
use quantflow_core::compiler::{compile, Frame, IndicatorSnapshot};
use quantflow_core::domain::{Bar, Parameters, Position, PositionSide, SignalAction, StrategyGraph};
use quantflow_core::indicators::IndicatorResult;

fn bar(close: f64) -> Bar {
    Bar {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000.0,
    }
}

fn graph(json: &str) -> StrategyGraph {
    StrategyGraph::from_json(json).unwrap()
}

/// Snapshot with a single-output indicator pinned to one latest value.
fn snapshot(entries: &[(&str, f64)]) -> IndicatorSnapshot {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), IndicatorResult::single(vec![*value])))
        .collect()
}

/// Two indicator inputs feeding one CROSS_ABOVE condition into a LONG entry.
fn crossover_graph(op: &str) -> StrategyGraph {
    graph(&format!(
        r#"{{
        "nodes": [
            {{"id": "price_1", "type": "priceNode"}},
            {{"id": "ind_a", "type": "indicatorNode", "data": {{"indicatorType": "SMA", "period": 5}}}},
            {{"id": "ind_b", "type": "indicatorNode", "data": {{"indicatorType": "SMA", "period": 20}}}},
            {{"id": "cond", "type": "conditionNode", "data": {{"conditionType": "{op}"}}}},
            {{"id": "entry_1", "type": "entryNode", "data": {{"positionType": "LONG"}}}}
        ],
        "edges": [
            {{"source": "ind_a", "sourceHandle": "result", "target": "cond", "targetHandle": "a"}},
            {{"source": "ind_b", "sourceHandle": "result", "target": "cond", "targetHandle": "b"}},
            {{"source": "cond", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"}}
        ]
    }}"#
    ))
}

#[test]
fn cross_above_fires_on_strict_cross() {
    // A: 1 → 3, B: 2 → 2 (the canonical crossing pair)
    let strategy = compile(&crossover_graph("CROSS_ABOVE"), &Parameters::new()).unwrap();
    let current = bar(100.0);
    let previous = bar(99.0);
    let indicators = snapshot(&[("ind_a", 3.0), ("ind_b", 2.0)]);
    let previous_indicators = snapshot(&[("ind_a", 1.0), ("ind_b", 2.0)]);
    let frame = Frame {
        current: &current,
        previous: Some(&previous),
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };

    let signal = strategy.execute(&frame, None).expect("cross above should fire");
    assert_eq!(signal.action, SignalAction::Entry);
    assert_eq!(signal.side, PositionSide::Long);

    // The mirrored operator on the same data must not fire
    let below = compile(&crossover_graph("CROSS_BELOW"), &Parameters::new()).unwrap();
    assert_eq!(below.execute(&frame, None), None);
}

#[test]
fn cross_above_requires_prior_contact() {
    // A already above B on both bars: no cross
    let strategy = compile(&crossover_graph("CROSS_ABOVE"), &Parameters::new()).unwrap();
    let current = bar(100.0);
    let previous = bar(99.0);
    let indicators = snapshot(&[("ind_a", 3.0), ("ind_b", 2.0)]);
    let previous_indicators = snapshot(&[("ind_a", 2.5), ("ind_b", 2.0)]);
    let frame = Frame {
        current: &current,
        previous: Some(&previous),
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert_eq!(strategy.execute(&frame, None), None);
}

#[test]
fn cross_with_missing_previous_data_is_false() {
    let strategy = compile(&crossover_graph("CROSS_ABOVE"), &Parameters::new()).unwrap();
    let current = bar(100.0);
    let indicators = snapshot(&[("ind_a", 3.0), ("ind_b", 2.0)]);
    // Previous snapshot empty: warm-up has not produced prior values yet
    let previous_indicators = IndicatorSnapshot::new();
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert_eq!(strategy.execute(&frame, None), None);
}

#[test]
fn threshold_beats_wired_b_input() {
    // Condition has threshold 200 AND an edge into b carrying 2.0; the
    // threshold must win, so a=3 GT b is false.
    let g = graph(
        r#"{
        "nodes": [
            {"id": "price_1", "type": "priceNode"},
            {"id": "ind_a", "type": "indicatorNode", "data": {"indicatorType": "SMA", "period": 5}},
            {"id": "ind_b", "type": "indicatorNode", "data": {"indicatorType": "SMA", "period": 20}},
            {"id": "cond", "type": "conditionNode", "data": {"conditionType": "GT", "threshold": 200}},
            {"id": "entry_1", "type": "entryNode", "data": {"positionType": "LONG"}}
        ],
        "edges": [
            {"source": "ind_a", "sourceHandle": "result", "target": "cond", "targetHandle": "a"},
            {"source": "ind_b", "sourceHandle": "result", "target": "cond", "targetHandle": "b"},
            {"source": "cond", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"}
        ]
    }"#,
    );
    let strategy = compile(&g, &Parameters::new()).unwrap();
    let current = bar(100.0);
    let indicators = snapshot(&[("ind_a", 3.0), ("ind_b", 2.0)]);
    let previous_indicators = snapshot(&[("ind_a", 3.0), ("ind_b", 2.0)]);
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert_eq!(strategy.execute(&frame, None), None);

    // Lowering the threshold via override flips the outcome
    let params = Parameters::from([("cond_threshold".to_string(), 1.0)]);
    let strategy = compile(&g, &params).unwrap();
    assert!(strategy.execute(&frame, None).is_some());
}

fn logic_graph(logic_type: &str) -> StrategyGraph {
    // close > 100 {AND/OR} close < 110 → LONG entry
    graph(&format!(
        r#"{{
        "nodes": [
            {{"id": "price_1", "type": "priceNode"}},
            {{"id": "cond_lo", "type": "conditionNode", "data": {{"conditionType": "GT", "threshold": 100}}}},
            {{"id": "cond_hi", "type": "conditionNode", "data": {{"conditionType": "LT", "threshold": 110}}}},
            {{"id": "logic_1", "type": "logicNode", "data": {{"logicType": "{logic_type}"}}}},
            {{"id": "entry_1", "type": "entryNode", "data": {{"positionType": "LONG"}}}}
        ],
        "edges": [
            {{"source": "price_1", "sourceHandle": "close", "target": "cond_lo", "targetHandle": "a"}},
            {{"source": "price_1", "sourceHandle": "close", "target": "cond_hi", "targetHandle": "a"}},
            {{"source": "cond_lo", "sourceHandle": "result", "target": "logic_1", "targetHandle": "in1"}},
            {{"source": "cond_hi", "sourceHandle": "result", "target": "logic_1", "targetHandle": "in2"}},
            {{"source": "logic_1", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"}}
        ]
    }}"#
    ))
}

fn execute_flat(strategy_graph: &StrategyGraph, close: f64) -> Option<quantflow_core::domain::Signal> {
    let strategy = compile(strategy_graph, &Parameters::new()).unwrap();
    let current = bar(close);
    let indicators = IndicatorSnapshot::new();
    let previous_indicators = IndicatorSnapshot::new();
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    strategy.execute(&frame, None)
}

#[test]
fn logic_and_requires_every_input() {
    let g = logic_graph("AND");
    assert!(execute_flat(&g, 105.0).is_some()); // both true
    assert_eq!(execute_flat(&g, 95.0), None); // lower bound fails
    assert_eq!(execute_flat(&g, 115.0), None); // upper bound fails
}

#[test]
fn logic_or_accepts_any_input() {
    let g = logic_graph("OR");
    assert!(execute_flat(&g, 105.0).is_some());
    assert!(execute_flat(&g, 95.0).is_some()); // close < 110 still holds
    assert!(execute_flat(&g, 115.0).is_some()); // close > 100 still holds
}

#[test]
fn missing_indicator_data_fails_safe() {
    // Indicator-driven condition with an empty snapshot: null operand →
    // condition false → no signal, no panic.
    let strategy = compile(&crossover_graph("CROSS_ABOVE"), &Parameters::new()).unwrap();
    let current = bar(100.0);
    let empty = IndicatorSnapshot::new();
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &empty,
        previous_indicators: &empty,
    };
    assert_eq!(strategy.execute(&frame, None), None);
}

#[test]
fn nan_indicator_value_is_null_operand() {
    let strategy = compile(&crossover_graph("GT"), &Parameters::new()).unwrap();
    let current = bar(100.0);
    let mut indicators = snapshot(&[("ind_b", 2.0)]);
    indicators.insert("ind_a".to_string(), IndicatorResult::single(vec![f64::NAN]));
    let previous_indicators = IndicatorSnapshot::new();
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert_eq!(strategy.execute(&frame, None), None);
}

#[test]
fn macd_handles_route_to_sub_series() {
    // MACD line above its signal line → SHORT entry (arbitrary wiring)
    let g = graph(
        r#"{
        "nodes": [
            {"id": "price_1", "type": "priceNode"},
            {"id": "macd_1", "type": "indicatorNode", "data": {"indicatorType": "MACD"}},
            {"id": "cond", "type": "conditionNode", "data": {"conditionType": "GT"}},
            {"id": "entry_1", "type": "entryNode", "data": {"positionType": "SHORT"}}
        ],
        "edges": [
            {"source": "macd_1", "sourceHandle": "macd", "target": "cond", "targetHandle": "a"},
            {"source": "macd_1", "sourceHandle": "signal", "target": "cond", "targetHandle": "b"},
            {"source": "cond", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"}
        ]
    }"#,
    );
    let strategy = compile(&g, &Parameters::new()).unwrap();

    let mut indicators = IndicatorSnapshot::new();
    indicators.insert(
        "macd_1".to_string(),
        IndicatorResult::multi(vec![
            ("macd", vec![0.8]),
            ("signal", vec![0.3]),
            ("histogram", vec![0.5]),
        ]),
    );
    let previous_indicators = IndicatorSnapshot::new();
    let current = bar(100.0);
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };

    let signal = strategy.execute(&frame, None).expect("macd > signal");
    assert_eq!(signal.side, PositionSide::Short);
}

#[test]
fn exit_scan_runs_before_entry_scan() {
    // Entry and exit conditions both true on the same bar with an open LONG:
    // the exit must win.
    let g = graph(
        r#"{
        "nodes": [
            {"id": "price_1", "type": "priceNode"},
            {"id": "cond_in", "type": "conditionNode", "data": {"conditionType": "GT", "threshold": 90}},
            {"id": "cond_out", "type": "conditionNode", "data": {"conditionType": "GT", "threshold": 95}},
            {"id": "entry_1", "type": "entryNode", "data": {"positionType": "LONG"}},
            {"id": "exit_1", "type": "exitNode", "data": {"positionType": "LONG"}}
        ],
        "edges": [
            {"source": "price_1", "sourceHandle": "close", "target": "cond_in", "targetHandle": "a"},
            {"source": "price_1", "sourceHandle": "close", "target": "cond_out", "targetHandle": "a"},
            {"source": "cond_in", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"},
            {"source": "cond_out", "sourceHandle": "result", "target": "exit_1", "targetHandle": "signal"}
        ]
    }"#,
    );
    let strategy = compile(&g, &Parameters::new()).unwrap();
    let current = bar(100.0);
    let indicators = IndicatorSnapshot::new();
    let previous_indicators = IndicatorSnapshot::new();
    let frame = Frame {
        current: &current,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };

    let position = Position {
        side: PositionSide::Long,
        entry_price: 92.0,
        entry_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        quantity: 1.0,
    };
    let signal = strategy.execute(&frame, Some(&position)).unwrap();
    assert_eq!(signal.action, SignalAction::Exit);

    // Flat, same bar: the entry fires instead
    let signal = strategy.execute(&frame, None).unwrap();
    assert_eq!(signal.action, SignalAction::Entry);
}

#[test]
fn eq_uses_exact_float_comparison() {
    let g = graph(
        r#"{
        "nodes": [
            {"id": "price_1", "type": "priceNode"},
            {"id": "cond", "type": "conditionNode", "data": {"conditionType": "EQ", "threshold": 100}},
            {"id": "entry_1", "type": "entryNode", "data": {"positionType": "LONG"}}
        ],
        "edges": [
            {"source": "price_1", "sourceHandle": "close", "target": "cond", "targetHandle": "a"},
            {"source": "cond", "sourceHandle": "result", "target": "entry_1", "targetHandle": "signal"}
        ]
    }"#,
    );
    let strategy = compile(&g, &Parameters::new()).unwrap();
    let indicators = IndicatorSnapshot::new();
    let previous_indicators = IndicatorSnapshot::new();

    let exact = bar(100.0);
    let frame = Frame {
        current: &exact,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert!(strategy.execute(&frame, None).is_some());

    let near = bar(100.0 + 1e-9);
    let frame = Frame {
        current: &near,
        previous: None,
        indicators: &indicators,
        previous_indicators: &previous_indicators,
    };
    assert_eq!(strategy.execute(&frame, None), None);
}
