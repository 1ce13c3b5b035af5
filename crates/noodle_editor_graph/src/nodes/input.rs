// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic input node: a user-typed value emitted as one of four data types.

use super::single_output;
use super::values::BOOLEAN_VALUE;
use crate::node::{HeightMode, Node, NodeState};
use crate::registry::{NodeTypeDef, NodeTypeRegistry, SocketValues, WidgetEvent};
use crate::socket::{DataType, SocketId, SocketSpec, Value};

/// State key holding the raw text value
pub const INPUT_VALUE: &str = "inputValue";
/// State key holding the selected output type name
pub const INPUT_DATA_TYPE: &str = "inputDataType";
/// State key enabling float rounding
pub const FLOAT_ROUND: &str = "floatRound";
/// State key holding the number of decimals used when rounding
pub const FLOAT_DECIMALS: &str = "floatDecimals";

/// Output types the input node can switch between, in menu order
pub const INPUT_TYPES: [DataType; 4] = [
    DataType::String,
    DataType::Float,
    DataType::Integer,
    DataType::Bool,
];

const DEFAULT_DECIMALS: i64 = 2;
const MAX_DECIMALS: i64 = 10;

pub(super) fn register(registry: &mut NodeTypeRegistry) {
    registry.register(
        NodeTypeDef::new("input", "Input", compute_input)
            .with_outputs(vec![SocketSpec::new("out", "value", DataType::String)])
            .with_sizing(true, HeightMode::Auto)
            .with_widget(input_widget),
    );
}

fn selected_type(state: &NodeState) -> DataType {
    state
        .get_str(INPUT_DATA_TYPE)
        .and_then(DataType::parse)
        .filter(|t| INPUT_TYPES.contains(t))
        .unwrap_or(DataType::String)
}

fn decimals(state: &NodeState) -> usize {
    state
        .get_i64(FLOAT_DECIMALS)
        .unwrap_or(DEFAULT_DECIMALS)
        .clamp(0, MAX_DECIMALS) as usize
}

/// Compute function of the input node.
///
/// Text that does not start with a number reads as zero. Floats are rounded
/// to `floatDecimals` places when `floatRound` is set.
pub fn compute_input(_inputs: &SocketValues, node: &Node) -> SocketValues {
    let state = &node.state;
    let text = state.get_str(INPUT_VALUE).unwrap_or("");
    let value = match selected_type(state) {
        DataType::Float => {
            let number = leading_number(text, true).unwrap_or(0.0);
            if state.get_bool(FLOAT_ROUND).unwrap_or(false) {
                Value::Float(round_to(number, decimals(state)))
            } else {
                Value::Float(number)
            }
        }
        DataType::Integer => Value::Integer(leading_number(text, false).map_or(0, |n| n as i64)),
        DataType::Bool => Value::Bool(state.get_bool(BOOLEAN_VALUE).unwrap_or(false)),
        _ => Value::String(text.to_string()),
    };
    single_output("out", value)
}

/// Parse the longest numeric prefix of `text`, ignoring leading whitespace
fn leading_number(text: &str, allow_fraction: bool) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut has_digits = end > digits_start;
    if allow_fraction && bytes.get(end) == Some(&b'.') {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while bytes.get(fraction_end).is_some_and(u8::is_ascii_digit) {
            fraction_end += 1;
        }
        if fraction_end > fraction_start || has_digits {
            has_digits |= fraction_end > fraction_start;
            end = fraction_end;
        }
    }
    if !has_digits {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}

fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

fn type_label(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Float => "Float",
        DataType::Integer => "Integer",
        DataType::Bool => "Bool",
        _ => "String",
    }
}

fn input_widget(ui: &mut egui::Ui, state: &mut NodeState) -> WidgetEvent {
    let current = selected_type(state);
    let mut chosen = current;
    egui::ComboBox::from_id_salt("input-type")
        .selected_text(type_label(current))
        .show_ui(ui, |ui| {
            for data_type in INPUT_TYPES {
                ui.selectable_value(&mut chosen, data_type, type_label(data_type));
            }
        });

    if chosen != current {
        switch_type(state, chosen);
        return WidgetEvent::OutputTypeChanged {
            socket: SocketId::from("out"),
            data_type: chosen,
        };
    }

    let changed = match current {
        DataType::Bool => bool_controls(ui, state),
        DataType::Integer => integer_controls(ui, state),
        DataType::Float => float_controls(ui, state),
        _ => string_controls(ui, state),
    };
    if changed {
        WidgetEvent::Changed
    } else {
        WidgetEvent::None
    }
}

/// Select a new output type and reset the text value to fit it
fn switch_type(state: &mut NodeState, data_type: DataType) {
    state.set(INPUT_DATA_TYPE, data_type.name());
    match data_type {
        DataType::Float | DataType::Integer => state.set(INPUT_VALUE, "0"),
        DataType::String => state.set(INPUT_VALUE, ""),
        _ => {}
    }
}

fn bool_controls(ui: &mut egui::Ui, state: &mut NodeState) -> bool {
    let mut value = state.get_bool(BOOLEAN_VALUE).unwrap_or(false);
    let changed = ui
        .checkbox(&mut value, "value")
        .on_hover_text("Toggle true / false")
        .changed();
    if changed {
        state.set(BOOLEAN_VALUE, value);
    }
    changed
}

fn integer_controls(ui: &mut egui::Ui, state: &mut NodeState) -> bool {
    let mut value = leading_number(state.get_str(INPUT_VALUE).unwrap_or(""), false).map_or(0, |n| n as i64);
    let changed = ui.add(egui::DragValue::new(&mut value)).changed();
    if changed {
        state.set(INPUT_VALUE, value.to_string());
    }
    changed
}

fn float_controls(ui: &mut egui::Ui, state: &mut NodeState) -> bool {
    let round = state.get_bool(FLOAT_ROUND).unwrap_or(false);
    let decimals = decimals(state);
    let mut value = leading_number(state.get_str(INPUT_VALUE).unwrap_or(""), true).unwrap_or(0.0);

    let mut drag = egui::DragValue::new(&mut value).speed(0.1);
    if round {
        drag = drag.fixed_decimals(decimals);
    }
    let mut changed = false;
    if ui.add(drag).changed() {
        state.set(INPUT_VALUE, value.to_string());
        changed = true;
    }

    let mut round_enabled = round;
    if ui
        .checkbox(&mut round_enabled, "round")
        .on_hover_text("Enable custom decimals")
        .changed()
    {
        state.set(FLOAT_ROUND, round_enabled);
        if !round_enabled {
            state.set(FLOAT_DECIMALS, DEFAULT_DECIMALS);
        }
        changed = true;
    }

    if round_enabled {
        let mut places = decimals as i64;
        if ui
            .add(egui::DragValue::new(&mut places).range(0..=MAX_DECIMALS).prefix("decimals: "))
            .changed()
        {
            state.set(FLOAT_DECIMALS, places);
            changed = true;
        }
    }
    changed
}

fn string_controls(ui: &mut egui::Ui, state: &mut NodeState) -> bool {
    let mut text = state.get_str(INPUT_VALUE).unwrap_or("").to_string();
    let changed = ui
        .add(egui::TextEdit::singleline(&mut text).hint_text("enter value..."))
        .changed();
    if changed {
        state.set(INPUT_VALUE, text);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use egui::Pos2;

    fn node_with(state: NodeState) -> Node {
        let mut node = Node::new(
            NodeId::from("input-1"),
            "Input",
            Pos2::ZERO,
            &[],
            &[SocketSpec::new("out", "value", DataType::String)],
        );
        node.state = state;
        node
    }

    fn emitted(state: NodeState) -> Value {
        compute_input(&SocketValues::new(), &node_with(state))["out"].clone()
    }

    #[test]
    fn test_defaults_to_empty_string() {
        assert_eq!(emitted(NodeState::new()), Value::from(""));
    }

    #[test]
    fn test_numeric_conversion() {
        let float = NodeState::new().with(INPUT_DATA_TYPE, "float").with(INPUT_VALUE, "3.75kg");
        assert_eq!(emitted(float), Value::Float(3.75));

        let int = NodeState::new().with(INPUT_DATA_TYPE, "integer").with(INPUT_VALUE, " -12.9");
        assert_eq!(emitted(int), Value::Integer(-12));

        let junk = NodeState::new().with(INPUT_DATA_TYPE, "float").with(INPUT_VALUE, "abc");
        assert_eq!(emitted(junk), Value::Float(0.0));
    }

    #[test]
    fn test_float_rounding() {
        let state = NodeState::new()
            .with(INPUT_DATA_TYPE, "float")
            .with(INPUT_VALUE, "3.14159")
            .with(FLOAT_ROUND, true)
            .with(FLOAT_DECIMALS, 2);
        assert_eq!(emitted(state), Value::Float(3.14));

        let unrounded = NodeState::new()
            .with(INPUT_DATA_TYPE, "float")
            .with(INPUT_VALUE, "3.14159")
            .with(FLOAT_DECIMALS, 2);
        assert_eq!(emitted(unrounded), Value::Float(3.14159));
    }

    #[test]
    fn test_bool_and_unknown_type() {
        let state = NodeState::new().with(INPUT_DATA_TYPE, "bool").with(BOOLEAN_VALUE, true);
        assert_eq!(emitted(state), Value::Bool(true));

        let any = NodeState::new().with(INPUT_DATA_TYPE, "any").with(INPUT_VALUE, "x");
        assert_eq!(emitted(any), Value::from("x"));
    }

    #[test]
    fn test_switch_type_resets_value() {
        let mut state = NodeState::new().with(INPUT_VALUE, "hello");
        switch_type(&mut state, DataType::Integer);
        assert_eq!(state.get_str(INPUT_DATA_TYPE), Some("integer"));
        assert_eq!(state.get_str(INPUT_VALUE), Some("0"));

        switch_type(&mut state, DataType::Bool);
        assert_eq!(state.get_str(INPUT_VALUE), Some("0"));
    }

    #[test]
    fn test_widget_draws_without_editing() {
        let ctx = egui::Context::default();
        let mut state = NodeState::new().with(INPUT_DATA_TYPE, "float").with(FLOAT_ROUND, true);
        let before = state.clone();
        let mut event = WidgetEvent::Changed;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                event = input_widget(ui, &mut state);
            });
        });
        assert_eq!(event, WidgetEvent::None);
        assert_eq!(state, before);
    }
}
