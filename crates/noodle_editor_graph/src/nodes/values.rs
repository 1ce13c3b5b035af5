// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed pass-through nodes, the bool constant and the test node.

use super::single_output;
use crate::node::NodeState;
use crate::registry::{NodeTypeDef, NodeTypeRegistry, SocketValues, WidgetEvent};
use crate::socket::{DataType, SocketId, SocketSpec, Value};

/// State key holding the bool node's value
pub const BOOLEAN_VALUE: &str = "booleanValue";

pub(super) fn register(registry: &mut NodeTypeRegistry) {
    registry.register(pass_through("float", "Float Node", DataType::Float, Value::Float(0.0)));
    registry.register(pass_through("string", "String Node", DataType::String, Value::from("")));
    registry.register(pass_through("integer", "Integer Node", DataType::Integer, Value::Integer(0)));

    registry.register(
        NodeTypeDef::new("bool", "Bool Node", |_, node| {
            single_output("out", Value::Bool(node.state.get_bool(BOOLEAN_VALUE).unwrap_or(false)))
        })
        .with_outputs(vec![SocketSpec::new("out", "bool", DataType::Bool)])
        .with_widget(bool_widget),
    );

    registry.register(
        NodeTypeDef::new("test", "Test Node", |inputs, _| {
            DataType::ALL
                .into_iter()
                .filter_map(|t| {
                    let value = inputs.get(format!("in-{t}").as_str())?;
                    Some((SocketId::new(format!("out-{t}")), value.clone()))
                })
                .collect()
        })
        .with_inputs(
            DataType::ALL
                .into_iter()
                .map(|t| SocketSpec::new(format!("in-{t}"), t.name(), t))
                .collect(),
        )
        .with_outputs(
            DataType::ALL
                .into_iter()
                .map(|t| SocketSpec::new(format!("out-{t}"), t.name(), t))
                .collect(),
        ),
    );
}

/// One typed input copied to one typed output, with a default when unconnected
fn pass_through(id: &str, title: &str, data_type: DataType, fallback: Value) -> NodeTypeDef {
    NodeTypeDef::new(id, title, move |inputs: &SocketValues, _| {
        let value = inputs.get("in").cloned().unwrap_or_else(|| fallback.clone());
        single_output("out", value)
    })
    .with_inputs(vec![SocketSpec::new("in", data_type.name(), data_type)])
    .with_outputs(vec![SocketSpec::new("out", data_type.name(), data_type)])
}

fn bool_widget(ui: &mut egui::Ui, state: &mut NodeState) -> WidgetEvent {
    let mut value = state.get_bool(BOOLEAN_VALUE).unwrap_or(false);
    if ui.checkbox(&mut value, "value").changed() {
        state.set(BOOLEAN_VALUE, value);
        return WidgetEvent::Changed;
    }
    WidgetEvent::None
}
