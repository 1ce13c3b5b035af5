// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load-file node: emits a file path picked by the user.

use super::single_output;
use crate::node::NodeState;
use crate::registry::{NodeTypeDef, NodeTypeRegistry, WidgetEvent};
use crate::socket::{DataType, SocketSpec, Value};

/// State key holding the chosen path
pub const SELECTED_FILE_PATH: &str = "selectedFilePath";

pub(super) fn register(registry: &mut NodeTypeRegistry) {
    registry.register(
        NodeTypeDef::new("load-file", "Load File", |_, node| {
            let path = node.state.get_str(SELECTED_FILE_PATH).unwrap_or("");
            single_output("path", Value::from(path))
        })
        .with_outputs(vec![SocketSpec::new("path", "path", DataType::String)])
        .with_widget(path_widget),
    );
}

fn path_widget(ui: &mut egui::Ui, state: &mut NodeState) -> WidgetEvent {
    let mut path = state.get_str(SELECTED_FILE_PATH).unwrap_or("").to_string();
    let response = ui.add(egui::TextEdit::singleline(&mut path).hint_text("path to file"));
    if !response.changed() {
        return WidgetEvent::None;
    }
    state.set(SELECTED_FILE_PATH, path);
    WidgetEvent::Changed
}
