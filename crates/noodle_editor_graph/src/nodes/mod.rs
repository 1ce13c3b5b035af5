// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.
//!
//! The engine only knows node types through a [`NodeTypeRegistry`]; this module
//! supplies the catalogue shipped with the editor.

mod debug;
mod file;
mod input;
mod values;

pub use debug::{describe_value, NO_VALUE_TEXT};
pub use file::SELECTED_FILE_PATH;
pub use input::{
    compute_input, FLOAT_DECIMALS, FLOAT_ROUND, INPUT_DATA_TYPE, INPUT_TYPES, INPUT_VALUE,
};
pub use values::BOOLEAN_VALUE;

use crate::registry::{NodeTypeRegistry, SocketValues};
use crate::socket::{SocketId, Value};

/// Create the registry holding every built-in node type
pub fn create_builtin_registry() -> NodeTypeRegistry {
    let mut registry = NodeTypeRegistry::new();

    // ========================================================================
    // Sources and sinks
    // ========================================================================

    file::register(&mut registry);
    debug::register(&mut registry);

    // ========================================================================
    // Typed values
    // ========================================================================

    values::register(&mut registry);

    // ========================================================================
    // Generic input
    // ========================================================================

    input::register(&mut registry);

    registry
}

/// Single-output result map
pub(crate) fn single_output(socket: &str, value: Value) -> SocketValues {
    SocketValues::from([(SocketId::from(socket), value)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, NodeSpec};
    use crate::node::NodeState;
    use crate::socket::SocketRef;
    use egui::Pos2;
    use std::sync::Arc;

    #[test]
    fn test_catalogue_contents() {
        let registry = create_builtin_registry();
        let ids: Vec<&str> = registry.types().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["load-file", "debug", "float", "string", "integer", "bool", "test", "input"]
        );
    }

    #[tokio::test]
    async fn test_input_feeds_debug() {
        let mut graph = Graph::new(Arc::new(create_builtin_registry()));
        let input = graph.add_node(
            "Input",
            Pos2::ZERO,
            NodeSpec::of_type("input").with_state(
                NodeState::new()
                    .with(INPUT_DATA_TYPE, "integer")
                    .with(INPUT_VALUE, "42"),
            ),
        );
        let debug = graph.add_node("Debug", Pos2::new(300.0, 0.0), NodeSpec::of_type("debug"));
        let lonely = graph.add_node("Debug", Pos2::new(300.0, 200.0), NodeSpec::of_type("debug"));
        graph
            .connect(&SocketRef::output(input, "out"), &SocketRef::input(debug.clone(), "in"))
            .unwrap();

        let report = graph.execute().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(graph.node(&debug).unwrap().display(), Some("42"));
        assert_eq!(graph.node(&lonely).unwrap().display(), Some(NO_VALUE_TEXT));
    }

    #[tokio::test]
    async fn test_load_file_feeds_debug_with_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello from disk").unwrap();

        let mut graph = Graph::new(Arc::new(create_builtin_registry()));
        let file = graph.add_node(
            "Load File",
            Pos2::ZERO,
            NodeSpec::of_type("load-file")
                .with_state(NodeState::new().with(SELECTED_FILE_PATH, path.to_string_lossy().into_owned())),
        );
        let debug = graph.add_node("Debug", Pos2::new(300.0, 0.0), NodeSpec::of_type("debug"));
        graph
            .connect(&SocketRef::output(file, "path"), &SocketRef::input(debug.clone(), "in"))
            .unwrap();

        graph.execute().await.unwrap();
        assert_eq!(graph.node(&debug).unwrap().display(), Some("hello from disk"));
    }
}
