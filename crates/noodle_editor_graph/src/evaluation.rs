// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! One pass clears every socket value, evaluates nodes synchronously in
//! dependency order, then drains the after-execute hooks one at a time in the
//! same order. A failing hook is recorded and the queue moves on.

use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::registry::{HookError, HookInput, SocketValues};
use crate::socket::SocketRef;
use std::collections::VecDeque;

/// Result of a successful execution pass
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Nodes in the order they were evaluated
    pub order: Vec<NodeId>,
    /// Hooks that failed, in the order they ran
    pub hook_failures: Vec<(NodeId, HookError)>,
}

impl ExecutionReport {
    /// Whether every hook succeeded
    pub fn is_clean(&self) -> bool {
        self.hook_failures.is_empty()
    }
}

impl Graph {
    /// Reset every socket value to "unset"
    pub fn reset_values(&mut self) {
        for node in self.nodes_mut() {
            node.clear_values();
        }
    }

    /// Run one execution pass.
    ///
    /// Fails only when the graph has a cycle, in which case no node is
    /// evaluated and every socket is left unset. Calls must not overlap.
    pub async fn execute(&mut self) -> Result<ExecutionReport, GraphError> {
        tracing::info!("Execution started ({} nodes)", self.node_count());
        self.reset_values();

        let Some(order) = self.execution_order() else {
            tracing::warn!("Execution aborted: graph contains a cycle");
            return Err(GraphError::CyclicGraph);
        };

        for node_id in &order {
            self.evaluate_node(node_id);
        }

        let mut hooks: VecDeque<&NodeId> = order
            .iter()
            .filter(|id| {
                self.node(id)
                    .is_some_and(|n| n.behavior().after_execute.is_some())
            })
            .collect();

        let mut hook_failures = Vec::new();
        while let Some(node_id) = hooks.pop_front() {
            let Some((hook, input)) = self.node(node_id).and_then(|node| {
                let hook = node.behavior().after_execute.clone()?;
                let input = HookInput {
                    node: node.id.clone(),
                    type_id: node.type_id.clone(),
                    state: node.state.clone(),
                    inputs: node.input_values(),
                    outputs: node.output_values(),
                };
                Some((hook, input))
            }) else {
                continue;
            };

            match hook(input).await {
                Ok(display) => {
                    if let (Some(text), Some(node)) = (display, self.node_mut(node_id)) {
                        node.set_display(Some(text));
                    }
                }
                Err(err) => {
                    tracing::warn!("After-execute hook failed on {}: {}", node_id, err);
                    hook_failures.push((node_id.clone(), err));
                }
            }
        }

        tracing::info!("Execution finished");
        Ok(ExecutionReport {
            order,
            hook_failures,
        })
    }

    fn evaluate_node(&mut self, node_id: &NodeId) {
        let Some(node) = self.node(node_id) else {
            return;
        };

        let mut inputs = SocketValues::new();
        for socket in &node.inputs {
            let input = SocketRef::input(node_id.clone(), socket.id.clone());
            let value = self
                .incoming_edge(&input)
                .and_then(|edge| self.socket(&edge.from))
                .and_then(|source| source.value());
            if let Some(value) = value {
                inputs.insert(socket.id.clone(), value.clone());
            }
        }
        let outputs = node.compute(&inputs);

        let Some(node) = self.node_mut(node_id) else {
            return;
        };
        for socket in node.inputs.iter_mut() {
            if let Some(value) = inputs.get(&socket.id) {
                socket.set_value(value.clone());
            }
        }
        for socket in node.outputs.iter_mut() {
            if let Some(value) = outputs.get(&socket.id) {
                socket.set_value(value.clone());
            }
        }
        tracing::debug!("Evaluated {}", node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeSpec;
    use crate::registry::{NodeTypeDef, NodeTypeRegistry};
    use crate::socket::{DataType, SocketId, SocketSpec, Value};
    use egui::Pos2;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn int(id: &str) -> SocketSpec {
        SocketSpec::new(id, "", DataType::Integer)
    }

    fn value_of(graph: &Graph, socket: &SocketRef) -> Option<Value> {
        graph.socket(socket).and_then(|s| s.value().cloned())
    }

    fn chain() -> (Graph, NodeId, NodeId, NodeId) {
        let mut graph = Graph::default();
        let a = graph.add_node(
            "A",
            Pos2::ZERO,
            NodeSpec::generic()
                .with_inputs(vec![])
                .with_outputs(vec![int("out")])
                .with_compute(|_, _| SocketValues::from([(SocketId::from("out"), Value::Integer(3))])),
        );
        let b = graph.add_node(
            "B",
            Pos2::ZERO,
            NodeSpec::generic()
                .with_inputs(vec![int("in")])
                .with_outputs(vec![int("out")])
                .with_compute(|inputs, _| {
                    let v = inputs.get(&SocketId::from("in")).and_then(Value::as_i64).unwrap_or(0);
                    SocketValues::from([(SocketId::from("out"), Value::Integer(v * 2))])
                }),
        );
        let c = graph.add_node(
            "C",
            Pos2::ZERO,
            NodeSpec::generic().with_inputs(vec![int("in")]).with_outputs(vec![]),
        );
        graph
            .connect(&SocketRef::output(a.clone(), "out"), &SocketRef::input(b.clone(), "in"))
            .unwrap();
        graph
            .connect(&SocketRef::output(b.clone(), "out"), &SocketRef::input(c.clone(), "in"))
            .unwrap();
        (graph, a, b, c)
    }

    #[tokio::test]
    async fn test_chain_propagates_values() {
        let (mut graph, a, b, c) = chain();
        let report = graph.execute().await.unwrap();
        assert_eq!(report.order, vec![a, b, c.clone()]);
        assert!(report.is_clean());
        assert_eq!(
            value_of(&graph, &SocketRef::input(c, "in")),
            Some(Value::Integer(6))
        );
    }

    #[tokio::test]
    async fn test_cycle_fails_and_leaves_values_unset() {
        let mut graph = Graph::default();
        let pass = || {
            NodeSpec::generic()
                .with_inputs(vec![int("in")])
                .with_outputs(vec![int("out")])
                .with_compute(|_, _| SocketValues::from([(SocketId::from("out"), Value::Integer(1))]))
        };
        let x = graph.add_node("X", Pos2::ZERO, pass());
        let y = graph.add_node("Y", Pos2::ZERO, pass());
        graph
            .connect(&SocketRef::output(x.clone(), "out"), &SocketRef::input(y.clone(), "in"))
            .unwrap();
        graph.execute().await.unwrap();
        assert_eq!(
            value_of(&graph, &SocketRef::input(y.clone(), "in")),
            Some(Value::Integer(1))
        );

        graph
            .connect(&SocketRef::output(y.clone(), "out"), &SocketRef::input(x.clone(), "in"))
            .unwrap();
        let err = graph.execute().await.unwrap_err();
        assert_eq!(err, GraphError::CyclicGraph);
        for node in [&x, &y] {
            let node = graph.node(node).unwrap();
            assert!(node.output_values().is_empty());
            assert!(node.input_values().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unconnected_inputs_are_absent() {
        let mut graph = Graph::default();
        let seen = Arc::new(Mutex::new(None));
        let probe = seen.clone();
        graph.add_node(
            "Probe",
            Pos2::ZERO,
            NodeSpec::generic().with_compute(move |inputs, _| {
                *probe.lock() = Some(inputs.len());
                SocketValues::new()
            }),
        );
        graph.execute().await.unwrap();
        assert_eq!(*seen.lock(), Some(0));
    }

    #[tokio::test]
    async fn test_hooks_run_in_order_and_failures_do_not_stop_siblings() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = NodeTypeRegistry::new();
        let log = calls.clone();
        registry.register(
            NodeTypeDef::new("echo", "Echo", crate::registry::pass_through_first)
                .with_inputs(vec![SocketSpec::new("in", "", DataType::Any)])
                .with_outputs(vec![SocketSpec::new("out", "", DataType::Any)])
                .with_after_execute(move |input| {
                    let log = log.clone();
                    Box::pin(async move {
                        log.lock().push(input.node.clone());
                        match input.inputs.get(&SocketId::from("in")) {
                            Some(value) => Ok(Some(value.to_string())),
                            None => Err(HookError::Failed("nothing received".into())),
                        }
                    })
                }),
        );
        let mut graph = Graph::new(Arc::new(registry));
        let first = graph.add_node("First", Pos2::ZERO, NodeSpec::of_type("echo"));
        let second = graph.add_node("Second", Pos2::ZERO, NodeSpec::of_type("echo"));
        let source = graph.add_node(
            "Source",
            Pos2::ZERO,
            NodeSpec::generic()
                .with_inputs(vec![])
                .with_outputs(vec![SocketSpec::new("out", "", DataType::String)])
                .with_compute(|_, _| SocketValues::from([(SocketId::from("out"), Value::from("hi"))])),
        );
        graph
            .connect(&SocketRef::output(source, "out"), &SocketRef::input(second.clone(), "in"))
            .unwrap();

        let report = graph.execute().await.unwrap();
        assert_eq!(*calls.lock(), vec![first.clone(), second.clone()]);
        assert_eq!(report.hook_failures.len(), 1);
        assert_eq!(report.hook_failures[0].0, first);
        assert_eq!(graph.node(&second).unwrap().display(), Some("hi"));
        assert_eq!(graph.node(&first).unwrap().display(), None);
    }
}
