// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debug sink: shows whatever reaches its input once a pass has finished.

use crate::registry::{HookError, HookFuture, HookInput, NodeTypeDef, NodeTypeRegistry, SocketValues};
use crate::socket::{DataType, SocketSpec, Value};

/// Text shown when the input received nothing
pub const NO_VALUE_TEXT: &str = "(no value)";

pub(super) fn register(registry: &mut NodeTypeRegistry) {
    registry.register(
        NodeTypeDef::new("debug", "Debug", |_, _| SocketValues::new())
            .with_inputs(vec![SocketSpec::new("in", "value", DataType::Any)])
            .with_after_execute(|input: HookInput| -> HookFuture {
                let value = input.inputs.get("in").cloned();
                Box::pin(describe_value(value))
            }),
    );
}

fn looks_like_path(text: &str) -> bool {
    text.contains('/') || text.contains('\\')
}

/// Display text for a debug input.
///
/// Strings that look like paths are replaced by the file's contents; a read
/// failure is shown inline rather than failing the hook.
pub async fn describe_value(value: Option<Value>) -> Result<Option<String>, HookError> {
    let text = match value {
        None => NO_VALUE_TEXT.to_string(),
        Some(Value::String(path)) if looks_like_path(&path) => {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!("Debug node could not read {}: {}", path, err);
                    format!("[Error: {err}]")
                }
            }
        }
        Some(other) => other.to_string(),
    };
    Ok(Some(text))
}
