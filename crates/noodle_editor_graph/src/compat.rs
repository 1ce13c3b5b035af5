// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type compatibility between sockets, and the colours derived from it.

use crate::socket::{DataType, Direction, Socket};

impl DataType {
    /// Get the colour for this data type (for UI)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::Default => [154, 224, 74],
            Self::Float => [146, 146, 146],
            Self::Integer => [103, 214, 159],
            Self::String => [96, 172, 197],
            Self::Bool => [224, 78, 217],
            Self::Any => [161, 73, 219],
        }
    }
}

/// Whether two data types may be joined by an edge.
///
/// Concrete types connect only to themselves; the wildcard connects to anything.
pub fn types_compatible(from: DataType, to: DataType) -> bool {
    if from.is_wildcard() || to.is_wildcard() {
        return true;
    }
    from == to
}

/// Whether an edge may run from `output` into `input`.
///
/// Returns false unless the first socket is an output and the second an input.
pub fn can_connect(output: &Socket, input: &Socket) -> bool {
    if output.direction != Direction::Output || input.direction != Direction::Input {
        return false;
    }
    types_compatible(output.data_type, input.data_type)
}

/// Whether a connection between the two types is drawn with two colours
pub fn needs_gradient(from: DataType, to: DataType) -> bool {
    from != to && (from.is_wildcard() || to.is_wildcard())
}

/// How a noodle is coloured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoodleColoring {
    /// Single colour
    Flat([u8; 3]),
    /// Colour blend from the source end to the target end
    Gradient([u8; 3], [u8; 3]),
}

/// Colouring for a noodle whose ends carry the given types.
///
/// A pending noodle has one end missing and is always flat.
pub fn noodle_coloring(from: Option<DataType>, to: Option<DataType>) -> NoodleColoring {
    match (from, to) {
        (Some(from), Some(to)) if needs_gradient(from, to) => {
            NoodleColoring::Gradient(from.color(), to.color())
        }
        (_, Some(ty)) | (Some(ty), None) => NoodleColoring::Flat(ty.color()),
        (None, None) => NoodleColoring::Flat(DataType::Default.color()),
    }
}
