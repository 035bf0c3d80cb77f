//! Processing graph: node/connection storage and topology (C4/C5), buffer
//! kernels (C6), and the per-block dispatch engine (C7).

pub mod buffer;
pub mod node;
pub mod processor;
pub mod topology;

pub use node::{Connection, GraphNode, NodeId, NodeKind, PortKind};
pub use processor::GraphProcessor;
pub use topology::Graph;
