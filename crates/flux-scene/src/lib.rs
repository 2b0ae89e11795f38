//! UI node descriptor tree produced by the Flux command interpreter.
//!
//! The scene is the contract between the interpreter and whatever host
//! renders it: nodes are plain data, rendering happens elsewhere. Hosts
//! walk the tree (or serialize it wholesale) and apply it to their own
//! display primitives.

pub mod node;
pub mod scene;

pub use node::{ChartSpec, Node, NodeKind, Severity, DIAL_RADIUS};
pub use scene::{NodeId, Scene};
