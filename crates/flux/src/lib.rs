//! Declarative UI command interpreter.
//!
//! Consumes JSON-compatible command lists (`{type, props, commands?}`) and
//! builds a [`flux_scene::Scene`] of node descriptors, with a shared state
//! store for text interpolation and form capture, loop expansion, modal
//! bookkeeping and pluggable persistence. Rendering the scene is the
//! host's job.

pub mod clock;
pub mod command;
pub mod interpreter;
pub mod persistence;
pub mod state;
pub mod value;

pub use clock::{Clock, TestClock};
pub use command::{Command, Directive};
pub use interpreter::{HostConfig, Interpreter, ViewMode, WidgetEvent};
pub use persistence::{COLLECTION, MemoryStorage, PersistenceBackend, PersistenceError};
pub use state::{LOOP_INDEX_KEY, StateStore};
pub use value::Value;

pub use flux_scene as scene;
