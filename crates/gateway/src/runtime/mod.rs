//! Turn execution runtime.

pub mod context;
pub mod tools;
pub mod turn;

pub use turn::{prepare, spawn, PreparedTurn, TurnEvent, TurnInput};
