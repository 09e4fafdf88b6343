//! chatrelay gateway: HTTP surface and turn runtime.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
