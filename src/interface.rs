//! Diagnostic Dispatcher.
//!
//! Line-oriented command protocol over an arbitrary byte-stream
//! transport. [`line`] owns the buffering policy, [`command`] the
//! grammar, and [`dispatch`] the execution and response formatting.

pub mod command;
pub mod dispatch;
pub mod line;

pub use dispatch::{Interface, Response};
