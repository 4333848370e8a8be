// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor adapter for the MDA graph core.
//!
//! Translates host editor events into graph mutations and drives the
//! validate/compile pipeline:
//! - [`commands::GraphCommand`]: edits expressed as messages, applied in
//!   order on the editing thread
//! - [`session::EditSession`]: owns the live graph, issues compile
//!   requests over immutable snapshots, and discards stale results

pub mod commands;
pub mod session;

pub use commands::{CommandError, CommandOutcome, GraphCommand};
pub use session::{CompileCompletion, CompileRequest, CompileResult, EditSession};
