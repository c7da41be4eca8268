//! chainboard-core library.
//!
//! Project boards whose task states and tasks are ordered as intrusive
//! doubly-linked chains stored in SQLite. [`Board`] is the entry point.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return [`error::Result`] with a classified
//!   [`EngineError`]; setup paths (opening stores, reading config) use
//!   `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod access;
pub mod chain;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod naming;
pub mod verify;

pub use access::{Action, Actor, AllowAll, AllowOnly, Permissions, Scope};
pub use chain::{MoveOutcome, TransferOutcome};
pub use engine::{Board, Placement};
pub use error::{EngineError, ErrorCode};
pub use model::{
    BoardSnapshot, ChainKind, Column, ContainerId, HistoryEntry, Node, NodeId, Project, ProjectId,
};
pub use verify::VerifyReport;
