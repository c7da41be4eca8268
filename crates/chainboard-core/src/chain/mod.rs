//! The ordering engine proper.
//!
//! - [`locate`]: head/tail lookup, container guard, head-to-tail ordering
//! - [`working`]: the per-transaction node arena
//! - [`mutate`]: append, detach, move, remove
//! - [`transfer`]: cross-container moves

pub mod locate;
pub mod mutate;
pub mod transfer;
pub mod working;

pub use locate::{assert_same_container, find_head, find_tail, order_chain};
pub use mutate::{MoveOutcome, append, detach, move_after, remove};
pub use transfer::{TransferOutcome, transfer};
pub use working::WorkingSet;
