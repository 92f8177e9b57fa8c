//! Save/load persistence
//!
//! - Fixed big-endian binary record (`codec`)
//! - Atomic replace on save, missing file is not an error (`store`)

pub mod codec;
pub mod store;

pub use codec::{SaveRecord, SavedBlock, decode, encode};
pub use store::SaveStore;
