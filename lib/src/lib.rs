//! Decoder for PIG model containers.
//!
//! A PIG file holds a node hierarchy followed by objects, each with one or
//! more levels of detail made of zstd-compressed meshes. [`decode`] reads a
//! whole file from memory into a [`Document`].

pub mod error;
pub mod format;
pub mod util;

pub use error::{ErrorCategory, PigError};
pub use format::pig::{decode, Document};
