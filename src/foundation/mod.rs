//! Leaf primitives shared by every other module: geometry/time types, the error taxonomy,
//! stable hashing and engine options.

pub mod config;
pub mod core;
pub mod error;
pub mod hash;
pub(crate) mod sync;
