//! Cached artifacts: node images with render coverage, and viewer frames.

pub mod bitmap;
pub mod frame;
#[allow(clippy::module_inception)]
pub mod image;
