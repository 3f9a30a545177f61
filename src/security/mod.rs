//! Resource limits shared by the echo protocols

pub mod limits;

pub use limits::{SizeError, SizeValidator};
