pub mod core;

pub use crate::core::error::{ModError, ModResult};
