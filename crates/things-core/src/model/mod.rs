//! Entities held in projected state.

pub mod context;
pub mod id;
pub mod task;
