//! The storage-space sensor: volume resolution, usage probing, history,
//! probe health, template rendering, and the sampling engine tying them together.

pub mod engine;
pub mod health;
pub mod history;
pub mod probe;
pub mod resolver;
pub mod template;
