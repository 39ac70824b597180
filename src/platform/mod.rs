//! Platform abstraction layer: file reads and external commands.

pub mod pal;
