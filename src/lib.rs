//! War Table - turn-based tactical battle engine

pub mod battle;
pub mod core;
