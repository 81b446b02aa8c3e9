//! Query functions grouped by table.

pub mod exercises;
pub mod sets;
