//! Core logic for coachwise: the exercise/set aggregate protocol and the
//! access rules layered over it.

pub mod access;
pub mod exercise;
