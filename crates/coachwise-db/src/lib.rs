//! Postgres persistence for coachwise: connection pooling, embedded
//! migrations, row models, and the exercise/set queries.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
