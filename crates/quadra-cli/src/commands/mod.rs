pub mod block;
pub mod config;
pub mod quota;
pub mod schedule;
pub mod task;
