pub mod analytics;
pub mod config;
pub mod order;
pub mod slot;
pub mod task;
pub mod workload;
