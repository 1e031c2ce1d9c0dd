pub mod analytics;
pub mod calendar;
pub mod complexity;
pub mod conflict;
pub mod events;
pub mod jobs;
pub mod optimizer;
pub mod schedule_utils;
pub mod scheduler;
pub mod slot_finder;
pub mod workload;
