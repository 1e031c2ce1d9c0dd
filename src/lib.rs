//! Smart scheduling core for a single-workshop framing calendar.
//!
//! The crate allocates calendar slots to framing orders under working-hours,
//! deadline, priority, and complexity constraints, then keeps the schedule
//! consistent through a synchronous conflict pass, an hourly optimization
//! pass, and a daily workload assessment.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
