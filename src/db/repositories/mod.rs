pub mod analytics_repository;
pub mod order_repository;
pub mod task_repository;
pub mod workload_repository;
