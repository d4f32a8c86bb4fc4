pub mod classifier;
pub mod error;
pub mod events;
pub mod scan_service;
pub mod session_lifecycle_service;
