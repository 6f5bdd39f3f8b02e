pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod report;
pub mod role;
pub mod service;
pub mod util;
