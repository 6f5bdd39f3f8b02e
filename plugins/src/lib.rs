pub mod context;
pub mod executor;
pub mod factory;
pub mod service;
