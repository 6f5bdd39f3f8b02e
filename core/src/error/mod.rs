#[allow(clippy::module_inception)]
pub mod error;
pub mod code;
pub mod crew;
pub mod service;

pub use code::ErrorCode;
pub use crew::CrewError;
pub use error::CliError;
pub use service::ServiceError;
