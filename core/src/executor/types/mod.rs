pub mod config;
pub mod result;
pub mod status;
pub mod task;

pub use config::*;
pub use result::*;
pub use status::*;
pub use task::*;
