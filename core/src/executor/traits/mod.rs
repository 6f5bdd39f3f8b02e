pub mod renderer;
pub mod strategy;

pub use renderer::*;
pub use strategy::*;
