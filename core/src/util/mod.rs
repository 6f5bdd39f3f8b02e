mod ticker;

pub use ticker::normalize_ticker;
