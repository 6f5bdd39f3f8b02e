mod files;

pub use files::FileContextSource;
