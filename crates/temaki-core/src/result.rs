/// Convenient result type used throughout the crate.
pub type Result<T> = std::result::Result<T, crate::error::TemakiError>;
