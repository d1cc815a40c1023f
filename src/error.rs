pub use crate::types::FlexError;

pub type Result<T> = std::result::Result<T, FlexError>;

/// Turns a foreign error into a `FlexError` of the caller's choosing,
/// prefixed with a description of what was being attempted.
pub trait ErrorContext<T> {
    fn or_flex<K, F>(self, kind: K, what: F) -> Result<T>
    where
        K: FnOnce(String) -> FlexError,
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn or_flex<K, F>(self, kind: K, what: F) -> Result<T>
    where
        K: FnOnce(String) -> FlexError,
        F: FnOnce() -> String,
    {
        self.map_err(|e| kind(format!("{}: {}", what(), e)))
    }
}
