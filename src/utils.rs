//! # Utility Functions Module
//!
//! Small helpers that cut boilerplate when building external command
//! argument vectors.

/// Converts an iterable of string-like items to Vec<String>.
///
/// Accepts any iterable of items convertible to String, eliminating
/// repetitive `.to_string()` calls when assembling argument lists.
///
/// # Example
/// ```rust
/// use web_media_compressor::utils::to_string_vec;
///
/// // Instead of:
/// let args = vec![
///     "-c:a".to_string(),
///     "aac".to_string(),
///     "-b:a".to_string(),
///     "128k".to_string(),
/// ];
///
/// // You can write:
/// let args = to_string_vec(["-c:a", "aac", "-b:a", "128k"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for building argument vectors from mixed string/numeric items.
///
/// Each item is converted on its own, so numbers can sit next to string
/// literals without manual `.to_string()` noise.
///
/// # Example
/// ```rust
/// use web_media_compressor::args;
///
/// let crf = 28;
/// let args = args!["-c:v", "libx264", "-crf", crf, "-preset", "slow"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($item.to_string()),*]
    };
}
