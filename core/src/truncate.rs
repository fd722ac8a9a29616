//! Bounded previews of response bodies for log lines.

use std::fmt;

/// Display adapter rendering at most `max_length` characters of a value.
///
/// An absent value renders as `"No content"`. Present values are hard-cut at
/// the character bound with no ellipsis, so a log line can never grow past
/// its configured preview size.
pub struct Truncated<'a, T: ?Sized> {
    value: Option<&'a T>,
    max_length: usize,
}

impl<'a, T: fmt::Display + ?Sized> Truncated<'a, T> {
    pub fn new(value: Option<&'a T>, max_length: usize) -> Self {
        Truncated { value, max_length }
    }
}

impl<T: fmt::Display + ?Sized> fmt::Display for Truncated<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(value) = self.value else {
            return f.write_str("No content");
        };
        let rendered = value.to_string();
        match rendered.char_indices().nth(self.max_length) {
            Some((boundary, _)) => f.write_str(&rendered[..boundary]),
            None => f.write_str(&rendered),
        }
    }
}
