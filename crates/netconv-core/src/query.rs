//! Convenience builder for HTTP query parameters.
//!
//! List endpoints take optional filters plus an `offset`/`limit` page window;
//! this helper keeps that boilerplate out of the facade methods.

use std::fmt::Display;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Start a builder holding one page window.
    #[must_use]
    pub fn page(offset: u32, limit: u32) -> Self {
        let mut params = Self::new();
        params.push("offset", offset);
        params.push("limit", limit);
        params
    }

    /// Append a required key/value pair.
    pub fn push<T>(&mut self, key: &'static str, value: T)
    where
        T: Display,
    {
        self.pairs.push((key, value.to_string()));
    }

    /// Chaining form of [`QueryParams::push`].
    #[must_use]
    pub fn with<T>(mut self, key: &'static str, value: T) -> Self
    where
        T: Display,
    {
        self.push(key, value);
        self
    }

    /// Return the collected key/value pairs.
    #[must_use]
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        self.pairs
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::QueryParams;

    #[test]
    fn starts_empty() {
        assert!(QueryParams::new().is_empty());
        assert!(!QueryParams::page(1, 25).is_empty());
    }

    #[test]
    fn page_window_then_filter() {
        let params = QueryParams::page(26, 25).with("siteId", "s-1");
        assert_eq!(
            params.into_pairs(),
            vec![
                ("offset", "26".to_string()),
                ("limit", "25".to_string()),
                ("siteId", "s-1".to_string())
            ]
        );
    }
}
