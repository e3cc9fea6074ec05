//! Path parameters supplied by the routing layer.

use smallvec::SmallVec;

/// Parameters kept inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Named path parameters matched by a router, e.g. `id` in `/users/{id}`.
///
/// # Example
///
/// ```rust
/// use reqbind::PathParams;
///
/// let params: PathParams = [("id", "42"), ("tab", "posts")].into_iter().collect();
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    pairs: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((name, value)),
        }
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no parameters were matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterates over `(name, value)` pairs in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut params = PathParams::new();
        assert!(params.is_empty());

        params.insert("id", "7");
        params.insert("slug", "hello-world");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("slug"), Some("hello-world"));
        assert_eq!(params.get("ID"), None);
    }

    #[test]
    fn test_insert_replaces() {
        let mut params = PathParams::new();
        params.insert("id", "1");
        params.insert("id", "2");

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn test_iter_keeps_order_past_inline_capacity() {
        let params: PathParams = (0..6).map(|i| (format!("k{i}"), i.to_string())).collect();

        let names: Vec<_> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["k0", "k1", "k2", "k3", "k4", "k5"]);
    }
}
