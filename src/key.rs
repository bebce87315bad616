//! Dotted/indexed key paths for emitted values.

use std::fmt::Write;

/// Destination path of one emitted value.
///
/// `key` is the full path including array index notation (`a.b[2].c`), while
/// `flat_key` omits the indices (`a.b.c`) so that all elements of a repeated
/// field share one shape path.
///
/// During a parse the live `Key` is owned by the parser and grown/shrunk in
/// place through the scopes returned by [`enter_dictionary`](Key::enter_dictionary)
/// and [`enter_array`](Key::enter_array).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Key {
    /// Path without array indices, used to group all elements of a repeated
    /// field under one logical name.
    pub flat_key: String,

    /// Full path including `[i]` index notation.
    pub key: String,
}

impl Key {
    /// Create an empty key, denoting the root of a message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key whose indexed path and shape path are the same.
    ///
    /// Useful for sinks and overrides that synthesize values at a fixed,
    /// non-repeated location.
    pub fn from_path(path: impl Into<String>) -> Self {
        let key = path.into();
        Key {
            flat_key: key.clone(),
            key,
        }
    }

    /// Return true if the key denotes the root of a message.
    pub fn is_empty(&self) -> bool {
        self.flat_key.is_empty() && self.key.is_empty()
    }

    /// Append `.<name>` (bare `<name>` at the top level) to both paths.
    ///
    /// The returned scope restores the previous paths when it is dropped or
    /// [reset](KeyScope::reset). Deeper scopes are entered through the
    /// returned scope, which makes releasing them out of order a compile
    /// error rather than a path corruption.
    pub fn enter_dictionary(&mut self, name: &str) -> KeyScope<'_> {
        let saved = (self.flat_key.len(), self.key.len());
        append_segment(&mut self.flat_key, name);
        append_segment(&mut self.key, name);
        KeyScope {
            inner: self,
            saved: Some(saved),
        }
    }

    /// Append `[<index>]` to the indexed path only.
    ///
    /// The shape path is left untouched so that every element of a repeated
    /// field keeps the same flat key.
    pub fn enter_array(&mut self, index: usize) -> KeyScope<'_> {
        let saved = (self.flat_key.len(), self.key.len());
        let _ = write!(self.key, "[{}]", index);
        KeyScope {
            inner: self,
            saved: Some(saved),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.flat_key.clear();
        self.key.clear();
    }
}

fn append_segment(path: &mut String, name: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(name);
}

/// Scope over a [`Key`] with one extra path segment entered.
///
/// Dropping the scope truncates both paths back to their pre-entry lengths,
/// on every exit path including early returns. The scope dereferences to the
/// underlying `Key`, so nested segments are entered directly through it:
///
/// ```
/// use proto_args::Key;
///
/// let mut key = Key::new();
/// let mut outer = key.enter_dictionary("sub");
/// {
///     let inner = outer.enter_dictionary("inner");
///     assert_eq!(inner.key, "sub.inner");
/// }
/// assert_eq!(outer.key, "sub");
/// ```
pub struct KeyScope<'k> {
    inner: &'k mut Key,
    saved: Option<(usize, usize)>,
}

impl KeyScope<'_> {
    /// Restore the paths to their pre-entry state before the scope ends.
    ///
    /// After a reset the scope is inert; this allows entering a sibling
    /// segment through the parent without waiting for the scope to drop.
    pub fn reset(&mut self) {
        if let Some((flat_key_len, key_len)) = self.saved.take() {
            self.inner.flat_key.truncate(flat_key_len);
            self.inner.key.truncate(key_len);
        }
    }
}

impl Drop for KeyScope<'_> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl std::ops::Deref for KeyScope<'_> {
    type Target = Key;

    fn deref(&self) -> &Key {
        self.inner
    }
}

impl std::ops::DerefMut for KeyScope<'_> {
    fn deref_mut(&mut self) -> &mut Key {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::Key;

    #[test]
    fn test_enter_dictionary() {
        let mut key = Key::new();
        {
            let mut outer = key.enter_dictionary("a");
            assert_eq!(outer.flat_key, "a");
            assert_eq!(outer.key, "a");
            {
                let inner = outer.enter_dictionary("b");
                assert_eq!(inner.flat_key, "a.b");
                assert_eq!(inner.key, "a.b");
            }
            assert_eq!(outer.flat_key, "a");
            assert_eq!(outer.key, "a");
        }
        assert!(key.is_empty());
    }

    #[test]
    fn test_enter_array() {
        let mut key = Key::new();
        let mut dict = key.enter_dictionary("x");
        {
            let elem = dict.enter_array(2);
            // Array indices appear in the indexed path only.
            assert_eq!(elem.flat_key, "x");
            assert_eq!(elem.key, "x[2]");
        }
        assert_eq!(dict.key, "x");
    }

    #[test]
    fn test_nested_array_element() {
        let mut key = Key::new();
        let mut dict = key.enter_dictionary("subs");
        let mut elem = dict.enter_array(0);
        let inner = elem.enter_dictionary("inner");
        assert_eq!(inner.flat_key, "subs.inner");
        assert_eq!(inner.key, "subs[0].inner");
    }

    #[test]
    fn test_reset_allows_sibling() {
        let mut key = Key::new();
        let mut outer = key.enter_dictionary("parent");
        let mut first = outer.enter_dictionary("first");
        first.reset();
        assert_eq!(first.key, "parent");

        // A reset scope no longer truncates on drop.
        drop(first);
        let second = outer.enter_dictionary("second");
        assert_eq!(second.key, "parent.second");
    }

    #[test]
    fn test_from_path() {
        let key = Key::from_path("args.payload");
        assert_eq!(key.flat_key, "args.payload");
        assert_eq!(key.key, "args.payload");
        assert!(!key.is_empty());
    }
}
