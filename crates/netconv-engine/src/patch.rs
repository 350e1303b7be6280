//! Three-state field updates.
//!
//! A settings field in the input document can be left out (keep the
//! controller's value), set to `null` (clear it), or given a value. Plain
//! `Option` cannot tell the first two apart.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Requested change to one field.
///
/// Use with `#[serde(default)]` so a missing key becomes [`Patch::Preserve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Key omitted: keep the current value
    #[default]
    Preserve,
    /// Key set to `null`: remove the current value
    Clear,
    /// Key set: replace the current value
    Set(T),
}

impl<T> Patch<T> {
    /// Returns true when the field was omitted.
    #[must_use]
    pub const fn is_preserve(&self) -> bool {
        matches!(self, Self::Preserve)
    }

    /// The value being set, if any.
    #[must_use]
    pub const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Apply the patch to the current value.
    #[must_use]
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Self::Preserve => current,
            Self::Clear => None,
            Self::Set(value) => Some(value),
        }
    }

    /// Borrowing form of [`Patch::resolve`].
    #[must_use]
    pub fn resolve_ref(&self, current: Option<&T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Self::Preserve => current.cloned(),
            Self::Clear => None,
            Self::Set(value) => Some(value.clone()),
        }
    }

    /// Map the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Preserve => Patch::Preserve,
            Self::Clear => Patch::Clear,
            Self::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Clear, Self::Set))
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Set(value) => value.serialize(serializer),
            Self::Preserve | Self::Clear => serializer.serialize_none(),
        }
    }
}
