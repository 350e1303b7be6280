//! Comparison vectors.
//!
//! Each resource family declares, once, the list of fields that decide
//! whether its controller copy matches the input. Planning and verification
//! both compare through that list.
//!
//! A field the input leaves unspecified is skipped. Set-valued fields compare
//! without regard to order or duplicates. An empty value and an absent value
//! are different.

use std::collections::BTreeSet;

/// One extracted field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Not specified; never compared
    Unspecified,
    /// Text, compared exactly
    Text(&'a str),
    /// Boolean flag
    Flag(bool),
    /// Integer
    Number(u64),
    /// Unordered collection of strings
    Set(BTreeSet<&'a str>),
}

impl<'a> FieldValue<'a> {
    /// Text from an optional string.
    #[must_use]
    pub fn text(value: Option<&'a str>) -> Self {
        value.map_or(Self::Unspecified, Self::Text)
    }

    /// Set from an optional list.
    #[must_use]
    pub fn set(values: Option<&'a [String]>) -> Self {
        values.map_or(Self::Unspecified, |values| {
            Self::Set(values.iter().map(String::as_str).collect())
        })
    }

    /// Flag from an optional bool.
    #[must_use]
    pub fn flag(value: Option<bool>) -> Self {
        value.map_or(Self::Unspecified, Self::Flag)
    }

    /// Number from an optional integer.
    #[must_use]
    pub fn number(value: Option<u64>) -> Self {
        value.map_or(Self::Unspecified, Self::Number)
    }

    /// Returns true when the value takes part in comparison.
    #[must_use]
    pub const fn is_specified(&self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

/// A named field of a comparison vector.
pub struct Field<R> {
    /// Wire-facing field name, reported on mismatch
    pub name: &'static str,
    /// Reads the field from a normalized record
    pub extract: fn(&R) -> FieldValue<'_>,
}

impl<R> Field<R> {
    /// Declare a field.
    pub const fn new(name: &'static str, extract: fn(&R) -> FieldValue<'_>) -> Self {
        Self { name, extract }
    }
}

/// Names of the fields on which `want` differs from `have`, in vector order.
#[must_use]
pub fn differences<R>(have: &R, want: &R, vector: &[Field<R>]) -> Vec<&'static str> {
    vector
        .iter()
        .filter(|field| {
            let wanted = (field.extract)(want);
            wanted.is_specified() && wanted != (field.extract)(have)
        })
        .map(|field| field.name)
        .collect()
}

/// Returns true when `have` already satisfies `want`.
#[must_use]
pub fn matches<R>(have: &R, want: &R, vector: &[Field<R>]) -> bool {
    differences(have, want, vector).is_empty()
}

/// Outcome of diffing one input entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<P, I> {
    /// Controller already matches
    NoChange,
    /// Create with the payload
    Create(P),
    /// Update with the payload
    Update(P),
    /// Delete the identified resource
    Delete(I),
    /// The entry cannot be applied; recorded as a failure
    Blocked(netconv_core::Error),
}

impl<P, I> Action<P, I> {
    /// Returns true if applying the action calls the controller.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(_) | Self::Delete(_))
    }

    /// Short label for logs and check-mode output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoChange => "no_change",
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Blocked(_) => "blocked",
        }
    }
}

/// A planned action for one named resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Planned<P, I> {
    /// Resource name as reported
    pub name: String,
    /// What to do
    pub action: Action<P, I>,
    /// Set for named deletes whose target does not exist
    pub missing: bool,
    /// Fields that differ, for updates
    pub changed_fields: Vec<&'static str>,
}

impl<P, I> Planned<P, I> {
    /// Plan an action.
    pub fn new(name: impl Into<String>, action: Action<P, I>) -> Self {
        Self {
            name: name.into(),
            action,
            missing: false,
            changed_fields: Vec::new(),
        }
    }

    /// Plan nothing for a resource that is already absent.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            missing: true,
            ..Self::new(name, Action::NoChange)
        }
    }

    /// Record which fields differ.
    #[must_use]
    pub fn with_changed_fields(mut self, fields: Vec<&'static str>) -> Self {
        self.changed_fields = fields;
        self
    }
}
