//! Declarative collection catalog.
//!
//! A [`CollectionSpec`] says what a collection must accept (field rules) and
//! how it is indexed. Stores never hard-code constraints: the PostgreSQL store
//! renders these specs into DDL and the in-memory store evaluates them with
//! [`validate_document`], so both enforce the same invariants.
//!
//! Field paths are dotted (`payment_info.id`) and address nested objects.

mod catalog;
mod validate;

pub use catalog::{
    EMAIL_PATTERN, ORDERS, PRODUCTS, TIMESTAMP_PATTERN, USERS, catalog, collection, orders,
    products, users,
};
pub use validate::{ValidationError, Violation, ViolationKind, lookup, validate_document};

use chrono::{DateTime, SecondsFormat, Utc};

/// A single constraint on a field value.
///
/// Rules only apply when the field is present; presence itself is governed
/// by [`FieldSpec::required`]. `Pattern` and `MinLength` ignore non-string
/// values, so pair them with `String` to also constrain the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Value must be a JSON string.
    String,
    /// Value must be a JSON string or `null`.
    NullableString,
    /// Value must be a JSON number.
    Number,
    /// Value must be an RFC 3339 timestamp string matching [`TIMESTAMP_PATTERN`].
    Timestamp,
    /// String value must match the regular expression.
    Pattern(&'static str),
    /// Value must be one of the listed strings.
    OneOf(&'static [&'static str]),
    /// String value must have at least this many characters.
    MinLength(usize),
}

/// Constraints on one field of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dotted path to the field.
    pub path: &'static str,
    /// Whether the field must be present.
    pub required: bool,
    /// Rules applied when the field is present.
    pub rules: Vec<FieldRule>,
}

impl FieldSpec {
    /// A field that must be present.
    #[must_use]
    pub fn required(path: &'static str, rules: impl Into<Vec<FieldRule>>) -> Self {
        Self {
            path,
            required: true,
            rules: rules.into(),
        }
    }

    /// A field that may be absent.
    #[must_use]
    pub fn optional(path: &'static str, rules: impl Into<Vec<FieldRule>>) -> Self {
        Self {
            path,
            required: false,
            rules: rules.into(),
        }
    }
}

/// Sort direction of a single-field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One field of a weighted full-text index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextField {
    /// Dotted path to the text field.
    pub path: &'static str,
    /// Relative weight; higher ranks matches in this field first.
    pub weight: u8,
}

/// An index on a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSpec {
    /// Index over one field.
    Single {
        path: &'static str,
        order: SortOrder,
        unique: bool,
    },
    /// Weighted full-text index over several string fields.
    Text { fields: Vec<TextField> },
}

impl IndexSpec {
    /// Ascending, non-unique index.
    #[must_use]
    pub const fn ascending(path: &'static str) -> Self {
        Self::Single {
            path,
            order: SortOrder::Ascending,
            unique: false,
        }
    }

    /// Descending, non-unique index.
    #[must_use]
    pub const fn descending(path: &'static str) -> Self {
        Self::Single {
            path,
            order: SortOrder::Descending,
            unique: false,
        }
    }

    /// Ascending unique index.
    #[must_use]
    pub const fn unique(path: &'static str) -> Self {
        Self::Single {
            path,
            order: SortOrder::Ascending,
            unique: true,
        }
    }

    /// Whether inserts must keep this index's key unique.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        matches!(self, Self::Single { unique: true, .. })
    }

    /// Deterministic index name within `collection`.
    ///
    /// `users` + unique `email` gives `users_email_key`; `orders` +
    /// `payment_info.id` gives `orders_payment_info_id_idx`; text indexes are
    /// `<collection>_text_idx`.
    #[must_use]
    pub fn name(&self, collection: &str) -> String {
        match self {
            Self::Single { path, unique, .. } => {
                let suffix = if *unique { "key" } else { "idx" };
                format!("{collection}_{}_{suffix}", path.replace('.', "_"))
            }
            Self::Text { .. } => format!("{collection}_text_idx"),
        }
    }
}

/// A named collection with its validator and indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    /// Collection name (also the table name in PostgreSQL).
    pub name: &'static str,
    /// Field rules; empty means any JSON object is accepted.
    pub fields: Vec<FieldSpec>,
    /// Indexes in creation order.
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    /// Indexes whose keys must stay unique.
    pub fn unique_indexes(&self) -> impl Iterator<Item = &IndexSpec> {
        self.indexes.iter().filter(|index| index.is_unique())
    }

    /// Look up an index by its generated name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|index| index.name(self.name) == name)
    }
}

/// Format a timestamp the way documents store it (RFC 3339, millisecond
/// precision, `Z` suffix).
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
