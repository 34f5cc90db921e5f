//! The SkyCart collections: `users`, `products`, `orders`.

use super::{CollectionSpec, FieldRule, FieldSpec, IndexSpec, TextField};
use crate::types::{MIN_PASSWORD_LENGTH, UserRole};

/// Collection name for user accounts.
pub const USERS: &str = "users";
/// Collection name for the product catalog.
pub const PRODUCTS: &str = "products";
/// Collection name for customer orders.
pub const ORDERS: &str = "orders";

/// Storage-layer email pattern. Whitespace is spelled out as the ASCII set
/// because `\s` is Unicode-aware in the `regex` crate but locale-dependent in
/// PostgreSQL.
pub const EMAIL_PATTERN: &str = r"^[^@ \t\n\r\f\v]+@[^@ \t\n\r\f\v]+\.[^@ \t\n\r\f\v]+$";

/// RFC 3339 timestamp shape accepted for `created_at` fields.
pub const TIMESTAMP_PATTERN: &str =
    r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$";

const ROLES: &[&str] = &[UserRole::User.as_str(), UserRole::Admin.as_str()];

/// `users`: the only collection with a validator.
#[must_use]
pub fn users() -> CollectionSpec {
    CollectionSpec {
        name: USERS,
        fields: vec![
            FieldSpec::required("name", [FieldRule::String]),
            FieldSpec::required(
                "email",
                [FieldRule::String, FieldRule::Pattern(EMAIL_PATTERN)],
            ),
            FieldSpec::required(
                "password",
                [FieldRule::String, FieldRule::MinLength(MIN_PASSWORD_LENGTH)],
            ),
            FieldSpec::optional("role", [FieldRule::OneOf(ROLES)]),
            FieldSpec::optional("avatar", [FieldRule::NullableString]),
            FieldSpec::optional("created_at", [FieldRule::Timestamp]),
        ],
        indexes: vec![
            IndexSpec::unique("email"),
            IndexSpec::ascending("reset_password_token"),
        ],
    }
}

/// `products`: unstructured apart from its indexes.
#[must_use]
pub fn products() -> CollectionSpec {
    CollectionSpec {
        name: PRODUCTS,
        fields: Vec::new(),
        indexes: vec![
            IndexSpec::ascending("name"),
            IndexSpec::ascending("category"),
            IndexSpec::ascending("price"),
            IndexSpec::ascending("ratings"),
            IndexSpec::descending("created_at"),
            IndexSpec::Text {
                fields: vec![
                    TextField {
                        path: "name",
                        weight: 10,
                    },
                    TextField {
                        path: "description",
                        weight: 5,
                    },
                ],
            },
        ],
    }
}

/// `orders`: indexed by owner, status, age, and payment transaction.
#[must_use]
pub fn orders() -> CollectionSpec {
    CollectionSpec {
        name: ORDERS,
        fields: Vec::new(),
        indexes: vec![
            IndexSpec::ascending("user"),
            IndexSpec::ascending("order_status"),
            IndexSpec::descending("created_at"),
            IndexSpec::ascending("payment_info.id"),
        ],
    }
}

/// All collections in creation order.
#[must_use]
pub fn catalog() -> Vec<CollectionSpec> {
    vec![users(), products(), orders()]
}

/// Look up a catalog collection by name.
#[must_use]
pub fn collection(name: &str) -> Option<CollectionSpec> {
    catalog().into_iter().find(|spec| spec.name == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let names: Vec<_> = catalog().iter().map(|c| c.name).collect();
        assert_eq!(names, [USERS, PRODUCTS, ORDERS]);
    }

    #[test]
    fn test_index_names_unique_per_collection() {
        for spec in catalog() {
            let mut names: Vec<_> = spec.indexes.iter().map(|i| i.name(spec.name)).collect();
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate index name in {}", spec.name);
        }
    }

    #[test]
    fn test_products_text_index_weights_name_highest() {
        let products = products();
        let text = products
            .indexes
            .iter()
            .find_map(|index| match index {
                IndexSpec::Text { fields } => Some(fields),
                IndexSpec::Single { .. } => None,
            })
            .unwrap();
        assert_eq!(text.first().unwrap().path, "name");
        assert!(text.first().unwrap().weight > text.get(1).unwrap().weight);
    }

    #[test]
    fn test_collection_lookup() {
        assert_eq!(collection("orders").unwrap().name, ORDERS);
        assert!(collection("carts").is_none());
    }

    #[test]
    fn test_patterns_compile() {
        assert!(regex::Regex::new(EMAIL_PATTERN).is_ok());
        assert!(regex::Regex::new(TIMESTAMP_PATTERN).is_ok());
    }
}
