//! SQL rendering of the collection catalog.
//!
//! Pure string building; nothing here touches a connection. Every collection
//! becomes:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "skycart"."users" (
//!     id BIGSERIAL PRIMARY KEY,
//!     doc JSONB NOT NULL,
//!     inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     CONSTRAINT users_doc_check CHECK (jsonb_typeof(doc) = 'object'),
//!     CONSTRAINT users_email_check CHECK (...)
//! )
//! ```
//!
//! A field's constraint only inspects the field when it is present, mirroring
//! [`skycart_core::schema::validate_document`].

use std::fmt::Write;

use skycart_core::schema::{CollectionSpec, FieldRule, FieldSpec, IndexSpec, SortOrder, TIMESTAMP_PATTERN};

/// Quote an identifier (`"name"`).
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal (`'value'`).
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Schema-qualified table name.
#[must_use]
pub fn table(namespace: &str, collection: &str) -> String {
    format!("{}.{}", quote_ident(namespace), quote_ident(collection))
}

/// Name of the `CHECK` constraint guarding `path` in `collection`.
#[must_use]
pub fn check_name(collection: &str, path: &str) -> String {
    format!("{collection}_{}_check", path.replace('.', "_"))
}

/// `CREATE SCHEMA IF NOT EXISTS`.
#[must_use]
pub fn create_schema(namespace: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(namespace))
}

/// `CREATE TABLE IF NOT EXISTS` with one `CHECK` per field.
#[must_use]
pub fn create_collection(namespace: &str, spec: &CollectionSpec) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id BIGSERIAL PRIMARY KEY,\n    doc JSONB NOT NULL,\n    inserted_at TIMESTAMPTZ NOT NULL DEFAULT now(),\n    CONSTRAINT {} CHECK (jsonb_typeof(doc) = 'object')",
        table(namespace, spec.name),
        quote_ident(&format!("{}_doc_check", spec.name)),
    );

    for field in &spec.fields {
        let _ = write!(
            sql,
            ",\n    CONSTRAINT {} CHECK ({})",
            quote_ident(&check_name(spec.name, field.path)),
            field_check(field)
        );
    }

    sql.push_str("\n)");
    sql
}

/// `CREATE [UNIQUE] INDEX IF NOT EXISTS` for a single-field or text index.
#[must_use]
pub fn create_index(namespace: &str, collection: &str, index: &IndexSpec) -> String {
    let name = quote_ident(&index.name(collection));
    let table = table(namespace, collection);

    match index {
        IndexSpec::Single {
            path,
            order,
            unique,
        } => {
            let unique = if *unique { "UNIQUE " } else { "" };
            let direction = match order {
                SortOrder::Ascending => "",
                SortOrder::Descending => " DESC",
            };
            format!(
                "CREATE {unique}INDEX IF NOT EXISTS {name} ON {table} (({}){direction})",
                json_value(path)
            )
        }
        IndexSpec::Text { fields } => {
            let classes = weight_classes(fields.iter().map(|f| f.weight));
            let vector = fields
                .iter()
                .zip(classes)
                .map(|(field, class)| {
                    format!(
                        "setweight(to_tsvector('english', coalesce({}, '')), '{class}')",
                        json_text(field.path)
                    )
                })
                .collect::<Vec<_>>()
                .join(" || ");
            format!("CREATE INDEX IF NOT EXISTS {name} ON {table} USING GIN (({vector}))")
        }
    }
}

/// Map numeric weights onto `PostgreSQL`'s four weight classes by rank.
///
/// The highest distinct weight gets `A`, the next `B`, then `C`; anything
/// lower shares `D`.
#[must_use]
pub fn weight_classes(weights: impl Iterator<Item = u8> + Clone) -> Vec<char> {
    let mut distinct: Vec<u8> = weights.clone().collect();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    weights
        .map(|w| {
            let rank = distinct.iter().position(|d| *d == w).unwrap_or(usize::MAX);
            match rank {
                0 => 'A',
                1 => 'B',
                2 => 'C',
                _ => 'D',
            }
        })
        .collect()
}

/// `INSERT ... RETURNING id`.
#[must_use]
pub fn insert(namespace: &str, collection: &str) -> String {
    format!(
        "INSERT INTO {} (doc) VALUES ($1) RETURNING id",
        table(namespace, collection)
    )
}

/// `SELECT COUNT(*)` with a containment filter in `$1`.
#[must_use]
pub fn count(namespace: &str, collection: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE doc @> $1",
        table(namespace, collection)
    )
}

/// First document by ID with a containment filter in `$1`.
#[must_use]
pub fn find_one(namespace: &str, collection: &str) -> String {
    format!(
        "SELECT id, doc FROM {} WHERE doc @> $1 ORDER BY id LIMIT 1",
        table(namespace, collection)
    )
}

/// The boolean expression guarding one field.
#[must_use]
pub fn field_check(field: &FieldSpec) -> String {
    let value = json_value(field.path);
    let rules = field
        .rules
        .iter()
        .map(|rule| rule_check(*rule, field.path))
        .collect::<Vec<_>>();

    let body = if rules.is_empty() {
        "TRUE".to_string()
    } else {
        rules.join(" AND ")
    };

    if field.required {
        format!("({value}) IS NOT NULL AND {body}")
    } else {
        format!("({value}) IS NULL OR ({body})")
    }
}

fn rule_check(rule: FieldRule, path: &str) -> String {
    let value = json_value(path);
    let text = json_text(path);
    let is_string = format!("jsonb_typeof({value}) = 'string'");

    match rule {
        FieldRule::String => is_string,
        FieldRule::NullableString => format!("jsonb_typeof({value}) IN ('string', 'null')"),
        FieldRule::Number => format!("jsonb_typeof({value}) = 'number'"),
        FieldRule::Timestamp => format!(
            "({is_string} AND {text} ~ {})",
            quote_literal(TIMESTAMP_PATTERN)
        ),
        FieldRule::Pattern(pattern) => format!(
            "(jsonb_typeof({value}) <> 'string' OR {text} ~ {})",
            quote_literal(pattern)
        ),
        FieldRule::OneOf(allowed) => {
            let list = allowed
                .iter()
                .map(|v| quote_literal(v))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({is_string} AND {text} IN ({list}))")
        }
        FieldRule::MinLength(min) => format!(
            "(jsonb_typeof({value}) <> 'string' OR char_length({text}) >= {min})"
        ),
    }
}

/// `doc #> '{a,b}'` - the JSONB value at `path`, SQL NULL when absent.
fn json_value(path: &str) -> String {
    format!("doc #> {}", path_literal(path))
}

/// `doc #>> '{a,b}'` - the value at `path` as text.
fn json_text(path: &str) -> String {
    format!("(doc #>> {})", path_literal(path))
}

fn path_literal(path: &str) -> String {
    quote_literal(&format!("{{{}}}", path.replace('.', ",")))
}
