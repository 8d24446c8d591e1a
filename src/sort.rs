use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    DueDate,
    Priority,
    Status,
    Title,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "due_date" => Some(SortField::DueDate),
            "priority" => Some(SortField::Priority),
            "status" => Some(SortField::Status),
            "title" => Some(SortField::Title),
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

/// A resolved ordering. Rows that tie on `field` are always ordered by id
/// ascending so repeated queries page identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Lenient by contract: an unknown key sorts by `created_at`, an unknown
/// order sorts descending.
pub fn resolve(sort_by: Option<&str>, sort_order: Option<&str>) -> SortSpec {
    let default = SortSpec::default();

    let field = match sort_by.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => SortField::parse(key).unwrap_or_else(|| {
            debug!(sort_by = key, "unknown sort key, using created_at");
            default.field
        }),
        None => default.field,
    };

    let direction = match sort_order.map(str::trim) {
        Some("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    };

    SortSpec { field, direction }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        assert_eq!(resolve(None, None), SortSpec::default());
        assert_eq!(resolve(None, None).field, SortField::CreatedAt);
        assert_eq!(resolve(None, None).direction, SortDirection::Desc);
    }

    #[test]
    fn test_known_keys() {
        for (key, field) in [
            ("due_date", SortField::DueDate),
            ("priority", SortField::Priority),
            ("status", SortField::Status),
            ("title", SortField::Title),
            ("created_at", SortField::CreatedAt),
            ("updated_at", SortField::UpdatedAt),
        ] {
            assert_eq!(resolve(Some(key), Some("asc")).field, field);
        }
    }

    #[test]
    fn test_bogus_key_matches_created_at() {
        assert_eq!(
            resolve(Some("bogus"), Some("asc")),
            resolve(Some("created_at"), Some("asc"))
        );
    }

    #[test]
    fn test_unknown_order_is_desc() {
        assert_eq!(resolve(Some("title"), Some("ASC")).direction, SortDirection::Desc);
        assert_eq!(resolve(Some("title"), Some("sideways")).direction, SortDirection::Desc);
        assert_eq!(resolve(Some("title"), Some("asc")).direction, SortDirection::Asc);
    }

    proptest! {
        #[test]
        fn prop_resolve_never_fails(key in ".{0,20}", order in ".{0,10}") {
            let spec = resolve(Some(&key), Some(&order));
            if SortField::parse(key.trim()).is_none() {
                prop_assert_eq!(spec.field, SortField::CreatedAt);
            }
        }
    }
}
