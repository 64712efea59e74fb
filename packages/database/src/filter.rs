//! Renders a [`SiteQuery`] into a parameterised SQL `WHERE` clause.
//!
//! The clause assumes the site query's join aliases: `s` for `sites`, `c` for
//! `categories` and `a` for `accessibility`, both joined with `LEFT JOIN`.
//! A missing accessibility record therefore shows up as three `NULL` flags,
//! and `NULL = 0` is never true, which keeps unknown distinct from false.
//!
//! `LOWER()` in `SQLite` only folds ASCII letters, so case-insensitive
//! comparisons of accented capitals differ from the in-memory evaluation.

use switchy_database::DatabaseValue;
use unesco_map_database_models::{AccMode, SiteQuery, TextPredicate};
use unesco_map_heritage_models::AccessibilityFeature;

/// A rendered filter: SQL text and its positional parameters.
#[derive(Debug, Clone)]
pub struct SiteFilterSql {
    /// `WHERE ...` clause, or an empty string when nothing is filtered.
    pub where_clause: String,
    /// Values for `$1..$n`.
    pub params: Vec<DatabaseValue>,
}

impl SiteFilterSql {
    /// Index of the next free `$n` placeholder.
    #[must_use]
    pub fn next_param(&self) -> usize {
        self.params.len() + 1
    }
}

/// Column holding a feature's flag in the `accessibility` table.
#[must_use]
pub const fn feature_column(feature: AccessibilityFeature) -> &'static str {
    match feature {
        AccessibilityFeature::Wheelchair => "a.wheelchair",
        AccessibilityFeature::VisualAids => "a.visual_aids",
        AccessibilityFeature::HearingSupport => "a.hearing_support",
    }
}

/// Escapes `LIKE` wildcards so user input is matched literally.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Renders every filter stage of `query` (pagination excluded).
#[must_use]
pub fn render(query: &SiteQuery) -> SiteFilterSql {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<DatabaseValue> = Vec::new();

    for predicate in query.text_predicates() {
        match predicate {
            TextPredicate::Search(needle) => {
                let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
                let idx = params.len() + 1;
                conditions.push(format!(
                    "(LOWER(s.name) LIKE ${} ESCAPE '\\' \
                     OR LOWER(s.city) LIKE ${} ESCAPE '\\' \
                     OR LOWER(s.region) LIKE ${} ESCAPE '\\')",
                    idx,
                    idx + 1,
                    idx + 2,
                ));
                for _ in 0..3 {
                    params.push(DatabaseValue::String(pattern.clone()));
                }
            }
            TextPredicate::Category(name) => {
                conditions.push(format!("LOWER(c.name) = LOWER(${})", params.len() + 1));
                params.push(DatabaseValue::String(name.clone()));
            }
            TextPredicate::Region(region) => {
                conditions.push(format!("LOWER(s.region) = LOWER(${})", params.len() + 1));
                params.push(DatabaseValue::String(region.clone()));
            }
            TextPredicate::City(city) => {
                conditions.push(format!("LOWER(s.city) = LOWER(${})", params.len() + 1));
                params.push(DatabaseValue::String(city.clone()));
            }
        }
    }

    let accessibility = query.accessibility();
    if !accessibility.is_empty() {
        let mut flags = Vec::with_capacity(accessibility.conditions().len());
        for (feature, value) in accessibility.conditions() {
            flags.push(format!(
                "{} = ${}",
                feature_column(*feature),
                params.len() + 1
            ));
            params.push(DatabaseValue::Int64(i64::from(*value)));
        }
        let joiner = match accessibility.mode() {
            AccMode::Any => " OR ",
            AccMode::All => " AND ",
        };
        conditions.push(format!("({})", flags.join(joiner)));
    }

    if query.requires_accessibility_data() {
        conditions.push(
            "(a.wheelchair IS NOT NULL OR a.visual_aids IS NOT NULL OR a.hearing_support IS NOT NULL)"
                .to_string(),
        );
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    SiteFilterSql {
        where_clause,
        params,
    }
}
