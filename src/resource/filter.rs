//! Filter state and matching
//!
//! A resource matches a [`FilterState`] when every active filter's predicate
//! holds. Predicates are independent, so the result does not depend on the
//! order filters were set in.

use super::model::Resource;
use super::registry::{FilterKind, ResourceDef};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

/// Input that means "no constraint"
pub const ALL_SENTINEL: &str = "all";

/// Current value of one filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterValue {
    #[default]
    All,
    Text(String),
    /// Inclusive bounds; either side may be open
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl FilterValue {
    /// Parse select/search box input; `""` and `"all"` clear the filter
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            Self::All
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        if from.is_none() && to.is_none() {
            Self::All
        } else {
            Self::DateRange { from, to }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Filter name -> current value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    values: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterState::set`]
    pub fn with(mut self, name: &str, value: FilterValue) -> Self {
        self.set(name, value);
        self
    }

    /// Set a filter; returns whether the stored value changed
    pub fn set(&mut self, name: &str, value: FilterValue) -> bool {
        if value.is_all() {
            return self.values.remove(name).is_some();
        }
        self.values.insert(name.to_string(), value.clone()) != Some(value)
    }

    pub fn get(&self, name: &str) -> &FilterValue {
        static ALL: FilterValue = FilterValue::All;
        self.values.get(name).unwrap_or(&ALL)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Active (non-`All`) filters
    pub fn active(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Query parameters for server-side filtering
    ///
    /// Date ranges become `{name}From` / `{name}To` in `YYYY-MM-DD` form.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        for (name, value) in self.active() {
            match value {
                FilterValue::All => {}
                FilterValue::Text(text) => query.push((name.to_string(), text.clone())),
                FilterValue::DateRange { from, to } => {
                    if let Some(from) = from {
                        query.push((format!("{}From", name), from.format("%Y-%m-%d").to_string()));
                    }
                    if let Some(to) = to {
                        query.push((format!("{}To", name), to.format("%Y-%m-%d").to_string()));
                    }
                }
            }
        }
        query
    }
}

/// Parse `YYYY-MM-DD`, RFC 3339, or anything starting with a date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn search_matches(resource: &Resource, fields: &[String], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    if fields.is_empty() {
        return resource.values().any(|v| match v {
            Value::String(s) => s.to_lowercase().contains(&needle),
            _ => false,
        });
    }
    fields.iter().any(|field| {
        resource
            .field_str(field)
            .map(|s| s.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Whether a single filter accepts the resource
fn filter_matches(resource: &Resource, def: &ResourceDef, name: &str, value: &FilterValue) -> bool {
    let filter_def = def.filter(name);
    let field = filter_def.map(|f| f.field_path()).unwrap_or(name);

    match (def.filter_kind(name), value) {
        (_, FilterValue::All) => true,
        (FilterKind::Search, FilterValue::Text(needle)) => {
            let fields = match filter_def {
                Some(f) if !f.fields.is_empty() => &f.fields,
                _ => &def.searchable_fields,
            };
            search_matches(resource, fields, needle)
        }
        (FilterKind::DateRange, FilterValue::Text(text)) => {
            // A plain date on a range filter means that single day
            let Some(day) = parse_date(text) else {
                return false;
            };
            resource
                .field_str(field)
                .and_then(|v| parse_date(&v))
                .map(|d| d == day)
                .unwrap_or(false)
        }
        (_, FilterValue::DateRange { from, to }) => {
            let Some(date) = resource.field_str(field).and_then(|v| parse_date(&v)) else {
                return false;
            };
            from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
        }
        (FilterKind::Exact, FilterValue::Text(expected)) => {
            resource.field_str(field).as_deref() == Some(expected.as_str())
        }
    }
}

/// Whether a resource satisfies every active filter
pub fn matches(resource: &Resource, filters: &FilterState, def: &ResourceDef) -> bool {
    filters
        .active()
        .all(|(name, value)| filter_matches(resource, def, name, value))
}

/// Filter items, preserving order
pub fn filter_items(items: &[Resource], filters: &FilterState, def: &ResourceDef) -> Vec<Resource> {
    if filters.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| matches(item, filters, def))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::{FilterDef, SEARCH_FILTER};
    use serde_json::json;

    fn items(values: Vec<Value>) -> Vec<Resource> {
        values.into_iter().filter_map(Resource::from_value).collect()
    }

    fn customers_def() -> ResourceDef {
        ResourceDef::new("customers", "customers")
            .with_searchable(&["name", "email"])
            .with_filter(FilterDef::search(SEARCH_FILTER))
            .with_filter(FilterDef::exact("status"))
    }

    #[test]
    fn test_status_filter_exact() {
        let list = items(vec![
            json!({"id": 1, "status": "Active"}),
            json!({"id": 2, "status": "Suspended"}),
        ]);
        let filters = FilterState::new().with("status", FilterValue::from_input("Active"));
        let result = filter_items(&list, &filters, &customers_def());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id("id"), Some("1".to_string()));
    }

    #[test]
    fn test_search_case_insensitive_substring() {
        let list = items(vec![json!({"name": "John Doe"}), json!({"name": "Jane"})]);
        let filters = FilterState::new().with(SEARCH_FILTER, FilterValue::from_input("john"));
        let result = filter_items(&list, &filters, &customers_def());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], "John Doe");
    }

    #[test]
    fn test_search_any_searchable_field() {
        let list = items(vec![
            json!({"name": "Ann", "email": "ann@cellar.io"}),
            json!({"name": "Bob", "email": "bob@example.com"}),
        ]);
        let filters = FilterState::new().with(SEARCH_FILTER, FilterValue::from_input("CELLAR"));
        assert_eq!(filter_items(&list, &filters, &customers_def()).len(), 1);
    }

    #[test]
    fn test_all_sentinel_clears_filter() {
        let mut filters = FilterState::new().with("status", FilterValue::from_input("Active"));
        assert!(filters.set("status", FilterValue::from_input("ALL")));
        assert!(filters.is_empty());
        assert_eq!(FilterValue::from_input("  "), FilterValue::All);
    }

    #[test]
    fn test_filters_combine_with_and() {
        let list = items(vec![
            json!({"name": "John", "status": "Active"}),
            json!({"name": "John", "status": "Suspended"}),
            json!({"name": "Jane", "status": "Active"}),
        ]);
        let filters = FilterState::new()
            .with(SEARCH_FILTER, FilterValue::from_input("john"))
            .with("status", FilterValue::from_input("Active"));
        assert_eq!(filter_items(&list, &filters, &customers_def()).len(), 1);
    }

    #[test]
    fn test_date_range_inclusive() {
        let def = ResourceDef::new("payments", "payments")
            .with_filter(FilterDef::date_range("date", "createdAt"));
        let list = items(vec![
            json!({"id": 1, "createdAt": "2024-03-01T10:00:00Z"}),
            json!({"id": 2, "createdAt": "2024-03-15"}),
            json!({"id": 3, "createdAt": "2024-04-02T00:00:00.000Z"}),
            json!({"id": 4}),
        ]);
        let range = FilterValue::date_range(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        );
        let filters = FilterState::new().with("date", range);
        let ids: Vec<_> = filter_items(&list, &filters, &def)
            .iter()
            .filter_map(|r| r.id("id"))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_nested_field_filter() {
        let def = ResourceDef::new("products", "products").with_filter(FilterDef {
            field: Some("category.name".into()),
            ..FilterDef::exact("category")
        });
        let list = items(vec![
            json!({"category": {"name": "Wine"}}),
            json!({"category": {"name": "Beer"}}),
        ]);
        let filters = FilterState::new().with("category", FilterValue::from_input("Beer"));
        assert_eq!(filter_items(&list, &filters, &def).len(), 1);
    }

    #[test]
    fn test_to_query_serialization() {
        let filters = FilterState::new()
            .with("status", FilterValue::from_input("Active"))
            .with(
                "date",
                FilterValue::date_range(NaiveDate::from_ymd_opt(2024, 1, 1), None),
            );
        assert_eq!(
            filters.to_query(),
            vec![
                ("dateFrom".to_string(), "2024-01-01".to_string()),
                ("status".to_string(), "Active".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6);
        assert_eq!(parse_date("2024-05-06"), expected);
        assert_eq!(parse_date("2024-05-06T23:59:59+02:00"), expected);
        assert_eq!(parse_date("2024-05-06 12:00"), expected);
        assert_eq!(parse_date("May 6"), None);
    }
}
