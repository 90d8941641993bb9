//! Resource Fetcher
//!
//! Fetches one page of a resource and maps the raw response into
//! [`Resource`] records. Derived presentation values are computed here and
//! nowhere else.

use super::filter::{parse_date, FilterState};
use super::model::Resource;
use super::pagination::PaginationState;
use super::registry::{DerivedStatusDef, FilterMode, ResourceDef};
use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::http::PageMeta;
use chrono::NaiveDate;
use serde_json::Value;

/// Result of a list fetch
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub items: Vec<Resource>,
    pub meta: Option<PageMeta>,
}

/// Query string for a list request
pub fn build_query(
    def: &ResourceDef,
    filters: &FilterState,
    pagination: &PaginationState,
) -> Vec<(String, String)> {
    match def.filter_mode {
        FilterMode::Server => {
            let mut query = filters.to_query();
            query.extend(pagination.to_query());
            query
        }
        // Full set is fetched once and narrowed locally
        FilterMode::Client => Vec::new(),
    }
}

/// Fetch one page of resources
pub async fn fetch_page(
    client: &ApiClient,
    def: &ResourceDef,
    filters: &FilterState,
    pagination: &PaginationState,
) -> Result<PageResult, ApiError> {
    let query = build_query(def, filters, pagination);
    let response = client.list(&def.path, &query).await?;

    let today = chrono::Local::now().date_naive();
    let items = extract_items(&response.data, def, today);

    tracing::debug!("Fetched {} {} (page {})", items.len(), def.key, pagination.page());

    Ok(PageResult {
        items,
        meta: response.pagination,
    })
}

/// Extract items from `data` using the response_path
pub fn extract_items(data: &Value, def: &ResourceDef, today: NaiveDate) -> Vec<Resource> {
    let mut current = data;
    if !def.response_path.is_empty() {
        for part in def.response_path.split('.') {
            current = match current.get(part) {
                Some(v) => v,
                None => {
                    tracing::warn!("Response for {} has no '{}'", def.key, def.response_path);
                    return Vec::new();
                }
            };
        }
    }

    let Some(raw_items) = current.as_array() else {
        tracing::warn!("Response data for {} is not a list", def.key);
        return Vec::new();
    };

    raw_items
        .iter()
        .cloned()
        .filter_map(|item| normalize_item(item, def, today))
        .collect()
}

/// Map one raw item; drops non-objects and fills server-omitted derived fields
pub fn normalize_item(item: Value, def: &ResourceDef, today: NaiveDate) -> Option<Resource> {
    let Some(mut resource) = Resource::from_value(item) else {
        tracing::warn!("Dropping non-object item in {}", def.key);
        return None;
    };

    if resource.id(&def.id_field).is_none() {
        tracing::debug!("Item in {} has no identifier", def.key);
    }

    if let Some(derived) = &def.derived_status {
        let present = resource
            .get(&derived.field)
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
        if !present {
            if let Some(status) = derive_status(&resource, derived, today) {
                resource.insert(derived.field.clone(), Value::String(status.to_string()));
            }
        }
    }

    Some(resource)
}

/// Scheduled / Active / Expired from a validity window
pub fn derive_status(
    resource: &Resource,
    derived: &DerivedStatusDef,
    today: NaiveDate,
) -> Option<&'static str> {
    let start = resource.field_str(&derived.start_field).and_then(|s| parse_date(&s));
    let end = resource.field_str(&derived.end_field).and_then(|s| parse_date(&s));

    if start.is_none() && end.is_none() {
        return None;
    }

    if start.is_some_and(|s| today < s) {
        Some("Scheduled")
    } else if end.is_some_and(|e| today > e) {
        Some("Expired")
    } else {
        Some("Active")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::filter::FilterValue;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn promotions() -> ResourceDef {
        ResourceDef::new("promotions", "promotions").with_derived_status("startDate", "endDate")
    }

    #[test]
    fn test_derive_status_windows() {
        let def = promotions();
        let cases = [
            (json!({"startDate": "2024-07-01", "endDate": "2024-07-31"}), "Scheduled"),
            (json!({"startDate": "2024-06-01", "endDate": "2024-06-15"}), "Active"),
            (json!({"startDate": "2024-05-01", "endDate": "2024-06-14T23:00:00Z"}), "Expired"),
        ];
        for (raw, expected) in cases {
            let item = normalize_item(raw, &def, today()).unwrap();
            assert_eq!(item["status"], expected);
        }
    }

    #[test]
    fn test_server_status_wins() {
        let raw = json!({"status": "Paused", "startDate": "2024-06-01", "endDate": "2024-06-30"});
        let item = normalize_item(raw, &promotions(), today()).unwrap();
        assert_eq!(item["status"], "Paused");
    }

    #[test]
    fn test_extract_items_drops_non_objects() {
        let data = json!([{"id": 1}, "junk", {"id": 2}]);
        let def = ResourceDef::new("products", "products");
        assert_eq!(extract_items(&data, &def, today()).len(), 2);
    }

    #[test]
    fn test_extract_items_with_response_path() {
        let mut def = ResourceDef::new("orders", "orders");
        def.response_path = "orders".to_string();
        let data = json!({"orders": [{"id": "a"}], "summary": {}});
        assert_eq!(extract_items(&data, &def, today()).len(), 1);
        assert!(extract_items(&json!({"other": []}), &def, today()).is_empty());
    }

    #[test]
    fn test_build_query_server_mode() {
        let def = ResourceDef::new("refunds", "refunds");
        let filters = FilterState::new().with("status", FilterValue::from_input("Approved"));
        let query = build_query(&def, &filters, &PaginationState::new(10));
        assert_eq!(
            query,
            vec![
                ("status".to_string(), "Approved".to_string()),
                ("page".to_string(), "1".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_query_client_mode_is_empty() {
        let def = ResourceDef::new("reviews", "reviews").with_filter_mode(FilterMode::Client);
        let filters = FilterState::new().with("rating", FilterValue::from_input("5"));
        assert!(build_query(&def, &filters, &PaginationState::default()).is_empty());
    }
}
