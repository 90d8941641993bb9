//! Export of the current view to CSV or JSON

use super::model::{value_to_string, Resource};
use super::registry::ResourceDef;
use crate::api::http::Download;
use serde_json::Value;
use std::str::FromStr;

/// Requested export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}

/// Downloadable export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ExportBlob {
    /// Wrap a backend download, keeping its content type when it sent one
    pub fn from_download(def: &ResourceDef, format: ExportFormat, download: Download) -> Self {
        Self {
            file_name: file_name(def, format),
            content_type: download
                .content_type
                .unwrap_or_else(|| format.content_type().to_string()),
            bytes: download.bytes,
        }
    }
}

/// `{key}-{YYYYMMDD}.{ext}`
pub fn file_name(def: &ResourceDef, format: ExportFormat) -> String {
    format!(
        "{}-{}.{}",
        def.key,
        chrono::Local::now().format("%Y%m%d"),
        format.as_str()
    )
}

/// Column list: the configured export fields, else every top-level key in
/// order of first appearance
fn columns(items: &[Resource], def: &ResourceDef) -> Vec<String> {
    if !def.export.fields.is_empty() {
        return def.export.fields.clone();
    }
    let mut columns: Vec<String> = Vec::new();
    for item in items {
        for key in item.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Serialize items to CSV with a header row
pub fn to_csv(items: &[Resource], def: &ResourceDef) -> String {
    let columns = columns(items, def);
    let mut out = String::new();

    out.push_str(
        &columns
            .iter()
            .map(|c| escape_csv(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for item in items {
        let row: Vec<String> = columns
            .iter()
            .map(|col| escape_csv(&item.get_path(col).and_then(value_to_string).unwrap_or_default()))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Serialize items locally; no network involved
pub fn export_items(items: &[Resource], def: &ResourceDef, format: ExportFormat) -> ExportBlob {
    let bytes = match format {
        ExportFormat::Csv => to_csv(items, def).into_bytes(),
        ExportFormat::Json => {
            let values: Vec<Value> = items.iter().cloned().map(Resource::into_value).collect();
            serde_json::to_vec_pretty(&values).unwrap_or_default()
        }
    };

    ExportBlob {
        file_name: file_name(def, format),
        content_type: format.content_type().to_string(),
        bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::registry::ExportDef;
    use serde_json::json;

    fn items() -> Vec<Resource> {
        vec![
            json!({"id": 1, "name": "Red, Dry", "brand": {"name": "Bodega"}}),
            json!({"id": 2, "name": "Say \"cheers\"", "abv": 5.5}),
        ]
        .into_iter()
        .filter_map(Resource::from_value)
        .collect()
    }

    #[test]
    fn test_csv_escapes_and_infers_columns() {
        let def = ResourceDef::new("products", "products");
        let csv = to_csv(&items(), &def);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "brand,id,name,abv");
        assert_eq!(lines[1], r#""{""name"":""Bodega""}",1,"Red, Dry","#);
        assert_eq!(lines[2], r#",2,"Say ""cheers""",5.5"#);
    }

    #[test]
    fn test_csv_uses_configured_fields_with_paths() {
        let def = ResourceDef::new("products", "products").with_export(ExportDef {
            fields: vec!["name".into(), "brand.name".into()],
            ..ExportDef::default()
        });
        let csv = to_csv(&items(), &def);
        assert_eq!(csv.lines().nth(1), Some(r#""Red, Dry",Bodega"#));
    }

    #[test]
    fn test_json_export_round_trips_items() {
        let def = ResourceDef::new("products", "products");
        let blob = export_items(&items(), &def, ExportFormat::Json);
        let parsed: Vec<Value> = serde_json::from_slice(&blob.bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(blob.content_type, "application/json");
        assert!(blob.file_name.starts_with("products-"));
        assert!(blob.file_name.ends_with(".json"));
    }

    #[test]
    fn test_format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!(" json ".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_empty_view_has_header_only() {
        let def = ResourceDef::new("products", "products").with_export(ExportDef {
            fields: vec!["id".into()],
            ..ExportDef::default()
        });
        assert_eq!(to_csv(&[], &def), "id\n");
    }
}
