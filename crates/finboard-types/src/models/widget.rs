//! Persisted widget and dashboard configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::field::StructuralType;
use crate::error::ConfigError;

pub const DASHBOARD_CONFIG_VERSION: u32 = 1;

pub const fn default_cache_ttl() -> u64 {
    30
}

pub const fn default_refresh_interval() -> u64 {
    30
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `(header, key)` when both are present; the header name is trimmed and
/// neither part may be blank.
pub fn auth_pair<'a>(header: Option<&'a str>, key: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (header.map(str::trim), key) {
        (Some(header), Some(key)) if !header.is_empty() && !key.is_empty() => Some((header, key)),
        _ => None,
    }
}

/// How a widget lays out its resolved values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Card,
    Table,
    Chart,
}

/// Display format hint attached to a selected field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    #[default]
    None,
    Currency,
    Percentage,
    Number,
    Date,
    Datetime,
}

/// A field path the user picked during configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WidgetField {
    #[validate(length(min = 1_u64))]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub structural_type: Option<StructuralType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FieldFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = 12_u32))]
    pub decimal_places: Option<u32>,
}

impl WidgetField {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            display_name: None,
            structural_type: None,
            format: None,
            currency_symbol: None,
            decimal_places: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_format(mut self, format: FieldFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Display name, falling back to the last dotted path component.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.path.rsplit('.').next().unwrap_or(&self.path),
        }
    }
}

/// One widget: data source, refresh policy and selected fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub id: String,
    #[validate(length(min = 1_u64))]
    pub name: String,
    #[validate(custom(function = "validate_http_url"))]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1_u64))]
    pub api_key_header: Option<String>,
    /// Seconds; 0 disables caching
    #[serde(rename = "cacheTTL", default = "default_cache_ttl")]
    #[validate(range(max = 86_400_u64))]
    pub cache_ttl: u64,
    /// Seconds; 0 disables auto-refresh
    #[serde(default = "default_refresh_interval")]
    #[validate(range(max = 86_400_u64))]
    pub refresh_interval: u64,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default)]
    #[validate(nested)]
    pub selected_fields: Vec<WidgetField>,
    #[serde(default = "now_millis")]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

impl WidgetConfig {
    /// New widget with a generated `widget-<uuid>` id and default intervals.
    pub fn new(name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            id: format!("widget-{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            api_url: api_url.into(),
            api_key: None,
            api_key_header: None,
            cache_ttl: default_cache_ttl(),
            refresh_interval: default_refresh_interval(),
            display_mode: DisplayMode::default(),
            selected_fields: Vec::new(),
            created_at: now_millis(),
            last_updated: None,
        }
    }

    /// Auth header as `(name, key)` only when both parts are configured.
    pub fn auth_header(&self) -> Option<(&str, &str)> {
        auth_pair(self.api_key_header.as_deref(), self.api_key.as_deref())
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        self.refresh_interval > 0
    }

    /// Validate and convert the first failure into a [`ConfigError`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|errors| first_validation_error(&errors))
    }
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    let parsed = url::Url::parse(value).map_err(|_| {
        let mut err = ValidationError::new("url");
        err.message = Some("must be an absolute URL".into());
        err
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        let mut err = ValidationError::new("scheme");
        err.message = Some("must use http or https".into());
        return Err(err);
    }
    Ok(())
}

fn first_validation_error(errors: &ValidationErrors) -> ConfigError {
    let mut fields: Vec<String> = errors.errors().keys().map(|key| key.to_string()).collect();
    fields.sort();
    let field = fields.into_iter().next().unwrap_or_else(|| "widget".to_string());
    let message = errors.to_string().lines().next().unwrap_or("invalid value").to_string();
    ConfigError::ValidationError { field: camel_case(&field), message }
}

fn camel_case(field: &str) -> String {
    match field {
        "cache_ttl" => "cacheTTL".to_string(),
        other => {
            let mut out = String::with_capacity(other.len());
            let mut upper = false;
            for ch in other.chars() {
                if ch == '_' {
                    upper = true;
                } else if upper {
                    out.extend(ch.to_uppercase());
                    upper = false;
                } else {
                    out.push(ch);
                }
            }
            out
        }
    }
}

/// The persisted dashboard document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub widgets: Vec<WidgetConfig>,
}

const fn default_version() -> u32 {
    DASHBOARD_CONFIG_VERSION
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { version: DASHBOARD_CONFIG_VERSION, widgets: Vec::new() }
    }
}

impl DashboardConfig {
    pub fn find(&self, id: &str) -> Option<&WidgetConfig> {
        self.widgets.iter().find(|w| w.id == id)
    }

    /// Insert or replace by id.
    pub fn upsert(&mut self, widget: WidgetConfig) {
        match self.widgets.iter_mut().find(|w| w.id == widget.id) {
            Some(existing) => *existing = widget,
            None => self.widgets.push(widget),
        }
    }

    pub fn remove(&mut self, id: &str) -> Result<WidgetConfig, ConfigError> {
        let index = self
            .widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| ConfigError::WidgetNotFound { id: id.to_string() })?;
        Ok(self.widgets.remove(index))
    }

    /// Validate every widget; duplicate ids are rejected.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for widget in &self.widgets {
            if !seen.insert(widget.id.as_str()) {
                return Err(ConfigError::ValidationError {
                    field: "id".to_string(),
                    message: format!("duplicate widget id '{}'", widget.id),
                });
            }
            widget.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persisted_field_names() {
        let mut widget = WidgetConfig::new("AAPL", "https://finnhub.io/api/v1/quote?symbol=AAPL");
        widget.api_key = Some("secret".to_string());
        widget.api_key_header = Some("X-Finnhub-Token".to_string());
        widget.selected_fields.push(WidgetField::new("c").with_display_name("Price"));

        let value = serde_json::to_value(&widget).unwrap();
        assert_eq!(value["apiUrl"], "https://finnhub.io/api/v1/quote?symbol=AAPL");
        assert_eq!(value["apiKeyHeader"], "X-Finnhub-Token");
        assert_eq!(value["cacheTTL"], 30);
        assert_eq!(value["refreshInterval"], 30);
        assert_eq!(value["selectedFields"][0]["displayName"], "Price");
        assert!(widget.id.starts_with("widget-"));
    }

    #[test]
    fn test_defaults_applied_on_load() {
        let widget: WidgetConfig = serde_json::from_value(json!({
            "id": "w1",
            "name": "Quote",
            "apiUrl": "https://example.com/q"
        }))
        .unwrap();
        assert_eq!(widget.cache_ttl, default_cache_ttl());
        assert_eq!(widget.refresh_interval, default_refresh_interval());
        assert_eq!(widget.display_mode, DisplayMode::Card);
        assert!(widget.auth_header().is_none());
    }

    #[test]
    fn test_auth_header_requires_both_parts() {
        let mut widget = WidgetConfig::new("w", "https://example.com");
        widget.api_key = Some("k".to_string());
        assert!(widget.auth_header().is_none());
        widget.api_key_header = Some("x-api-key".to_string());
        assert_eq!(widget.auth_header(), Some(("x-api-key", "k")));
    }

    #[test]
    fn test_auth_header_trims_name_and_rejects_blank() {
        let mut widget = WidgetConfig::new("w", "https://example.com");
        widget.api_key = Some("k".to_string());
        widget.api_key_header = Some("  X-Api-Key ".to_string());
        assert_eq!(widget.auth_header(), Some(("X-Api-Key", "k")));

        widget.api_key_header = Some("   ".to_string());
        assert!(widget.auth_header().is_none());
        assert!(auth_pair(Some("X-Api-Key"), Some("")).is_none());
    }

    #[test]
    fn test_validation_rejects_non_http_url() {
        let widget = WidgetConfig::new("w", "ftp://example.com/data");
        let err = widget.check().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "apiUrl"));
    }

    #[test]
    fn test_validation_rejects_oversized_ttl() {
        let mut widget = WidgetConfig::new("w", "https://example.com");
        widget.cache_ttl = 86_401;
        let err = widget.check().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "cacheTTL"));
    }

    #[test]
    fn test_dashboard_rejects_duplicate_ids() {
        let widget = WidgetConfig::new("w", "https://example.com");
        let dashboard = DashboardConfig { version: 1, widgets: vec![widget.clone(), widget] };
        assert!(dashboard.check().is_err());
    }

    #[test]
    fn test_label_falls_back_to_last_segment() {
        assert_eq!(WidgetField::new("items[0].price").label(), "price");
        assert_eq!(WidgetField::new("c").with_display_name("Current").label(), "Current");
    }
}
