//! Widget embedding configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

use super::WidgetError;

pub const DEFAULT_TITLE: &str = "Smeduverse AI";
pub const DEFAULT_CONTAINER_ID: &str = "smeduverse-ai-widget-container";

/// Script tag attribute that enables declarative initialisation
pub const AUTO_INIT_ATTR: &str = "data-smeduverse-ai";

/// Corner of the page the widget is anchored to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    BottomCenter,
}

impl Position {
    /// Class token understood by the bundled stylesheet
    pub fn semantic_class(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomCenter => "bottom-center",
        }
    }

    /// Utility classes for hosts that ship a utility-first stylesheet
    pub fn utility_classes(&self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-6 right-2 md:right-6 items-end",
            Position::BottomLeft => "bottom-6 left-1 items-start",
            Position::BottomCenter => "bottom-6 left-1/2 -translate-x-1/2 items-center",
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bottom-right" => Ok(Position::BottomRight),
            "bottom-left" => Ok(Position::BottomLeft),
            "bottom-center" => Ok(Position::BottomCenter),
            other => Err(format!("Unknown position: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    pub api_endpoint: String,
    pub position: Position,
    /// CSS color overriding the theme's primary color
    pub primary_color: Option<String>,
    pub title: String,
    pub dark_mode: bool,
    pub container_id: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            position: Position::default(),
            primary_color: None,
            title: DEFAULT_TITLE.to_string(),
            dark_mode: false,
            container_id: DEFAULT_CONTAINER_ID.to_string(),
        }
    }
}

impl WidgetConfig {
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            ..Self::default()
        }
    }

    /// Check the configuration and resolve the relay URL
    pub fn validate(&self) -> Result<Url, WidgetError> {
        let endpoint = self.api_endpoint.trim();
        if endpoint.is_empty() {
            return Err(WidgetError::MissingApiEndpoint);
        }
        Url::parse(endpoint).map_err(|e| WidgetError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a configuration from script tag data attributes
    ///
    /// Returns `Ok(None)` unless `data-smeduverse-ai="auto"` is present. Empty
    /// attributes count as absent and an unknown position falls back to the
    /// default corner.
    pub fn from_data_attributes(
        attrs: &HashMap<String, String>,
    ) -> Result<Option<Self>, WidgetError> {
        if attrs.get(AUTO_INIT_ATTR).map(String::as_str) != Some("auto") {
            return Ok(None);
        }

        let attr = |name: &str| {
            attrs
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let api_endpoint = attr("data-api-endpoint").ok_or(WidgetError::AutoInitMissingEndpoint)?;

        let position = match attr("data-position") {
            Some(p) => p.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using bottom-right", e);
                Position::default()
            }),
            None => Position::default(),
        };

        Ok(Some(Self {
            api_endpoint,
            position,
            primary_color: attr("data-primary-color"),
            title: attr("data-title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            dark_mode: attrs.get("data-dark-mode").map(String::as_str) == Some("true"),
            container_id: DEFAULT_CONTAINER_ID.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config: WidgetConfig =
            serde_json::from_str(r#"{"apiEndpoint": "http://localhost:3000/api/chat"}"#).unwrap();
        assert_eq!(config.position, Position::BottomRight);
        assert_eq!(config.title, "Smeduverse AI");
        assert!(!config.dark_mode);
        assert_eq!(config.container_id, "smeduverse-ai-widget-container");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_endpoint() {
        assert_eq!(
            WidgetConfig::new("  ").validate(),
            Err(WidgetError::MissingApiEndpoint)
        );
        assert!(matches!(
            WidgetConfig::new("not a url").validate(),
            Err(WidgetError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_data_attributes() {
        let config = WidgetConfig::from_data_attributes(&attrs(&[
            ("data-smeduverse-ai", "auto"),
            ("data-api-endpoint", "https://relay.example.com/api/chat"),
            ("data-position", "bottom-left"),
            ("data-primary-color", "#4f46e5"),
            ("data-title", ""),
            ("data-dark-mode", "TRUE"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(config.position, Position::BottomLeft);
        assert_eq!(config.primary_color.as_deref(), Some("#4f46e5"));
        assert_eq!(config.title, DEFAULT_TITLE);
        // only the exact string "true" enables dark mode
        assert!(!config.dark_mode);
    }

    #[test]
    fn test_auto_init_requires_endpoint() {
        let err = WidgetConfig::from_data_attributes(&attrs(&[("data-smeduverse-ai", "auto")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Auto-init enabled but data-api-endpoint not found"
        );

        let none = WidgetConfig::from_data_attributes(&attrs(&[
            ("data-smeduverse-ai", "manual"),
            ("data-api-endpoint", "https://relay.example.com/api/chat"),
        ]))
        .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_unknown_position_falls_back() {
        let config = WidgetConfig::from_data_attributes(&attrs(&[
            ("data-smeduverse-ai", "auto"),
            ("data-api-endpoint", "https://relay.example.com/api/chat"),
            ("data-position", "top-left"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.position, Position::BottomRight);
        assert_eq!(config.position.utility_classes(), "bottom-6 right-2 md:right-6 items-end");
    }
}
