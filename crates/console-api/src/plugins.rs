//! Plugin listing and settings.
//!
//! The server describes a plugin's configuration as a map of
//! [`ConfigField`]s; the console works with the flattened [`Plugin`] view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Entry of `GET /plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PluginListEntry {
    pub module_name: String,
    #[serde(default)]
    pub name: String,
}

impl From<PluginListEntry> for PluginSummary {
    fn from(entry: PluginListEntry) -> Self {
        Self {
            id: entry.module_name,
            name: entry.name,
        }
    }
}

/// `{ "data": ... }` envelope used by the plugin endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

/// One configurable value as the server describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigField {
    pub value: Value,
    pub title: String,
    pub description: String,
    pub default: Value,
    pub input_type: String,
}

/// Entry of `GET /plugins/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub module_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: BTreeMap<String, ConfigField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_reload: Option<bool>,
}

/// Editor hint for a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginSettingType {
    Boolean,
    String,
    Number,
    Array,
    Object,
    StringArray,
    NumberArray,
    GroupArray,
    #[serde(other)]
    Other,
}

impl PluginSettingType {
    fn from_input_type(input_type: &str) -> Self {
        serde_json::from_value(Value::String(input_type.to_string())).unwrap_or(Self::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSetting {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: PluginSettingType,
    pub label: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAction {
    pub name: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A plugin with its settings flattened and sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub settings: Vec<PluginSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_reload: Option<bool>,
    #[serde(default)]
    pub actions: Vec<PluginAction>,
}

impl Plugin {
    pub fn setting(&self, key: &str) -> Option<&PluginSetting> {
        self.settings.iter().find(|setting| setting.key == key)
    }
}

impl From<PluginInfo> for Plugin {
    fn from(info: PluginInfo) -> Self {
        let settings = info
            .config
            .into_iter()
            .map(|(key, field)| PluginSetting {
                key,
                kind: PluginSettingType::from_input_type(&field.input_type),
                label: field.title,
                options: field.value.as_array().cloned(),
                value: field.value,
                description: (!field.description.is_empty()).then_some(field.description),
                default: (!field.default.is_null()).then_some(field.default),
            })
            .collect();

        Self {
            id: info.module_name,
            name: info.name,
            description: (!info.description.is_empty()).then_some(info.description),
            settings,
            can_reload: info.can_reload,
            actions: Vec::new(),
        }
    }
}

/// Outcome of a plugin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_info() -> PluginInfo {
        serde_json::from_value(json!({
            "module_name": "welcome",
            "name": "Welcome",
            "description": "Greets new members",
            "config": {
                "enabled": {
                    "value": true,
                    "title": "Enabled",
                    "description": "",
                    "default": false,
                    "input_type": "boolean"
                },
                "groups": {
                    "value": [123, 456],
                    "title": "Groups",
                    "description": "Groups to greet in",
                    "default": null,
                    "input_type": "groupArray"
                },
                "style": {
                    "value": "card",
                    "title": "Style",
                    "input_type": "select"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_plugin_from_info() {
        let plugin = Plugin::from(sample_info());

        assert_eq!(plugin.id, "welcome");
        assert_eq!(plugin.description.as_deref(), Some("Greets new members"));
        let keys: Vec<&str> = plugin.settings.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["enabled", "groups", "style"]);

        let enabled = plugin.setting("enabled").unwrap();
        assert_eq!(enabled.kind, PluginSettingType::Boolean);
        assert_eq!(enabled.label, "Enabled");
        assert_eq!(enabled.description, None);
        assert_eq!(enabled.default, Some(json!(false)));
        assert_eq!(enabled.options, None);

        let groups = plugin.setting("groups").unwrap();
        assert_eq!(groups.kind, PluginSettingType::GroupArray);
        assert_eq!(groups.options, Some(vec![json!(123), json!(456)]));
        assert_eq!(groups.default, None);
    }

    #[test]
    fn test_unknown_input_type_is_other() {
        let plugin = Plugin::from(sample_info());
        assert_eq!(
            plugin.setting("style").unwrap().kind,
            PluginSettingType::Other
        );
    }

    #[test]
    fn test_setting_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&PluginSettingType::StringArray).unwrap(),
            r#""stringArray""#
        );
        assert_eq!(
            PluginSettingType::from_input_type("numberArray"),
            PluginSettingType::NumberArray
        );
    }
}
