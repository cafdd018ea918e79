use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: Timestamp,
}

/// Record shape of the bundled default-data resource.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub task: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub is_complete: Value,
    #[serde(default)]
    pub created_at: Value,
}

impl ExternalTask {
    /// Maps the external field names onto the loose internal record shape
    /// consumed by `normalize_task`.
    pub fn into_record(self) -> Value {
        serde_json::json!({
            "id": self.id,
            "title": self.task,
            "description": self.description,
            "completed": self.is_complete,
            "createdAt": self.created_at,
        })
    }
}

/// A list item already present in the host markup, as scraped by the page.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct RenderedItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_tasks_key")]
    pub tasks_key: String,
    #[serde(default = "default_theme_key")]
    pub theme_key: String,
    #[serde(default = "default_data_source")]
    pub default_data_source: Option<String>,
    #[serde(default)]
    pub default_tasks: Option<Vec<Value>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tasks_key: default_tasks_key(),
            theme_key: default_theme_key(),
            default_data_source: default_data_source(),
            default_tasks: None,
        }
    }
}

fn default_tasks_key() -> String {
    "tasks".to_string()
}

fn default_theme_key() -> String {
    "theme".to_string()
}

fn default_data_source() -> Option<String> {
    Some("default-tasks.json".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}
