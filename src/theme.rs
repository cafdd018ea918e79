use serde::{Deserialize, Serialize};

use crate::storage::Storage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    /// Anything other than a stored `light` or `dark` falls back to dark.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn body_class(&self) -> &'static str {
        match self {
            Theme::Light => "theme-light",
            Theme::Dark => "theme-dark",
        }
    }

    /// The toggle names the theme a click switches to.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            Theme::Light => "Dark mode",
            Theme::Dark => "Light mode",
        }
    }

    pub fn view(&self) -> ThemeView {
        ThemeView {
            theme: *self,
            body_class: self.body_class(),
            toggle_label: self.toggle_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ThemeView {
    pub theme: Theme,
    pub body_class: &'static str,
    pub toggle_label: &'static str,
}

/// Reads the stored theme. Storage failures are not reported; they read as the default.
pub fn load_theme(storage: &Storage, key: &str) -> Theme {
    match storage.get_item(key) {
        Ok(value) => Theme::from_stored(value.as_deref()),
        Err(error) => {
            log::debug!("theme storage unavailable: {error}");
            Theme::default()
        }
    }
}

pub fn save_theme(storage: &Storage, key: &str, theme: Theme) {
    if let Err(error) = storage.set_item(key, theme.as_str()) {
        log::debug!("failed to persist theme: {error}");
    }
}
