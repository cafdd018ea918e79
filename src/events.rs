pub const EVENT_LIST_RENDERED: &str = "list_rendered";
pub const EVENT_THEME_CHANGED: &str = "theme_changed";
