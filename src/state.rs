use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{Settings, Task};
use crate::projection::{Filter, ViewState};
use crate::render::{render, EditMode, ListView};
use crate::store::TaskStore;
use crate::theme::Theme;

/// Shared handle to everything the list view is built from.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    pub fn new(store: TaskStore, settings: Settings, theme: Theme) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                store,
                view: ViewState::default(),
                edit: EditMode::Viewing,
                theme,
                settings,
                loaded: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The lock, but only once the startup load has finished.
    fn lock_loaded(&self) -> Option<MutexGuard<'_, AppData>> {
        let guard = self.lock();
        if guard.loaded {
            Some(guard)
        } else {
            None
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().store.list()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        self.lock().settings = settings;
    }

    pub fn theme(&self) -> Theme {
        self.lock().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.lock().theme = theme;
    }

    pub fn render(&self) -> ListView {
        let guard = self.lock();
        render(guard.store.tasks(), &guard.view, &guard.edit)
    }

    /// Runs `f` against the task store under the state lock.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut TaskStore) -> T) -> T {
        f(&mut self.lock().store)
    }

    /// Task mutations are refused until `finish_loading`.
    pub fn begin_loading(&self) {
        let mut guard = self.lock();
        guard.loaded = false;
        guard.edit = EditMode::Viewing;
    }

    pub fn finish_loading(&self, tasks: Vec<Task>) {
        let mut guard = self.lock();
        guard.store.replace_all(tasks);
        guard.edit = EditMode::Viewing;
        guard.loaded = true;
    }

    pub fn add_task(&self, title: &str, description: &str) -> Option<Task> {
        self.lock_loaded()?.store.add_task(title, description)
    }

    pub fn remove_task(&self, id: &str) -> bool {
        let Some(mut guard) = self.lock_loaded() else {
            return false;
        };
        if !guard.store.remove_task(id) {
            return false;
        }
        if matches!(&guard.edit, EditMode::Editing { id: editing, .. } if editing == id) {
            guard.edit = EditMode::Viewing;
        }
        true
    }

    pub fn toggle_complete(&self, id: &str, completed: bool) -> bool {
        self.lock_loaded()
            .is_some_and(|mut guard| guard.store.toggle_complete(id, completed))
    }

    pub fn set_filter(&self, filter: Filter) {
        self.lock().view.set_filter(filter);
    }

    pub fn set_search(&self, raw: &str) {
        self.lock().view.set_search(raw);
    }

    pub fn edit_mode(&self) -> EditMode {
        self.lock().edit.clone()
    }

    /// viewing → editing, seeded with the task's current title.
    pub fn begin_edit(&self, id: &str) -> bool {
        let Some(mut guard) = self.lock_loaded() else {
            return false;
        };
        let Some(title) = guard.store.get(id).map(|task| task.title.clone()) else {
            return false;
        };
        guard.edit = EditMode::Editing {
            id: id.to_string(),
            pending: title,
        };
        true
    }

    pub fn update_pending(&self, value: &str) -> bool {
        match &mut self.lock().edit {
            EditMode::Editing { pending, .. } => {
                *pending = value.to_string();
                true
            }
            EditMode::Viewing => false,
        }
    }

    /// editing → viewing, applying the pending title. Returns whether the title
    /// changed; a blank pending value keeps the old one.
    pub fn commit_edit(&self) -> Option<bool> {
        let mut guard = self.lock();
        let EditMode::Editing { id, pending } = std::mem::take(&mut guard.edit) else {
            return None;
        };
        Some(guard.store.edit_title(&id, &pending))
    }

    pub fn cancel_edit(&self) -> bool {
        let mut guard = self.lock();
        let was_editing = matches!(guard.edit, EditMode::Editing { .. });
        guard.edit = EditMode::Viewing;
        was_editing
    }
}

#[derive(Debug)]
struct AppData {
    store: TaskStore,
    view: ViewState,
    edit: EditMode,
    theme: Theme,
    settings: Settings,
    loaded: bool,
}
