use std::path::PathBuf;

use crate::models::{RenderedItem, Task};
use crate::persistence::{adopt_default_data, load_local, save_tasks, Bootstrap};
use crate::projection::Filter;
use crate::render::ListView;
use crate::state::AppState;
use crate::storage::{Storage, StorageError};
use crate::theme::{load_theme, save_theme, ThemeView};

#[cfg(all(feature = "app", not(test)))]
use crate::events::{EVENT_LIST_RENDERED, EVENT_THEME_CHANGED};
#[cfg(all(feature = "app", not(test)))]
use tauri::{AppHandle, Emitter, Manager, Runtime, State};

#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// What the page should do with the task form after a submit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FormFeedback {
    pub clear_fields: bool,
    pub focus_title: bool,
    pub task: Option<Task>,
}

/// Controls inside a list item, matched by the item's control attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListControl {
    Delete,
    Edit,
    Reopen,
}

impl ListControl {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "delete" => Some(Self::Delete),
            "edit" => Some(Self::Edit),
            "reopen" => Some(Self::Reopen),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum LoadStep {
    Ready(ListView),
    NeedsDefaultData(Option<String>),
}

trait CommandCtx {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError>;
    fn emit_list_rendered(&self, view: ListView);
    fn emit_theme_changed(&self, view: ThemeView);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

const LOADING: &str = "loading";

fn open_storage(ctx: &impl CommandCtx) -> Result<Storage, StorageError> {
    let storage = Storage::new(ctx.app_data_dir()?);
    storage.ensure_dirs()?;
    Ok(storage)
}

fn try_storage(ctx: &impl CommandCtx) -> Option<Storage> {
    match open_storage(ctx) {
        Ok(storage) => Some(storage),
        Err(error) => {
            log::warn!("storage unavailable: {error}");
            None
        }
    }
}

fn persist(ctx: &impl CommandCtx, state: &AppState) -> Result<(), StorageError> {
    let storage = open_storage(ctx)?;
    save_tasks(&storage, &state.settings().tasks_key, &state.tasks())
}

/// Rebuilds the whole list view and hands it to the page.
fn publish(ctx: &impl CommandCtx, state: &AppState) -> ListView {
    let view = state.render();
    ctx.emit_list_rendered(view.clone());
    view
}

/// After a successful mutation: persist (best effort), then re-render.
fn commit(ctx: &impl CommandCtx, state: &AppState) -> ListView {
    if let Err(error) = persist(ctx, state) {
        log::warn!("failed to persist tasks: {error}");
    }
    publish(ctx, state)
}

fn begin_load_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    rendered: &[RenderedItem],
) -> LoadStep {
    state.begin_loading();
    let settings = state.settings();
    let storage = try_storage(ctx);
    let bootstrap = state.with_store(|store| {
        load_local(
            storage.as_ref(),
            &settings.tasks_key,
            settings.default_tasks.as_deref(),
            rendered,
            store.ids(),
        )
    });
    match bootstrap {
        Bootstrap::Ready { tasks, source } => {
            log::info!("bootstrap finished source={source:?} tasks={}", tasks.len());
            state.finish_loading(tasks);
            LoadStep::Ready(publish(ctx, state))
        }
        Bootstrap::NeedsDefaultData => LoadStep::NeedsDefaultData(settings.default_data_source),
    }
}

fn finish_load_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    payload: Result<String, String>,
) -> ListView {
    let key = state.settings().tasks_key;
    let storage = try_storage(ctx);
    let (tasks, source) = state.with_store(|store| {
        adopt_default_data(storage.as_ref(), &key, payload, store.ids())
    });
    log::info!("bootstrap finished source={source:?} tasks={}", tasks.len());
    state.finish_loading(tasks);
    publish(ctx, state)
}

/// Runs the whole fallback chain with a synchronous fetcher for the default data.
#[cfg(test)]
fn load_state_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    rendered: &[RenderedItem],
    fetch: impl FnOnce(&str) -> Result<String, String>,
) -> CommandResult<ListView> {
    match begin_load_impl(ctx, state, rendered) {
        LoadStep::Ready(view) => ok(view),
        LoadStep::NeedsDefaultData(source) => {
            let payload = match source {
                Some(source) => fetch(&source),
                None => Err("no default data source configured".to_string()),
            };
            ok(finish_load_impl(ctx, state, payload))
        }
    }
}

fn submit_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    title: String,
    description: Option<String>,
) -> CommandResult<FormFeedback> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    match state.add_task(&title, description.as_deref().unwrap_or_default()) {
        Some(task) => {
            commit(ctx, state);
            ok(FormFeedback {
                clear_fields: true,
                focus_title: true,
                task: Some(task),
            })
        }
        None => CommandResult {
            ok: false,
            data: Some(FormFeedback {
                clear_fields: false,
                focus_title: true,
                task: None,
            }),
            error: Some("empty title".to_string()),
        },
    }
}

fn remove_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
) -> CommandResult<ListView> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    if !state.remove_task(&task_id) {
        return err("task not found");
    }
    ok(commit(ctx, state))
}

fn toggle_complete_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
    completed: bool,
) -> CommandResult<ListView> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    if !state.toggle_complete(&task_id, completed) {
        return err("task not found");
    }
    ok(commit(ctx, state))
}

fn list_click_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
    control: String,
) -> CommandResult<ListView> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    let Some(control) = ListControl::parse(&control) else {
        return err("unknown control");
    };
    match control {
        ListControl::Delete => remove_task_impl(ctx, state, task_id),
        ListControl::Reopen => toggle_complete_impl(ctx, state, task_id, false),
        ListControl::Edit => {
            if !state.begin_edit(&task_id) {
                return err("task not found");
            }
            ok(publish(ctx, state))
        }
    }
}

fn edit_input_impl(state: &AppState, value: String) -> CommandResult<bool> {
    if !state.update_pending(&value) {
        return err("not editing");
    }
    ok(true)
}

fn commit_edit_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<ListView> {
    match state.commit_edit() {
        None => err("not editing"),
        Some(true) => ok(commit(ctx, state)),
        // Blank replacement: the old title stays and nothing needs persisting.
        Some(false) => ok(publish(ctx, state)),
    }
}

fn cancel_edit_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<ListView> {
    if !state.cancel_edit() {
        return err("not editing");
    }
    ok(publish(ctx, state))
}

fn search_input_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    value: String,
) -> CommandResult<ListView> {
    state.set_search(&value);
    ok(publish(ctx, state))
}

fn filter_click_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    filter: String,
) -> CommandResult<ListView> {
    state.set_filter(Filter::parse(&filter));
    ok(publish(ctx, state))
}

fn load_theme_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<ThemeView> {
    if let Some(storage) = try_storage(ctx) {
        state.set_theme(load_theme(&storage, &state.settings().theme_key));
    }
    let view = state.theme().view();
    ctx.emit_theme_changed(view.clone());
    ok(view)
}

fn toggle_theme_impl(ctx: &impl CommandCtx, state: &AppState) -> CommandResult<ThemeView> {
    let next = state.theme().toggled();
    state.set_theme(next);
    match open_storage(ctx) {
        Ok(storage) => save_theme(&storage, &state.settings().theme_key, next),
        Err(error) => log::debug!("theme not persisted: {error}"),
    }
    let view = next.view();
    ctx.emit_theme_changed(view.clone());
    ok(view)
}

fn debug_add_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    title: String,
    description: Option<String>,
) -> CommandResult<Task> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    let Some(task) = state.add_task(&title, description.as_deref().unwrap_or_default()) else {
        return err("empty title");
    };
    commit(ctx, state);
    ok(task)
}

fn debug_remove_task_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    task_id: String,
) -> CommandResult<bool> {
    if !state.is_loaded() {
        return err(LOADING);
    }
    if !state.remove_task(&task_id) {
        return err("task not found");
    }
    commit(ctx, state);
    ok(true)
}

fn debug_list_impl(state: &AppState) -> CommandResult<Vec<Task>> {
    ok(state.tasks())
}

#[cfg(all(feature = "app", not(test)))]
struct TauriCommandCtx<'a, R: Runtime> {
    app: &'a AppHandle<R>,
}

#[cfg(all(feature = "app", not(test)))]
impl<R: Runtime> CommandCtx for TauriCommandCtx<'_, R> {
    fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
        self.app
            .path()
            .app_data_dir()
            .map_err(|err| StorageError::Io(std::io::Error::other(err.to_string())))
    }

    fn emit_list_rendered(&self, view: ListView) {
        let _ = self.app.emit(EVENT_LIST_RENDERED, view);
    }

    fn emit_theme_changed(&self, view: ThemeView) {
        let _ = self.app.emit(EVENT_THEME_CHANGED, view);
    }
}

/// Fetches the bundled default data: over HTTP for URLs, otherwise from the
/// app's resource directory.
#[cfg(all(feature = "app", not(test)))]
async fn fetch_default_data<R: Runtime>(
    app: &AppHandle<R>,
    source: &str,
) -> Result<String, String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let resp = reqwest::get(source)
            .await
            .map_err(|err| format!("default data request failed: {err}"))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| format!("failed to read default data: {err}"))?;
        if !status.is_success() {
            return Err(format!("default data http {status}"));
        }
        return Ok(text);
    }

    let path = app
        .path()
        .resolve(source, tauri::path::BaseDirectory::Resource)
        .map_err(|err| format!("failed to resolve {source}: {err}"))?;
    std::fs::read_to_string(&path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub async fn load_state(app: AppHandle, rendered: Vec<RenderedItem>) -> CommandResult<ListView> {
    let state = app.state::<AppState>().inner().clone();
    let ctx = TauriCommandCtx { app: &app };
    let source = match begin_load_impl(&ctx, &state, &rendered) {
        LoadStep::Ready(view) => return ok(view),
        LoadStep::NeedsDefaultData(source) => source,
    };
    let payload = match source {
        Some(source) => fetch_default_data(&app, &source).await,
        None => Err("no default data source configured".to_string()),
    };
    ok(finish_load_impl(&ctx, &state, payload))
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn submit_task(
    app: AppHandle,
    state: State<AppState>,
    title: String,
    description: Option<String>,
) -> CommandResult<FormFeedback> {
    let ctx = TauriCommandCtx { app: &app };
    submit_task_impl(&ctx, state.inner(), title, description)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn list_click(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
    control: String,
) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    list_click_impl(&ctx, state.inner(), task_id, control)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn checkbox_change(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
    checked: bool,
) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    toggle_complete_impl(&ctx, state.inner(), task_id, checked)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn edit_input(state: State<AppState>, value: String) -> CommandResult<bool> {
    edit_input_impl(state.inner(), value)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn commit_edit(app: AppHandle, state: State<AppState>) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    commit_edit_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn cancel_edit(app: AppHandle, state: State<AppState>) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    cancel_edit_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn search_input(
    app: AppHandle,
    state: State<AppState>,
    value: String,
) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    search_input_impl(&ctx, state.inner(), value)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn filter_click(
    app: AppHandle,
    state: State<AppState>,
    filter: String,
) -> CommandResult<ListView> {
    let ctx = TauriCommandCtx { app: &app };
    filter_click_impl(&ctx, state.inner(), filter)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn load_theme_state(app: AppHandle, state: State<AppState>) -> CommandResult<ThemeView> {
    let ctx = TauriCommandCtx { app: &app };
    load_theme_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn toggle_theme(app: AppHandle, state: State<AppState>) -> CommandResult<ThemeView> {
    let ctx = TauriCommandCtx { app: &app };
    toggle_theme_impl(&ctx, state.inner())
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn debug_add_task(
    app: AppHandle,
    state: State<AppState>,
    title: String,
    description: Option<String>,
) -> CommandResult<Task> {
    let ctx = TauriCommandCtx { app: &app };
    debug_add_task_impl(&ctx, state.inner(), title, description)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn debug_remove_task(
    app: AppHandle,
    state: State<AppState>,
    task_id: String,
) -> CommandResult<bool> {
    let ctx = TauriCommandCtx { app: &app };
    debug_remove_task_impl(&ctx, state.inner(), task_id)
}

#[cfg(all(feature = "app", not(test)))]
#[tauri::command]
pub fn debug_list(state: State<AppState>) -> CommandResult<Vec<Task>> {
    debug_list_impl(state.inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;
    use crate::persistence::load_stored;
    use crate::render::EditMode;
    use crate::store::TaskStore;
    use crate::theme::Theme;
    use serde_json::json;
    use std::fs;
    use std::sync::Mutex;

    struct TestCtx {
        root: tempfile::TempDir,
        app_data_dir_error: Option<String>,
        rendered: Mutex<Vec<ListView>>,
        themes: Mutex<Vec<ThemeView>>,
    }

    impl TestCtx {
        fn new() -> Self {
            Self {
                root: tempfile::tempdir().unwrap(),
                app_data_dir_error: None,
                rendered: Mutex::new(Vec::new()),
                themes: Mutex::new(Vec::new()),
            }
        }

        fn with_app_data_dir_error(message: &str) -> Self {
            let mut ctx = Self::new();
            ctx.app_data_dir_error = Some(message.to_string());
            ctx
        }

        fn root_path(&self) -> &std::path::Path {
            self.root.path()
        }

        fn slot_path(&self, key: &str) -> PathBuf {
            self.root_path().join("local_storage").join(key)
        }

        fn storage(&self) -> Storage {
            let storage = Storage::new(self.root_path().to_path_buf());
            storage.ensure_dirs().unwrap();
            storage
        }

        fn stored_tasks(&self) -> Option<Vec<Task>> {
            let ids = crate::ids::IdGenerator::with_seed(0);
            load_stored(&self.storage(), "tasks", &ids).unwrap()
        }

        fn render_count(&self) -> usize {
            self.rendered.lock().unwrap().len()
        }

        fn last_view(&self) -> ListView {
            self.rendered.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl CommandCtx for TestCtx {
        fn app_data_dir(&self) -> Result<PathBuf, StorageError> {
            if let Some(message) = &self.app_data_dir_error {
                return Err(StorageError::Io(std::io::Error::other(message.clone())));
            }
            Ok(self.root.path().to_path_buf())
        }

        fn emit_list_rendered(&self, view: ListView) {
            self.rendered.lock().unwrap().push(view);
        }

        fn emit_theme_changed(&self, view: ThemeView) {
            self.themes.lock().unwrap().push(view);
        }
    }

    fn make_task(id: &str, title: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            completed,
            created_at: 1,
        }
    }

    fn make_state(tasks: Vec<Task>) -> AppState {
        let state = make_loading_state();
        state.finish_loading(tasks);
        state
    }

    fn make_loading_state() -> AppState {
        AppState::new(TaskStore::default(), Settings::default(), Theme::Dark)
    }

    fn no_fetch(_source: &str) -> Result<String, String> {
        panic!("default data should not be fetched")
    }

    #[test]
    fn ok_and_err_helpers_construct_expected_shape() {
        let r = ok(123);
        assert!(r.ok);
        assert_eq!(r.data, Some(123));
        assert_eq!(r.error, None);

        let r: CommandResult<i32> = err("nope");
        assert!(!r.ok);
        assert_eq!(r.data, None);
        assert_eq!(r.error, Some("nope".to_string()));
    }

    #[test]
    fn submit_adds_persists_renders_and_clears_the_form() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("old", "Old", false)]);

        let res = submit_task_impl(&ctx, &state, "Buy milk".into(), Some("2%".into()));
        assert!(res.ok);
        let feedback = res.data.unwrap();
        assert!(feedback.clear_fields);
        assert!(feedback.focus_title);
        let task = feedback.task.unwrap();

        let tasks = state.tasks();
        assert_eq!(tasks[0], task);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].description, "2%");
        assert!(!tasks[0].completed);
        assert_ne!(tasks[0].id, "old");

        assert_eq!(ctx.stored_tasks().unwrap(), tasks);
        assert_eq!(ctx.render_count(), 1);
        assert_eq!(ctx.last_view().count_label, "2");
    }

    #[test]
    fn blank_submit_keeps_the_form_and_changes_nothing() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());

        for title in ["", "   ", "\t\n"] {
            let res = submit_task_impl(&ctx, &state, title.into(), Some("desc".into()));
            assert!(!res.ok);
            assert_eq!(res.error.as_deref(), Some("empty title"));
            let feedback = res.data.unwrap();
            assert!(!feedback.clear_fields);
            assert!(feedback.focus_title);
        }

        assert!(state.tasks().is_empty());
        assert!(ctx.stored_tasks().is_none());
        assert_eq!(ctx.render_count(), 0);
    }

    #[test]
    fn submit_without_description_field_is_supported() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());
        let res = submit_task_impl(&ctx, &state, "Walk".into(), None);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].description, "");
    }

    #[test]
    fn storage_failures_do_not_block_mutations() {
        let state = make_state(Vec::new());

        let bad_ctx = TestCtx::with_app_data_dir_error("nope");
        let res = submit_task_impl(&bad_ctx, &state, "Offline".into(), None);
        assert!(res.ok);
        assert_eq!(state.tasks().len(), 1);
        assert_eq!(bad_ctx.render_count(), 1);

        // Slot path occupied by a directory: the write fails, the mutation stands.
        let ctx = TestCtx::new();
        fs::create_dir_all(ctx.slot_path("tasks")).unwrap();
        let res = submit_task_impl(&ctx, &state, "Still works".into(), None);
        assert!(res.ok);
        assert_eq!(state.tasks().len(), 2);
        assert_eq!(ctx.last_view().count, 2);
    }

    #[test]
    fn removing_the_only_task_shows_the_empty_state() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);

        let res = list_click_impl(&ctx, &state, "a".into(), "delete".into());
        assert!(res.ok);
        let view = res.data.unwrap();
        assert!(view.empty_visible);
        assert_eq!(view.count_label, "0");
        assert_eq!(ctx.last_view(), view);
        assert_eq!(ctx.stored_tasks().unwrap(), Vec::<Task>::new());
    }

    #[test]
    fn missing_targets_are_ignored() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);
        let before = state.tasks();

        assert!(!list_click_impl(&ctx, &state, "missing".into(), "delete".into()).ok);
        assert!(!list_click_impl(&ctx, &state, "missing".into(), "edit".into()).ok);
        assert!(!list_click_impl(&ctx, &state, "missing".into(), "reopen".into()).ok);
        assert!(!toggle_complete_impl(&ctx, &state, "missing".into(), true).ok);
        assert!(!list_click_impl(&ctx, &state, "a".into(), "archive".into()).ok);

        assert_eq!(state.tasks(), before);
        assert_eq!(ctx.render_count(), 0);
        assert!(ctx.stored_tasks().is_none());
    }

    #[test]
    fn checkbox_and_reopen_set_completion() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);

        assert!(toggle_complete_impl(&ctx, &state, "a".into(), true).ok);
        assert!(state.tasks()[0].completed);
        assert!(ctx.stored_tasks().unwrap()[0].completed);

        assert!(list_click_impl(&ctx, &state, "a".into(), "reopen".into()).ok);
        assert!(!state.tasks()[0].completed);
        assert!(!ctx.stored_tasks().unwrap()[0].completed);
        assert_eq!(ctx.render_count(), 2);
    }

    #[test]
    fn edit_flow_enters_updates_and_commits() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);

        assert!(!edit_input_impl(&state, "x".into()).ok);
        assert!(!commit_edit_impl(&ctx, &state).ok);
        assert!(!cancel_edit_impl(&ctx, &state).ok);

        let res = list_click_impl(&ctx, &state, "a".into(), "edit".into());
        assert!(res.ok);
        assert_eq!(res.data.unwrap().items[0].editing.as_deref(), Some("Alpha"));
        // Entering edit mode does not touch storage.
        assert!(ctx.stored_tasks().is_none());

        assert!(edit_input_impl(&state, " Alpha prime ".into()).ok);
        let res = commit_edit_impl(&ctx, &state);
        assert!(res.ok);
        let view = res.data.unwrap();
        assert_eq!(view.items[0].title, "Alpha prime");
        assert_eq!(view.items[0].editing, None);
        assert_eq!(state.edit_mode(), EditMode::Viewing);
        assert_eq!(ctx.stored_tasks().unwrap()[0].title, "Alpha prime");
    }

    #[test]
    fn blank_or_cancelled_edits_keep_the_old_title() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);

        list_click_impl(&ctx, &state, "a".into(), "edit".into());
        edit_input_impl(&state, "   ".into());
        let res = commit_edit_impl(&ctx, &state);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].title, "Alpha");
        assert!(ctx.stored_tasks().is_none());

        list_click_impl(&ctx, &state, "a".into(), "edit".into());
        edit_input_impl(&state, "Changed".into());
        let res = cancel_edit_impl(&ctx, &state);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].title, "Alpha");
        assert_eq!(state.edit_mode(), EditMode::Viewing);
    }

    #[test]
    fn search_and_filter_update_the_projection() {
        let ctx = TestCtx::new();
        let state = make_state(vec![
            make_task("a", "Alpha", true),
            make_task("b", "Beta", false),
        ]);

        let view = filter_click_impl(&ctx, &state, "completed".into()).data.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].title, "Alpha");
        assert!(view.filters.iter().any(|b| b.filter == Filter::Completed && b.active));

        let view = filter_click_impl(&ctx, &state, "incomplete".into()).data.unwrap();
        assert_eq!(view.items[0].title, "Beta");

        let view = filter_click_impl(&ctx, &state, "bogus".into()).data.unwrap();
        assert_eq!(view.filter, Filter::All);
        let view = search_input_impl(&ctx, &state, "  AL ".into()).data.unwrap();
        assert_eq!(view.search, "al");
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].title, "Alpha");
        assert_eq!(view.count_label, "1");

        // View changes never rewrite storage.
        assert!(ctx.stored_tasks().is_none());
        assert_eq!(ctx.render_count(), 4);
    }

    #[test]
    fn load_prefers_stored_tasks() {
        let ctx = TestCtx::new();
        let stored = vec![make_task("s1", "Stored", true)];
        save_tasks(&ctx.storage(), "tasks", &stored).unwrap();

        let state = make_state(Vec::new());
        let rendered = vec![RenderedItem {
            title: Some("markup".into()),
            ..RenderedItem::default()
        }];
        let res = load_state_impl(&ctx, &state, &rendered, no_fetch);
        assert!(res.ok);
        assert_eq!(state.tasks(), stored);
        assert_eq!(res.data.unwrap().count_label, "1");
        assert_eq!(ctx.render_count(), 1);
    }

    #[test]
    fn load_uses_host_defaults_from_settings() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());
        let mut settings = Settings::default();
        settings.default_tasks = Some(vec![json!({"title": "From settings", "completed": true})]);
        state.update_settings(settings);

        let res = load_state_impl(&ctx, &state, &[], no_fetch);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].title, "From settings");
        assert!(state.tasks()[0].completed);
        assert!(ctx.stored_tasks().is_none());
    }

    #[test]
    fn load_rebuilds_from_markup_and_persists() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());
        let rendered = vec![RenderedItem {
            id: Some("m1".into()),
            title: Some("From markup".into()),
            checked: true,
            ..RenderedItem::default()
        }];

        let res = load_state_impl(&ctx, &state, &rendered, no_fetch);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].id, "m1");
        assert_eq!(ctx.stored_tasks().unwrap(), state.tasks());
    }

    #[test]
    fn load_fetches_default_data_last() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());
        let mut requested = None;

        let res = load_state_impl(&ctx, &state, &[], |source| {
            requested = Some(source.to_string());
            Ok(r#"[{"id":"d1","task":"Seeded","description":"","isComplete":false}]"#.into())
        });
        assert!(res.ok);
        assert_eq!(requested.as_deref(), Some("default-tasks.json"));
        assert_eq!(state.tasks()[0].title, "Seeded");
        assert_eq!(ctx.stored_tasks().unwrap(), state.tasks());
    }

    #[test]
    fn input_during_the_default_data_fetch_is_refused() {
        let ctx = TestCtx::new();
        let state = make_loading_state();

        let source = match begin_load_impl(&ctx, &state, &[]) {
            LoadStep::NeedsDefaultData(source) => source,
            LoadStep::Ready(_) => panic!("expected the default data step"),
        };
        assert_eq!(source.as_deref(), Some("default-tasks.json"));
        assert_eq!(ctx.render_count(), 0);

        // The fetch is still pending here.
        let res = submit_task_impl(&ctx, &state, "Mine".into(), None);
        assert!(!res.ok);
        assert_eq!(res.error.as_deref(), Some("loading"));
        assert!(!debug_add_task_impl(&ctx, &state, "Mine".into(), None).ok);
        let res = list_click_impl(&ctx, &state, "d1".into(), "delete".into());
        assert_eq!(res.error.as_deref(), Some("loading"));
        assert!(!toggle_complete_impl(&ctx, &state, "d1".into(), true).ok);
        assert!(state.tasks().is_empty());
        assert!(ctx.stored_tasks().is_none());

        let payload = Ok(r#"[{"id":"d1","task":"Seeded"}]"#.to_string());
        let view = finish_load_impl(&ctx, &state, payload);
        assert_eq!(view.items[0].title, "Seeded");

        let res = submit_task_impl(&ctx, &state, "Mine".into(), None);
        assert!(res.ok);
        let titles: Vec<String> = state.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["Mine", "Seeded"]);
        let stored: Vec<String> = ctx
            .stored_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(stored, ["Mine", "Seeded"]);
    }

    #[test]
    fn a_second_load_reopens_the_gate_only_when_done() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("a", "Alpha", false)]);
        assert!(state.is_loaded());

        let res = load_state_impl(&ctx, &state, &[], |_| Err("offline".into()));
        assert!(res.ok);
        assert!(state.is_loaded());
        assert!(submit_task_impl(&ctx, &state, "After".into(), None).ok);
    }

    #[test]
    fn load_falls_back_to_empty_when_default_data_fails() {
        let ctx = TestCtx::new();
        let state = make_state(vec![make_task("stale", "Stale", false)]);

        let res = load_state_impl(&ctx, &state, &[], |_| Err("network restricted".into()));
        assert!(res.ok);
        let view = res.data.unwrap();
        assert!(view.empty_visible);
        assert_eq!(view.count_label, "0");
        assert!(state.tasks().is_empty());

        let state = make_state(Vec::new());
        let mut settings = Settings::default();
        settings.default_data_source = None;
        state.update_settings(settings);
        let res = load_state_impl(&ctx, &state, &[], no_fetch);
        assert!(res.ok);
        assert!(state.tasks().is_empty());
    }

    #[test]
    fn load_survives_missing_app_data_dir() {
        let ctx = TestCtx::with_app_data_dir_error("nope");
        let state = make_state(Vec::new());
        let rendered = vec![RenderedItem {
            title: Some("Kept in memory".into()),
            ..RenderedItem::default()
        }];
        let res = load_state_impl(&ctx, &state, &rendered, no_fetch);
        assert!(res.ok);
        assert_eq!(state.tasks()[0].title, "Kept in memory");
    }

    #[test]
    fn theme_toggle_persists_across_reload() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());

        let res = load_theme_impl(&ctx, &state);
        assert_eq!(res.data.unwrap().theme, Theme::Dark);

        let res = toggle_theme_impl(&ctx, &state);
        let view = res.data.unwrap();
        assert_eq!(view.theme, Theme::Light);
        assert_eq!(view.body_class, "theme-light");
        assert_eq!(view.toggle_label, "Dark mode");

        let reloaded = make_state(Vec::new());
        let res = load_theme_impl(&ctx, &reloaded);
        assert_eq!(res.data.unwrap().theme, Theme::Light);
        assert_eq!(ctx.themes.lock().unwrap().len(), 3);
    }

    #[test]
    fn theme_toggle_still_flips_without_storage() {
        let ctx = TestCtx::with_app_data_dir_error("nope");
        let state = make_state(Vec::new());
        let res = toggle_theme_impl(&ctx, &state);
        assert!(res.ok);
        assert_eq!(state.theme(), Theme::Light);

        let ctx = TestCtx::new();
        fs::create_dir_all(ctx.slot_path("theme")).unwrap();
        let res = toggle_theme_impl(&ctx, &state);
        assert!(res.ok);
        assert_eq!(state.theme(), Theme::Dark);
    }

    #[test]
    fn debug_accessor_adds_removes_and_lists() {
        let ctx = TestCtx::new();
        let state = make_state(Vec::new());

        assert!(!debug_add_task_impl(&ctx, &state, " ".into(), None).ok);
        let task = debug_add_task_impl(&ctx, &state, "Via console".into(), None)
            .data
            .unwrap();
        assert_eq!(ctx.render_count(), 1);

        let mut listed = debug_list_impl(&state).data.unwrap();
        assert_eq!(listed, vec![task.clone()]);
        listed.clear();
        assert_eq!(state.tasks().len(), 1);

        assert!(!debug_remove_task_impl(&ctx, &state, "missing".into()).ok);
        assert!(debug_remove_task_impl(&ctx, &state, task.id).ok);
        assert!(state.tasks().is_empty());
        assert_eq!(ctx.stored_tasks().unwrap(), Vec::<Task>::new());
        assert!(ctx.last_view().empty_visible);
    }
}
