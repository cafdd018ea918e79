use serde::Serialize;

use crate::models::Task;
use crate::projection::{project, Filter, ViewState};

/// Edit interaction for a single task title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing { id: String, pending: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TaskItemView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Pending replacement title while the item is in edit mode.
    pub editing: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FilterButtonView {
    pub filter: Filter,
    pub label: &'static str,
    pub active: bool,
}

/// Everything the host needs to rebuild the list from scratch.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ListView {
    pub items: Vec<TaskItemView>,
    pub count: usize,
    pub count_label: String,
    pub empty_visible: bool,
    pub filter: Filter,
    pub search: String,
    pub filters: Vec<FilterButtonView>,
}

pub fn render(tasks: &[Task], view: &ViewState, edit: &EditMode) -> ListView {
    let visible = project(tasks, view.filter(), view.search());
    let items: Vec<TaskItemView> = visible
        .into_iter()
        .map(|task| TaskItemView {
            id: task.id.clone(),
            title: task.title.clone(),
            description: (!task.description.is_empty()).then(|| task.description.clone()),
            completed: task.completed,
            editing: match edit {
                EditMode::Editing { id, pending } if *id == task.id => Some(pending.clone()),
                _ => None,
            },
        })
        .collect();
    let count = items.len();
    ListView {
        count,
        count_label: count.to_string(),
        empty_visible: items.is_empty(),
        items,
        filter: view.filter(),
        search: view.search().to_string(),
        filters: Filter::ALL
            .iter()
            .map(|filter| FilterButtonView {
                filter: *filter,
                label: filter.label(),
                active: *filter == view.filter(),
            })
            .collect(),
    }
}
