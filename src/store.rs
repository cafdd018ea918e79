use chrono::Utc;

use crate::ids::IdGenerator;
use crate::models::Task;

/// The ordered task collection, newest first.
///
/// Mutations report failure through their return value and leave the collection
/// untouched when they fail. Persisting and re-rendering after a successful
/// mutation is the caller's job (see `commands`).
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    ids: IdGenerator,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self::with_ids(tasks, IdGenerator::new())
    }

    pub fn with_ids(tasks: Vec<Task>, ids: IdGenerator) -> Self {
        Self { tasks, ids }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Snapshot for callers outside the store; edits to it never reach the live list.
    pub fn list(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn add_task(&mut self, title: &str, description: &str) -> Option<Task> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let task = Task {
            id: self.ids.next_id(),
            title: title.to_string(),
            description: description.trim().to_string(),
            completed: false,
            created_at: Utc::now().timestamp_millis(),
        };
        self.tasks.insert(0, task.clone());
        Some(task)
    }

    pub fn remove_task(&mut self, id: &str) -> bool {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return false;
        };
        self.tasks.remove(index);
        true
    }

    pub fn toggle_complete(&mut self, id: &str, completed: bool) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.completed = completed;
                true
            }
            None => false,
        }
    }

    pub fn edit_title(&mut self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.title = title.to_string();
                true
            }
            None => false,
        }
    }
}
