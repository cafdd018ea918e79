//! Task persistence on top of [`Storage`] and the startup fallback chain.
//!
//! The chain is split so that the core never performs I/O it cannot do
//! synchronously: [`load_local`] walks the stored slot, the host-provided
//! defaults and the pre-rendered markup. When all three are absent it asks the
//! caller to fetch the bundled default data and hand the result to
//! [`adopt_default_data`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::ids::IdGenerator;
use crate::models::{ExternalTask, RenderedItem, Task, Timestamp};
use crate::storage::{Storage, StorageError};

/// CSS marker the host markup puts on completed items.
pub const COMPLETED_CLASS: &str = "completed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Stored,
    HostDefaults,
    RenderedMarkup,
    DefaultData,
    Empty,
}

#[derive(Debug)]
pub enum Bootstrap {
    Ready { tasks: Vec<Task>, source: LoadSource },
    NeedsDefaultData,
}

pub fn save_tasks(storage: &Storage, key: &str, tasks: &[Task]) -> Result<(), StorageError> {
    storage.save_json(key, &tasks)
}

/// Reads the stored slot. `Ok(None)` means nothing usable is stored and the
/// chain should continue.
pub fn load_stored(
    storage: &Storage,
    key: &str,
    ids: &IdGenerator,
) -> Result<Option<Vec<Task>>, StorageError> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(&raw)? {
        Value::Array(records) => Ok(Some(normalize_all(&records, ids))),
        other => {
            log::warn!(
                "stored task slot {key:?} is not a sequence (found {}), ignoring it",
                json_kind(&other)
            );
            Ok(None)
        }
    }
}

/// Steps one to three of the fallback chain. Without storage the stored slot is
/// skipped and nothing is persisted.
pub fn load_local(
    storage: Option<&Storage>,
    key: &str,
    host_defaults: Option<&[Value]>,
    rendered: &[RenderedItem],
    ids: &IdGenerator,
) -> Bootstrap {
    if let Some(storage) = storage {
        match load_stored(storage, key, ids) {
            Ok(Some(tasks)) => {
                log::info!("loaded {} tasks from storage", tasks.len());
                return Bootstrap::Ready {
                    tasks,
                    source: LoadSource::Stored,
                };
            }
            Ok(None) => {}
            Err(error) => log::warn!("failed to read stored tasks: {error}"),
        }
    }

    if let Some(records) = host_defaults {
        let tasks = normalize_all(records, ids);
        log::info!("loaded {} tasks from host defaults", tasks.len());
        return Bootstrap::Ready {
            tasks,
            source: LoadSource::HostDefaults,
        };
    }

    if !rendered.is_empty() {
        let tasks = reconstruct_rendered(rendered, ids);
        save_quietly(storage, key, &tasks);
        log::info!("rebuilt {} tasks from rendered markup", tasks.len());
        return Bootstrap::Ready {
            tasks,
            source: LoadSource::RenderedMarkup,
        };
    }

    Bootstrap::NeedsDefaultData
}

/// Step four: maps a fetched default-data payload, or falls back to an empty list.
pub fn adopt_default_data(
    storage: Option<&Storage>,
    key: &str,
    payload: Result<String, String>,
    ids: &IdGenerator,
) -> (Vec<Task>, LoadSource) {
    let body = match payload {
        Ok(body) => body,
        Err(error) => {
            log::info!("default data unavailable: {error}");
            return (Vec::new(), LoadSource::Empty);
        }
    };
    let external: Vec<ExternalTask> = match serde_json::from_str(&body) {
        Ok(records) => records,
        Err(error) => {
            log::warn!("default data is malformed: {error}");
            return (Vec::new(), LoadSource::Empty);
        }
    };
    let records: Vec<Value> = external.into_iter().map(ExternalTask::into_record).collect();
    let tasks = normalize_all(&records, ids);
    save_quietly(storage, key, &tasks);
    log::info!("loaded {} tasks from default data", tasks.len());
    (tasks, LoadSource::DefaultData)
}

fn save_quietly(storage: Option<&Storage>, key: &str, tasks: &[Task]) {
    let Some(storage) = storage else {
        return;
    };
    if let Err(error) = save_tasks(storage, key, tasks) {
        log::warn!("failed to persist bootstrapped tasks: {error}");
    }
}

/// Builds a valid task out of a loosely shaped record. The title may still be
/// empty; callers drop such records.
pub fn normalize_task(record: &Value, ids: &IdGenerator) -> Task {
    let id = match record.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => ids.next_id(),
    };
    Task {
        id,
        title: coerce_text(record.get("title")),
        description: coerce_text(record.get("description")),
        completed: record.get("completed").map(truthy).unwrap_or(false),
        created_at: record
            .get("createdAt")
            .and_then(coerce_timestamp)
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
    }
}

/// Normalizes a batch and enforces the collection invariants: no empty titles,
/// no duplicate ids.
fn normalize_all(records: &[Value], ids: &IdGenerator) -> Vec<Task> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let mut task = normalize_task(record, ids);
        if task.title.is_empty() {
            log::warn!("dropping task record without a title (id={})", task.id);
            continue;
        }
        while !seen.insert(task.id.clone()) {
            task.id = ids.next_id();
        }
        out.push(task);
    }
    out
}

fn reconstruct_rendered(items: &[RenderedItem], ids: &IdGenerator) -> Vec<Task> {
    let now = Utc::now().timestamp_millis();
    let records: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let title = item
                .title
                .as_deref()
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Task {}", index + 1));
            let completed =
                item.checked || item.classes.iter().any(|class| class == COMPLETED_CLASS);
            serde_json::json!({
                "id": item.id,
                "title": title,
                "description": item.description,
                "completed": completed,
                "createdAt": now,
            })
        })
        .collect();
    normalize_all(&records, ids)
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn coerce_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|n| n as i64)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.timestamp_millis())
            })
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
