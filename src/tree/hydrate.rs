//! Rebuilds a [`MessageStore`] from a session's flat message log.
//!
//! Records are coerced field by field; a malformed record never fails the
//! batch. Parent links come from one of two modes, chosen once per batch:
//! if any record carries a `parentId`/`parent_id` key (even `null`) every
//! record keeps its own parent, otherwise records chain in input order.

use std::collections::{HashMap, HashSet};

use serde_json::{Number, Value};
use session_backend::{ImageAttachment, RawMessageRecord};
use tracing::{debug, warn};

use crate::tree::message::{Message, Role};
use crate::tree::store::MessageStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationMode {
    /// Parents taken from each record's own parent field.
    Explicit,
    /// Record `i` is parented to record `i - 1`.
    Inferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HydratedTree {
    pub store: MessageStore,
    /// Id of the last record in input order.
    pub next_head_id: Option<String>,
    pub mode: HydrationMode,
}

pub fn build_tree(records: &[RawMessageRecord]) -> HydratedTree {
    let mode = if records.iter().any(RawMessageRecord::has_parent_field) {
        HydrationMode::Explicit
    } else {
        HydrationMode::Inferred
    };

    let normalized = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let id = coerce_id(record.id.as_ref(), index);
            let parent = record.parent_candidate().and_then(coerce_reference);
            (normalize_record(id, record), parent)
        })
        .collect::<Vec<_>>();

    let known_ids = normalized
        .iter()
        .map(|(message, _)| message.id.clone())
        .collect::<HashSet<_>>();

    let mut store = MessageStore::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut previous_id: Option<String> = None;

    for (position, (mut message, parent)) in normalized.into_iter().enumerate() {
        let parent = match mode {
            HydrationMode::Explicit => parent.filter(|parent| known_ids.contains(parent)),
            HydrationMode::Inferred => previous_id.clone(),
        };
        message.parent_id = parent.filter(|parent| parent != &message.id);

        first_seen.entry(message.id.clone()).or_insert(position);
        previous_id = Some(message.id.clone());
        if let Some(replaced) = store.insert(message) {
            debug!(id = %replaced.id, "duplicate message id in session log; later record wins");
        }
    }

    break_cycles(&mut store, &first_seen);

    HydratedTree {
        store,
        next_head_id: previous_id,
        mode,
    }
}

/// Turns the earliest-seen member of every parent cycle into a root.
fn break_cycles(store: &mut MessageStore, first_seen: &HashMap<String, usize>) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Visit {
        InProgress,
        Done,
    }

    let mut starts = first_seen.iter().collect::<Vec<_>>();
    starts.sort_unstable_by_key(|(_, position)| **position);
    let starts = starts
        .into_iter()
        .map(|(id, _)| id.clone())
        .collect::<Vec<_>>();

    let mut visits: HashMap<String, Visit> = HashMap::new();
    let mut roots_to_cut: Vec<String> = Vec::new();

    for start in starts {
        let mut walk: Vec<String> = Vec::new();
        let mut cursor = Some(start);

        while let Some(id) = cursor.take() {
            match visits.get(&id).copied() {
                Some(Visit::Done) => break,
                Some(Visit::InProgress) => {
                    let from = walk.iter().position(|member| member == &id).unwrap_or(0);
                    let cycle = &walk[from..];
                    if let Some(cut) = cycle
                        .iter()
                        .min_by_key(|member| first_seen.get(*member).copied().unwrap_or(usize::MAX))
                    {
                        warn!(
                            id = %cut,
                            cycle_len = cycle.len(),
                            "parent cycle in session log; treating earliest member as a root"
                        );
                        roots_to_cut.push(cut.clone());
                    }
                    break;
                }
                None => {
                    visits.insert(id.clone(), Visit::InProgress);
                    cursor = store.get(&id).and_then(|message| message.parent_id.clone());
                    walk.push(id);
                }
            }
        }

        for id in walk {
            visits.insert(id, Visit::Done);
        }
    }

    for id in roots_to_cut {
        if let Some(message) = store.get_mut(&id) {
            message.parent_id = None;
        }
    }
}

fn normalize_record(id: String, record: &RawMessageRecord) -> Message {
    let mut message = Message::new(
        record
            .role
            .as_ref()
            .and_then(Value::as_str)
            .map_or(Role::Model, Role::from_wire),
        record
            .content
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default(),
    )
    .with_id(id);

    message.stats = record.stats.as_ref().and_then(coerce_stats);
    message.thought = string_field(record.thought.as_ref());
    message.citations = record
        .citations
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    message.images = record
        .images
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_image).collect())
        .unwrap_or_default();
    message.session_id = string_field(record.session_id.as_ref());
    message.error = record.error.as_ref().is_some_and(is_truthy);
    message
}

fn coerce_id(value: Option<&Value>, index: usize) -> String {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(number)) => number_to_id(number),
        _ => format!("msg-{index}"),
    }
}

fn coerce_reference(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(number) => Some(number_to_id(number)),
        _ => None,
    }
}

/// Integral floats print without a fractional part so `7.0` and `7` name
/// the same message.
fn number_to_id(number: &Number) -> String {
    if let Some(value) = number.as_i64() {
        return value.to_string();
    }
    if let Some(value) = number.as_u64() {
        return value.to_string();
    }
    match number.as_f64() {
        Some(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        Some(value) => value.to_string(),
        None => number.to_string(),
    }
}

fn coerce_stats(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Some(value.clone()),
        Value::String(raw) if !raw.is_empty() => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|parsed| !parsed.is_null()),
        _ => None,
    }
}

fn coerce_image(value: &Value) -> Option<ImageAttachment> {
    let data_url = value.get("dataUrl")?.as_str()?;
    let mime_type = value.get("type")?.as_str()?;
    let name = value.get("name")?.as_str()?;
    Some(ImageAttachment::new(data_url, mime_type, name))
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
