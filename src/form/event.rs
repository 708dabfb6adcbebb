use crate::form::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A user interaction with the rendered form, emitted by the view and applied
/// by the runtime after the frame is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    FieldEdited { path: Path, value: String },
    VariantSelected { path: Path, tag: String },
    ListInsert { path: Path, index: usize },
    ListDelete { path: Path, index: usize },
}

impl FormEvent {
    /// Everything except a field edit reshapes the active tree.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::FieldEdited { .. })
    }

    pub fn to_log_line(&self) -> String {
        match self {
            Self::FieldEdited { path, value } => {
                format!("field_edited path={path} value={value}")
            }
            Self::VariantSelected { path, tag } => {
                format!("variant_selected path={path} tag={tag}")
            }
            Self::ListInsert { path, index } => format!("list_insert path={path} index={index}"),
            Self::ListDelete { path, index } => format!("list_delete path={path} index={index}"),
        }
    }
}

pub const EVENT_LOG_LIMIT: usize = 256;

/// Bounded record of applied events, each tagged with a sequence number that
/// keeps growing across `clear`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FormEventLog {
    entries: VecDeque<(u64, FormEvent)>,
    next_seq: u64,
}

impl FormEventLog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormEvent> {
        self.entries.iter().map(|(_, event)| event)
    }

    /// Successive edits of one field collapse into the latest.
    pub fn push(&mut self, event: FormEvent) {
        let repeats_last_edit = matches!(
            (self.entries.back(), &event),
            (
                Some((_, FormEvent::FieldEdited { path: last, .. })),
                FormEvent::FieldEdited { path, .. },
            ) if last == path
        );
        if repeats_last_edit {
            self.entries.pop_back();
        }
        self.entries.push_back((self.next_seq, event));
        self.next_seq += 1;
        while self.entries.len() > EVENT_LOG_LIMIT {
            self.entries.pop_front();
        }
    }

    /// Structural events recorded at or after `seq`.
    pub fn structural_since(&self, seq: u64) -> impl Iterator<Item = (u64, &FormEvent)> {
        self.entries
            .iter()
            .filter(move |(entry_seq, event)| *entry_seq >= seq && event.is_structural())
            .map(|(entry_seq, event)| (*entry_seq, event))
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_wire_paths() {
        let event = FormEvent::ListInsert {
            path: Path::root().field("items"),
            index: 2,
        };
        assert_eq!(
            serde_json::to_value(&event).expect("event should serialize"),
            json!({"event": "list_insert", "path": ".items", "index": 2})
        );
        assert_eq!(event.to_log_line(), "list_insert path=.items index=2");
    }

    fn edit(path: &str, value: &str) -> FormEvent {
        FormEvent::FieldEdited {
            path: path.parse().expect("test path should parse"),
            value: value.to_string(),
        }
    }

    #[test]
    fn keystrokes_on_one_field_collapse() {
        let mut log = FormEventLog::default();
        log.push(edit(".x", "1"));
        log.push(edit(".x", "12"));
        log.push(edit(".y", "3"));
        log.push(edit(".x", "4"));
        let lines: Vec<_> = log.iter().map(FormEvent::to_log_line).collect();
        assert_eq!(
            lines,
            vec![
                "field_edited path=.x value=12",
                "field_edited path=.y value=3",
                "field_edited path=.x value=4",
            ]
        );
        assert_eq!(log.next_seq(), 4);
    }

    #[test]
    fn log_is_bounded_and_sequence_survives_clear() {
        let mut log = FormEventLog::default();
        for index in 0..EVENT_LOG_LIMIT + 10 {
            log.push(FormEvent::ListInsert {
                path: Path::root().field("items"),
                index,
            });
        }
        assert_eq!(log.len(), EVENT_LOG_LIMIT);
        let first = log.structural_since(0).next().map(|(seq, _)| seq);
        assert_eq!(first, Some(10));

        log.clear();
        assert!(log.is_empty());
        log.push(edit(".x", "1"));
        log.push(FormEvent::VariantSelected {
            path: Path::root().field("shape"),
            tag: "Circle".to_string(),
        });
        let since: Vec<_> = log
            .structural_since(EVENT_LOG_LIMIT as u64 + 10)
            .map(|(seq, event)| (seq, event.to_log_line()))
            .collect();
        assert_eq!(
            since,
            vec![(EVENT_LOG_LIMIT as u64 + 11, "variant_selected path=.shape tag=Circle".to_string())]
        );
    }
}
