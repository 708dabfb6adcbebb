use crate::history::store::HistoryStorage;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub name: Option<String>,
    pub conf: Value,
    pub time: DateTime<Utc>,
}

fn fresh_id(time: &DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{}-{suffix}", time.timestamp_millis())
}

/// Stack of accepted configurations, written through to storage on every
/// mutation.
pub struct ConfigHistory {
    entries: Vec<HistoryEntry>,
    storage: Box<dyn HistoryStorage>,
}

impl ConfigHistory {
    /// Loads whatever the storage holds. Unreadable storage starts an empty
    /// history.
    pub fn open(storage: Box<dyn HistoryStorage>) -> Self {
        let entries = match storage.load() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "config history unreadable; starting empty");
                Vec::new()
            }
        };
        tracing::debug!(entries = entries.len(), "config history opened");
        Self { entries, storage }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn push(&mut self, conf: Value) -> &HistoryEntry {
        self.push_at(conf, Utc::now())
    }

    pub(crate) fn push_at(&mut self, conf: Value, time: DateTime<Utc>) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: fresh_id(&time),
            name: None,
            conf,
            time,
        };
        tracing::info!(id = %entry.id, "config recorded");
        self.entries.push(entry);
        self.persist();
        &self.entries[self.entries.len() - 1]
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        let entry = self.entries.pop()?;
        self.persist();
        Some(entry)
    }

    /// Names an entry in place, verbatim. Returns `false` for unknown ids.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            tracing::warn!(id, "rename of unknown history entry ignored");
            return false;
        };
        entry.name = Some(name.to_string());
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Entries newest first. Entries recorded at the same instant keep their
    /// push order reversed, so the latest push still comes first.
    pub fn view(&self) -> Vec<&HistoryEntry> {
        let mut view: Vec<&HistoryEntry> = self.entries.iter().rev().collect();
        view.sort_by(|a, b| b.time.cmp(&a.time));
        view
    }

    fn persist(&self) {
        if let Err(err) = self.storage.save(&self.entries) {
            tracing::warn!(error = %err, "failed to persist config history");
        }
    }
}
