//! The catalog: an external, read-only `u16 -> string` mapping used for
//! interned templates and string literals. The wire codec only ever
//! depends on the [`Catalog`] trait; storage is a collaborator supplied by
//! the host.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Deserialize;

pub trait Catalog {
    fn lookup(&self, id: u16) -> Option<&str>;
}

/// No cataloged ids resolve; used when the producer never interns
/// anything (scenario 1 in the crate's scenario tests).
pub struct EmptyCatalog;

impl Catalog for EmptyCatalog {
    fn lookup(&self, _id: u16) -> Option<&str> {
        None
    }
}

impl Catalog for BTreeMap<u16, String> {
    fn lookup(&self, id: u16) -> Option<&str> {
        self.get(&id).map(String::as_str)
    }
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn lookup(&self, id: u16) -> Option<&str> {
        (**self).lookup(id)
    }
}

/// Sidecar shape produced by a build-time catalog generator:
/// `{"StringConstants": {"<id>": "<text>", ...}}`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "StringConstants")]
    string_constants: BTreeMap<String, String>,
}

/// A catalog loaded once from a JSON sidecar file.
#[derive(Debug, Default)]
pub struct JsonCatalog {
    entries: BTreeMap<u16, String>,
}

impl JsonCatalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog file {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let parsed: CatalogFile =
            serde_json::from_str(text).context("parsing catalog JSON")?;
        let mut entries = BTreeMap::new();
        for (id, text) in parsed.string_constants {
            let id: u16 = id
                .parse()
                .with_context(|| format!("catalog id {id:?} is not a valid u16"))?;
            entries.insert(id, text);
        }
        Ok(Self { entries })
    }

    pub fn to_json_string(&self) -> Result<String> {
        let out = CatalogFile {
            string_constants: self
                .entries
                .iter()
                .map(|(id, text)| (id.to_string(), text.clone()))
                .collect(),
        };
        serde_json::to_string_pretty(&out).context("serializing catalog JSON")
    }

    pub fn insert(&mut self, id: u16, text: impl Into<String>) {
        self.entries.insert(id, text.into());
    }
}

impl Catalog for JsonCatalog {
    fn lookup(&self, id: u16) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }
}

/// A runtime intern table the producer side can use to assign ids to
/// `&'static str` templates/literals the first time they're seen, instead
/// of relying on a build-time scan of the caller's sources. Thread-safe so
/// it can back a process-wide encoder.
#[derive(Default)]
pub struct InternTable {
    next_id: AtomicU16,
    entries: Mutex<BTreeMap<&'static str, u16>>,
    reverse: Mutex<BTreeMap<u16, &'static str>>,
}

impl InternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `text`, assigning a fresh one on first sight.
    pub fn intern(&self, text: &'static str) -> u16 {
        let mut entries = self.entries.lock().unwrap();
        if let Some(&id) = entries.get(text) {
            return id;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(text, id);
        self.reverse.lock().unwrap().insert(id, text);
        id
    }

    pub fn dump_json(&self) -> Result<String> {
        let reverse = self.reverse.lock().unwrap();
        let out = CatalogFile {
            string_constants: reverse
                .iter()
                .map(|(id, text)| (id.to_string(), text.to_string()))
                .collect(),
        };
        serde_json::to_string_pretty(&out).context("serializing intern table as catalog JSON")
    }
}

impl Catalog for InternTable {
    fn lookup(&self, id: u16) -> Option<&str> {
        self.reverse.lock().unwrap().get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_catalog_round_trips_through_text() {
        let text = r#"{"StringConstants": {"3": "Test {}"}}"#;
        let cat = JsonCatalog::from_json_str(text).unwrap();
        assert_eq!(cat.lookup(3), Some("Test {}"));
        assert_eq!(cat.lookup(4), None);
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        assert_eq!(EmptyCatalog.lookup(0), None);
    }

    #[test]
    fn intern_table_assigns_stable_monotonic_ids() {
        let table = InternTable::new();
        let a = table.intern("Test {}");
        let b = table.intern("Other");
        let a_again = table.intern("Test {}");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(table.lookup(a), Some("Test {}"));
    }
}
