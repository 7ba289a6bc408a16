//! citelaw-dict: the corpus-wide law dictionary.
//!
//! Built once from a corpus CSV and thereafter read-only; concurrent
//! readers are safe since nothing here is mutated after [`LawDictionary::build`]
//! returns.

pub mod abbreviation;

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use citelaw_core::{CiteError, LawId, LawKind, LawMetadata};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of the dictionary source CSV. Records with an empty `law_id`
/// or `canonical_title` are skipped during load.
#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryRecord {
    pub kind: String,
    pub number: String,
    pub canonical_title: String,
    #[serde(default)]
    pub reading: String,
    #[serde(default)]
    pub old_title: String,
    #[serde(default)]
    pub promulgation_date: String,
    #[serde(default)]
    pub effective_date: String,
    pub law_id: String,
}

fn parse_kind(s: &str) -> LawKind {
    match s {
        "法律" | "act" | "Act" => LawKind::Act,
        "政令" | "cabinet_order" | "CabinetOrder" => LawKind::CabinetOrder,
        "省令" | "ministerial_ordinance" | "MinisterialOrdinance" => LawKind::MinisterialOrdinance,
        "規則" | "rule" | "Rule" => LawKind::Rule,
        _ => LawKind::Other,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// A recorded ambiguous-abbreviation conflict: a later registration whose
/// derived abbreviation collided with an earlier one. The first
/// registration always wins the lookup; this list exists purely for
/// diagnostics and is never consulted by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct AbbreviationConflict {
    pub abbreviation: String,
    pub existing_law_id: LawId,
    pub conflicting_law_id: LawId,
    pub conflicting_title: String,
}

/// Counters surfaced after [`LawDictionary::build`] so callers can report
/// partial-success statistics: load is never all-or-nothing, so a caller
/// always knows how much of the corpus actually registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub read: usize,
    pub skipped: usize,
    pub registered: usize,
}

/// The in-memory, read-only law dictionary.
#[derive(Debug, Default)]
pub struct LawDictionary {
    title_to_id: IndexMap<String, LawId>,
    abbreviation_to_id: IndexMap<String, LawId>,
    number_to_id: IndexMap<String, LawId>,
    metadata: IndexMap<LawId, LawMetadata>,
    conflicts: Vec<AbbreviationConflict>,
    stats: LoadStats,
}

impl LawDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from an in-memory iterator of records, in
    /// insertion order. Records with an empty id or title are skipped.
    pub fn build<I: IntoIterator<Item = DictionaryRecord>>(records: I) -> Self {
        let mut dict = Self::new();
        for record in records {
            dict.stats.read += 1;
            if record.law_id.is_empty() || record.canonical_title.is_empty() {
                dict.stats.skipped += 1;
                continue;
            }
            dict.register(record);
            dict.stats.registered += 1;
        }
        dict
    }

    /// Loads and builds a dictionary from a UTF-8 delimited corpus file
    /// with a header row.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CiteError> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            CiteError::Fatal(format!(
                "cannot read dictionary source {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::load_csv_reader(file)
    }

    pub fn load_csv_reader<R: Read>(reader: R) -> Result<Self, CiteError> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut records = Vec::new();
        for result in csv_reader.deserialize::<DictionaryRecord>() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    // A single malformed row is a data defect, not a fatal
                    // error; skip it and keep loading.
                    tracing_skip_row(&e);
                }
            }
        }
        Ok(Self::build(records))
    }

    fn register(&mut self, record: DictionaryRecord) {
        let law_id = LawId::new(record.law_id.clone());

        if !self.title_to_id.contains_key(&record.canonical_title) {
            self.title_to_id
                .insert(record.canonical_title.clone(), law_id.clone());
        }
        if !record.number.is_empty() && !self.number_to_id.contains_key(&record.number) {
            self.number_to_id.insert(record.number.clone(), law_id.clone());
        }
        if !record.old_title.is_empty() && !self.title_to_id.contains_key(&record.old_title) {
            self.title_to_id
                .insert(record.old_title.clone(), law_id.clone());
        }

        self.metadata.insert(
            law_id.clone(),
            LawMetadata {
                canonical_title: record.canonical_title.clone(),
                kind: parse_kind(&record.kind),
                effective_date: parse_date(&record.effective_date),
            },
        );

        for abbrev in abbreviation::derive_abbreviations(&record.canonical_title) {
            self.register_abbreviation(abbrev, &law_id, &record.canonical_title);
        }
    }

    fn register_abbreviation(&mut self, abbrev: String, law_id: &LawId, title: &str) {
        match self.abbreviation_to_id.get(&abbrev) {
            None => {
                self.abbreviation_to_id.insert(abbrev, law_id.clone());
            }
            Some(existing) if existing != law_id => {
                self.conflicts.push(AbbreviationConflict {
                    abbreviation: abbrev,
                    existing_law_id: existing.clone(),
                    conflicting_law_id: law_id.clone(),
                    conflicting_title: title.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    pub fn find_by_title(&self, name: &str) -> Option<LawId> {
        self.title_to_id.get(name).cloned()
    }

    pub fn find_by_abbreviation(&self, name: &str) -> Option<LawId> {
        self.abbreviation_to_id.get(name).cloned()
    }

    pub fn find_by_number(&self, number: &str) -> Option<LawId> {
        self.number_to_id.get(number).cloned()
    }

    /// Tries title, then abbreviation — the common "does this name resolve
    /// to a known statute" query used by patterns P1/P2.
    pub fn resolve_name(&self, name: &str) -> Option<LawId> {
        self.find_by_title(name).or_else(|| self.find_by_abbreviation(name))
    }

    pub fn metadata(&self, id: &LawId) -> Option<&LawMetadata> {
        self.metadata.get(id)
    }

    /// The retained abbreviation-conflict list, for diagnostics only. The
    /// detector never consults this; lookups always resolve to the first
    /// registration.
    pub fn diagnostics(&self) -> &[AbbreviationConflict] {
        &self.conflicts
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// A flattened, serializable snapshot of the built index, meant to be
    /// written once as a read-only artifact and never parsed back into a
    /// `LawDictionary` (the CSV source remains the sole writable input).
    pub fn to_artifact(&self) -> DictionaryArtifact {
        let number_by_id: IndexMap<&LawId, &String> =
            self.number_to_id.iter().map(|(number, id)| (id, number)).collect();
        DictionaryArtifact {
            entries: self
                .metadata
                .iter()
                .map(|(id, meta)| DictionaryArtifactEntry {
                    law_id: id.clone(),
                    canonical_title: meta.canonical_title.clone(),
                    kind: meta.kind,
                    number: number_by_id.get(id).map(|n| (*n).clone()),
                })
                .collect(),
            abbreviations: self.abbreviation_to_id.clone().into_iter().collect(),
            stats: self.stats.clone(),
        }
    }
}

/// A read-only snapshot of a built [`LawDictionary`], written to disk by
/// the `build-dictionary` command so downstream tooling can inspect what
/// was indexed without re-parsing the source CSV.
#[derive(Debug, Clone, Serialize)]
pub struct DictionaryArtifact {
    pub entries: Vec<DictionaryArtifactEntry>,
    pub abbreviations: Vec<(String, LawId)>,
    pub stats: LoadStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct DictionaryArtifactEntry {
    pub law_id: LawId,
    pub canonical_title: String,
    pub kind: LawKind,
    pub number: Option<String>,
}

fn tracing_skip_row(err: &csv::Error) {
    // A malformed row is a data defect: logged, never fatal.
    eprintln!("citelaw-dict: skipping malformed dictionary row: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DictionaryRecord> {
        vec![
            DictionaryRecord {
                kind: "法律".into(),
                number: "明治二十九年法律第八十九号".into(),
                canonical_title: "民法".into(),
                reading: "みんぽう".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "129AC0000000089".into(),
            },
            DictionaryRecord {
                kind: "法律".into(),
                number: "明治三十二年法律第四十八号".into(),
                canonical_title: "商法".into(),
                reading: "しょうほう".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "132AC0000000048".into(),
            },
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "個人情報の保護に関する法律".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "415AC0000000057".into(),
            },
            DictionaryRecord {
                kind: "".into(),
                number: "".into(),
                canonical_title: "".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "".into(),
            },
        ]
    }

    #[test]
    fn builds_and_skips_empty_rows() {
        let dict = LawDictionary::build(sample());
        assert_eq!(dict.stats().read, 4);
        assert_eq!(dict.stats().skipped, 1);
        assert_eq!(dict.stats().registered, 3);
    }

    #[test]
    fn finds_by_title_and_number() {
        let dict = LawDictionary::build(sample());
        assert_eq!(dict.find_by_title("民法"), Some(LawId::new("129AC0000000089")));
        assert_eq!(
            dict.find_by_number("明治三十二年法律第四十八号"),
            Some(LawId::new("132AC0000000048"))
        );
    }

    #[test]
    fn finds_derived_abbreviation() {
        let dict = LawDictionary::build(sample());
        assert_eq!(
            dict.find_by_abbreviation("個人情報の保護法"),
            Some(LawId::new("415AC0000000057"))
        );
    }

    #[test]
    fn first_registration_wins_on_conflict() {
        let records = vec![
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "甲に関する法律".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "1".into(),
            },
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "甲法".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "2".into(),
            },
        ];
        // "甲に関する法律" derives the abbreviation "甲法", which collides
        // with the second entry's canonical title also being "甲法" once
        // it is registered as a title (not an abbreviation) — so the
        // abbreviation lookup should still resolve to the first entry.
        let dict = LawDictionary::build(records);
        assert_eq!(dict.find_by_abbreviation("甲法"), Some(LawId::new("1")));
        assert_eq!(dict.diagnostics().len(), 0);
    }

    #[test]
    fn records_abbreviation_conflicts() {
        // "甲特例に関する法律" -> "甲特例法" (general rule) and
        // "甲の特例に関する法律" -> "甲特例法" (specific rule) collide on
        // the same derived abbreviation despite being different titles.
        let records = vec![
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "甲特例に関する法律".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "1".into(),
            },
            DictionaryRecord {
                kind: "法律".into(),
                number: "".into(),
                canonical_title: "甲の特例に関する法律".into(),
                reading: "".into(),
                old_title: "".into(),
                promulgation_date: "".into(),
                effective_date: "".into(),
                law_id: "2".into(),
            },
        ];
        let dict = LawDictionary::build(records);
        assert_eq!(dict.find_by_abbreviation("甲特例法"), Some(LawId::new("1")));
        assert_eq!(dict.diagnostics().len(), 1);
        assert_eq!(dict.diagnostics()[0].abbreviation, "甲特例法");
        assert_eq!(dict.diagnostics()[0].conflicting_law_id, LawId::new("2"));
    }
}
