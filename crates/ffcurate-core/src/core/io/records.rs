use crate::core::models::record::{ComparisonPair, Conformer, ConformerSource, Record, RecordId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Conformer set holds several candidates ({}); choose one by name", .0.join(", "))]
    AmbiguousCandidate(Vec<String>),
    #[error("Duplicate record id {0}")]
    DuplicateRecord(RecordId),
}

fn read_to_string(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| LoadError::Json {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

pub(crate) fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = read_to_string(path)?;
    toml::from_str(&content).map_err(|e| LoadError::Toml {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Loads a JSON array of [`Record`]s, rejecting repeated ids.
pub fn load_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let records: Vec<Record> = read_json(path)?;
    let mut seen = BTreeSet::new();
    for record in &records {
        if !seen.insert(record.id) {
            return Err(LoadError::DuplicateRecord(record.id));
        }
    }
    Ok(records)
}

/// Records together with the reference and candidate conformers computed for them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConformerSet {
    pub records: Vec<Record>,
    pub conformers: Vec<Conformer>,
}

impl ConformerSet {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        read_json(path)
    }

    /// Distinct candidate names present in the set, sorted.
    pub fn candidate_names(&self) -> Vec<String> {
        self.conformers
            .iter()
            .filter_map(|c| match &c.source {
                ConformerSource::Candidate(name) => Some(name.clone()),
                ConformerSource::Reference => None,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Builds one comparison pair per record for the chosen candidate.
    ///
    /// With `candidate` unset the set must hold exactly one candidate name.
    /// Records that cannot be paired (no reference, no candidate, no group key)
    /// are reported as error strings; the remaining pairs are still returned.
    pub fn pairs(
        &self,
        candidate: Option<&str>,
    ) -> Result<(Vec<ComparisonPair>, Vec<String>), LoadError> {
        let name = match candidate {
            Some(name) => name.to_string(),
            None => {
                let mut names = self.candidate_names();
                if names.len() > 1 {
                    return Err(LoadError::AmbiguousCandidate(names));
                }
                match names.pop() {
                    Some(name) => name,
                    None => return Ok((Vec::new(), vec!["no candidate conformers".to_string()])),
                }
            }
        };
        let wanted = ConformerSource::Candidate(name.clone());

        let mut references: BTreeMap<RecordId, &Conformer> = BTreeMap::new();
        let mut candidates: BTreeMap<RecordId, &Conformer> = BTreeMap::new();
        for conformer in &self.conformers {
            if conformer.source == ConformerSource::Reference {
                references.entry(conformer.record_id).or_insert(conformer);
            } else if conformer.source == wanted {
                candidates.entry(conformer.record_id).or_insert(conformer);
            }
        }

        let mut pairs = Vec::new();
        let mut errors = Vec::new();
        for record in &self.records {
            let (Some(reference), Some(cand)) =
                (references.get(&record.id), candidates.get(&record.id))
            else {
                errors.push(format!(
                    "record {}: missing reference or '{}' conformer",
                    record.id, name
                ));
                continue;
            };
            match ComparisonPair::new(record.clone(), (*reference).clone(), (*cand).clone()) {
                Ok(pair) => pairs.push(pair),
                Err(e) => errors.push(format!("record {}: {}", record.id, e)),
            }
        }
        Ok((pairs, errors))
    }
}
