use super::tags::TagCategory;
use crate::core::io::records::{LoadError, read_json};
use crate::core::models::molecule::Molecule;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::trace;

/// Per-category assignments: atom-index tuple to parameter id.
pub type StructuralLabels = BTreeMap<TagCategory, BTreeMap<Vec<usize>, String>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("Molecule '{0}' is unknown to the labeling oracle")]
    UnknownMolecule(String),
    #[error("Labeling oracle failed: {0}")]
    Failed(String),
}

/// Assigns force-field parameters and matches substructure patterns.
///
/// Implementations wrap an external cheminformatics toolkit; they must be
/// pure, returning the same answer for the same molecule every time.
pub trait LabelingOracle {
    fn assign_structural_parameters(
        &self,
        molecule: &Molecule,
    ) -> Result<StructuralLabels, OracleError>;

    /// Every match of `pattern` in `molecule`, as atom-index tuples.
    fn match_pattern(
        &self,
        molecule: &Molecule,
        pattern: &str,
    ) -> Result<Vec<Vec<usize>>, OracleError>;

    fn functional_groups(&self, _molecule: &Molecule) -> Result<Vec<String>, OracleError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParameterMatch {
    pub atoms: Vec<usize>,
    pub id: String,
}

/// Precomputed oracle answers for one molecule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MoleculeLabels {
    #[serde(default)]
    pub parameters: BTreeMap<TagCategory, Vec<ParameterMatch>>,
    #[serde(default)]
    pub patterns: HashMap<String, Vec<Vec<usize>>>,
    #[serde(default)]
    pub functional_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LabelsFile {
    molecules: HashMap<String, MoleculeLabels>,
}

/// A [`LabelingOracle`] answering from a table exported by the toolkit.
///
/// Entries are keyed by the exact mapped SMILES of the record. Patterns that
/// were not exported for a molecule are treated as having no matches.
#[derive(Debug, Clone, Default)]
pub struct TabulatedOracle {
    molecules: HashMap<String, MoleculeLabels>,
}

impl TabulatedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file: LabelsFile = read_json(path)?;
        Ok(Self {
            molecules: file.molecules,
        })
    }

    pub fn insert(&mut self, mapped_smiles: &str, labels: MoleculeLabels) {
        self.molecules.insert(mapped_smiles.to_string(), labels);
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    fn entry(&self, molecule: &Molecule) -> Result<&MoleculeLabels, OracleError> {
        self.molecules
            .get(molecule.ident())
            .ok_or_else(|| OracleError::UnknownMolecule(molecule.ident().to_string()))
    }
}

impl LabelingOracle for TabulatedOracle {
    fn assign_structural_parameters(
        &self,
        molecule: &Molecule,
    ) -> Result<StructuralLabels, OracleError> {
        let entry = self.entry(molecule)?;
        Ok(entry
            .parameters
            .iter()
            .map(|(category, matches)| {
                let assignments = matches
                    .iter()
                    .map(|m| (m.atoms.clone(), m.id.clone()))
                    .collect();
                (category.clone(), assignments)
            })
            .collect())
    }

    fn match_pattern(
        &self,
        molecule: &Molecule,
        pattern: &str,
    ) -> Result<Vec<Vec<usize>>, OracleError> {
        let entry = self.entry(molecule)?;
        match entry.patterns.get(pattern) {
            Some(matches) => Ok(matches.clone()),
            None => {
                trace!(pattern, molecule = molecule.ident(), "Pattern not tabulated; no matches");
                Ok(Vec::new())
            }
        }
    }

    fn functional_groups(&self, molecule: &Molecule) -> Result<Vec<String>, OracleError> {
        Ok(self.entry(molecule)?.functional_groups.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::smiles::parse_mapped_smiles;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const ETHANE: &str = "[C:1]([C:2]([H:6])([H:7])[H:8])([H:3])([H:4])[H:5]";

    #[test]
    fn load_and_answer_queries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"molecules": {{"{ETHANE}": {{
                "parameters": {{
                    "Bonds": [{{"atoms": [0, 1], "id": "b1"}}, {{"atoms": [0, 2], "id": "b83"}}],
                    "ProperTorsions": [{{"atoms": [2, 0, 1, 5], "id": "t4"}}]
                }},
                "patterns": {{"[r3:1]": []}},
                "functional_groups": ["alkane"]
            }}}}}}"#
        )
        .unwrap();

        let oracle = TabulatedOracle::load(&path).unwrap();
        assert_eq!(oracle.len(), 1);
        let molecule = parse_mapped_smiles(ETHANE).unwrap();

        let labels = oracle.assign_structural_parameters(&molecule).unwrap();
        assert_eq!(labels[&TagCategory::Bonds][&vec![0, 1]], "b1");
        assert_eq!(labels[&TagCategory::ProperTorsions].len(), 1);
        assert!(oracle.match_pattern(&molecule, "[r3:1]").unwrap().is_empty());
        assert!(oracle.match_pattern(&molecule, "[r9:1]").unwrap().is_empty());
        assert_eq!(oracle.functional_groups(&molecule).unwrap(), vec!["alkane"]);
    }

    #[test]
    fn unknown_molecule_is_an_error() {
        let oracle = TabulatedOracle::new();
        let molecule = parse_mapped_smiles("[O:1]([H:2])[H:3]").unwrap();
        assert_eq!(
            oracle.assign_structural_parameters(&molecule),
            Err(OracleError::UnknownMolecule("[O:1]([H:2])[H:3]".to_string()))
        );
    }
}
