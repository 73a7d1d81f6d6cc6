use super::patterns::{auxiliary_pattern, auxiliary_patterns};
use super::tags::TagCategory;
use crate::core::io::records::{LoadError, read_toml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub id: String,
    pub smirks: String,
}

/// Resolves a `(category, tag id)` pair to the pattern that defines it.
///
/// Returns `None` when the id is unknown or ambiguous within the category.
pub trait DefinitionResolver {
    fn lookup(&self, category: &TagCategory, tag_id: &str) -> Option<&ParameterDefinition>;
}

/// Parameter patterns of a force field, grouped by handler.
///
/// Auxiliary pattern ids resolve under [`TagCategory::Additional`] even when
/// the file does not list them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterDefinitions {
    by_category: BTreeMap<TagCategory, Vec<ParameterDefinition>>,
    auxiliary: Vec<ParameterDefinition>,
}

impl ParameterDefinitions {
    pub fn new(by_category: BTreeMap<TagCategory, Vec<ParameterDefinition>>) -> Self {
        let auxiliary = auxiliary_patterns()
            .into_iter()
            .map(|(id, smirks)| ParameterDefinition {
                id: id.to_string(),
                smirks: smirks.to_string(),
            })
            .collect();
        Self {
            by_category,
            auxiliary,
        }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let by_category = read_toml(path)?;
        Ok(Self::new(by_category))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        Ok(Self::new(toml::from_str(content)?))
    }

    pub fn categories(&self) -> impl Iterator<Item = &TagCategory> {
        self.by_category.keys()
    }

    /// Finds an id in any category, for ids whose category is implied by a prefix.
    pub fn find(&self, tag_id: &str) -> Option<(&TagCategory, &ParameterDefinition)> {
        let mut found = self.by_category.iter().flat_map(|(category, defs)| {
            defs.iter()
                .filter(move |d| d.id == tag_id)
                .map(move |d| (category, d))
        });
        let first = found.next()?;
        if found.next().is_some() {
            return None;
        }
        Some(first)
    }
}

impl DefinitionResolver for ParameterDefinitions {
    fn lookup(&self, category: &TagCategory, tag_id: &str) -> Option<&ParameterDefinition> {
        let defined = self.by_category.get(category).map(Vec::as_slice).unwrap_or(&[]);
        let mut matches = defined.iter().filter(|d| d.id == tag_id);
        match (matches.next(), matches.next()) {
            (Some(definition), None) => Some(definition),
            (Some(_), Some(_)) => None,
            (None, _)
                if *category == TagCategory::Additional
                    && auxiliary_pattern(tag_id).is_some() =>
            {
                self.auxiliary.iter().find(|d| d.id == tag_id)
            }
            (None, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const DEFINITIONS: &str = r#"
        [[Bonds]]
        id = "b1"
        smirks = "[#6X4:1]-[#6X4:2]"

        [[Bonds]]
        id = "b2"
        smirks = "[#6X4:1]-[#6X3:2]"

        [[Bonds]]
        id = "b2"
        smirks = "[#6X4:1]-[#6X2:2]"

        [[ProperTorsions]]
        id = "t1"
        smirks = "[*:1]-[#6X4:2]-[#6X4:3]-[*:4]"
    "#;

    #[test]
    fn lookup_resolves_zero_or_one_definition() {
        let defs = ParameterDefinitions::from_toml_str(DEFINITIONS).unwrap();
        assert_eq!(
            defs.lookup(&TagCategory::Bonds, "b1").map(|d| d.smirks.as_str()),
            Some("[#6X4:1]-[#6X4:2]")
        );
        assert_eq!(defs.lookup(&TagCategory::Bonds, "b2"), None);
        assert_eq!(defs.lookup(&TagCategory::Bonds, "t1"), None);
        assert_eq!(defs.lookup(&TagCategory::Angles, "a1"), None);
    }

    #[test]
    fn auxiliary_ids_resolve_under_additional() {
        let defs = ParameterDefinitions::from_toml_str(DEFINITIONS).unwrap();
        assert_eq!(
            defs.lookup(&TagCategory::Additional, "r3").map(|d| d.smirks.as_str()),
            Some("[r3:1]")
        );
        assert_eq!(defs.lookup(&TagCategory::Bonds, "r3"), None);
    }

    #[test]
    fn find_searches_all_categories() {
        let defs = ParameterDefinitions::from_toml_str(DEFINITIONS).unwrap();
        let (category, def) = defs.find("t1").unwrap();
        assert_eq!(category, &TagCategory::ProperTorsions);
        assert_eq!(def.id, "t1");
        assert!(defs.find("b2").is_none());
        assert!(defs.find("zz").is_none());
    }

    #[test]
    fn load_reports_toml_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defs.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "[[Bonds]]\nid = ").unwrap();
        let err = ParameterDefinitions::load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Toml { .. }));
        assert!(err.to_string().contains("defs.toml"));
    }
}
