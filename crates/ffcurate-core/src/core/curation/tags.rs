use crate::core::models::record::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kind of parameter or pattern a tag refers to.
///
/// Force-field handler names map onto the named variants; any other handler
/// name the oracle reports is kept verbatim in [`TagCategory::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagCategory {
    Bonds,
    Angles,
    ProperTorsions,
    ImproperTorsions,
    #[allow(non_camel_case_types)]
    vdW,
    Electrostatics,
    LibraryCharges,
    FunctionalGroup,
    Additional,
    Other(String),
}

impl TagCategory {
    pub fn as_str(&self) -> &str {
        match self {
            TagCategory::Bonds => "Bonds",
            TagCategory::Angles => "Angles",
            TagCategory::ProperTorsions => "ProperTorsions",
            TagCategory::ImproperTorsions => "ImproperTorsions",
            TagCategory::vdW => "vdW",
            TagCategory::Electrostatics => "Electrostatics",
            TagCategory::LibraryCharges => "LibraryCharges",
            TagCategory::FunctionalGroup => "functional_group",
            TagCategory::Additional => "additional",
            TagCategory::Other(name) => name,
        }
    }

    pub fn is_torsion(&self) -> bool {
        matches!(
            self,
            TagCategory::ProperTorsions | TagCategory::ImproperTorsions
        )
    }
}

impl From<&str> for TagCategory {
    fn from(s: &str) -> Self {
        match s {
            "Bonds" => TagCategory::Bonds,
            "Angles" => TagCategory::Angles,
            "ProperTorsions" => TagCategory::ProperTorsions,
            "ImproperTorsions" => TagCategory::ImproperTorsions,
            "vdW" => TagCategory::vdW,
            "Electrostatics" => TagCategory::Electrostatics,
            "LibraryCharges" => TagCategory::LibraryCharges,
            "functional_group" => TagCategory::FunctionalGroup,
            "additional" => TagCategory::Additional,
            other => TagCategory::Other(other.to_string()),
        }
    }
}

impl From<String> for TagCategory {
    fn from(s: String) -> Self {
        TagCategory::from(s.as_str())
    }
}

impl From<TagCategory> for String {
    fn from(category: TagCategory) -> Self {
        category.as_str().to_string()
    }
}

impl FromStr for TagCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TagCategory::from(s))
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tag attached to a record, e.g. `(ProperTorsions, "t1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagAssignment {
    pub category: TagCategory,
    pub tag_id: String,
}

impl TagAssignment {
    pub fn new(category: TagCategory, tag_id: &str) -> Self {
        Self {
            category,
            tag_id: tag_id.to_string(),
        }
    }
}

impl fmt::Display for TagAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.tag_id)
    }
}

/// The labeler's output for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRecord {
    pub record_id: RecordId,
    pub heavy_atoms: usize,
    pub tags: BTreeSet<TagAssignment>,
}

impl LabeledRecord {
    pub fn has(&self, category: &TagCategory, tag_id: &str) -> bool {
        self.tags
            .iter()
            .any(|t| &t.category == category && t.tag_id == tag_id)
    }
}

/// Joins tags into the `category:id;category:id` form used in tabular output.
pub fn format_tags<'a>(tags: impl IntoIterator<Item = &'a TagAssignment>) -> String {
    tags.into_iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip() {
        for name in [
            "Bonds",
            "Angles",
            "ProperTorsions",
            "ImproperTorsions",
            "vdW",
            "Electrostatics",
            "LibraryCharges",
            "functional_group",
            "additional",
            "GBSA",
        ] {
            assert_eq!(TagCategory::from(name).to_string(), name);
        }
        assert_eq!(
            TagCategory::from("GBSA"),
            TagCategory::Other("GBSA".to_string())
        );
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&TagCategory::ProperTorsions).unwrap();
        assert_eq!(json, r#""ProperTorsions""#);
        let parsed: TagCategory = serde_json::from_str(r#""additional""#).unwrap();
        assert_eq!(parsed, TagCategory::Additional);
    }

    #[test]
    fn tags_format_sorted_by_category_then_id() {
        let tags: BTreeSet<_> = [
            TagAssignment::new(TagCategory::ProperTorsions, "t2"),
            TagAssignment::new(TagCategory::Bonds, "b1"),
            TagAssignment::new(TagCategory::ProperTorsions, "t1"),
            TagAssignment::new(TagCategory::Bonds, "b1"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            format_tags(&tags),
            "Bonds:b1;ProperTorsions:t1;ProperTorsions:t2"
        );
    }
}
