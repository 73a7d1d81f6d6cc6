use super::coverage::CoverageTable;
use super::definitions::DefinitionResolver;
use super::tags::TagCategory;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("Category '{0}' was requested more than once")]
    DuplicateCategory(TagCategory),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedParameter {
    pub id: String,
    pub smirks: String,
}

/// Selected parameters per category, in the order the categories were requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    categories: Vec<(TagCategory, Vec<SelectedParameter>)>,
}

impl Selection {
    pub fn get(&self, category: &TagCategory) -> Option<&[SelectedParameter]> {
        self.categories
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, selected)| selected.as_slice())
    }

    pub fn ids(&self, category: &TagCategory) -> Vec<&str> {
        self.get(category)
            .map(|s| s.iter().map(|p| p.id.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagCategory, &[SelectedParameter])> {
        self.categories.iter().map(|(c, s)| (c, s.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.categories.iter().map(|(_, s)| s.len()).sum()
    }
}

/// Serializes as `{category: [smirks, ...]}`, preserving request order.
impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, selected) in &self.categories {
            let patterns: Vec<&str> = selected.iter().map(|p| p.smirks.as_str()).collect();
            map.serialize_entry(category.as_str(), &patterns)?;
        }
        map.end()
    }
}

/// Keeps every tag of the requested categories that is carried by at least
/// `min_coverage` records and resolves to exactly one definition.
pub fn select<R>(
    table: &CoverageTable,
    categories: &[TagCategory],
    resolver: &R,
    min_coverage: usize,
) -> Result<Selection, SelectError>
where
    R: DefinitionResolver + ?Sized,
{
    let mut seen = BTreeSet::new();
    let mut selection = Selection::default();
    for category in categories {
        if !seen.insert(category) {
            return Err(SelectError::DuplicateCategory(category.clone()));
        }
        let mut selected = Vec::new();
        for (tag_id, entry) in table.in_category(category) {
            if entry.count < min_coverage {
                trace!(%category, tag_id, count = entry.count, "Below coverage threshold");
                continue;
            }
            match resolver.lookup(category, tag_id) {
                Some(definition) => selected.push(SelectedParameter {
                    id: tag_id.to_string(),
                    smirks: definition.smirks.clone(),
                }),
                None => trace!(%category, tag_id, "No unique definition; skipped"),
            }
        }
        debug!(%category, selected = selected.len(), "Category selected");
        selection.categories.push((category.clone(), selected));
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::curation::definitions::ParameterDefinitions;
    use crate::core::curation::tags::{LabeledRecord, TagAssignment};

    fn table(counts: &[(TagCategory, &str, usize)]) -> CoverageTable {
        let mut table = CoverageTable::new();
        let mut next_id = 0;
        for (category, tag, count) in counts {
            for _ in 0..*count {
                next_id += 1;
                table.fold(&LabeledRecord {
                    record_id: next_id,
                    heavy_atoms: 3,
                    tags: [TagAssignment::new(category.clone(), tag)].into_iter().collect(),
                });
            }
        }
        table
    }

    fn definitions() -> ParameterDefinitions {
        ParameterDefinitions::from_toml_str(
            r#"
            [[Bonds]]
            id = "b1"
            smirks = "[#6:1]-[#6:2]"
            [[Bonds]]
            id = "b2"
            smirks = "[#6:1]-[#8:2]"
            [[Angles]]
            id = "a1"
            smirks = "[*:1]~[#6:2]~[*:3]"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn selects_only_tags_meeting_threshold() {
        let table = table(&[(TagCategory::Bonds, "b1", 10), (TagCategory::Bonds, "b2", 3)]);
        let selection = select(&table, &[TagCategory::Bonds], &definitions(), 5).unwrap();
        assert_eq!(selection.ids(&TagCategory::Bonds), vec!["b1"]);
        assert_eq!(selection.get(&TagCategory::Bonds).unwrap()[0].smirks, "[#6:1]-[#6:2]");
    }

    #[test]
    fn below_threshold_tags_are_never_selected() {
        let table = table(&[
            (TagCategory::Bonds, "b1", 4),
            (TagCategory::Bonds, "b2", 7),
            (TagCategory::Angles, "a1", 2),
        ]);
        for min in 0..10 {
            let selection =
                select(&table, &[TagCategory::Bonds, TagCategory::Angles], &definitions(), min)
                    .unwrap();
            for (category, selected) in selection.iter() {
                for parameter in selected {
                    assert!(table.count(category, &parameter.id) >= min);
                }
            }
        }
    }

    #[test]
    fn unresolvable_tags_are_dropped() {
        let table = table(&[(TagCategory::Bonds, "b99", 20), (TagCategory::Bonds, "b1", 20)]);
        let selection = select(&table, &[TagCategory::Bonds], &definitions(), 1).unwrap();
        assert_eq!(selection.ids(&TagCategory::Bonds), vec!["b1"]);
    }

    #[test]
    fn output_follows_request_order_and_serializes_as_map() {
        let table = table(&[(TagCategory::Bonds, "b1", 2), (TagCategory::Angles, "a1", 2)]);
        let selection = select(
            &table,
            &[TagCategory::Angles, TagCategory::Bonds, TagCategory::ProperTorsions],
            &definitions(),
            1,
        )
        .unwrap();
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(
            json,
            r#"{"Angles":["[*:1]~[#6:2]~[*:3]"],"Bonds":["[#6:1]-[#6:2]"],"ProperTorsions":[]}"#
        );
        assert_eq!(selection.total(), 2);
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let table = CoverageTable::new();
        assert_eq!(
            select(&table, &[TagCategory::Bonds, TagCategory::Bonds], &definitions(), 1),
            Err(SelectError::DuplicateCategory(TagCategory::Bonds))
        );
    }
}
