use super::tags::{LabeledRecord, TagAssignment, TagCategory};
use crate::core::models::record::RecordId;
use serde::Serialize;
use std::collections::BTreeMap;

/// A record that carries a tag, with its heavy-atom count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Sample {
    pub heavy_atoms: usize,
    pub record_id: RecordId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageEntry {
    pub count: usize,
    /// Sorted by heavy-atom count, then record id.
    pub samples: Vec<Sample>,
}

impl CoverageEntry {
    fn add_sample(&mut self, sample: Sample, limit: Option<usize>) {
        let position = self
            .samples
            .binary_search(&sample)
            .unwrap_or_else(|position| position);
        if limit.is_some_and(|n| position >= n) {
            return;
        }
        self.samples.insert(position, sample);
        if let Some(n) = limit {
            self.samples.truncate(n);
        }
    }
}

/// Per-tag coverage across a corpus of labeled records.
///
/// Counts only ever grow. Folding the same records in any order, or folding
/// disjoint partitions separately and merging, gives an identical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageTable {
    entries: BTreeMap<TagAssignment, CoverageEntry>,
    sample_limit: Option<usize>,
}

impl CoverageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `n` samples per tag, preferring the smallest molecules.
    pub fn with_sample_limit(n: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            sample_limit: Some(n),
        }
    }

    pub fn sample_limit(&self) -> Option<usize> {
        self.sample_limit
    }

    /// Adds one record. Each of its tags is counted once.
    pub fn fold(&mut self, record: &LabeledRecord) {
        let sample = Sample {
            heavy_atoms: record.heavy_atoms,
            record_id: record.record_id,
        };
        for tag in &record.tags {
            let entry = self.entries.entry(tag.clone()).or_default();
            entry.count += 1;
            entry.add_sample(sample, self.sample_limit);
        }
    }

    pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a LabeledRecord>) -> Self {
        let mut table = Self::new();
        table.extend(records);
        table
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a LabeledRecord>) {
        for record in records {
            self.fold(record);
        }
    }

    /// Sums counts of two tables built from disjoint record sets.
    pub fn merge(mut self, other: CoverageTable) -> CoverageTable {
        for (tag, entry) in other.entries {
            let target = self.entries.entry(tag).or_default();
            target.count += entry.count;
            for sample in entry.samples {
                target.add_sample(sample, self.sample_limit);
            }
        }
        self
    }

    pub fn count(&self, category: &TagCategory, tag_id: &str) -> usize {
        self.get(category, tag_id).map_or(0, |e| e.count)
    }

    pub fn samples(&self, category: &TagCategory, tag_id: &str) -> &[Sample] {
        self.get(category, tag_id)
            .map(|e| e.samples.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, category: &TagCategory, tag_id: &str) -> Option<&CoverageEntry> {
        self.entries
            .get(&TagAssignment::new(category.clone(), tag_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagAssignment, &CoverageEntry)> {
        self.entries.iter()
    }

    /// Tags of one category with their entries, sorted by id.
    pub fn in_category<'a>(
        &'a self,
        category: &'a TagCategory,
    ) -> impl Iterator<Item = (&'a str, &'a CoverageEntry)> + 'a {
        self.entries
            .iter()
            .filter(move |(tag, _)| &tag.category == category)
            .map(|(tag, entry)| (tag.tag_id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picks up to `n` sample records spread evenly from the smallest to the
    /// largest molecule carrying the tag.
    pub fn subsample_by_size(
        &self,
        category: &TagCategory,
        tag_id: &str,
        n: usize,
    ) -> Vec<RecordId> {
        let samples = self.samples(category, tag_id);
        if n == 0 || samples.is_empty() {
            return Vec::new();
        }
        if n >= samples.len() {
            return samples.iter().map(|s| s.record_id).collect();
        }
        if n == 1 {
            return vec![samples[0].record_id];
        }
        let last = samples.len() - 1;
        (0..n)
            .map(|i| {
                let position = (i * last + (n - 1) / 2) / (n - 1);
                samples[position].record_id
            })
            .collect()
    }
}

impl<'a> FromIterator<&'a LabeledRecord> for CoverageTable {
    fn from_iter<I: IntoIterator<Item = &'a LabeledRecord>>(iter: I) -> Self {
        Self::aggregate(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::thread_rng;
    use std::collections::BTreeSet;

    fn labeled(id: RecordId, heavy_atoms: usize, tags: &[(&TagCategory, &str)]) -> LabeledRecord {
        LabeledRecord {
            record_id: id,
            heavy_atoms,
            tags: tags
                .iter()
                .map(|(c, t)| TagAssignment::new((*c).clone(), t))
                .collect::<BTreeSet<_>>(),
        }
    }

    fn corpus() -> Vec<LabeledRecord> {
        let bonds = TagCategory::Bonds;
        let torsions = TagCategory::ProperTorsions;
        (0..40u64)
            .map(|i| {
                let mut tags = vec![(&bonds, "b1")];
                if i % 3 == 0 {
                    tags.push((&torsions, "t7"));
                }
                if i % 5 == 0 {
                    tags.push((&bonds, "b2"));
                }
                labeled(i, (i as usize * 7) % 13 + 1, &tags)
            })
            .collect()
    }

    #[test]
    fn counts_each_tag_once_per_record() {
        let record = LabeledRecord {
            record_id: 1,
            heavy_atoms: 4,
            tags: [
                TagAssignment::new(TagCategory::Bonds, "b1"),
                TagAssignment::new(TagCategory::Bonds, "b1"),
            ]
            .into_iter()
            .collect(),
        };
        let table = CoverageTable::aggregate([&record]);
        assert_eq!(table.count(&TagCategory::Bonds, "b1"), 1);
        assert_eq!(table.count(&TagCategory::Bonds, "b9"), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let mut records = corpus();
        let expected = CoverageTable::aggregate(&records);
        assert_eq!(expected.count(&TagCategory::Bonds, "b1"), 40);
        assert_eq!(expected.count(&TagCategory::ProperTorsions, "t7"), 14);
        assert_eq!(expected.count(&TagCategory::Bonds, "b2"), 8);

        let mut rng = thread_rng();
        for _ in 0..10 {
            records.shuffle(&mut rng);
            assert_eq!(CoverageTable::aggregate(&records), expected);
        }
    }

    #[test]
    fn merging_partitions_matches_single_pass() {
        let records = corpus();
        let expected = CoverageTable::aggregate(&records);
        let (left, right) = records.split_at(17);
        let merged = CoverageTable::aggregate(left).merge(CoverageTable::aggregate(right));
        assert_eq!(merged, expected);
    }

    #[test]
    fn sample_limit_keeps_smallest_molecules_in_any_order() {
        let mut records = corpus();
        let mut table = CoverageTable::with_sample_limit(3);
        table.extend(&records);
        let samples = table.samples(&TagCategory::Bonds, "b1").to_vec();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.heavy_atoms == 1));
        assert_eq!(table.count(&TagCategory::Bonds, "b1"), 40);

        records.reverse();
        let mut reversed = CoverageTable::with_sample_limit(3);
        reversed.extend(&records);
        assert_eq!(reversed, table);
    }

    #[test]
    fn subsample_spreads_over_sizes() {
        let records: Vec<_> = (0..10u64)
            .map(|i| labeled(i, i as usize + 1, &[(&TagCategory::Angles, "a1")]))
            .collect();
        let table = CoverageTable::aggregate(&records);
        assert_eq!(
            table.subsample_by_size(&TagCategory::Angles, "a1", 3),
            vec![0, 5, 9]
        );
        assert_eq!(table.subsample_by_size(&TagCategory::Angles, "a1", 1), vec![0]);
        assert_eq!(table.subsample_by_size(&TagCategory::Angles, "a1", 50).len(), 10);
        assert!(table.subsample_by_size(&TagCategory::Angles, "a9", 3).is_empty());
    }
}
