use phf::{Map, phf_map};

/// Substructures tracked in addition to the force field's own parameters.
///
/// Sulfur chemistry and small or hetero rings are under-represented in most
/// training sets, so their coverage is reported alongside parameter coverage.
static AUXILIARY_PATTERNS: Map<&'static str, &'static str> = phf_map! {
    "sx4" => "[*:1]-[#16X4:2](-*)(-*)-[*:3]",
    "sulfamide" => "[#7:1]-[#16X4:2](=[#8])(=[#8])~[#7:3]",
    "sulfonamide" => "[#7:1]-[#16X4:2](=[#8])(=[#8])~[*:3]",
    "r3" => "[r3:1]",
    "r4" => "[r4:1]",
    "r5" => "[r5:1]",
    "r5S" => "[r5:1]1@[#16;r5:2]@[r5:3]@[r5]@[r5]1",
    "r4O" => "[#8;r4:1]",
    "r4N" => "[#7;r4:1]",
    "r3C" => "[#6;r3:1]1@[#6;r3:2]@[#6;r3:3]1",
    "r3het" => "[#6;r3:1]1@[!#6;r3:2]@[#6;r3:3]1",
    "r4C" => "[#6;r4:1]1@[#6;r4:2]@[#6;r4:3]@[#6;r4]1",
};

/// SMARTS for an auxiliary pattern id.
pub fn auxiliary_pattern(id: &str) -> Option<&'static str> {
    AUXILIARY_PATTERNS.get(id).copied()
}

/// All auxiliary patterns as `(id, smarts)`, sorted by id.
pub fn auxiliary_patterns() -> Vec<(&'static str, &'static str)> {
    let mut entries: Vec<_> = AUXILIARY_PATTERNS
        .entries()
        .map(|(id, smarts)| (*id, *smarts))
        .collect();
    entries.sort_unstable();
    entries
}
