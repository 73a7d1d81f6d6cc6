use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element symbol: '{0}'")]
pub struct ParseElementError(pub String);

/// Chemical elements that appear in small-molecule force-field training sets.
///
/// The discriminant is the atomic number, so `element as u8` is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    H = 1,
    He = 2,
    Li = 3,
    Be = 4,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Ne = 10,
    Na = 11,
    Mg = 12,
    Al = 13,
    Si = 14,
    P = 15,
    S = 16,
    Cl = 17,
    Ar = 18,
    K = 19,
    Ca = 20,
    Zn = 30,
    As = 33,
    Se = 34,
    Br = 35,
    I = 53,
}

static SYMBOLS: Map<&'static str, Element> = phf_map! {
    "H" => Element::H,
    "He" => Element::He,
    "Li" => Element::Li,
    "Be" => Element::Be,
    "B" => Element::B,
    "C" => Element::C,
    "N" => Element::N,
    "O" => Element::O,
    "F" => Element::F,
    "Ne" => Element::Ne,
    "Na" => Element::Na,
    "Mg" => Element::Mg,
    "Al" => Element::Al,
    "Si" => Element::Si,
    "P" => Element::P,
    "S" => Element::S,
    "Cl" => Element::Cl,
    "Ar" => Element::Ar,
    "K" => Element::K,
    "Ca" => Element::Ca,
    "Zn" => Element::Zn,
    "As" => Element::As,
    "Se" => Element::Se,
    "Br" => Element::Br,
    "I" => Element::I,
};

impl Element {
    pub fn atomic_number(self) -> u8 {
        self as u8
    }

    pub fn is_hydrogen(self) -> bool {
        self == Element::H
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::He => "He",
            Element::Li => "Li",
            Element::Be => "Be",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Ne => "Ne",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Al => "Al",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::Ar => "Ar",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Zn => "Zn",
            Element::As => "As",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    /// Parses the lowercase aromatic form used by SMILES (`c`, `n`, `se`, ...).
    pub fn from_aromatic_symbol(s: &str) -> Option<Self> {
        match s {
            "b" => Some(Element::B),
            "c" => Some(Element::C),
            "n" => Some(Element::N),
            "o" => Some(Element::O),
            "p" => Some(Element::P),
            "s" => Some(Element::S),
            "se" => Some(Element::Se),
            "as" => Some(Element::As),
            _ => None,
        }
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SYMBOLS
            .get(s)
            .copied()
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_parses_case_sensitive_symbols() {
        assert_eq!("C".parse::<Element>(), Ok(Element::C));
        assert_eq!("Cl".parse::<Element>(), Ok(Element::Cl));
        assert_eq!("Br".parse::<Element>(), Ok(Element::Br));
        assert!("cl".parse::<Element>().is_err());
        assert!("Xx".parse::<Element>().is_err());
    }

    #[test]
    fn symbol_round_trips_through_display() {
        for symbol in ["H", "C", "N", "O", "S", "Se", "I"] {
            let element: Element = symbol.parse().unwrap();
            assert_eq!(element.to_string(), symbol);
        }
    }

    #[test]
    fn atomic_numbers_match_periodic_table() {
        assert_eq!(Element::H.atomic_number(), 1);
        assert_eq!(Element::C.atomic_number(), 6);
        assert_eq!(Element::S.atomic_number(), 16);
        assert_eq!(Element::I.atomic_number(), 53);
    }

    #[test]
    fn aromatic_symbols_map_to_elements() {
        assert_eq!(Element::from_aromatic_symbol("c"), Some(Element::C));
        assert_eq!(Element::from_aromatic_symbol("se"), Some(Element::Se));
        assert_eq!(Element::from_aromatic_symbol("cl"), None);
    }
}
