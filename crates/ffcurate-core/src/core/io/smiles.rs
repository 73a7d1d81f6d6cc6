use crate::core::models::element::Element;
use crate::core::models::molecule::{Atom, Bond, BondOrder, Molecule, MoleculeError};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Descriptor is empty")]
    Empty,
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    #[error("Unknown element '{symbol}' at position {pos}")]
    UnknownElement { pos: usize, symbol: String },
    #[error("Unterminated bracket atom starting at position {0}")]
    UnterminatedBracket(usize),
    #[error("Unmatched ')' at position {0}")]
    UnmatchedBranchClose(usize),
    #[error("Unclosed branch '('")]
    UnclosedBranch,
    #[error("Ring closure {0} is never closed")]
    UnclosedRing(u32),
    #[error("Bond symbol or ring closure at position {0} has no preceding atom")]
    DanglingBond(usize),
    #[error("Conflicting bond orders on ring closure {0}")]
    RingBondConflict(u32),
    #[error("Atom-map number {0} is used more than once")]
    DuplicateMapNumber(u32),
    #[error("Atom-map numbers must cover 1..={n_atoms}, found {found}")]
    InvalidMapNumber { found: u32, n_atoms: usize },
    #[error("Only some atoms carry atom-map numbers")]
    PartialMapping,
    #[error(transparent)]
    Graph(#[from] MoleculeError),
}

/// Parses an atom-mapped SMILES string into a [`Molecule`].
///
/// When every atom carries a map number, atom `n` of the map lands at index
/// `n - 1`, matching the row order of the record's coordinates. Unmapped
/// descriptors keep their textual atom order. Hydrogens only become atoms when
/// they are written explicitly (`[H:5]`); implicit counts such as `[CH3]` are
/// read and discarded.
pub fn parse_mapped_smiles(smiles: &str) -> Result<Molecule, SmilesError> {
    let text = smiles.split_whitespace().next().ok_or(SmilesError::Empty)?;
    let mut parser = Parser::new(text);
    parser.run()?;
    let (atoms, bonds) = apply_atom_map(parser.atoms, parser.bonds)?;
    Ok(Molecule::new(smiles.trim(), atoms, bonds)?)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    current: Option<usize>,
    pending_bond: Option<BondOrder>,
    branch_stack: Vec<Option<usize>>,
    // ring number -> (opening atom, explicit bond order at the opening)
    open_rings: HashMap<u32, (usize, Option<BondOrder>)>,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            current: None,
            pending_bond: None,
            branch_stack: Vec::new(),
            open_rings: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) -> Result<(), SmilesError> {
        while let Some(ch) = self.peek() {
            match ch {
                '-' | '/' | '\\' => self.set_bond(BondOrder::Single)?,
                '=' => self.set_bond(BondOrder::Double)?,
                '#' => self.set_bond(BondOrder::Triple)?,
                ':' => self.set_bond(BondOrder::Aromatic)?,
                '(' => {
                    if self.current.is_none() {
                        return Err(SmilesError::UnexpectedChar { pos: self.pos, ch });
                    }
                    self.branch_stack.push(self.current);
                    self.pos += 1;
                }
                ')' => {
                    let previous = self
                        .branch_stack
                        .pop()
                        .ok_or(SmilesError::UnmatchedBranchClose(self.pos))?;
                    self.current = previous;
                    self.pending_bond = None;
                    self.pos += 1;
                }
                '.' => {
                    self.current = None;
                    self.pending_bond = None;
                    self.pos += 1;
                }
                '%' => {
                    let start = self.pos;
                    self.pos += 1;
                    let d1 = self.take_digit(start)?;
                    let d2 = self.take_digit(start)?;
                    self.ring_closure(d1 * 10 + d2, start)?;
                }
                '0'..='9' => {
                    let start = self.pos;
                    let digit = self.take_digit(start)?;
                    self.ring_closure(digit, start)?;
                }
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.push_atom(atom);
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.push_atom(atom);
                }
            }
        }

        if !self.branch_stack.is_empty() {
            return Err(SmilesError::UnclosedBranch);
        }
        if let Some(&ring) = self.open_rings.keys().min() {
            return Err(SmilesError::UnclosedRing(ring));
        }
        if self.atoms.is_empty() {
            return Err(SmilesError::Empty);
        }
        Ok(())
    }

    fn set_bond(&mut self, order: BondOrder) -> Result<(), SmilesError> {
        if self.current.is_none() {
            return Err(SmilesError::DanglingBond(self.pos));
        }
        self.pending_bond = Some(order);
        self.pos += 1;
        Ok(())
    }

    fn take_digit(&mut self, start: usize) -> Result<u32, SmilesError> {
        match self.peek().and_then(|c| c.to_digit(10)) {
            Some(d) => {
                self.pos += 1;
                Ok(d)
            }
            None => Err(SmilesError::UnexpectedChar {
                pos: start,
                ch: self.chars.get(start).copied().unwrap_or('%'),
            }),
        }
    }

    fn implicit_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn push_atom(&mut self, atom: Atom) {
        let index = self.atoms.len();
        self.atoms.push(atom);
        if let Some(previous) = self.current {
            let order = self
                .pending_bond
                .take()
                .unwrap_or_else(|| self.implicit_order(previous, index));
            self.bonds.push(Bond::new(previous, index, order));
        }
        self.pending_bond = None;
        self.current = Some(index);
    }

    fn ring_closure(&mut self, ring: u32, start: usize) -> Result<(), SmilesError> {
        let atom = self.current.ok_or(SmilesError::DanglingBond(start))?;
        let explicit = self.pending_bond.take();
        match self.open_rings.remove(&ring) {
            None => {
                self.open_rings.insert(ring, (atom, explicit));
            }
            Some((opener, opening_order)) => {
                let order = match (opening_order, explicit) {
                    (Some(a), Some(b)) if a != b => return Err(SmilesError::RingBondConflict(ring)),
                    (Some(a), _) | (None, Some(a)) => a,
                    (None, None) => self.implicit_order(opener, atom),
                };
                self.bonds.push(Bond::new(opener, atom, order));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let ch = self.peek().ok_or(SmilesError::Empty)?;
        let two: String = [Some(ch), self.peek_at(1)].iter().flatten().collect();

        let (element, aromatic, width) = match two.as_str() {
            "Cl" => (Element::Cl, false, 2),
            "Br" => (Element::Br, false, 2),
            _ => match ch {
                'B' => (Element::B, false, 1),
                'C' => (Element::C, false, 1),
                'N' => (Element::N, false, 1),
                'O' => (Element::O, false, 1),
                'P' => (Element::P, false, 1),
                'S' => (Element::S, false, 1),
                'F' => (Element::F, false, 1),
                'I' => (Element::I, false, 1),
                'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                    let element = Element::from_aromatic_symbol(&ch.to_string())
                        .ok_or(SmilesError::UnexpectedChar { pos: start, ch })?;
                    (element, true, 1)
                }
                _ => return Err(SmilesError::UnexpectedChar { pos: start, ch }),
            },
        };
        self.pos += width;
        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        Ok(atom)
    }

    // [isotope? symbol chirality? hcount? charge? (:map)?]
    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let open = self.pos;
        self.pos += 1;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }

        let symbol_start = self.pos;
        let first = self.peek().ok_or(SmilesError::UnterminatedBracket(open))?;
        let second = self.peek_at(1).filter(|c| c.is_ascii_lowercase());
        let (element, aromatic) = if first.is_ascii_uppercase() {
            // Inside brackets a lowercase letter after the capital always belongs to the symbol.
            let symbol = match second {
                Some(s) => format!("{first}{s}"),
                None => first.to_string(),
            };
            let element = symbol
                .parse::<Element>()
                .map_err(|_| SmilesError::UnknownElement {
                    pos: symbol_start,
                    symbol: symbol.clone(),
                })?;
            self.pos += symbol.len();
            (element, false)
        } else if first.is_ascii_lowercase() {
            let two = second.map(|s| format!("{first}{s}"));
            match two.as_deref().and_then(Element::from_aromatic_symbol) {
                Some(element) => {
                    self.pos += 2;
                    (element, true)
                }
                None => {
                    let element = Element::from_aromatic_symbol(&first.to_string()).ok_or(
                        SmilesError::UnknownElement {
                            pos: symbol_start,
                            symbol: first.to_string(),
                        },
                    )?;
                    self.pos += 1;
                    (element, true)
                }
            }
        } else {
            return Err(SmilesError::UnexpectedChar {
                pos: symbol_start,
                ch: first,
            });
        };

        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;

        while self.peek() == Some('@') {
            self.pos += 1;
        }

        if self.peek() == Some('H') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        if let Some(sign @ ('+' | '-')) = self.peek() {
            let unit: i8 = if sign == '+' { 1 } else { -1 };
            self.pos += 1;
            let mut magnitude = 1i8;
            if let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                magnitude = d as i8;
                self.pos += 1;
            } else {
                while self.peek() == Some(sign) {
                    magnitude += 1;
                    self.pos += 1;
                }
            }
            atom.formal_charge = unit * magnitude;
        }

        if self.peek() == Some(':') {
            self.pos += 1;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            let map = digits.parse::<u32>().map_err(|_| SmilesError::UnexpectedChar {
                pos: digits_start,
                ch: self.peek().unwrap_or(']'),
            })?;
            atom.map_number = Some(map);
        }

        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(atom)
            }
            Some(ch) => Err(SmilesError::UnexpectedChar { pos: self.pos, ch }),
            None => Err(SmilesError::UnterminatedBracket(open)),
        }
    }
}

fn apply_atom_map(
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
) -> Result<(Vec<Atom>, Vec<Bond>), SmilesError> {
    let mapped = atoms.iter().filter(|a| a.map_number.is_some()).count();
    if mapped == 0 {
        return Ok((atoms, bonds));
    }
    if mapped != atoms.len() {
        return Err(SmilesError::PartialMapping);
    }

    let n_atoms = atoms.len();
    let mut seen = HashSet::new();
    let mut new_index = Vec::with_capacity(n_atoms);
    for atom in &atoms {
        let map = atom.map_number.unwrap_or(0);
        if map == 0 || map as usize > n_atoms {
            return Err(SmilesError::InvalidMapNumber {
                found: map,
                n_atoms,
            });
        }
        if !seen.insert(map) {
            return Err(SmilesError::DuplicateMapNumber(map));
        }
        new_index.push(map as usize - 1);
    }

    let mut ordered: Vec<Option<Atom>> = vec![None; n_atoms];
    for (old, atom) in atoms.into_iter().enumerate() {
        ordered[new_index[old]] = Some(atom);
    }
    let atoms = ordered.into_iter().flatten().collect();
    let bonds = bonds
        .into_iter()
        .map(|b| Bond::new(new_index[b.i], new_index[b.j], b.order))
        .collect();
    Ok((atoms, bonds))
}
