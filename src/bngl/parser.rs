use std::collections::BTreeMap;

use crate::compartment::Compartment;
use crate::component::{BondLabel, BondWildcard, Component, Site};
use crate::error::PatternError;
use crate::graph::SpeciesGraph;
use crate::molecule::Molecule;
use crate::molecule_type::MoleculeType;
use crate::rule::{RateLaw, ReactionRule};

use super::error::BnglError;

pub(super) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.src[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek().filter(|ch| ch.is_whitespace()) {
            self.pos += ch.len_utf8();
        }
    }

    pub(super) fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn unexpected(&self, expected: &'static str) -> BnglError {
        match self.peek() {
            Some(ch) => BnglError::UnexpectedChar {
                pos: self.pos,
                ch,
                expected,
            },
            None => BnglError::UnexpectedEnd { expected },
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<&'a str, BnglError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected(expected));
        }
        Ok(&self.src[start..self.pos])
    }

    pub(super) fn expect_end(&mut self) -> Result<(), BnglError> {
        self.skip_ws();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// A component as written, before bonds are resolved.
struct RawComponent {
    pos: usize,
    name: String,
    states: Vec<String>,
    any_state: bool,
    wildcard: BondWildcard,
    labels: Vec<(BondLabel, usize)>,
}

fn raw_component(c: &mut Cursor<'_>) -> Result<RawComponent, BnglError> {
    let pos = c.pos;
    let name = c.ident("component name")?.to_string();
    let mut states = Vec::new();
    let mut any_state = false;
    while c.eat('~') {
        if c.eat('?') {
            any_state = true;
        } else {
            states.push(c.ident("state")?.to_string());
        }
    }
    let mut wildcard = BondWildcard::None;
    let mut labels = Vec::new();
    while c.eat('!') {
        if let Some(w) = c.peek().and_then(BondWildcard::from_symbol) {
            c.bump();
            wildcard = w;
            continue;
        }
        let start = c.pos;
        while c.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            c.pos += 1;
        }
        if c.pos == start {
            return Err(c.unexpected("bond label or wildcard"));
        }
        let label = c.src[start..c.pos]
            .parse::<BondLabel>()
            .map_err(|_| BnglError::InvalidBondLabel { pos: start })?;
        labels.push((label, start));
    }
    Ok(RawComponent {
        pos,
        name,
        states,
        any_state,
        wildcard,
        labels,
    })
}

struct RawMolecule {
    name: String,
    label: Option<String>,
    compartment: Option<String>,
    components: Vec<RawComponent>,
}

fn raw_molecule(c: &mut Cursor<'_>) -> Result<RawMolecule, BnglError> {
    let name = c.ident("molecule name")?.to_string();
    let label = if c.eat('%') {
        Some(c.ident("molecule label")?.to_string())
    } else {
        None
    };
    let mut components = Vec::new();
    if c.eat('(') {
        c.skip_ws();
        if !c.eat(')') {
            loop {
                c.skip_ws();
                components.push(raw_component(c)?);
                c.skip_ws();
                if c.eat(',') {
                    continue;
                }
                if c.eat(')') {
                    break;
                }
                return Err(c.unexpected("',' or ')'"));
            }
        }
    }
    let compartment = if c.eat('@') {
        Some(c.ident("compartment name")?.to_string())
    } else {
        None
    };
    Ok(RawMolecule {
        name,
        label,
        compartment,
        components,
    })
}

/// `0` standing alone is the empty pattern.
fn at_null(c: &Cursor<'_>) -> bool {
    c.peek() == Some('0') && !c.peek_at(1).is_some_and(is_name_char)
}

pub(super) fn pattern(c: &mut Cursor<'_>) -> Result<SpeciesGraph, BnglError> {
    if at_null(c) {
        c.bump();
        return Ok(SpeciesGraph::new());
    }
    // `@C:` in front applies to every molecule that names no compartment.
    let species_compartment = if c.eat('@') {
        let name = c.ident("compartment name")?.to_string();
        if !c.eat(':') {
            return Err(c.unexpected("':'"));
        }
        Some(name)
    } else {
        None
    };
    let mut graph = SpeciesGraph::new();
    let mut bonds: BTreeMap<BondLabel, Vec<Site>> = BTreeMap::new();
    loop {
        let raw = raw_molecule(c)?;
        let mut mol = Molecule::new(raw.name);
        mol.label = raw.label;
        mol.compartment = raw.compartment.or_else(|| species_compartment.clone());
        let m = graph.molecule_count();
        for (ci, rc) in raw.components.into_iter().enumerate() {
            if rc.states.len() > 1 {
                return Err(BnglError::MultipleStates {
                    pos: rc.pos,
                    component: rc.name,
                });
            }
            let mut comp = Component::new(rc.name).with_wildcard(rc.wildcard);
            if !rc.any_state {
                comp.state = rc.states.into_iter().next();
            }
            for (label, _) in rc.labels {
                bonds.entry(label).or_default().push(Site::new(m, ci));
            }
            mol.components.push(comp);
        }
        graph.add_molecule(mol);
        if !c.eat('.') {
            break;
        }
    }
    for (label, sites) in bonds {
        if sites.len() != 2 {
            return Err(PatternError::DanglingBond {
                label,
                count: sites.len(),
            }
            .into());
        }
        graph
            .add_bond_with_label(sites[0], sites[1], label)
            .map_err(PatternError::from)?;
    }
    Ok(graph)
}

pub(super) fn molecule_type(c: &mut Cursor<'_>) -> Result<MoleculeType, BnglError> {
    let raw = raw_molecule(c)?;
    if raw.compartment.is_some() {
        return Err(c.unexpected("end of declaration"));
    }
    let mut mt = MoleculeType::new(raw.name);
    for rc in raw.components {
        if let Some(&(_, pos)) = rc.labels.first() {
            return Err(BnglError::BondInDeclaration { pos });
        }
        if rc.wildcard != BondWildcard::None {
            return Err(BnglError::BondInDeclaration { pos: rc.pos });
        }
        mt.add_site(&rc.name, rc.states);
    }
    Ok(mt)
}

fn word<'a>(c: &mut Cursor<'a>) -> (usize, &'a str) {
    c.skip_ws();
    let start = c.pos;
    while c.peek().is_some_and(|ch| !ch.is_whitespace()) {
        c.bump();
    }
    (start, &c.src[start..c.pos])
}

/// `name dimension size [parent]`, as in a `begin compartments` block.
pub(super) fn compartment(c: &mut Cursor<'_>) -> Result<Compartment, BnglError> {
    c.skip_ws();
    let name = c.ident("compartment name")?.to_string();
    let (pos, dim) = word(c);
    let dimension = match dim {
        "2" => 2,
        "3" => 3,
        "" => return Err(c.unexpected("compartment dimension")),
        _ => return Err(BnglError::InvalidDimension { pos }),
    };
    let (pos, size) = word(c);
    let size = match size.parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => v,
        _ if size.is_empty() => return Err(c.unexpected("compartment size")),
        _ => return Err(BnglError::InvalidSize { pos }),
    };
    c.skip_ws();
    let parent = if c.at_end() {
        None
    } else {
        Some(c.ident("parent compartment")?.to_string())
    };
    Ok(Compartment {
        name,
        dimension,
        size,
        parent,
    })
}

/// Patterns joined by `+`.
fn side(c: &mut Cursor<'_>) -> Result<Vec<SpeciesGraph>, BnglError> {
    let mut patterns = Vec::new();
    loop {
        c.skip_ws();
        let p = pattern(c)?;
        if !p.is_empty() {
            patterns.push(p);
        }
        c.skip_ws();
        if !c.eat('+') {
            return Ok(patterns);
        }
    }
}

/// One rate expression: everything up to whitespace or a top-level comma.
fn rate(c: &mut Cursor<'_>) -> Result<RateLaw, BnglError> {
    c.skip_ws();
    let start = c.pos;
    let mut depth = 0u32;
    while let Some(ch) = c.peek() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => break,
            ch if ch.is_whitespace() && depth == 0 => break,
            _ => {}
        }
        c.bump();
    }
    if c.pos == start {
        return Err(BnglError::MissingRate);
    }
    Ok(RateLaw::parse(&c.src[start..c.pos]))
}

/// Rule name before the first `:` when the prefix is a bare identifier.
fn rule_name<'a>(c: &mut Cursor<'a>) -> &'a str {
    let rest = c.rest();
    let Some((head, _)) = rest.split_once(':') else {
        return "";
    };
    let name = head.trim();
    if name.is_empty() || !name.chars().all(is_name_char) {
        return "";
    }
    c.pos += head.len() + 1;
    name
}

fn slot_constraint(
    c: &mut Cursor<'_>,
    reactants: usize,
) -> Result<(usize, SpeciesGraph), BnglError> {
    if !c.eat('(') {
        return Err(c.unexpected("'('"));
    }
    c.skip_ws();
    let start = c.pos;
    while c.peek().is_some_and(|ch| ch.is_ascii_digit()) {
        c.pos += 1;
    }
    let index: usize = c.src[start..c.pos]
        .parse()
        .map_err(|_| c.unexpected("reactant index"))?;
    if index == 0 || index > reactants {
        return Err(BnglError::ReactantIndex { index, reactants });
    }
    c.skip_ws();
    if !c.eat(',') {
        return Err(c.unexpected("','"));
    }
    c.skip_ws();
    let p = pattern(c)?;
    c.skip_ws();
    if !c.eat(')') {
        return Err(c.unexpected("')'"));
    }
    Ok((index - 1, p))
}

pub(super) fn rule(c: &mut Cursor<'_>) -> Result<ReactionRule, BnglError> {
    c.skip_ws();
    let name = rule_name(c).to_string();
    let reactants = side(c)?;
    c.skip_ws();
    let arrow = if c.eat_str("<->") {
        "<->"
    } else if c.eat_str("->") {
        "->"
    } else {
        return Err(BnglError::MissingArrow);
    };
    let products = side(c)?;

    let mut rates = vec![rate(c)?];
    c.skip_ws();
    if c.eat(',') {
        rates.push(rate(c)?);
    }
    let expected = if arrow == "<->" { 2 } else { 1 };
    if rates.len() != expected {
        return Err(BnglError::RateCountMismatch {
            arrow,
            rates: rates.len(),
        });
    }
    let mut rates = rates.into_iter();
    let forward = rates.next().ok_or(BnglError::MissingRate)?;
    let mut rule = ReactionRule::new(name, reactants, products, forward);
    rule.reverse_rate = rates.next();

    loop {
        c.skip_ws();
        if c.at_end() {
            break;
        }
        let word = c.ident("rule modifier")?;
        match word {
            "DeleteMolecules" => rule.delete_molecules = true,
            "include_reactants" => {
                let constraint = slot_constraint(c, rule.reactants.len())?;
                rule.include.push(constraint);
            }
            "exclude_reactants" => {
                let constraint = slot_constraint(c, rule.reactants.len())?;
                rule.exclude.push(constraint);
            }
            other => return Err(BnglError::UnknownModifier(other.to_string())),
        }
    }
    Ok(rule)
}
