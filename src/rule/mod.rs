mod apply;
mod compile;

pub use compile::{CompiledRule, GraphOp, OpSite};

use std::fmt;

use crate::graph::SpeciesGraph;

/// Rate of a rule: a number or an expression left for the simulator to
/// evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum RateLaw {
    Constant(f64),
    Expression(String),
}

impl RateLaw {
    /// Numbers become constants, anything else an expression.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let numeric = text
            .trim_start_matches(['+', '-'])
            .starts_with(|c: char| c.is_ascii_digit() || c == '.');
        match text.parse::<f64>() {
            Ok(value) if numeric => Self::Constant(value),
            _ => Self::Expression(text.to_string()),
        }
    }

    pub fn constant(&self) -> Option<f64> {
        match self {
            Self::Constant(value) => Some(*value),
            Self::Expression(_) => None,
        }
    }
}

impl fmt::Display for RateLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value}"),
            Self::Expression(text) => f.write_str(text),
        }
    }
}

impl From<f64> for RateLaw {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<&str> for RateLaw {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

/// A graph-rewriting rule: reactant patterns, product patterns, rate.
///
/// A reversible rule carries both rates until [`split`](Self::split) turns
/// it into two one-way rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRule {
    pub name: String,
    pub reactants: Vec<SpeciesGraph>,
    pub products: Vec<SpeciesGraph>,
    pub rate: RateLaw,
    pub reverse_rate: Option<RateLaw>,
    /// Remove only matched molecules instead of whole species when a
    /// reactant pattern disappears.
    pub delete_molecules: bool,
    /// `(slot, pattern)`: the species in `slot` must contain `pattern`.
    pub include: Vec<(usize, SpeciesGraph)>,
    /// `(slot, pattern)`: the species in `slot` must not contain `pattern`.
    pub exclude: Vec<(usize, SpeciesGraph)>,
}

impl ReactionRule {
    pub fn new(
        name: impl Into<String>,
        reactants: Vec<SpeciesGraph>,
        products: Vec<SpeciesGraph>,
        rate: impl Into<RateLaw>,
    ) -> Self {
        Self {
            name: name.into(),
            reactants,
            products,
            rate: rate.into(),
            reverse_rate: None,
            delete_molecules: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn with_reverse(mut self, rate: impl Into<RateLaw>) -> Self {
        self.reverse_rate = Some(rate.into());
        self
    }

    pub fn with_delete_molecules(mut self) -> Self {
        self.delete_molecules = true;
        self
    }

    pub fn include_reactants(mut self, slot: usize, pattern: SpeciesGraph) -> Self {
        self.include.push((slot, pattern));
        self
    }

    pub fn exclude_reactants(mut self, slot: usize, pattern: SpeciesGraph) -> Self {
        self.exclude.push((slot, pattern));
        self
    }

    pub fn is_bidirectional(&self) -> bool {
        self.reverse_rate.is_some()
    }

    pub fn is_synthesis(&self) -> bool {
        self.reactants.is_empty()
    }

    /// Splits a reversible rule into its forward and reverse halves.
    /// Slot constraints stay with the forward half.
    pub fn split(&self) -> (ReactionRule, Option<ReactionRule>) {
        let mut forward = self.clone();
        let Some(reverse_rate) = forward.reverse_rate.take() else {
            return (forward, None);
        };
        let reverse = ReactionRule {
            name: format!("_reverse_{}", self.name),
            reactants: self.products.clone(),
            products: self.reactants.clone(),
            rate: reverse_rate,
            reverse_rate: None,
            delete_molecules: self.delete_molecules,
            include: Vec::new(),
            exclude: Vec::new(),
        };
        (forward, Some(reverse))
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, side: &[SpeciesGraph]) -> fmt::Result {
    if side.is_empty() {
        return f.write_str("0");
    }
    for (i, pattern) in side.iter().enumerate() {
        if i > 0 {
            f.write_str(" + ")?;
        }
        write!(f, "{pattern}")?;
    }
    Ok(())
}

impl fmt::Display for ReactionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "{}: ", self.name)?;
        }
        write_side(f, &self.reactants)?;
        f.write_str(if self.is_bidirectional() { " <-> " } else { " -> " })?;
        write_side(f, &self.products)?;
        write!(f, " {}", self.rate)?;
        if let Some(reverse) = &self.reverse_rate {
            write!(f, ", {reverse}")?;
        }
        for (slot, pattern) in &self.include {
            write!(f, " include_reactants({},{pattern})", slot + 1)?;
        }
        for (slot, pattern) in &self.exclude {
            write!(f, " exclude_reactants({},{pattern})", slot + 1)?;
        }
        if self.delete_molecules {
            f.write_str(" DeleteMolecules")?;
        }
        Ok(())
    }
}
