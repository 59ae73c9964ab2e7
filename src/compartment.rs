use std::collections::BTreeMap;
use std::fmt;

use crate::error::PatternError;
use crate::graph::SpeciesGraph;

/// A volume (3D) or surface (2D) region molecules can live in.
#[derive(Debug, Clone, PartialEq)]
pub struct Compartment {
    pub name: String,
    /// 2 for a surface, 3 for a volume.
    pub dimension: u8,
    pub size: f64,
    /// Enclosing compartment.
    pub parent: Option<String>,
}

impl Compartment {
    pub fn volume(name: impl Into<String>, size: f64) -> Self {
        Self {
            name: name.into(),
            dimension: 3,
            size,
            parent: None,
        }
    }

    pub fn surface(name: impl Into<String>, size: f64) -> Self {
        Self {
            dimension: 2,
            ..Self::volume(name, size)
        }
    }

    pub fn inside(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn is_surface(&self) -> bool {
        self.dimension == 2
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.dimension, self.size)?;
        if let Some(parent) = &self.parent {
            write!(f, " {parent}")?;
        }
        Ok(())
    }
}

/// The model-wide compartment table.
///
/// An empty table means the model is not compartmental: every adjacency and
/// interaction check passes and every reaction has volume 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compartments {
    by_name: BTreeMap<String, Compartment>,
}

impl Compartments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compartment, replacing any earlier one of the same name.
    pub fn insert(&mut self, compartment: Compartment) -> Option<Compartment> {
        self.by_name.insert(compartment.name.clone(), compartment)
    }

    pub fn get(&self, name: &str) -> Option<&Compartment> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compartment> {
        self.by_name.values()
    }

    /// Every molecule compartment in `graph` must be declared.
    pub fn validate(&self, graph: &SpeciesGraph) -> Result<(), PatternError> {
        for mol in graph.molecules() {
            if let Some(name) = &mol.compartment {
                if !self.by_name.contains_key(name) {
                    return Err(PatternError::UndeclaredCompartment(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Same compartment, or one directly encloses the other. Unknown names
    /// are not restricted.
    pub fn adjacent(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(ca), Some(cb)) => {
                ca.parent.as_deref() == Some(b) || cb.parent.as_deref() == Some(a)
            }
            _ => true,
        }
    }

    /// Whether every bond of `graph` joins molecules in adjacent compartments.
    pub fn bonds_adjacent(&self, graph: &SpeciesGraph) -> bool {
        graph.bonds().iter().all(|bond| {
            let ca = graph.molecule(bond.a.molecule).compartment.as_deref();
            let cb = graph.molecule(bond.b.molecule).compartment.as_deref();
            match (ca, cb) {
                (Some(a), Some(b)) => self.adjacent(a, b),
                _ => true,
            }
        })
    }

    /// The compartment a species lives in: the lowest-dimensional one among
    /// its molecules, first in molecule order on ties.
    pub fn species_compartment<'g>(&self, species: &'g SpeciesGraph) -> Option<&'g str> {
        species
            .molecules()
            .iter()
            .filter_map(|m| m.compartment.as_deref())
            .enumerate()
            .min_by_key(|&(i, name)| (self.get(name).map_or(3, |c| c.dimension), i))
            .map(|(_, name)| name)
    }

    /// Whether species in compartments `a` and `b` may react together.
    /// Two volumes or two surfaces must be the same compartment; a volume
    /// and a surface must be adjacent.
    pub fn interacting(&self, a: Option<&str>, b: Option<&str>) -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return true;
        };
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(ca), Some(cb)) if ca.dimension == cb.dimension => false,
            (Some(_), Some(_)) => self.adjacent(a, b),
            _ => true,
        }
    }

    /// Size of the compartment that anchors a reaction: the first volume
    /// among the reactants, else the first surface, else 1. Synthesis
    /// anchors on its products.
    pub fn scaling_volume(&self, reactants: &[&SpeciesGraph], products: &[&SpeciesGraph]) -> f64 {
        let anchors = if reactants.is_empty() { products } else { reactants };
        let located: Vec<&Compartment> = anchors
            .iter()
            .filter_map(|s| self.species_compartment(s))
            .filter_map(|name| self.get(name))
            .collect();
        located
            .iter()
            .find(|c| !c.is_surface())
            .or_else(|| located.first())
            .map_or(1.0, |c| c.size)
    }
}

impl FromIterator<Compartment> for Compartments {
    fn from_iter<I: IntoIterator<Item = Compartment>>(iter: I) -> Self {
        let mut table = Self::new();
        for c in iter {
            table.insert(c);
        }
        table
    }
}
