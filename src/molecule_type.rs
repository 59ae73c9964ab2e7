use std::collections::BTreeMap;
use std::fmt;

use crate::component::{BondWildcard, Component};
use crate::error::{GraphError, PatternError};
use crate::graph::SpeciesGraph;
use crate::molecule::Molecule;

/// A named molecule template: the ordered list of sites it declares.
///
/// Templates carry no bonds and no current state. A name may be declared
/// more than once through [`add_site`](Self::add_site) for multi-site types
/// like `L(r,r)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoleculeType {
    pub name: String,
    components: Vec<Component>,
}

impl MoleculeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Declares a single site. Redefining an existing name replaces every
    /// earlier declaration of it.
    pub fn add_component<S: Into<String>>(&mut self, name: &str, states: impl IntoIterator<Item = S>) {
        let component = Component::with_states(name, states);
        match self.components.iter().position(|c| c.name == name) {
            Some(pos) => {
                self.components[pos] = component;
                let mut idx = 0;
                self.components.retain(|c| {
                    let keep = idx <= pos || c.name != name;
                    idx += 1;
                    keep
                });
            }
            None => self.components.push(component),
        }
    }

    /// Declares one more copy of a site, keeping earlier copies.
    pub fn add_site<S: Into<String>>(&mut self, name: &str, states: impl IntoIterator<Item = S>) {
        self.components.push(Component::with_states(name, states));
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Number of declared copies of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.components.iter().filter(|c| c.name == name).count()
    }

    /// A fully specified, unbound instance with every stateful site in its
    /// first declared state.
    pub fn instantiate(&self) -> Molecule {
        let mut mol = Molecule::new(self.name.clone());
        for template in &self.components {
            let mut comp = Component::with_states(template.name.clone(), template.states.clone());
            comp.state = template.states.first().cloned();
            mol.components.push(comp);
        }
        mol
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, comp) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(&comp.name)?;
            for state in &comp.states {
                write!(f, "~{state}")?;
            }
        }
        f.write_str(")")
    }
}

/// The model-wide molecule type table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoleculeTypes {
    types: BTreeMap<String, MoleculeType>,
}

impl MoleculeTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type, replacing any earlier type of the same name.
    pub fn insert(&mut self, molecule_type: MoleculeType) -> Option<MoleculeType> {
        self.types.insert(molecule_type.name.clone(), molecule_type)
    }

    pub fn get(&self, name: &str) -> Option<&MoleculeType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MoleculeType> {
        self.types.values()
    }

    /// Checks that every molecule, component and state in `pattern` is
    /// declared and that no wildcard contradicts its explicit bonds.
    pub fn validate_pattern(&self, pattern: &SpeciesGraph) -> Result<(), PatternError> {
        for mol in pattern.molecules() {
            let mt = self
                .get(&mol.name)
                .ok_or_else(|| PatternError::UndeclaredMolecule(mol.name.clone()))?;
            for comp in &mol.components {
                let template = mt
                    .component(&comp.name)
                    .ok_or_else(|| PatternError::UndeclaredComponent {
                        molecule: mol.name.clone(),
                        component: comp.name.clone(),
                    })?;
                if let Some(state) = &comp.state {
                    if !template.states.contains(state) {
                        return Err(PatternError::UndeclaredState {
                            molecule: mol.name.clone(),
                            component: comp.name.clone(),
                            state: state.clone(),
                        });
                    }
                }
                if !comp.wildcard.consistent_with_explicit(comp.bond_count()) {
                    return Err(GraphError::UnsatisfiableWildcard {
                        molecule: mol.name.clone(),
                        component: comp.name.clone(),
                        wildcard: comp.wildcard,
                        bonds: comp.bond_count(),
                    }
                    .into());
                }
            }
            for template in mt.components() {
                let used = mol.count_named(&template.name);
                let declared = mt.count(&template.name);
                if used > declared {
                    return Err(PatternError::TooManyCopies {
                        molecule: mol.name.clone(),
                        component: template.name.clone(),
                        used,
                        declared,
                    });
                }
            }
        }
        Ok(())
    }

    /// Pattern checks plus the species rule that no wildcard may appear.
    pub fn validate_species(&self, species: &SpeciesGraph) -> Result<(), PatternError> {
        self.validate_pattern(species)?;
        let has_wildcard = species
            .molecules()
            .iter()
            .flat_map(|m| m.components.iter())
            .any(|c| c.wildcard != BondWildcard::None);
        if has_wildcard {
            return Err(PatternError::WildcardInSpecies(species.to_string()));
        }
        Ok(())
    }

    /// Appends a synthetic `!?` site for every declared site a pattern
    /// molecule leaves out, and copies allowed-state lists onto authored sites.
    ///
    /// Undeclared molecule types are left untouched; validation reports them.
    pub fn complete_missing_components(&self, pattern: &mut SpeciesGraph) {
        self.complete_with(pattern, |template| {
            Component::synthetic(template.name.clone(), template.states.clone())
        });
    }

    /// Fills a species the same way, but missing sites become unbound and
    /// take their first declared state. Authored stateful sites with no state
    /// also take the default.
    pub fn complete_species(&self, species: &mut SpeciesGraph) {
        self.complete_with(species, |template| {
            let mut comp = Component::with_states(template.name.clone(), template.states.clone());
            comp.state = template.states.first().cloned();
            comp
        });
        for idx in 0..species.molecule_count() {
            for comp in &mut species.molecule_mut(idx).components {
                if comp.state.is_none() {
                    comp.state = comp.states.first().cloned();
                }
            }
        }
    }

    fn complete_with(&self, graph: &mut SpeciesGraph, make: impl Fn(&Component) -> Component) {
        for idx in 0..graph.molecule_count() {
            let Some(mt) = self.get(&graph.molecule(idx).name) else {
                continue;
            };
            for comp in &mut graph.molecule_mut(idx).components {
                if let Some(template) = mt.component(&comp.name) {
                    comp.states = template.states.clone();
                }
            }
            let mut missing = Vec::new();
            let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
            for template in mt.components() {
                let nth = seen.entry(template.name.as_str()).or_insert(0);
                if graph.molecule(idx).count_named(&template.name) <= *nth {
                    missing.push(make(template));
                }
                *nth += 1;
            }
            for comp in missing {
                graph.push_component(idx, comp);
            }
        }
    }
}

impl FromIterator<MoleculeType> for MoleculeTypes {
    fn from_iter<I: IntoIterator<Item = MoleculeType>>(iter: I) -> Self {
        let mut table = Self::new();
        for mt in iter {
            table.insert(mt);
        }
        table
    }
}
