use std::fmt;

use crate::component::Component;

/// A molecule instance: a typed node of a [`SpeciesGraph`](crate::SpeciesGraph)
/// owning its components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Molecule {
    /// Name of the [`MoleculeType`](crate::MoleculeType) this instance follows.
    pub name: String,
    pub components: Vec<Component>,
    /// Optional rule label (`%1`) pinning reactant/product correspondence.
    pub label: Option<String>,
    /// Compartment the molecule sits in (`@EC`). In a pattern, `None`
    /// matches any compartment.
    pub compartment: Option<String>,
}

impl Molecule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_compartment(mut self, compartment: impl Into<String>) -> Self {
        self.compartment = Some(compartment.into());
        self
    }

    pub fn component(&self, idx: usize) -> Option<&Component> {
        self.components.get(idx)
    }

    /// Number of components carrying the given name.
    pub fn count_named(&self, name: &str) -> usize {
        self.components.iter().filter(|c| c.name == name).count()
    }

    /// Index of the `nth` (0-based) component named `name`.
    pub fn nth_named(&self, name: &str, nth: usize) -> Option<usize> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .nth(nth)
            .map(|(i, _)| i)
    }

    /// Occurrence rank of component `idx` among same-named siblings.
    pub fn occurrence(&self, idx: usize) -> usize {
        let name = &self.components[idx].name;
        self.components[..idx]
            .iter()
            .filter(|c| &c.name == name)
            .count()
    }

    pub fn bond_count(&self) -> usize {
        self.components.iter().map(Component::bond_count).sum()
    }

    pub(crate) fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            components: self.components.iter().map(Component::detached).collect(),
            label: self.label.clone(),
            compartment: self.compartment.clone(),
        }
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(label) = &self.label {
            write!(f, "%{label}")?;
        }
        f.write_str("(")?;
        let mut first = true;
        for component in self.components.iter().filter(|c| !c.synthetic_wildcard) {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{component}")?;
        }
        f.write_str(")")?;
        if let Some(compartment) = &self.compartment {
            write!(f, "@{compartment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::BondWildcard;

    #[test]
    fn display_skips_synthetic_components() {
        let mol = Molecule::new("A")
            .with_component(Component::new("b").with_wildcard(BondWildcard::Plus))
            .with_component(Component::synthetic("c", Vec::new()));
        assert_eq!(mol.to_string(), "A(b!+)");
    }

    #[test]
    fn compartment_follows_the_component_list() {
        let mol = Molecule::new("R")
            .with_component(Component::new("l"))
            .with_compartment("PM");
        assert_eq!(mol.to_string(), "R(l)@PM");
    }

    #[test]
    fn empty_component_list() {
        assert_eq!(Molecule::new("Trash").to_string(), "Trash()");
    }

    #[test]
    fn occurrence_counts_same_named_siblings() {
        let mol = Molecule::new("L")
            .with_component(Component::new("r"))
            .with_component(Component::new("x"))
            .with_component(Component::new("r"));
        assert_eq!(mol.occurrence(0), 0);
        assert_eq!(mol.occurrence(2), 1);
        assert_eq!(mol.nth_named("r", 1), Some(2));
        assert_eq!(mol.nth_named("r", 2), None);
        assert_eq!(mol.count_named("r"), 2);
    }
}
