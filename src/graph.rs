use std::fmt;

use crate::component::{BondLabel, Component, Site};
use crate::error::GraphError;
use crate::graph_ops;
use crate::molecule::Molecule;

/// A bond seen from its lower endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bond {
    pub label: BondLabel,
    pub a: Site,
    pub b: Site,
}

/// Molecule instances joined by bonds.
///
/// Storage is an arena: molecules are addressed by index and bonds are
/// recorded on both endpoint components as `label -> partner site`. Every
/// mutation keeps the two ends symmetric.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeciesGraph {
    molecules: Vec<Molecule>,
}

impl SpeciesGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from bond-free molecules. Any edges already present on
    /// the components are discarded.
    pub fn from_molecules(molecules: impl IntoIterator<Item = Molecule>) -> Self {
        Self {
            molecules: molecules.into_iter().map(|m| m.detached()).collect(),
        }
    }

    pub(crate) fn from_raw(molecules: Vec<Molecule>) -> Self {
        Self { molecules }
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, idx: usize) -> &Molecule {
        &self.molecules[idx]
    }

    pub(crate) fn molecule_mut(&mut self, idx: usize) -> &mut Molecule {
        &mut self.molecules[idx]
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    pub fn add_molecule(&mut self, molecule: Molecule) -> usize {
        self.molecules.push(molecule.detached());
        self.molecules.len() - 1
    }

    /// Adds a component to an existing molecule and returns its index.
    pub fn push_component(&mut self, molecule: usize, component: Component) -> usize {
        let comps = &mut self.molecules[molecule].components;
        comps.push(component.detached());
        comps.len() - 1
    }

    pub fn component(&self, site: Site) -> Option<&Component> {
        self.molecules
            .get(site.molecule)
            .and_then(|m| m.components.get(site.component))
    }

    pub(crate) fn component_mut(&mut self, site: Site) -> Option<&mut Component> {
        self.molecules
            .get_mut(site.molecule)
            .and_then(|m| m.components.get_mut(site.component))
    }

    pub fn set_state(&mut self, site: Site, state: Option<String>) -> Result<Option<String>, GraphError> {
        let comp = self.component_mut(site).ok_or(GraphError::NoSuchSite(site))?;
        Ok(std::mem::replace(&mut comp.state, state))
    }

    pub fn sites(&self) -> impl Iterator<Item = Site> + '_ {
        self.molecules.iter().enumerate().flat_map(|(m, mol)| {
            (0..mol.components.len()).map(move |c| Site::new(m, c))
        })
    }

    /// Smallest label strictly greater than every label in use.
    pub fn next_bond_label(&self) -> BondLabel {
        self.max_bond_label().map_or(1, |l| l + 1)
    }

    pub fn max_bond_label(&self) -> Option<BondLabel> {
        self.molecules
            .iter()
            .flat_map(|m| m.components.iter())
            .filter_map(|c| c.edges.keys().next_back().copied())
            .max()
    }

    /// Bonds two sites with a fresh label.
    pub fn add_bond(&mut self, a: Site, b: Site) -> Result<BondLabel, GraphError> {
        let label = self.next_bond_label();
        self.add_bond_with_label(a, b, label)?;
        Ok(label)
    }

    pub fn add_bond_with_label(&mut self, a: Site, b: Site, label: BondLabel) -> Result<(), GraphError> {
        if a == b {
            return Err(GraphError::SelfBond(a));
        }
        for site in [a, b] {
            let comp = self.component(site).ok_or(GraphError::NoSuchSite(site))?;
            if comp.edges.contains_key(&label) {
                return Err(GraphError::LabelInUse { site, label });
            }
            if !comp.wildcard.consistent_with_explicit(comp.bond_count() + 1) {
                return Err(GraphError::UnsatisfiableWildcard {
                    molecule: self.molecules[site.molecule].name.clone(),
                    component: comp.name.clone(),
                    wildcard: comp.wildcard,
                    bonds: comp.bond_count() + 1,
                });
            }
        }
        self.molecules[a.molecule].components[a.component]
            .edges
            .insert(label, b);
        self.molecules[b.molecule].components[b.component]
            .edges
            .insert(label, a);
        Ok(())
    }

    /// Removes the bond carrying `label` at `site`, returning the partner.
    pub fn delete_bond(&mut self, site: Site, label: BondLabel) -> Option<Site> {
        let partner = self.component_mut(site)?.edges.remove(&label)?;
        if let Some(other) = self.component_mut(partner) {
            other.edges.remove(&label);
        }
        Some(partner)
    }

    /// Removes every bond of `site`; returns how many were removed.
    pub fn delete_bonds(&mut self, site: Site) -> usize {
        let labels: Vec<BondLabel> = match self.component(site) {
            Some(c) => c.labels().collect(),
            None => return 0,
        };
        labels
            .into_iter()
            .filter(|&l| self.delete_bond(site, l).is_some())
            .count()
    }

    pub fn bond_between(&self, a: Site, b: Site) -> Option<BondLabel> {
        self.component(a)?
            .edges
            .iter()
            .find(|(_, &partner)| partner == b)
            .map(|(&l, _)| l)
    }

    /// Each bond exactly once, reported from its lower endpoint.
    pub fn bonds(&self) -> Vec<Bond> {
        let mut out = Vec::new();
        for a in self.sites() {
            for (&label, &b) in &self.molecules[a.molecule].components[a.component].edges {
                if a < b {
                    out.push(Bond { label, a, b });
                }
            }
        }
        out
    }

    pub fn bond_count(&self) -> usize {
        self.molecules.iter().map(Molecule::bond_count).sum::<usize>() / 2
    }

    pub fn neighbors(&self, molecule: usize) -> impl Iterator<Item = usize> + '_ {
        self.molecules[molecule]
            .components
            .iter()
            .flat_map(|c| c.edges.values().map(|s| s.molecule))
    }

    /// Appends clones of `other`'s molecules, shifting its bond labels above
    /// ours. Returns the molecule index offset of the appended block.
    pub fn merge(&mut self, other: &SpeciesGraph) -> usize {
        let offset = self.molecules.len();
        let label_offset = self.max_bond_label().unwrap_or(0);
        for mol in &other.molecules {
            let mut copy = mol.clone();
            for comp in &mut copy.components {
                comp.edges = comp
                    .edges
                    .iter()
                    .map(|(&l, &s)| (l + label_offset, Site::new(s.molecule + offset, s.component)))
                    .collect();
            }
            self.molecules.push(copy);
        }
        offset
    }

    /// Drops molecules flagged in `doomed`, cutting any bonds into them and
    /// compacting indices. Returns `old -> new` index map.
    pub fn remove_molecules(&mut self, doomed: &[bool]) -> Vec<Option<usize>> {
        let mut remap = Vec::with_capacity(self.molecules.len());
        let mut next = 0;
        for i in 0..self.molecules.len() {
            if doomed.get(i).copied().unwrap_or(false) {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }
        let old = std::mem::take(&mut self.molecules);
        for (i, mut mol) in old.into_iter().enumerate() {
            if remap[i].is_none() {
                continue;
            }
            for comp in &mut mol.components {
                comp.edges = comp
                    .edges
                    .iter()
                    .filter_map(|(&l, &s)| {
                        remap[s.molecule].map(|m| (l, Site::new(m, s.component)))
                    })
                    .collect();
            }
            self.molecules.push(mol);
        }
        remap
    }

    /// Connected pieces of this graph as independent graphs.
    pub fn split(&self) -> Vec<SpeciesGraph> {
        graph_ops::fragments(self)
    }

    pub fn is_connected(&self) -> bool {
        graph_ops::connected_components(self).len() <= 1
    }

    /// Verifies that every bond entry has its reciprocal.
    pub fn check_bond_symmetry(&self) -> bool {
        self.sites().all(|site| {
            self.molecules[site.molecule].components[site.component]
                .edges
                .iter()
                .all(|(&label, &partner)| {
                    self.component(partner)
                        .and_then(|p| p.partner(label))
                        .is_some_and(|back| back == site)
                })
        })
    }

    /// Count of molecules per type name, sorted by name.
    pub fn census(&self) -> Vec<(&str, usize)> {
        let mut names: Vec<&str> = self.molecules.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        let mut out: Vec<(&str, usize)> = Vec::new();
        for name in names {
            match out.last_mut() {
                Some((last, count)) if *last == name => *count += 1,
                _ => out.push((name, 1)),
            }
        }
        out
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.molecules.iter().filter(|m| m.name == name).count()
    }
}

impl fmt::Display for SpeciesGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.molecules.is_empty() {
            return f.write_str("0");
        }
        for (i, mol) in self.molecules.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{mol}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::BondWildcard;

    fn ab() -> SpeciesGraph {
        SpeciesGraph::from_molecules([
            Molecule::new("A").with_component(Component::new("b")),
            Molecule::new("B").with_component(Component::new("a")),
        ])
    }

    #[test]
    fn add_bond_is_symmetric() {
        let mut g = ab();
        let l = g.add_bond(Site::new(0, 0), Site::new(1, 0)).unwrap();
        assert_eq!(l, 1);
        assert_eq!(g.bond_between(Site::new(0, 0), Site::new(1, 0)), Some(1));
        assert_eq!(g.bond_between(Site::new(1, 0), Site::new(0, 0)), Some(1));
        assert!(g.check_bond_symmetry());
        assert_eq!(g.to_string(), "A(b!1).B(a!1)");
        assert_eq!(g.bond_count(), 1);
    }

    #[test]
    fn delete_bond_clears_both_ends() {
        let mut g = ab();
        let l = g.add_bond(Site::new(0, 0), Site::new(1, 0)).unwrap();
        assert_eq!(g.delete_bond(Site::new(1, 0), l), Some(Site::new(0, 0)));
        assert_eq!(g.bond_count(), 0);
        assert!(g.check_bond_symmetry());
        assert_eq!(g.to_string(), "A(b).B(a)");
    }

    #[test]
    fn minus_wildcard_refuses_bond() {
        let mut g = SpeciesGraph::from_molecules([
            Molecule::new("A").with_component(Component::new("b").with_wildcard(BondWildcard::Minus)),
            Molecule::new("B").with_component(Component::new("a")),
        ]);
        let err = g.add_bond(Site::new(0, 0), Site::new(1, 0)).unwrap_err();
        assert!(matches!(err, GraphError::UnsatisfiableWildcard { .. }));
        assert!(g.check_bond_symmetry());
        assert_eq!(g.bond_count(), 0);
    }

    #[test]
    fn self_bond_rejected() {
        let mut g = ab();
        assert_eq!(
            g.add_bond(Site::new(0, 0), Site::new(0, 0)),
            Err(GraphError::SelfBond(Site::new(0, 0)))
        );
    }

    #[test]
    fn merge_shifts_labels_and_indices() {
        let mut g = ab();
        g.add_bond(Site::new(0, 0), Site::new(1, 0)).unwrap();
        let other = g.clone();
        let offset = g.merge(&other);
        assert_eq!(offset, 2);
        assert_eq!(g.molecule_count(), 4);
        assert_eq!(g.bond_between(Site::new(2, 0), Site::new(3, 0)), Some(2));
        assert!(g.check_bond_symmetry());
        assert_eq!(g.split().len(), 2);
    }

    #[test]
    fn remove_molecules_cuts_bonds() {
        let mut g = ab();
        g.add_bond(Site::new(0, 0), Site::new(1, 0)).unwrap();
        let remap = g.remove_molecules(&[true, false]);
        assert_eq!(remap, vec![None, Some(0)]);
        assert_eq!(g.to_string(), "B(a)");
        assert!(g.check_bond_symmetry());
    }

    #[test]
    fn census_counts_types() {
        let mut g = ab();
        g.add_molecule(Molecule::new("A").with_component(Component::new("b")));
        assert_eq!(g.census(), vec![("A", 2), ("B", 1)]);
    }

    #[test]
    fn empty_graph_displays_zero() {
        assert_eq!(SpeciesGraph::new().to_string(), "0");
    }
}
