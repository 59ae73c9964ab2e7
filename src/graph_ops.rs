use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;

use crate::component::{BondLabel, Site};
use crate::error::RenumberError;
use crate::graph::SpeciesGraph;

/// Molecule-level view of a species graph: one node per molecule, one edge
/// per bond, weighted by bond label.
pub fn molecule_graph(graph: &SpeciesGraph) -> UnGraph<usize, BondLabel> {
    let mut g = UnGraph::with_capacity(graph.molecule_count(), graph.bond_count());
    for idx in 0..graph.molecule_count() {
        g.add_node(idx);
    }
    for bond in graph.bonds() {
        g.add_edge(
            NodeIndex::new(bond.a.molecule),
            NodeIndex::new(bond.b.molecule),
            bond.label,
        );
    }
    g
}

/// Molecule index sets of the connected pieces, each sorted, ordered by
/// their lowest molecule index.
pub fn connected_components(graph: &SpeciesGraph) -> Vec<Vec<usize>> {
    let n = graph.molecule_count();
    let mut uf = UnionFind::<usize>::new(n);
    for bond in graph.bonds() {
        uf.union(bond.a.molecule, bond.b.molecule);
    }
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut first_of_root: BTreeMap<usize, usize> = BTreeMap::new();
    for idx in 0..n {
        let root = uf.find(idx);
        let first = *first_of_root.entry(root).or_insert(idx);
        groups.entry(first).or_default().push(idx);
    }
    groups.into_values().collect()
}

pub fn num_fragments(graph: &SpeciesGraph) -> usize {
    connected_components(graph).len()
}

/// Splits a graph into independent connected graphs. Bond labels are kept
/// as they were.
pub fn fragments(graph: &SpeciesGraph) -> Vec<SpeciesGraph> {
    let pieces = connected_components(graph);
    if pieces.len() == 1 {
        return vec![graph.clone()];
    }
    pieces
        .into_iter()
        .map(|members| extract(graph, &members))
        .collect()
}

fn extract(graph: &SpeciesGraph, members: &[usize]) -> SpeciesGraph {
    let mut new_index = vec![None; graph.molecule_count()];
    for (new, &old) in members.iter().enumerate() {
        new_index[old] = Some(new);
    }
    let molecules = members
        .iter()
        .map(|&old| {
            let mut mol = graph.molecule(old).clone();
            for comp in &mut mol.components {
                comp.edges = comp
                    .edges
                    .iter()
                    .filter_map(|(&l, s)| new_index[s.molecule].map(|m| (l, Site::new(m, s.component))))
                    .collect();
            }
            mol
        })
        .collect();
    SpeciesGraph::from_raw(molecules)
}

fn validate_permutation(new_order: &[usize], n: usize) -> Result<(), RenumberError> {
    if new_order.len() != n {
        return Err(RenumberError::LengthMismatch {
            expected: n,
            got: new_order.len(),
        });
    }
    let mut seen = vec![false; n];
    for &idx in new_order {
        if idx >= n || seen[idx] {
            return Err(RenumberError::InvalidPermutation);
        }
        seen[idx] = true;
    }
    Ok(())
}

/// Reorders molecules. `new_order[new_idx] = old_idx`. Bond labels are kept.
pub fn renumber_molecules(
    graph: &SpeciesGraph,
    new_order: &[usize],
) -> Result<SpeciesGraph, RenumberError> {
    let n = graph.molecule_count();
    validate_permutation(new_order, n)?;

    let mut old_to_new = vec![0usize; n];
    for (new_idx, &old_idx) in new_order.iter().enumerate() {
        old_to_new[old_idx] = new_idx;
    }

    let molecules = new_order
        .iter()
        .map(|&old_idx| {
            let mut mol = graph.molecule(old_idx).clone();
            for comp in &mut mol.components {
                for site in comp.edges.values_mut() {
                    site.molecule = old_to_new[site.molecule];
                }
            }
            mol
        })
        .collect();
    Ok(SpeciesGraph::from_raw(molecules))
}

/// Renames bond labels through `map`. Labels absent from the map are kept.
/// The map must be injective over the labels present.
pub fn relabel_bonds(graph: &SpeciesGraph, map: &BTreeMap<BondLabel, BondLabel>) -> SpeciesGraph {
    let mut out = graph.clone();
    for idx in 0..out.molecule_count() {
        for comp in &mut out.molecule_mut(idx).components {
            comp.edges = comp
                .edges
                .iter()
                .map(|(l, &s)| (map.get(l).copied().unwrap_or(*l), s))
                .collect();
        }
    }
    out
}

/// Renames bond labels to 1, 2, ... in the order bonds are first met
/// walking molecules then components.
pub fn compact_bond_labels(graph: &SpeciesGraph) -> SpeciesGraph {
    let mut map = BTreeMap::new();
    let mut next = 1;
    for site in graph.sites() {
        if let Some(comp) = graph.component(site) {
            for label in comp.labels() {
                map.entry(label).or_insert_with(|| {
                    let l = next;
                    next += 1;
                    l
                });
            }
        }
    }
    relabel_bonds(graph, &map)
}
