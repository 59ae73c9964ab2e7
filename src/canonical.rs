use std::collections::BTreeMap;
use std::fmt;

use petgraph::unionfind::UnionFind;

use crate::component::{BondLabel, BondWildcard, Site};
use crate::graph::SpeciesGraph;
use crate::molecule::Molecule;

/// Deduplication identity of a species. Equal keys mean isomorphic graphs.
///
/// The key is the text of [`canonical_form`], so it also parses back into a
/// graph with the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn canonicalize(graph: &SpeciesGraph) -> CanonicalKey {
    CanonicalKey(search(graph).text)
}

/// The graph rewritten in canonical molecule and component order with bond
/// labels renumbered 1, 2, ... by first appearance.
pub fn canonical_form(graph: &SpeciesGraph) -> SpeciesGraph {
    search(graph).form
}

/// Key and canonical form from a single search.
pub fn canonicalize_with_form(graph: &SpeciesGraph) -> (CanonicalKey, SpeciesGraph) {
    let leaf = search(graph);
    (CanonicalKey(leaf.text), leaf.form)
}

/// Canonical molecule order: `order[new_idx] = old_idx`.
pub fn canonical_ordering(graph: &SpeciesGraph) -> Vec<usize> {
    search(graph).order
}

pub fn is_isomorphic(a: &SpeciesGraph, b: &SpeciesGraph) -> bool {
    a.molecule_count() == b.molecule_count()
        && a.bond_count() == b.bond_count()
        && canonicalize(a) == canonicalize(b)
}

// Molecule `m` is node `m`; its component `c` is node `n_mol + offsets[m] + c`.
struct Layout {
    n_mol: usize,
    offsets: Vec<usize>,
    sites: Vec<Site>,
    members: Vec<Vec<usize>>,
    bonds: Vec<Vec<usize>>,
}

impl Layout {
    fn new(graph: &SpeciesGraph) -> Self {
        let n_mol = graph.molecule_count();
        let mut offsets = Vec::with_capacity(n_mol);
        let mut sites = Vec::new();
        for (m, mol) in graph.molecules().iter().enumerate() {
            offsets.push(sites.len());
            sites.extend((0..mol.components.len()).map(|c| Site::new(m, c)));
        }
        let total = n_mol + sites.len();
        let mut layout = Self {
            n_mol,
            offsets,
            sites,
            members: vec![Vec::new(); total],
            bonds: vec![Vec::new(); total],
        };
        for i in 0..layout.sites.len() {
            let site = layout.sites[i];
            let node = n_mol + i;
            layout.members[site.molecule].push(node);
            layout.members[node].push(site.molecule);
            if let Some(comp) = graph.component(site) {
                for partner in comp.edges().values() {
                    let other = layout.node_of(*partner);
                    layout.bonds[node].push(other);
                }
            }
        }
        layout
    }

    fn len(&self) -> usize {
        self.n_mol + self.sites.len()
    }

    fn node_of(&self, site: Site) -> usize {
        self.n_mol + self.offsets[site.molecule] + site.component
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct NodeInvariant<'a> {
    is_component: bool,
    name: &'a str,
    compartment: Option<&'a str>,
    state: Option<&'a str>,
    wildcard: BondWildcard,
    synthetic: bool,
    bonds: usize,
}

fn node_invariant<'a>(graph: &'a SpeciesGraph, layout: &Layout, node: usize) -> NodeInvariant<'a> {
    if node < layout.n_mol {
        let mol = graph.molecule(node);
        return NodeInvariant {
            is_component: false,
            name: &mol.name,
            compartment: mol.compartment.as_deref(),
            state: None,
            wildcard: BondWildcard::None,
            synthetic: false,
            bonds: 0,
        };
    }
    let site = layout.sites[node - layout.n_mol];
    let comp = &graph.molecule(site.molecule).components[site.component];
    NodeInvariant {
        is_component: true,
        name: &comp.name,
        compartment: None,
        state: comp.state.as_deref(),
        wildcard: comp.wildcard,
        synthetic: comp.synthetic_wildcard,
        bonds: comp.bond_count(),
    }
}

fn ranks_from_keys<K: Ord>(keys: &[K]) -> Vec<usize> {
    let n = keys.len();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0usize; n];
    for i in 1..n {
        ranks[indices[i]] = if keys[indices[i]] == keys[indices[i - 1]] {
            ranks[indices[i - 1]]
        } else {
            i
        };
    }
    ranks
}

fn count_distinct(ranks: &[usize]) -> usize {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn refine(layout: &Layout, ranks: &mut Vec<usize>) {
    let mut prev_distinct = count_distinct(ranks);
    loop {
        let keys: Vec<(usize, Vec<usize>, Vec<usize>)> = (0..layout.len())
            .map(|v| {
                let mut members: Vec<usize> = layout.members[v].iter().map(|&u| ranks[u]).collect();
                members.sort_unstable();
                let mut bonds: Vec<usize> = layout.bonds[v].iter().map(|&u| ranks[u]).collect();
                bonds.sort_unstable();
                (ranks[v], members, bonds)
            })
            .collect();
        let new_ranks = ranks_from_keys(&keys);
        let distinct = count_distinct(&new_ranks);
        if distinct <= prev_distinct {
            return;
        }
        *ranks = new_ranks;
        prev_distinct = distinct;
    }
}

// Tied unbound components of one molecule never need splitting.
fn target_cell(layout: &Layout, graph: &SpeciesGraph, ranks: &[usize]) -> Option<Vec<usize>> {
    let mut cells: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for v in 0..layout.n_mol {
        cells.entry(ranks[v]).or_default().push(v);
    }
    if let Some(cell) = cells.into_values().find(|c| c.len() > 1) {
        return Some(cell);
    }
    let mut cells: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &site) in layout.sites.iter().enumerate() {
        let bound = graph.component(site).is_some_and(|c| c.is_bound());
        if bound {
            cells.entry(ranks[layout.n_mol + i]).or_default().push(layout.n_mol + i);
        }
    }
    cells.into_values().find(|c| c.len() > 1)
}

struct Leaf {
    text: String,
    form: SpeciesGraph,
    order: Vec<usize>,
    path: Vec<usize>,
    positions: Vec<usize>,
}

fn search(graph: &SpeciesGraph) -> Leaf {
    let layout = Layout::new(graph);
    let invariants: Vec<NodeInvariant<'_>> = (0..layout.len())
        .map(|v| node_invariant(graph, &layout, v))
        .collect();
    let mut ranks = ranks_from_keys(&invariants);
    refine(&layout, &mut ranks);

    let mut tree = Tree {
        graph,
        layout: &layout,
        first: None,
        best: None,
        automorphisms: Vec::new(),
    };
    tree.descend(ranks, &mut Vec::new());
    match tree.best {
        Some(leaf) => leaf,
        None => build_leaf(graph, &layout, &(0..layout.len()).collect::<Vec<_>>(), Vec::new()),
    }
}

struct Tree<'a> {
    graph: &'a SpeciesGraph,
    layout: &'a Layout,
    first: Option<(String, Vec<usize>, Vec<usize>)>,
    best: Option<Leaf>,
    automorphisms: Vec<Vec<usize>>,
}

impl Tree<'_> {
    // `Some(depth)`: the rest of the tree up to `depth` mirrors an explored
    // subtree.
    fn descend(&mut self, ranks: Vec<usize>, path: &mut Vec<usize>) -> Option<usize> {
        let Some(cell) = target_cell(self.layout, self.graph, &ranks) else {
            let leaf = build_leaf(self.graph, self.layout, &ranks, path.clone());
            return self.visit(leaf);
        };
        let depth = path.len();
        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        let mut explored: Vec<usize> = Vec::new();
        for candidate in cell {
            if !explored.is_empty() {
                let orbits = self.orbits(path);
                if explored.iter().any(|&e| orbits.equiv(e, candidate)) {
                    continue;
                }
            }
            let mut trial = ranks.clone();
            trial[candidate] = max_rank + 1;
            refine(self.layout, &mut trial);
            path.push(candidate);
            let unwind = self.descend(trial, path);
            path.pop();
            explored.push(candidate);
            if let Some(target) = unwind {
                if target < depth {
                    return Some(target);
                }
            }
        }
        None
    }

    fn visit(&mut self, leaf: Leaf) -> Option<usize> {
        let mut unwind: Option<usize> = None;
        let references = self
            .first
            .iter()
            .map(|(text, path, positions)| (text, path, positions))
            .chain(self.best.iter().map(|b| (&b.text, &b.path, &b.positions)));
        let mut found = Vec::new();
        for (text, path, positions) in references {
            if *text != leaf.text {
                continue;
            }
            let gamma = automorphism(positions, &leaf.positions);
            let shared = path.iter().zip(&leaf.path).take_while(|(a, b)| a == b).count();
            // The subtree at the divergence point is an image of an explored
            // one only if gamma fixes the shared prefix and maps one branch
            // onto the other.
            let maps_branch = path[..shared].iter().all(|&v| gamma[v] == v)
                && matches!(
                    (path.get(shared), leaf.path.get(shared)),
                    (Some(&a), Some(&b)) if gamma[a] == b
                );
            if maps_branch {
                unwind = Some(unwind.map_or(shared, |u| u.min(shared)));
            }
            found.push(gamma);
        }
        self.automorphisms.extend(found);

        if self.first.is_none() {
            self.first = Some((leaf.text.clone(), leaf.path.clone(), leaf.positions.clone()));
        }
        if self.best.as_ref().map_or(true, |b| leaf.text < b.text) {
            self.best = Some(leaf);
        }
        unwind
    }

    fn orbits(&self, path: &[usize]) -> UnionFind<usize> {
        let mut orbits = UnionFind::new(self.layout.len());
        for gamma in &self.automorphisms {
            if path.iter().all(|&v| gamma[v] == v) {
                for (v, &w) in gamma.iter().enumerate() {
                    orbits.union(v, w);
                }
            }
        }
        orbits
    }
}

fn automorphism(from: &[usize], to: &[usize]) -> Vec<usize> {
    let mut at = vec![0usize; to.len()];
    for (v, &p) in to.iter().enumerate() {
        at[p] = v;
    }
    from.iter().map(|&p| at[p]).collect()
}

fn build_leaf(graph: &SpeciesGraph, layout: &Layout, ranks: &[usize], path: Vec<usize>) -> Leaf {
    let mut order: Vec<usize> = (0..layout.n_mol).collect();
    order.sort_by_key(|&m| (ranks[m], m));
    let mut new_pos = vec![0usize; layout.n_mol];
    for (pos, &m) in order.iter().enumerate() {
        new_pos[m] = pos;
    }

    // comp_order[m][new_c] = old_c
    let comp_order: Vec<Vec<usize>> = (0..layout.n_mol)
        .map(|m| {
            let mut cs: Vec<usize> = (0..graph.molecule(m).components.len()).collect();
            cs.sort_by_key(|&c| (ranks[layout.node_of(Site::new(m, c))], c));
            cs
        })
        .collect();
    let mut comp_pos: Vec<Vec<usize>> = comp_order.iter().map(|cs| vec![0; cs.len()]).collect();
    for (m, cs) in comp_order.iter().enumerate() {
        for (pos, &c) in cs.iter().enumerate() {
            comp_pos[m][c] = pos;
        }
    }
    let new_site = |s: Site| Site::new(new_pos[s.molecule], comp_pos[s.molecule][s.component]);

    let mut relabel: BTreeMap<BondLabel, BondLabel> = BTreeMap::new();
    let mut next: BondLabel = 1;
    for &m in &order {
        for &c in &comp_order[m] {
            let comp = &graph.molecule(m).components[c];
            let mut edges: Vec<(Site, BondLabel)> =
                comp.edges().iter().map(|(&l, &p)| (new_site(p), l)).collect();
            edges.sort_unstable();
            for (_, label) in edges {
                relabel.entry(label).or_insert_with(|| {
                    let l = next;
                    next += 1;
                    l
                });
            }
        }
    }

    let molecules: Vec<Molecule> = order
        .iter()
        .map(|&m| {
            let old = graph.molecule(m);
            let mut mol = Molecule::new(old.name.clone());
            mol.compartment = old.compartment.clone();
            for &c in &comp_order[m] {
                let mut comp = old.components[c].clone();
                comp.edges = comp
                    .edges
                    .iter()
                    .map(|(l, &p)| (relabel.get(l).copied().unwrap_or(*l), new_site(p)))
                    .collect();
                mol.components.push(comp);
            }
            mol
        })
        .collect();
    let mut positions = vec![0usize; layout.len()];
    let mut offset = layout.n_mol;
    for (pos, &m) in order.iter().enumerate() {
        positions[m] = pos;
        for (c, &p) in comp_pos[m].iter().enumerate() {
            positions[layout.node_of(Site::new(m, c))] = offset + p;
        }
        offset += comp_order[m].len();
    }

    let form = SpeciesGraph::from_raw(molecules);
    Leaf {
        text: form.to_string(),
        form,
        order,
        path,
        positions,
    }
}
