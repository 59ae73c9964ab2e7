use crate::component::{BondWildcard, Component, Site};
use crate::graph::SpeciesGraph;
use crate::molecule::Molecule;

/// Pattern-to-target mapping found by [`find_embeddings`].
///
/// `molecules[p]` is the target molecule hosting pattern molecule `p`;
/// `components[p][j]` is the target component (inside that molecule) hosting
/// pattern component `j`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Embedding {
    pub molecules: Vec<usize>,
    pub components: Vec<Vec<usize>>,
}

impl Embedding {
    /// Target site hosting a pattern site.
    pub fn site(&self, pattern_site: Site) -> Site {
        Site::new(
            self.molecules[pattern_site.molecule],
            self.components[pattern_site.molecule][pattern_site.component],
        )
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }
}

/// Default component comparison used when matching rule patterns.
///
/// States are compared only when the pattern sets one. Without a wildcard
/// the target must carry exactly as many bonds as the pattern spells out, so
/// `A(b)` means "b unbound". Synthetic sites accept anything.
pub fn site_matches(pattern: &Component, target: &Component) -> bool {
    if pattern.name != target.name {
        return false;
    }
    if let Some(state) = &pattern.state {
        if target.state.as_ref() != Some(state) {
            return false;
        }
    }
    if pattern.synthetic_wildcard {
        return true;
    }
    let explicit = pattern.bond_count();
    let actual = target.bond_count();
    match pattern.wildcard {
        BondWildcard::None => actual == explicit,
        BondWildcard::Plus => actual >= explicit.max(1),
        BondWildcard::Question => actual >= explicit && actual <= 1,
        BondWildcard::Minus => actual == 0,
    }
}

/// Molecule-level comparison: same type, room for every pattern component,
/// and the pattern's compartment if it names one.
pub fn molecule_matches(pattern: &Molecule, target: &Molecule) -> bool {
    pattern.name == target.name
        && pattern.components.len() <= target.components.len()
        && pattern
            .compartment
            .as_ref()
            .is_none_or(|c| target.compartment.as_ref() == Some(c))
}

pub fn find_embeddings<'a>(
    pattern: &'a SpeciesGraph,
    target: &'a SpeciesGraph,
) -> Embeddings<'a, fn(&Component, &Component) -> bool> {
    Embeddings::new(pattern, target, site_matches)
}

/// Like [`find_embeddings`] with a caller-supplied component comparison
/// `site_match(pattern_component, target_component)`. Molecule names and
/// bond topology are always enforced.
pub fn find_embeddings_with<'a, F>(
    pattern: &'a SpeciesGraph,
    target: &'a SpeciesGraph,
    site_match: F,
) -> Embeddings<'a, F>
where
    F: Fn(&Component, &Component) -> bool,
{
    Embeddings::new(pattern, target, site_match)
}

pub fn has_embedding(pattern: &SpeciesGraph, target: &SpeciesGraph) -> bool {
    find_embeddings(pattern, target).next().is_some()
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Mol(usize),
    Comp(usize, usize),
}

/// Lazy enumeration of every embedding of a pattern into a target.
///
/// Pattern molecules are assigned in declaration order, each followed by its
/// components; candidates are tried in target order. The search state lives
/// in an explicit stack, so iteration can stop at any point and
/// [`restart`](Self::restart) replays the same sequence.
#[derive(Clone)]
pub struct Embeddings<'a, F> {
    pattern: &'a SpeciesGraph,
    target: &'a SpeciesGraph,
    site_match: F,
    steps: Vec<Step>,
    cursor: Vec<usize>,
    depth: usize,
    done: bool,
    mol_map: Vec<Option<usize>>,
    comp_map: Vec<Vec<Option<usize>>>,
    mol_used: Vec<bool>,
    comp_used: Vec<Vec<bool>>,
}

impl<'a, F> Embeddings<'a, F>
where
    F: Fn(&Component, &Component) -> bool,
{
    fn new(pattern: &'a SpeciesGraph, target: &'a SpeciesGraph, site_match: F) -> Self {
        let mut steps = Vec::new();
        for (p, mol) in pattern.molecules().iter().enumerate() {
            steps.push(Step::Mol(p));
            for j in 0..mol.components.len() {
                steps.push(Step::Comp(p, j));
            }
        }
        let cursor = vec![0; steps.len()];
        Self {
            pattern,
            target,
            site_match,
            steps,
            cursor,
            depth: 0,
            done: false,
            mol_map: vec![None; pattern.molecule_count()],
            comp_map: pattern
                .molecules()
                .iter()
                .map(|m| vec![None; m.components.len()])
                .collect(),
            mol_used: vec![false; target.molecule_count()],
            comp_used: target
                .molecules()
                .iter()
                .map(|m| vec![false; m.components.len()])
                .collect(),
        }
    }

    /// Rewinds to the first embedding.
    pub fn restart(&mut self) {
        while self.depth > 0 {
            self.depth -= 1;
            self.unassign(self.depth);
        }
        self.cursor.iter_mut().for_each(|c| *c = 0);
        self.done = false;
    }

    fn candidate_count(&self, step: Step) -> usize {
        match step {
            Step::Mol(_) => self.target.molecule_count(),
            Step::Comp(p, _) => self.mol_map[p]
                .map_or(0, |t| self.target.molecule(t).components.len()),
        }
    }

    fn feasible(&self, step: Step, cand: usize) -> bool {
        match step {
            Step::Mol(p) => {
                if self.mol_used[cand] {
                    return false;
                }
                let pm = self.pattern.molecule(p);
                let tm = self.target.molecule(cand);
                molecule_matches(pm, tm)
            }
            Step::Comp(p, j) => {
                let Some(t) = self.mol_map[p] else {
                    return false;
                };
                if self.comp_used[t][cand] {
                    return false;
                }
                let pc = &self.pattern.molecule(p).components[j];
                let tc = &self.target.molecule(t).components[cand];
                if !(self.site_match)(pc, tc) {
                    return false;
                }
                if pc.synthetic_wildcard && !self.synthetic_in_order(p, j, cand) {
                    return false;
                }
                let here = Site::new(t, cand);
                for (_, partner) in pc.edges() {
                    let Some(tm) = self.mol_map[partner.molecule] else {
                        continue;
                    };
                    let Some(tcomp) = self.comp_map[partner.molecule][partner.component] else {
                        continue;
                    };
                    if self.target.bond_between(here, Site::new(tm, tcomp)).is_none() {
                        return false;
                    }
                }
                true
            }
        }
    }

    // Interchangeable synthetic sites go in increasing target order.
    fn synthetic_in_order(&self, p: usize, j: usize, cand: usize) -> bool {
        let comps = &self.pattern.molecule(p).components;
        let name = &comps[j].name;
        let previous = (0..j)
            .rev()
            .find(|&k| comps[k].synthetic_wildcard && &comps[k].name == name);
        match previous.and_then(|k| self.comp_map[p][k]) {
            Some(prev) => cand > prev,
            None => true,
        }
    }

    fn assign(&mut self, depth: usize, cand: usize) {
        match self.steps[depth] {
            Step::Mol(p) => {
                self.mol_map[p] = Some(cand);
                self.mol_used[cand] = true;
            }
            Step::Comp(p, j) => {
                if let Some(t) = self.mol_map[p] {
                    self.comp_map[p][j] = Some(cand);
                    self.comp_used[t][cand] = true;
                }
            }
        }
    }

    fn unassign(&mut self, depth: usize) {
        match self.steps[depth] {
            Step::Mol(p) => {
                if let Some(t) = self.mol_map[p].take() {
                    self.mol_used[t] = false;
                }
            }
            Step::Comp(p, j) => {
                if let (Some(t), Some(c)) = (self.mol_map[p], self.comp_map[p][j].take()) {
                    self.comp_used[t][c] = false;
                }
            }
        }
    }

    fn snapshot(&self) -> Embedding {
        Embedding {
            molecules: self.mol_map.iter().map(|m| m.unwrap_or(usize::MAX)).collect(),
            components: self
                .comp_map
                .iter()
                .map(|row| row.iter().map(|c| c.unwrap_or(usize::MAX)).collect())
                .collect(),
        }
    }

    fn backtrack(&mut self) {
        if self.depth == 0 {
            self.done = true;
        } else {
            self.depth -= 1;
            self.unassign(self.depth);
        }
    }
}

impl<F> Iterator for Embeddings<'_, F>
where
    F: Fn(&Component, &Component) -> bool,
{
    type Item = Embedding;

    fn next(&mut self) -> Option<Embedding> {
        loop {
            if self.done {
                return None;
            }
            if self.depth == self.steps.len() {
                let found = self.snapshot();
                self.backtrack();
                return Some(found);
            }
            let step = self.steps[self.depth];
            let limit = self.candidate_count(step);
            let start = self.cursor[self.depth];
            match (start..limit).find(|&c| self.feasible(step, c)) {
                Some(cand) => {
                    self.assign(self.depth, cand);
                    self.cursor[self.depth] = cand + 1;
                    self.depth += 1;
                    if let Some(next) = self.cursor.get_mut(self.depth) {
                        *next = 0;
                    }
                }
                None => {
                    self.cursor[self.depth] = 0;
                    self.backtrack();
                }
            }
        }
    }
}
