use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::component::{BondWildcard, Component, Site};
use crate::error::PatternError;
use crate::graph::SpeciesGraph;
use crate::matcher::{find_embeddings_with, has_embedding, Embedding};
use crate::molecule::Molecule;
use crate::molecule_type::MoleculeTypes;

use super::ReactionRule;

/// Endpoint of a bond created by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpSite {
    /// A site of the merged reactant pattern.
    Reactant(Site),
    /// Component `component` of the `molecule`-th molecule the rule creates.
    Added { molecule: usize, component: usize },
}

/// Elementary rewrite step. Sites refer to the merged reactant pattern
/// (all reactant patterns concatenated in slot order).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphOp {
    ChangeState { site: Site, state: String },
    /// Moves a matched molecule into another compartment.
    ChangeCompartment { molecule: usize, compartment: String },
    /// Removes the bond from `site` to `partner`, or every bond of `site`
    /// when the partner is unknown (a `!+` site).
    DeleteBond { site: Site, partner: Option<Site> },
    /// Instantiates the `index`-th molecule template of the rule.
    AddMolecule { index: usize },
    AddBond { a: OpSite, b: OpSite },
    /// Removes the matched molecule, or the whole species containing it.
    DeleteMolecule { molecule: usize, whole_species: bool },
}

impl GraphOp {
    fn delete_bond(a: Site, b: Option<Site>) -> Self {
        match b {
            Some(b) if b < a => Self::DeleteBond {
                site: b,
                partner: Some(a),
            },
            _ => Self::DeleteBond {
                site: a,
                partner: b,
            },
        }
    }

    fn add_bond(a: OpSite, b: OpSite) -> Self {
        if b < a {
            Self::AddBond { a: b, b: a }
        } else {
            Self::AddBond { a, b }
        }
    }

    /// The same operation seen through a reactant-pattern automorphism.
    fn mapped(&self, e: &Embedding) -> Self {
        let op_site = |s: &OpSite| match s {
            OpSite::Reactant(site) => OpSite::Reactant(e.site(*site)),
            added => *added,
        };
        match self {
            Self::ChangeState { site, state } => Self::ChangeState {
                site: e.site(*site),
                state: state.clone(),
            },
            Self::ChangeCompartment {
                molecule,
                compartment,
            } => Self::ChangeCompartment {
                molecule: e.molecules[*molecule],
                compartment: compartment.clone(),
            },
            Self::DeleteBond { site, partner } => {
                Self::delete_bond(e.site(*site), partner.map(|p| e.site(p)))
            }
            Self::AddMolecule { index } => Self::AddMolecule { index: *index },
            Self::AddBond { a, b } => Self::add_bond(op_site(a), op_site(b)),
            Self::DeleteMolecule {
                molecule,
                whole_species,
            } => Self::DeleteMolecule {
                molecule: e.molecules[*molecule],
                whole_species: *whole_species,
            },
        }
    }
}

/// A one-way rule prepared for matching and application.
///
/// Compilation validates every pattern, completes reactant patterns with
/// synthetic sites, derives the operation list by diffing reactants against
/// products and counts the rule's own symmetries.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub(crate) rule: ReactionRule,
    pub(crate) reactants: Vec<SpeciesGraph>,
    /// Merged-pattern molecule -> (slot, molecule index inside that slot).
    pub(crate) slot_of: Vec<(usize, usize)>,
    pub(crate) ops: Vec<GraphOp>,
    pub(crate) added: Vec<Molecule>,
    pub(crate) product_patterns: usize,
    pub(crate) deletes_molecules: bool,
    symmetry: usize,
    include: Vec<(usize, SpeciesGraph)>,
    exclude: Vec<(usize, SpeciesGraph)>,
}

impl CompiledRule {
    pub fn compile(rule: &ReactionRule, types: &MoleculeTypes) -> Result<Self, PatternError> {
        if rule.reactants.is_empty() && rule.products.is_empty() {
            return Err(PatternError::EmptyRule);
        }
        let constraints = rule.include.iter().chain(&rule.exclude).map(|(_, p)| p);
        for pattern in rule.reactants.iter().chain(&rule.products).chain(constraints) {
            types.validate_pattern(pattern)?;
        }

        let complete = |p: &SpeciesGraph| {
            let mut p = p.clone();
            types.complete_missing_components(&mut p);
            p
        };
        let reactants: Vec<SpeciesGraph> = rule.reactants.iter().map(complete).collect();
        let products: Vec<SpeciesGraph> = rule.products.iter().map(complete).collect();

        let mut lhs = SpeciesGraph::new();
        let mut slot_of = Vec::new();
        for (slot, pattern) in reactants.iter().enumerate() {
            lhs.merge(pattern);
            slot_of.extend((0..pattern.molecule_count()).map(|local| (slot, local)));
        }
        let mut rhs = SpeciesGraph::new();
        for pattern in &products {
            rhs.merge(pattern);
        }

        let pairing = pair_molecules(&lhs, &rhs);
        let diff = Diff::build(rule, &lhs, &rhs, &pairing, &slot_of)?;

        let symmetry = rule_symmetry(&lhs, &slot_of, &diff.ops);
        let constrain = |list: &[(usize, SpeciesGraph)]| -> Vec<(usize, SpeciesGraph)> {
            list.iter().map(|(slot, p)| (*slot, complete(p))).collect()
        };
        Ok(Self {
            rule: rule.clone(),
            reactants,
            slot_of,
            ops: diff.ops,
            added: diff.added,
            product_patterns: products.len(),
            deletes_molecules: diff.deletes_molecules,
            symmetry,
            include: constrain(&rule.include),
            exclude: constrain(&rule.exclude),
        })
    }

    pub fn name(&self) -> &str {
        &self.rule.name
    }

    pub fn rule(&self) -> &ReactionRule {
        &self.rule
    }

    /// Completed reactant patterns, one per slot.
    pub fn reactant_patterns(&self) -> &[SpeciesGraph] {
        &self.reactants
    }

    pub fn arity(&self) -> usize {
        self.reactants.len()
    }

    pub fn ops(&self) -> &[GraphOp] {
        &self.ops
    }

    /// Number of automorphisms of the reactant side that leave the
    /// operation list unchanged.
    pub fn symmetry(&self) -> usize {
        self.symmetry
    }

    /// Whether `species` passes the include/exclude constraints of `slot`.
    pub fn accepts(&self, slot: usize, species: &SpeciesGraph) -> bool {
        let included = self
            .include
            .iter()
            .filter(|(s, _)| *s == slot)
            .all(|(_, p)| has_embedding(p, species));
        let excluded = self
            .exclude
            .iter()
            .filter(|(s, _)| *s == slot)
            .any(|(_, p)| has_embedding(p, species));
        included && !excluded
    }
}

/// Product molecule -> reactant molecule. Shared `%labels` pair first; the
/// rest pair by type name, preferring the reactant whose sites agree most
/// with the product, then the earliest reactant.
fn pair_molecules(lhs: &SpeciesGraph, rhs: &SpeciesGraph) -> Vec<Option<usize>> {
    let mut pairing = vec![None; rhs.molecule_count()];
    let mut taken = vec![false; lhs.molecule_count()];

    for (pi, pm) in rhs.molecules().iter().enumerate() {
        let Some(label) = &pm.label else { continue };
        let found = lhs.molecules().iter().enumerate().position(|(ri, rm)| {
            !taken[ri] && rm.name == pm.name && rm.label.as_ref() == Some(label)
        });
        if let Some(ri) = found {
            pairing[pi] = Some(ri);
            taken[ri] = true;
        }
    }

    for (pi, pm) in rhs.molecules().iter().enumerate() {
        if pm.label.is_some() {
            continue;
        }
        let best = lhs
            .molecules()
            .iter()
            .enumerate()
            .filter(|(ri, rm)| !taken[*ri] && rm.label.is_none() && rm.name == pm.name)
            .max_by_key(|(ri, rm)| (similarity(rm, pm), Reverse(*ri)))
            .map(|(ri, _)| ri);
        if let Some(ri) = best {
            pairing[pi] = Some(ri);
            taken[ri] = true;
        }
    }
    pairing
}

fn similarity(reactant: &Molecule, product: &Molecule) -> usize {
    product
        .components
        .iter()
        .enumerate()
        .filter(|(j, pc)| {
            reactant
                .nth_named(&pc.name, product.occurrence(*j))
                .is_some_and(|rj| reactant.components[rj].state == pc.state)
        })
        .count()
}

struct Diff {
    ops: Vec<GraphOp>,
    added: Vec<Molecule>,
    deletes_molecules: bool,
}

impl Diff {
    fn build(
        rule: &ReactionRule,
        lhs: &SpeciesGraph,
        rhs: &SpeciesGraph,
        pairing: &[Option<usize>],
        slot_of: &[(usize, usize)],
    ) -> Result<Self, PatternError> {
        let mut to_lhs: BTreeMap<Site, Site> = BTreeMap::new();
        let mut to_rhs: BTreeMap<Site, Site> = BTreeMap::new();
        let mut added_index = vec![None; rhs.molecule_count()];
        let mut added = Vec::new();

        let mut changes = Vec::new();
        let mut deletions = Vec::new();
        let mut creations = Vec::new();

        for (pi, pm) in rhs.molecules().iter().enumerate() {
            let Some(ri) = pairing[pi] else {
                added_index[pi] = Some(added.len());
                creations.push(GraphOp::AddMolecule { index: added.len() });
                added.push(instantiate(pm)?);
                continue;
            };
            let rm = lhs.molecule(ri);
            if let Some(compartment) = &pm.compartment {
                if rm.compartment.as_ref() != Some(compartment) {
                    changes.push(GraphOp::ChangeCompartment {
                        molecule: ri,
                        compartment: compartment.clone(),
                    });
                }
            }
            for (j, pc) in pm.components.iter().enumerate() {
                let rj = rm.nth_named(&pc.name, pm.occurrence(j)).ok_or_else(|| {
                    PatternError::UndeclaredComponent {
                        molecule: rm.name.clone(),
                        component: pc.name.clone(),
                    }
                })?;
                let rc = &rm.components[rj];
                let site = Site::new(ri, rj);
                to_lhs.insert(Site::new(pi, j), site);
                to_rhs.insert(site, Site::new(pi, j));

                if let Some(state) = &pc.state {
                    if rc.state.as_ref() != Some(state) {
                        changes.push(GraphOp::ChangeState {
                            site,
                            state: state.clone(),
                        });
                    }
                }
                if pc.synthetic_wildcard {
                    continue;
                }
                let binding_state_unknown =
                    rc.synthetic_wildcard || rc.wildcard == BondWildcard::Question;
                if pc.is_bound() && binding_state_unknown {
                    return Err(PatternError::UnspecifiedBindingSite {
                        molecule: rm.name.clone(),
                        component: pc.name.clone(),
                    });
                }
                if pc.wildcard != BondWildcard::None && pc.wildcard != rc.wildcard {
                    return Err(PatternError::ProductWildcard {
                        molecule: pm.name.clone(),
                        wildcard: pc.wildcard,
                    });
                }
                let frees_unknown_partner = rc.wildcard == BondWildcard::Plus
                    && !rc.is_bound()
                    && pc.wildcard == BondWildcard::None
                    && !pc.is_bound();
                if frees_unknown_partner {
                    deletions.push(GraphOp::delete_bond(site, None));
                }
            }
        }

        let kept = |ri: usize| pairing.contains(&Some(ri));
        for bond in lhs.bonds() {
            if !kept(bond.a.molecule) || !kept(bond.b.molecule) {
                continue;
            }
            let survives = match (to_rhs.get(&bond.a), to_rhs.get(&bond.b)) {
                (Some(&pa), Some(&pb)) => rhs.bond_between(pa, pb).is_some(),
                _ => false,
            };
            if !survives {
                deletions.push(GraphOp::delete_bond(bond.a, Some(bond.b)));
            }
        }

        let op_site = |s: Site| match (to_lhs.get(&s), added_index[s.molecule]) {
            (Some(&site), _) => Some(OpSite::Reactant(site)),
            (None, Some(index)) => Some(OpSite::Added {
                molecule: index,
                component: s.component,
            }),
            (None, None) => None,
        };
        let mut bindings = Vec::new();
        for bond in rhs.bonds() {
            let (Some(a), Some(b)) = (op_site(bond.a), op_site(bond.b)) else {
                continue;
            };
            if let (OpSite::Reactant(ra), OpSite::Reactant(rb)) = (a, b) {
                if lhs.bond_between(ra, rb).is_some() {
                    continue;
                }
            }
            bindings.push(GraphOp::add_bond(a, b));
        }

        let mut removals = Vec::new();
        for ri in (0..lhs.molecule_count()).filter(|&ri| !kept(ri)) {
            let slot = slot_of[ri].0;
            let slot_vanishes = slot_of
                .iter()
                .enumerate()
                .filter(|(_, (s, _))| *s == slot)
                .all(|(m, _)| !kept(m));
            removals.push(GraphOp::DeleteMolecule {
                molecule: ri,
                whole_species: slot_vanishes && !rule.delete_molecules,
            });
        }

        let deletes_molecules = !removals.is_empty();
        let ops = changes
            .into_iter()
            .chain(deletions)
            .chain(creations)
            .chain(bindings)
            .chain(removals)
            .collect();
        Ok(Self {
            ops,
            added,
            deletes_molecules,
        })
    }
}

/// A concrete molecule for a product pattern molecule with no reactant
/// counterpart: omitted sites are unbound and in their first state.
fn instantiate(pattern: &Molecule) -> Result<Molecule, PatternError> {
    let mut mol = Molecule::new(pattern.name.clone());
    mol.compartment = pattern.compartment.clone();
    for pc in &pattern.components {
        if pc.wildcard != BondWildcard::None && !pc.synthetic_wildcard {
            return Err(PatternError::ProductWildcard {
                molecule: pattern.name.clone(),
                wildcard: pc.wildcard,
            });
        }
        let mut comp = Component::with_states(pc.name.clone(), pc.states.clone());
        comp.state = pc.state.clone().or_else(|| pc.states.first().cloned());
        mol.components.push(comp);
    }
    Ok(mol)
}

fn same_site(p: &Component, t: &Component) -> bool {
    p.name == t.name
        && p.state == t.state
        && p.wildcard == t.wildcard
        && p.synthetic_wildcard == t.synthetic_wildcard
        && p.bond_count() == t.bond_count()
}

/// Maps whole slots onto whole slots, bijectively.
fn respects_slots(e: &Embedding, slot_of: &[(usize, usize)]) -> bool {
    let slots = slot_of.iter().map(|(s, _)| s + 1).max().unwrap_or(0);
    let mut image = vec![None; slots];
    for (m, &(slot, _)) in slot_of.iter().enumerate() {
        let target = slot_of[e.molecules[m]].0;
        match image[slot] {
            None => image[slot] = Some(target),
            Some(t) if t == target => {}
            Some(_) => return false,
        }
    }
    let mut seen = vec![false; slots];
    for t in image.into_iter().flatten() {
        if seen[t] {
            return false;
        }
        seen[t] = true;
    }
    true
}

/// Size of the group of reactant-pattern automorphisms that map slots to
/// slots and leave the operation set invariant.
fn rule_symmetry(lhs: &SpeciesGraph, slot_of: &[(usize, usize)], ops: &[GraphOp]) -> usize {
    let mut reference = ops.to_vec();
    reference.sort();
    let count = find_embeddings_with(lhs, lhs, same_site)
        .filter(|e| respects_slots(e, slot_of))
        .filter(|e| {
            let mut mapped: Vec<GraphOp> = ops.iter().map(|op| op.mapped(e)).collect();
            mapped.sort();
            mapped == reference
        })
        .count();
    count.max(1)
}
