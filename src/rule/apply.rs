use crate::component::Site;
use crate::error::GraphError;
use crate::graph::SpeciesGraph;
use crate::matcher::Embedding;

use super::compile::{CompiledRule, GraphOp, OpSite};

impl CompiledRule {
    /// Rewrites copies of `reactants`, one species per slot, as located by
    /// `embeddings` (one per slot), and returns the connected products.
    ///
    /// Returns `Ok(None)` when the rule deletes no molecule but the result
    /// does not fall apart into exactly as many pieces as the rule has product
    /// patterns, e.g. unbinding inside a ring.
    pub fn apply(
        &self,
        reactants: &[&SpeciesGraph],
        embeddings: &[&Embedding],
    ) -> Result<Option<Vec<SpeciesGraph>>, GraphError> {
        let mut work = SpeciesGraph::new();
        let offsets: Vec<usize> = reactants.iter().map(|r| work.merge(r)).collect();

        let target = |site: Site| -> Site {
            let (slot, local) = self.slot_of[site.molecule];
            let e = embeddings[slot];
            Site::new(
                offsets[slot] + e.molecules[local],
                e.components[local][site.component],
            )
        };

        let mut added_at = Vec::with_capacity(self.added.len());
        let mut doomed = vec![false; work.molecule_count()];
        for op in &self.ops {
            match op {
                GraphOp::ChangeState { site, state } => {
                    work.set_state(target(*site), Some(state.clone()))?;
                }
                GraphOp::ChangeCompartment {
                    molecule,
                    compartment,
                } => {
                    let (slot, local) = self.slot_of[*molecule];
                    let at = offsets[slot] + embeddings[slot].molecules[local];
                    work.molecule_mut(at).compartment = Some(compartment.clone());
                }
                GraphOp::DeleteBond { site, partner } => {
                    let at = target(*site);
                    match partner {
                        Some(p) => {
                            let other = target(*p);
                            if let Some(label) = work.bond_between(at, other) {
                                work.delete_bond(at, label);
                            }
                        }
                        None => {
                            work.delete_bonds(at);
                        }
                    }
                }
                GraphOp::AddMolecule { index } => {
                    added_at.push(work.add_molecule(self.added[*index].clone()));
                }
                GraphOp::AddBond { a, b } => {
                    let resolve = |s: &OpSite| match *s {
                        OpSite::Reactant(site) => target(site),
                        OpSite::Added {
                            molecule,
                            component,
                        } => Site::new(added_at[molecule], component),
                    };
                    work.add_bond(resolve(a), resolve(b))?;
                }
                GraphOp::DeleteMolecule {
                    molecule,
                    whole_species,
                } => {
                    let (slot, local) = self.slot_of[*molecule];
                    if *whole_species {
                        let start = offsets[slot];
                        let end = start + reactants[slot].molecule_count();
                        doomed[start..end].iter_mut().for_each(|d| *d = true);
                    } else {
                        doomed[offsets[slot] + embeddings[slot].molecules[local]] = true;
                    }
                }
            }
        }

        if doomed.contains(&true) {
            doomed.resize(work.molecule_count(), false);
            work.remove_molecules(&doomed);
        }
        let products = work.split();
        if !self.deletes_molecules && products.len() != self.product_patterns {
            return Ok(None);
        }
        Ok(Some(products))
    }
}

#[cfg(test)]
mod tests {
    use crate::bngl::{parse_molecule_type, parse_rule, parse_species};
    use crate::canonical::canonicalize;
    use crate::matcher::find_embeddings;
    use crate::molecule_type::MoleculeTypes;
    use crate::rule::CompiledRule;
    use crate::SpeciesGraph;

    fn compile(rule: &str, decls: &[&str]) -> CompiledRule {
        let types: MoleculeTypes = decls.iter().map(|d| parse_molecule_type(d).unwrap()).collect();
        CompiledRule::compile(&parse_rule(rule).unwrap(), &types).unwrap()
    }

    /// Applies the rule under every embedding combination and returns the
    /// canonical product keys of each accepted application.
    fn run(rule: &CompiledRule, species: &[&str]) -> Vec<Vec<String>> {
        let graphs: Vec<SpeciesGraph> = species.iter().map(|s| parse_species(s).unwrap()).collect();
        let per_slot: Vec<Vec<_>> = rule
            .reactant_patterns()
            .iter()
            .zip(&graphs)
            .map(|(p, g)| find_embeddings(p, g).collect())
            .collect();
        let refs: Vec<&SpeciesGraph> = graphs.iter().collect();
        let mut out = Vec::new();
        let mut combos: Vec<Vec<usize>> = vec![Vec::new()];
        for slot in &per_slot {
            combos = combos
                .into_iter()
                .flat_map(|c| {
                    (0..slot.len()).map(move |i| {
                        let mut c = c.clone();
                        c.push(i);
                        c
                    })
                })
                .collect();
        }
        for combo in combos {
            let embs: Vec<_> = combo.iter().enumerate().map(|(s, &i)| &per_slot[s][i]).collect();
            if let Some(products) = rule.apply(&refs, &embs).unwrap() {
                let mut keys: Vec<String> = products
                    .iter()
                    .map(|p| {
                        assert!(p.check_bond_symmetry());
                        canonicalize(p).into_string()
                    })
                    .collect();
                keys.sort();
                out.push(keys);
            }
        }
        out
    }

    #[test]
    fn bind_two_species() {
        let r = compile("A(b) + B(a) -> A(b!1).B(a!1) k", &["A(b)", "B(a)"]);
        assert_eq!(run(&r, &["A(b)", "B(a)"]), vec![vec!["A(b!1).B(a!1)".to_string()]]);
    }

    #[test]
    fn unbind_splits_complex() {
        let r = compile("A(b!1).B(a!1) -> A(b) + B(a) k", &["A(b)", "B(a)"]);
        assert_eq!(
            run(&r, &["B(a!3).A(b!3)"]),
            vec![vec!["A(b)".to_string(), "B(a)".to_string()]]
        );
    }

    #[test]
    fn unbind_inside_ring_is_rejected() {
        let r = compile("A(b!1).B(a!1) -> A(b) + B(a) k", &["A(b,c)", "B(a,d)"]);
        assert!(run(&r, &["A(b!1,c!2).B(a!1,d!2)"]).is_empty());
    }

    #[test]
    fn state_change_keeps_rest_of_complex() {
        let r = compile("A(s~u) -> A(s~p) k", &["A(s~u~p,b)", "B(a)"]);
        assert_eq!(
            run(&r, &["A(b!1,s~u).B(a!1)"]),
            vec![vec!["A(b!1,s~p).B(a!1)".to_string()]]
        );
    }

    #[test]
    fn degradation_without_flag_removes_complex() {
        let r = compile("A() -> 0 k", &["A(b)", "B(a)"]);
        assert_eq!(run(&r, &["A(b!1).B(a!1)"]), vec![Vec::<String>::new()]);
    }

    #[test]
    fn degradation_with_flag_leaves_partner() {
        let r = compile("A() -> 0 k DeleteMolecules", &["A(b)", "B(a)"]);
        assert_eq!(run(&r, &["A(b!1).B(a!1)"]), vec![vec!["B(a)".to_string()]]);
    }

    #[test]
    fn wildcard_release() {
        let r = compile("A(b!+) -> A(b) k", &["A(b)", "B(a)"]);
        assert_eq!(
            run(&r, &["A(b!1).B(a!1)"]),
            vec![vec!["A(b)".to_string(), "B(a)".to_string()]]
        );
    }

    #[test]
    fn synthesis_adds_molecule() {
        let r = compile("0 -> A(b) k", &["A(b,s~u~p)"]);
        assert_eq!(run(&r, &[]), vec![vec!["A(b,s~u)".to_string()]]);
    }

    #[test]
    fn add_bound_molecule() {
        let r = compile("A(b) -> A(b!1).C(a!1) k", &["A(b)", "C(a)"]);
        assert_eq!(run(&r, &["A(b)"]), vec![vec!["A(b!1).C(a!1)".to_string()]]);
    }

    #[test]
    fn transport_keeps_the_partner_in_place() {
        let r = compile("R(l!+)@PM -> R(l!+)@CP k", &["R(l)", "L(r)"]);
        assert_eq!(
            run(&r, &["L(r!1)@EC.R(l!1)@PM"]),
            vec![vec!["L(r!1)@EC.R(l!1)@CP".to_string()]]
        );
    }

    #[test]
    fn homodimer_both_embeddings_give_same_product() {
        let r = compile("A(d) + A(d) -> A(d!1).A(d!1) k", &["A(d)"]);
        assert_eq!(run(&r, &["A(d)", "A(d)"]), vec![vec!["A(d!1).A(d!1)".to_string()]]);
    }
}
