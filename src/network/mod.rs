//! Network generation: expands seed species under a rule set into the full
//! list of species and reactions, or as much of it as the configured limits
//! allow.
//!
//! Species are processed in discovery order, one batch per iteration. When
//! species `x` is processed, every rule is tried on every reactant tuple in
//! which `x` is the highest-indexed species: slots before the slot holding
//! `x` draw from species with a lower index, slots after it from species
//! with an index up to and including `x`. Each ordered tuple is therefore
//! visited exactly once over the whole run.

pub mod export;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::canonical::{canonicalize, canonicalize_with_form, CanonicalKey};
use crate::compartment::Compartments;
use crate::error::NetworkError;
use crate::graph::SpeciesGraph;
use crate::matcher::{find_embeddings, Embedding};
use crate::model::{Model, Seed};
use crate::rule::{CompiledRule, RateLaw};

/// Limits that bound generation.
///
/// Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generation stops before the species table grows past this size.
    pub max_species: usize,
    /// Number of processing rounds before generation stops.
    pub max_iterations: usize,
    /// Generation stops before the reaction list grows past this size.
    pub max_reactions: usize,
    /// Products with more molecules than this are discarded.
    pub max_agg: usize,
    /// Cap on copies of one molecule type in a product; products over a
    /// cap are discarded.
    pub max_stoich: StoichLimit,
}

/// Molecule count caps: one cap for every type, or caps for named types
/// only. Reads from either a number or a map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoichLimit {
    Uniform(usize),
    PerType(BTreeMap<String, usize>),
}

impl Default for StoichLimit {
    fn default() -> Self {
        Self::Uniform(500)
    }
}

impl StoichLimit {
    /// The cap on molecules named `molecule`, if any.
    pub fn cap(&self, molecule: &str) -> Option<usize> {
        match self {
            Self::Uniform(cap) => Some(*cap),
            Self::PerType(caps) => caps.get(molecule).copied(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_species: 10_000,
            max_iterations: 50,
            max_reactions: 100_000,
            max_agg: 500,
            max_stoich: StoichLimit::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_max_species(mut self, max_species: usize) -> Self {
        self.max_species = max_species;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_reactions(mut self, max_reactions: usize) -> Self {
        self.max_reactions = max_reactions;
        self
    }

    pub fn with_max_agg(mut self, max_agg: usize) -> Self {
        self.max_agg = max_agg;
        self
    }

    /// Caps one molecule type. Replaces a uniform cap with per-type caps.
    pub fn with_max_stoich(mut self, molecule: impl Into<String>, cap: usize) -> Self {
        match &mut self.max_stoich {
            StoichLimit::PerType(caps) => {
                caps.insert(molecule.into(), cap);
            }
            StoichLimit::Uniform(_) => {
                self.max_stoich = StoichLimit::PerType(BTreeMap::from([(molecule.into(), cap)]));
            }
        }
        self
    }

    pub fn with_uniform_max_stoich(mut self, cap: usize) -> Self {
        self.max_stoich = StoichLimit::Uniform(cap);
        self
    }

    fn admits(&self, graph: &SpeciesGraph) -> bool {
        graph.molecule_count() <= self.max_agg
            && graph
                .census()
                .iter()
                .all(|(name, count)| self.max_stoich.cap(name).is_none_or(|cap| *count <= cap))
    }
}

/// Which limit stopped a truncated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruncationReason {
    MaxSpecies,
    MaxIterations,
    MaxReactions,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MaxSpecies => "max_species",
            Self::MaxIterations => "max_iterations",
            Self::MaxReactions => "max_reactions",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStatus {
    /// Every species was processed and no rule produced anything new.
    Converged,
    /// A limit was hit; the network is incomplete.
    Truncated(TruncationReason),
}

impl GenerationStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    /// Canonical form of the species graph.
    pub graph: SpeciesGraph,
    pub key: CanonicalKey,
    /// Seed amount; zero for generated species.
    pub initial_amount: f64,
}

impl Species {
    pub fn name(&self) -> &str {
        self.key.as_str()
    }
}

/// A concrete reaction between species, aggregating every rule
/// application that turns the same reactants into the same products.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Reactant species indices, ascending.
    pub reactants: Vec<usize>,
    /// Product species indices, ascending.
    pub products: Vec<usize>,
    /// Index of the one-way rule in [`Model::unidirectional_rules`].
    pub rule: usize,
    pub rule_name: String,
    pub rate: RateLaw,
    /// Number of embedding combinations that produced this reaction.
    pub embeddings: usize,
    pub rule_symmetry: usize,
    /// Size of the compartment the reaction happens in; 1 outside
    /// compartmental models.
    pub volume: f64,
}

impl Reaction {
    /// Multiplier on the rule's rate constant.
    pub fn propensity_factor(&self) -> f64 {
        self.embeddings as f64 / self.rule_symmetry as f64
    }

    /// Unit conversion of the rate constant: synthesis scales with the
    /// volume, an order `n > 1` reaction with `volume^(1-n)`.
    pub fn volume_factor(&self) -> f64 {
        match self.reactants.len() {
            0 => self.volume,
            1 => 1.0,
            order => self.volume.powi(1 - order as i32),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub species: Vec<Species>,
    pub reactions: Vec<Reaction>,
    pub status: GenerationStatus,
    /// Processing rounds that ran.
    pub iterations: usize,
}

impl Network {
    pub fn species_index(&self, key: &CanonicalKey) -> Option<usize> {
        self.species.iter().position(|s| &s.key == key)
    }

    /// Index of the species isomorphic to `graph`, if generated.
    pub fn find_species(&self, graph: &SpeciesGraph) -> Option<usize> {
        self.species_index(&canonicalize(graph))
    }

    /// Reactions produced by the named one-way rule.
    pub fn reactions_of<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Reaction> + 'a {
        self.reactions.iter().filter(move |r| r.rule_name == rule)
    }
}

/// Expands models into reaction networks. Holds only configuration; each
/// [`generate`](Self::generate) call owns its own tables.
#[derive(Debug, Clone, Default)]
pub struct NetworkGenerator {
    config: GeneratorConfig,
}

impl NetworkGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates the network of `model`.
    ///
    /// Rules and seeds are validated before any species is produced. Hitting
    /// a limit is not an error; it is reported through [`Network::status`].
    #[instrument(skip_all, fields(rules = model.rules.len(), seeds = model.seeds.len()))]
    pub fn generate(&self, model: &Model) -> Result<Network, NetworkError> {
        let rules = model.compile_rules()?;
        let seeds = model.prepared_seeds()?;
        info!(
            one_way_rules = rules.len(),
            max_species = self.config.max_species,
            max_iterations = self.config.max_iterations,
            "starting network generation"
        );

        let mut run = Generation::new(&self.config, &model.compartments, &rules);
        let status = run.run(seeds)?;
        match status {
            GenerationStatus::Converged => info!(
                species = run.species.len(),
                reactions = run.reactions.len(),
                iterations = run.iterations,
                "network converged"
            ),
            GenerationStatus::Truncated(reason) => warn!(
                %reason,
                species = run.species.len(),
                reactions = run.reactions.len(),
                iterations = run.iterations,
                "network truncated"
            ),
        }
        Ok(Network {
            species: run.species,
            reactions: run.reactions,
            status,
            iterations: run.iterations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReactionKey {
    reactants: Vec<usize>,
    products: Vec<usize>,
    rule: usize,
}

struct Generation<'a> {
    config: &'a GeneratorConfig,
    compartments: &'a Compartments,
    rules: &'a [CompiledRule],
    species: Vec<Species>,
    index: HashMap<CanonicalKey, usize>,
    reactions: Vec<Reaction>,
    reaction_index: HashMap<ReactionKey, usize>,
    // (rule, slot, species) -> embeddings
    matches: HashMap<(usize, usize, usize), Rc<[Embedding]>>,
    iterations: usize,
}

impl<'a> Generation<'a> {
    fn new(
        config: &'a GeneratorConfig,
        compartments: &'a Compartments,
        rules: &'a [CompiledRule],
    ) -> Self {
        Self {
            config,
            compartments,
            rules,
            species: Vec::new(),
            index: HashMap::new(),
            reactions: Vec::new(),
            reaction_index: HashMap::new(),
            matches: HashMap::new(),
            iterations: 0,
        }
    }

    fn run(&mut self, seeds: Vec<Seed>) -> Result<GenerationStatus, NetworkError> {
        for seed in seeds {
            let (key, form) = canonicalize_with_form(&seed.species);
            if self.index.contains_key(&key) {
                warn!(species = %key, "duplicate seed species ignored");
                continue;
            }
            if self.species.len() >= self.config.max_species {
                return Ok(GenerationStatus::Truncated(TruncationReason::MaxSpecies));
            }
            self.push_species(key, form, seed.amount);
        }

        let rules = self.rules;
        for (ri, rule) in rules.iter().enumerate().filter(|(_, r)| r.arity() == 0) {
            let applied = rule
                .apply(&[], &[])
                .map_err(|source| NetworkError::RuleApplication {
                    rule: rule.name().to_string(),
                    source,
                })?;
            if let Some(products) = applied {
                if let Some(reason) = self.record(ri, Vec::new(), products)? {
                    return Ok(GenerationStatus::Truncated(reason));
                }
            }
        }

        let mut processed = 0;
        loop {
            if processed == self.species.len() {
                return Ok(GenerationStatus::Converged);
            }
            if self.iterations >= self.config.max_iterations {
                return Ok(GenerationStatus::Truncated(TruncationReason::MaxIterations));
            }
            self.iterations += 1;
            let end = self.species.len();
            debug!(
                iteration = self.iterations,
                pending = end - processed,
                species = end,
                reactions = self.reactions.len(),
                "processing batch"
            );
            for x in processed..end {
                for (ri, rule) in rules.iter().enumerate() {
                    for slot in 0..rule.arity() {
                        if let Some(reason) = self.react_anchored(ri, slot, x)? {
                            return Ok(GenerationStatus::Truncated(reason));
                        }
                    }
                }
            }
            processed = end;
        }
    }

    fn embeddings(&mut self, rule: usize, slot: usize, species: usize) -> Rc<[Embedding]> {
        if let Some(found) = self.matches.get(&(rule, slot, species)) {
            return Rc::clone(found);
        }
        let compiled = &self.rules[rule];
        let graph = &self.species[species].graph;
        let found: Rc<[Embedding]> = if compiled.accepts(slot, graph) {
            find_embeddings(&compiled.reactant_patterns()[slot], graph).collect()
        } else {
            Rc::from(Vec::new())
        };
        self.matches.insert((rule, slot, species), Rc::clone(&found));
        found
    }

    fn react_anchored(
        &mut self,
        ri: usize,
        anchor: usize,
        x: usize,
    ) -> Result<Option<TruncationReason>, NetworkError> {
        let rules = self.rules;
        let rule = &rules[ri];
        if self.embeddings(ri, anchor, x).is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<Vec<usize>> = Vec::with_capacity(rule.arity());
        for slot in 0..rule.arity() {
            let range = if slot == anchor {
                x..x + 1
            } else if slot < anchor {
                0..x
            } else {
                0..x + 1
            };
            let mut fits = Vec::new();
            for s in range {
                if !self.embeddings(ri, slot, s).is_empty() {
                    fits.push(s);
                }
            }
            if fits.is_empty() {
                return Ok(None);
            }
            candidates.push(fits);
        }

        for pick in combinations(&candidates.iter().map(Vec::len).collect::<Vec<_>>()) {
            let tuple: Vec<usize> = pick
                .iter()
                .enumerate()
                .map(|(slot, &i)| candidates[slot][i])
                .collect();
            if !self.interacting(&tuple) {
                trace!(rule = rule.name(), reactants = ?tuple, "reactants cannot meet");
                continue;
            }
            let per_slot: Vec<Rc<[Embedding]>> = tuple
                .iter()
                .enumerate()
                .map(|(slot, &s)| self.embeddings(ri, slot, s))
                .collect();

            let mut outcomes = Vec::new();
            {
                let graphs: Vec<&SpeciesGraph> =
                    tuple.iter().map(|&s| &self.species[s].graph).collect();
                let lengths: Vec<usize> = per_slot.iter().map(|e| e.len()).collect();
                for combo in combinations(&lengths) {
                    let chosen: Vec<&Embedding> = combo
                        .iter()
                        .enumerate()
                        .map(|(slot, &i)| &per_slot[slot][i])
                        .collect();
                    let applied = rule.apply(&graphs, &chosen).map_err(|source| {
                        NetworkError::RuleApplication {
                            rule: rule.name().to_string(),
                            source,
                        }
                    })?;
                    if let Some(products) = applied {
                        outcomes.push(products);
                    }
                }
            }

            let mut reactants = tuple;
            reactants.sort_unstable();
            for products in outcomes {
                if let Some(reason) = self.record(ri, reactants.clone(), products)? {
                    return Ok(Some(reason));
                }
            }
        }
        Ok(None)
    }

    fn interacting(&self, tuple: &[usize]) -> bool {
        let located: Vec<Option<&str>> = tuple
            .iter()
            .map(|&s| self.compartments.species_compartment(&self.species[s].graph))
            .collect();
        located.iter().enumerate().all(|(i, &a)| {
            located[i + 1..]
                .iter()
                .all(|&b| self.compartments.interacting(a, b))
        })
    }

    fn record(
        &mut self,
        ri: usize,
        reactants: Vec<usize>,
        products: Vec<SpeciesGraph>,
    ) -> Result<Option<TruncationReason>, NetworkError> {
        if let Some(big) = products.iter().find(|p| !self.config.admits(p)) {
            debug!(rule = self.rules[ri].name(), product = %big, "product over aggregation limits discarded");
            return Ok(None);
        }
        if let Some(split) = products.iter().find(|p| !self.compartments.bonds_adjacent(p)) {
            debug!(rule = self.rules[ri].name(), product = %split, "product bonded across non-adjacent compartments discarded");
            return Ok(None);
        }

        let mut product_ids = Vec::with_capacity(products.len());
        let mut fresh: Vec<(CanonicalKey, SpeciesGraph)> = Vec::new();
        for graph in products {
            let (key, form) = canonicalize_with_form(&graph);
            if let Some(&id) = self.index.get(&key) {
                self.cross_check(&key, id, &form)?;
                product_ids.push(id);
            } else if let Some(pos) = fresh.iter().position(|(k, _)| k == &key) {
                product_ids.push(self.species.len() + pos);
            } else {
                product_ids.push(self.species.len() + fresh.len());
                fresh.push((key, form));
            }
        }
        product_ids.sort_unstable();

        let key = ReactionKey {
            reactants,
            products: product_ids,
            rule: ri,
        };
        let existing = self.reaction_index.get(&key).copied();
        if existing.is_none() && self.reactions.len() >= self.config.max_reactions {
            return Ok(Some(TruncationReason::MaxReactions));
        }
        if self.species.len() + fresh.len() > self.config.max_species {
            return Ok(Some(TruncationReason::MaxSpecies));
        }

        for (species_key, form) in fresh {
            self.push_species(species_key, form, 0.0);
        }
        match existing {
            Some(id) => self.reactions[id].embeddings += 1,
            None => {
                let rule = &self.rules[ri];
                let reactant_graphs: Vec<&SpeciesGraph> =
                    key.reactants.iter().map(|&s| &self.species[s].graph).collect();
                let product_graphs: Vec<&SpeciesGraph> =
                    key.products.iter().map(|&s| &self.species[s].graph).collect();
                let volume = self
                    .compartments
                    .scaling_volume(&reactant_graphs, &product_graphs);
                trace!(
                    index = self.reactions.len(),
                    rule = rule.name(),
                    reactants = ?key.reactants,
                    products = ?key.products,
                    "new reaction"
                );
                self.reactions.push(Reaction {
                    reactants: key.reactants.clone(),
                    products: key.products.clone(),
                    rule: ri,
                    rule_name: rule.name().to_string(),
                    rate: rule.rule().rate.clone(),
                    embeddings: 1,
                    rule_symmetry: rule.symmetry(),
                    volume,
                });
                self.reaction_index.insert(key, self.reactions.len() - 1);
            }
        }
        Ok(None)
    }

    fn cross_check(
        &self,
        key: &CanonicalKey,
        id: usize,
        candidate: &SpeciesGraph,
    ) -> Result<(), NetworkError> {
        let existing = &self.species[id].graph;
        if existing.census() != candidate.census() || existing.bond_count() != candidate.bond_count() {
            return Err(NetworkError::CanonicalizationAmbiguity {
                key: key.to_string(),
                existing: existing.to_string(),
                candidate: candidate.to_string(),
            });
        }
        Ok(())
    }

    fn push_species(&mut self, key: CanonicalKey, form: SpeciesGraph, amount: f64) {
        let index = self.species.len();
        trace!(index, species = %key, "new species");
        self.index.insert(key.clone(), index);
        self.species.push(Species {
            graph: form,
            key,
            initial_amount: amount,
        });
    }
}

// Last position varies fastest.
fn combinations(lengths: &[usize]) -> Vec<Vec<usize>> {
    let mut result: Vec<Vec<usize>> = vec![vec![]];
    for &len in lengths {
        let mut next = Vec::with_capacity(result.len() * len);
        for combo in &result {
            for i in 0..len {
                let mut extended = combo.clone();
                extended.push(i);
                next.push(extended);
            }
        }
        result = next;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bngl::{parse_molecule_type, parse_rule, parse_species};
    use crate::compartment::Compartment;

    fn model(types: &[&str], seeds: &[&str], rules: &[&str]) -> Model {
        let mut m = Model::new();
        for t in types {
            m.add_molecule_type(parse_molecule_type(t).unwrap());
        }
        for s in seeds {
            m.add_seed(parse_species(s).unwrap(), 1.0);
        }
        for r in rules {
            m.add_rule(parse_rule(r).unwrap());
        }
        m
    }

    fn generate(m: &Model) -> Network {
        NetworkGenerator::default().generate(m).unwrap()
    }

    #[test]
    fn combinations_enumerate_odometer_order() {
        assert_eq!(
            combinations(&[2, 2]),
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
        assert_eq!(combinations(&[]), vec![Vec::<usize>::new()]);
        assert!(combinations(&[3, 0]).is_empty());
    }

    #[test]
    fn heterodimer_binding() {
        let net = generate(&model(
            &["A(b)", "B(a)"],
            &["A(b)", "B(a)"],
            &["A(b) + B(a) -> A(b!1).B(a!1) k"],
        ));
        assert!(net.status.is_converged());
        assert_eq!(net.species.len(), 3);
        assert_eq!(net.reactions.len(), 1);
        let r = &net.reactions[0];
        assert_eq!(r.reactants, vec![0, 1]);
        assert_eq!(r.products, vec![2]);
        assert_eq!(r.propensity_factor(), 1.0);
    }

    #[test]
    fn reversible_rule_yields_both_directions() {
        let net = generate(&model(
            &["A(b)", "B(a)"],
            &["A(b)", "B(a)"],
            &["bind: A(b) + B(a) <-> A(b!1).B(a!1) kf, kr"],
        ));
        assert_eq!(net.reactions.len(), 2);
        assert_eq!(net.reactions_of("bind").count(), 1);
        let reverse: Vec<_> = net.reactions_of("_reverse_bind").collect();
        assert_eq!(reverse[0].reactants, vec![2]);
        assert_eq!(reverse[0].products, vec![0, 1]);
        assert_eq!(reverse[0].rate, RateLaw::Expression("kr".into()));
    }

    #[test]
    fn homodimer_factor_is_half() {
        let net = generate(&model(&["A(d)"], &["A(d)"], &["A(d) + A(d) -> A(d!1).A(d!1) k"]));
        assert_eq!(net.species.len(), 2);
        assert_eq!(net.reactions.len(), 1);
        assert_eq!(net.reactions[0].reactants, vec![0, 0]);
        assert_eq!(net.reactions[0].propensity_factor(), 0.5);
    }

    #[test]
    fn synthesis_runs_once() {
        let net = generate(&model(&["A(b~u~p)"], &[], &["0 -> A() ks", "A(b~u) -> A(b~p) k"]));
        assert!(net.status.is_converged());
        let names: Vec<&str> = net.species.iter().map(Species::name).collect();
        assert_eq!(names, vec!["A(b~u)", "A(b~p)"]);
        assert_eq!(net.reactions.len(), 2);
        assert!(net.reactions[0].reactants.is_empty());
    }

    #[test]
    fn duplicate_seed_keeps_first_amount() {
        let mut m = model(&["A(b)"], &[], &[]);
        m.add_seed(parse_species("A(b)").unwrap(), 5.0);
        m.add_seed(parse_species("A()").unwrap(), 7.0);
        let net = generate(&m);
        assert_eq!(net.species.len(), 1);
        assert_eq!(net.species[0].initial_amount, 5.0);
    }

    #[test]
    fn exclude_reactants_blocks_slot() {
        let net = generate(&model(
            &["A(b,s~u~p)", "B(a)"],
            &["A(s~u)", "A(s~p)", "B(a)"],
            &["A(b) + B(a) -> A(b!1).B(a!1) k exclude_reactants(1,A(s~p))"],
        ));
        assert_eq!(net.reactions.len(), 1);
        assert_eq!(net.reactions[0].reactants, vec![0, 2]);
    }

    #[test]
    fn max_agg_discards_large_products() {
        let m = model(&["P(a,b)"], &["P(a,b)"], &["P(b) + P(a) -> P(b!1).P(a!1) k"]);
        let net = NetworkGenerator::new(GeneratorConfig::default().with_max_agg(3))
            .generate(&m)
            .unwrap();
        assert!(net.status.is_converged());
        assert!(net.species.iter().all(|s| s.graph.molecule_count() <= 3));
        assert_eq!(net.species.len(), 3);
    }

    #[test]
    fn max_stoich_caps_molecule_type() {
        let m = model(&["P(a,b)"], &["P(a,b)"], &["P(b) + P(a) -> P(b!1).P(a!1) k"]);
        let config = GeneratorConfig::default().with_max_stoich("P", 2);
        assert_eq!(config.max_stoich.cap("Q"), None);
        let net = NetworkGenerator::new(config).generate(&m).unwrap();
        assert!(net.status.is_converged());
        assert_eq!(net.species.len(), 2);

        let config = GeneratorConfig::default().with_uniform_max_stoich(3);
        let net = NetworkGenerator::new(config).generate(&m).unwrap();
        assert!(net.status.is_converged());
        assert_eq!(net.species.len(), 3);
    }

    #[test]
    fn stoich_cap_defaults_to_five_hundred() {
        let config = GeneratorConfig::default();
        assert_eq!(config.max_stoich, StoichLimit::Uniform(500));
        assert_eq!(config.max_stoich.cap("anything"), Some(500));
    }

    fn cell(m: &mut Model) {
        m.add_compartment(Compartment::volume("EC", 100.0))
            .add_compartment(Compartment::surface("PM", 10.0).inside("EC"))
            .add_compartment(Compartment::volume("CP", 50.0).inside("PM"));
    }

    #[test]
    fn ligand_binds_receptor_across_the_membrane() {
        let mut m = model(
            &["L(r)", "R(l)"],
            &["L(r)@EC", "R(l)@PM"],
            &["bind: L(r) + R(l) -> L(r!1).R(l!1) kon"],
        );
        cell(&mut m);
        let net = generate(&m);
        assert!(net.status.is_converged());
        assert_eq!(net.species[2].name(), "L(r!1)@EC.R(l!1)@PM");
        assert_eq!(net.reactions.len(), 1);
        assert_eq!(net.reactions[0].volume, 100.0);
        assert_eq!(net.reactions[0].volume_factor(), 0.01);
    }

    #[test]
    fn separate_volumes_do_not_react() {
        let mut m = model(
            &["L(r)"],
            &["L(r)@EC", "L(r)@CP"],
            &["L(r) + L(r) -> L(r!1).L(r!1) k"],
        );
        cell(&mut m);
        let net = generate(&m);
        assert!(net.status.is_converged());
        assert_eq!(net.species.len(), 4);
        let pairs: Vec<Vec<usize>> = net.reactions.iter().map(|r| r.reactants.clone()).collect();
        assert_eq!(pairs, vec![vec![0, 0], vec![1, 1]]);
        assert_eq!(net.reactions[0].volume, 100.0);
        assert_eq!(net.reactions[1].volume, 50.0);
    }

    #[test]
    fn bonds_between_distant_compartments_are_discarded() {
        let mut m = model(&["L(r)", "R(l)"], &["L(r)@EC"], &["L(r) -> L(r!1).R(l!1)@CP k"]);
        cell(&mut m);
        let net = generate(&m);
        assert!(net.status.is_converged());
        assert_eq!(net.species.len(), 1);
        assert!(net.reactions.is_empty());

        let mut m = model(&["L(r)", "R(l)"], &["L(r)@EC"], &["L(r) -> L(r!1).R(l!1)@PM k"]);
        cell(&mut m);
        let net = generate(&m);
        assert_eq!(net.species.len(), 2);
        assert_eq!(net.reactions[0].volume, 100.0);
        assert_eq!(net.reactions[0].volume_factor(), 1.0);
    }

    #[test]
    fn uncompartmented_models_have_unit_volume() {
        let net = generate(&model(&["A(d)"], &["A(d)"], &["0 -> A(d) ks"]));
        assert!(net.reactions.iter().all(|r| r.volume == 1.0));
        assert_eq!(net.reactions[0].volume_factor(), 1.0);
    }

    #[test]
    fn max_reactions_truncates() {
        let m = model(&["P(a,b)"], &["P(a,b)"], &["P(b) + P(a) -> P(b!1).P(a!1) k"]);
        let net = NetworkGenerator::new(GeneratorConfig::default().with_max_reactions(2))
            .generate(&m)
            .unwrap();
        assert_eq!(
            net.status,
            GenerationStatus::Truncated(TruncationReason::MaxReactions)
        );
        assert_eq!(net.reactions.len(), 2);
    }

    #[test]
    fn max_iterations_truncates() {
        let m = model(&["P(a,b)"], &["P(a,b)"], &["P(b) + P(a) -> P(b!1).P(a!1) k"]);
        let net = NetworkGenerator::new(GeneratorConfig::default().with_max_iterations(1))
            .generate(&m)
            .unwrap();
        assert_eq!(
            net.status,
            GenerationStatus::Truncated(TruncationReason::MaxIterations)
        );
        assert_eq!(net.iterations, 1);
        assert_eq!(net.species.len(), 2);
    }

    #[test]
    fn find_species_by_graph() {
        let net = generate(&model(
            &["A(b)", "B(a)"],
            &["A(b)", "B(a)"],
            &["A(b) + B(a) -> A(b!1).B(a!1) k"],
        ));
        let complex = parse_species("B(a!7).A(b!7)").unwrap();
        assert_eq!(net.find_species(&complex), Some(2));
    }
}
