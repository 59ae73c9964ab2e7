use crate::compartment::{Compartment, Compartments};
use crate::error::{NetworkError, PatternError};
use crate::graph::SpeciesGraph;
use crate::molecule_type::{MoleculeType, MoleculeTypes};
use crate::rule::{CompiledRule, ReactionRule};

/// A seed species and its initial amount.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    pub species: SpeciesGraph,
    pub amount: f64,
}

/// Everything network generation consumes: molecule types, compartments,
/// seed species and reaction rules.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub molecule_types: MoleculeTypes,
    pub compartments: Compartments,
    pub seeds: Vec<Seed>,
    pub rules: Vec<ReactionRule>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_molecule_type(&mut self, molecule_type: MoleculeType) -> &mut Self {
        self.molecule_types.insert(molecule_type);
        self
    }

    pub fn add_compartment(&mut self, compartment: Compartment) -> &mut Self {
        self.compartments.insert(compartment);
        self
    }

    pub fn add_seed(&mut self, species: SpeciesGraph, amount: f64) -> &mut Self {
        self.seeds.push(Seed { species, amount });
        self
    }

    /// Adds a rule. An unnamed rule is called `_R<n>` after its 1-based
    /// position in the model.
    pub fn add_rule(&mut self, mut rule: ReactionRule) -> &mut Self {
        if rule.name.is_empty() {
            rule.name = format!("_R{}", self.rules.len() + 1);
        }
        self.rules.push(rule);
        self
    }

    /// One-way rules in model order, each reversible rule followed by its
    /// reverse half.
    pub fn unidirectional_rules(&self) -> Vec<ReactionRule> {
        self.rules
            .iter()
            .flat_map(|rule| {
                let (forward, reverse) = rule.split();
                std::iter::once(forward).chain(reverse)
            })
            .collect()
    }

    pub fn compile_rules(&self) -> Result<Vec<CompiledRule>, NetworkError> {
        self.unidirectional_rules()
            .iter()
            .map(|rule| {
                self.check_rule_compartments(rule)
                    .and_then(|()| CompiledRule::compile(rule, &self.molecule_types))
                    .map_err(|source| NetworkError::MalformedRule {
                        rule: rule.name.clone(),
                        source,
                    })
            })
            .collect()
    }

    fn check_rule_compartments(&self, rule: &ReactionRule) -> Result<(), PatternError> {
        let constraints = rule.include.iter().chain(&rule.exclude).map(|(_, p)| p);
        rule.reactants
            .iter()
            .chain(&rule.products)
            .chain(constraints)
            .try_for_each(|pattern| self.compartments.validate(pattern))
    }

    /// Seeds checked against the molecule types and filled out with their
    /// omitted sites.
    pub fn prepared_seeds(&self) -> Result<Vec<Seed>, NetworkError> {
        self.seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| {
                self.molecule_types
                    .validate_species(&seed.species)
                    .and_then(|()| self.compartments.validate(&seed.species))
                    .map_err(|source| NetworkError::MalformedSpecies {
                        index,
                        species: seed.species.to_string(),
                        source,
                    })?;
                let mut species = seed.species.clone();
                self.molecule_types.complete_species(&mut species);
                Ok(Seed {
                    species,
                    amount: seed.amount,
                })
            })
            .collect()
    }

    /// Checks every seed and every rule without generating anything.
    pub fn validate(&self) -> Result<(), NetworkError> {
        self.prepared_seeds()?;
        self.compile_rules()?;
        Ok(())
    }
}
