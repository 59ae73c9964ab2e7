use thiserror::Error;

use crate::component::{BondLabel, BondWildcard, Site};

/// Illegal edit of a [`SpeciesGraph`](crate::SpeciesGraph).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A site index does not exist in the graph.
    #[error("no component at molecule {}, component {}", .0.molecule, .0.component)]
    NoSuchSite(Site),
    /// A component tried to bond to itself.
    #[error("component {}.{} cannot bond to itself", .0.molecule, .0.component)]
    SelfBond(Site),
    /// The requested bond label is already used by one of the endpoints.
    #[error("bond label {label} is already in use on molecule {}, component {}", .site.molecule, .site.component)]
    LabelInUse { site: Site, label: BondLabel },
    /// A component declares a bond wildcard that its explicit bonds contradict.
    #[error("component '{component}' of molecule '{molecule}' declares !{} but would carry {bonds} bond(s)", .wildcard.symbol().unwrap_or(' '))]
    UnsatisfiableWildcard {
        molecule: String,
        component: String,
        wildcard: BondWildcard,
        bonds: usize,
    },
}

/// Structural inconsistency between a pattern or species and the declared
/// molecule types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("undeclared molecule type '{0}'")]
    UndeclaredMolecule(String),
    #[error("undeclared compartment '{0}'")]
    UndeclaredCompartment(String),
    #[error("molecule type '{molecule}' declares no component '{component}'")]
    UndeclaredComponent { molecule: String, component: String },
    #[error("molecule '{molecule}' lists component '{component}' {used} times but the type declares it {declared} time(s)")]
    TooManyCopies {
        molecule: String,
        component: String,
        used: usize,
        declared: usize,
    },
    #[error("state '{state}' is not allowed for component '{molecule}.{component}'")]
    UndeclaredState {
        molecule: String,
        component: String,
        state: String,
    },
    #[error("bond label {label} appears on {count} site(s); bonds need exactly two")]
    DanglingBond { label: BondLabel, count: usize },
    #[error("species '{0}' contains a bond wildcard")]
    WildcardInSpecies(String),
    #[error("product molecule '{molecule}' uses wildcard !{} which a product cannot create", .wildcard.symbol().unwrap_or(' '))]
    ProductWildcard {
        molecule: String,
        wildcard: BondWildcard,
    },
    #[error("product binds '{molecule}.{component}' but the reactant side does not say the site is free")]
    UnspecifiedBindingSite { molecule: String, component: String },
    #[error("rule has no reactant patterns and no product patterns")]
    EmptyRule,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Error returned when a molecule renumbering is not a permutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenumberError {
    #[error("new_order length {got} != molecule count {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("new_order is not a valid permutation")]
    InvalidPermutation,
}

/// Fatal network generation failure.
///
/// A truncated network is *not* an error; see
/// [`GenerationStatus`](crate::network::GenerationStatus).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// A rule references undeclared structure or is otherwise inconsistent.
    #[error("rule '{rule}' is malformed: {source}")]
    MalformedRule {
        rule: String,
        #[source]
        source: PatternError,
    },
    /// A seed species is inconsistent with the molecule types.
    #[error("seed species {index} ('{species}') is malformed: {source}")]
    MalformedSpecies {
        index: usize,
        species: String,
        #[source]
        source: PatternError,
    },
    /// Replaying a rule's operations on matched reactants failed.
    #[error("applying rule '{rule}' failed: {source}")]
    RuleApplication {
        rule: String,
        #[source]
        source: GraphError,
    },
    /// Two structurally different graphs produced the same canonical key.
    #[error("canonical key '{key}' maps to structurally different species '{existing}' and '{candidate}'")]
    CanonicalizationAmbiguity {
        key: String,
        existing: String,
        candidate: String,
    },
}
