pub mod bngl;
pub mod canonical;
pub mod compartment;
pub mod component;
pub mod error;
pub mod graph;
pub mod graph_ops;
pub mod matcher;
pub mod model;
pub mod molecule;
pub mod molecule_type;
pub mod network;
pub mod rule;

pub use bngl::{
    parse_compartment, parse_molecule_type, parse_pattern, parse_rule, parse_species, BnglError,
};
pub use canonical::{
    canonical_form, canonicalize, canonicalize_with_form, is_isomorphic, CanonicalKey,
};
pub use compartment::{Compartment, Compartments};
pub use component::{BondLabel, BondWildcard, Component, Site};
pub use error::{GraphError, NetworkError, PatternError, RenumberError};
pub use graph::{Bond, SpeciesGraph};
pub use matcher::{find_embeddings, has_embedding, molecule_matches, Embedding};
pub use model::{Model, Seed};
pub use molecule::Molecule;
pub use molecule_type::{MoleculeType, MoleculeTypes};
pub use network::{
    GenerationStatus, GeneratorConfig, Network, NetworkGenerator, Reaction, Species,
    StoichLimit, TruncationReason,
};
pub use rule::{CompiledRule, GraphOp, OpSite, RateLaw, ReactionRule};

#[cfg(test)]
mod tests;
