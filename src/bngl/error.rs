use thiserror::Error;

use crate::error::PatternError;

/// Errors produced when reading BNGL literals. Positions are byte offsets
/// into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BnglError {
    /// The input was empty or contained only whitespace.
    #[error("empty BNGL input")]
    EmptyInput,
    /// Input ended while a token was still expected.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unexpected character '{ch}' at position {pos}, expected {expected}")]
    UnexpectedChar {
        pos: usize,
        ch: char,
        expected: &'static str,
    },
    /// A pattern component listed more than one state.
    #[error("component '{component}' at position {pos} lists more than one state")]
    MultipleStates { pos: usize, component: String },
    #[error("bond label at position {pos} is out of range")]
    InvalidBondLabel { pos: usize },
    /// A molecule type declaration used a bond.
    #[error("molecule type declaration cannot contain bonds (position {pos})")]
    BondInDeclaration { pos: usize },
    #[error("rule has no '->' or '<->' arrow")]
    MissingArrow,
    #[error("rule has no rate")]
    MissingRate,
    /// `<->` with one rate, or `->` with two.
    #[error("rule arrow and rate count disagree: {arrow} with {rates} rate(s)")]
    RateCountMismatch { arrow: &'static str, rates: usize },
    #[error("unknown rule modifier '{0}'")]
    UnknownModifier(String),
    /// A reactant slot index in `include_reactants`/`exclude_reactants` is
    /// zero or past the last reactant.
    #[error("reactant index {index} is out of range (rule has {reactants} reactant(s))")]
    ReactantIndex { index: usize, reactants: usize },
    /// A compartment dimension other than 2 or 3.
    #[error("compartment dimension at position {pos} must be 2 or 3")]
    InvalidDimension { pos: usize },
    #[error("compartment size at position {pos} is not a positive number")]
    InvalidSize { pos: usize },
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
