use std::collections::BTreeMap;
use std::fmt;

/// Numeric bond label. Labels are unique per bond within one graph, not
/// globally.
pub type BondLabel = u32;

/// Address of a component inside a [`SpeciesGraph`](crate::SpeciesGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Site {
    pub molecule: usize,
    pub component: usize,
}

impl Site {
    pub fn new(molecule: usize, component: usize) -> Self {
        Self {
            molecule,
            component,
        }
    }
}

/// Bond-state constraint carried by a pattern component.
///
/// Concrete species never carry a wildcard; only patterns do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BondWildcard {
    /// No wildcard: the bond state is given by the explicit bonds.
    #[default]
    None,
    /// `!+`: at least one bond must exist.
    Plus,
    /// `!?`: zero or one bond.
    Question,
    /// `!-`: no bond may exist.
    Minus,
}

impl BondWildcard {
    pub fn symbol(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::Plus => Some('+'),
            Self::Question => Some('?'),
            Self::Minus => Some('-'),
        }
    }

    pub fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(Self::Plus),
            '?' => Some(Self::Question),
            '-' => Some(Self::Minus),
            _ => None,
        }
    }

    /// Whether a site with `bonds` bonds satisfies this wildcard on its own.
    pub fn admits(self, bonds: usize) -> bool {
        match self {
            Self::None => true,
            Self::Plus => bonds > 0,
            Self::Question => bonds <= 1,
            Self::Minus => bonds == 0,
        }
    }

    /// Whether this wildcard can coexist with `bonds` explicit bonds on the
    /// same component.
    pub fn consistent_with_explicit(self, bonds: usize) -> bool {
        match self {
            Self::None | Self::Plus => true,
            Self::Question => bonds <= 1,
            Self::Minus => bonds == 0,
        }
    }
}

/// A binding/state site on a molecule instance or template.
///
/// Bonds live in `edges`, keyed by label and pointing at the partner site.
/// They are only ever edited through
/// [`SpeciesGraph`](crate::SpeciesGraph), which keeps both ends in sync.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Component {
    pub name: String,
    /// Allowed state labels; empty for stateless sites.
    pub states: Vec<String>,
    /// Current state, `None` when unset or unconstrained in a pattern.
    pub state: Option<String>,
    pub wildcard: BondWildcard,
    /// Set on components added implicitly by
    /// [`MoleculeTypes::complete_missing_components`](crate::MoleculeTypes::complete_missing_components).
    pub synthetic_wildcard: bool,
    pub(crate) edges: BTreeMap<BondLabel, Site>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_states<S: Into<String>>(name: impl Into<String>, states: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            states: states.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_wildcard(mut self, wildcard: BondWildcard) -> Self {
        self.wildcard = wildcard;
        self
    }

    /// Implicit `!?` site used to complete a pattern molecule.
    pub fn synthetic(name: impl Into<String>, states: Vec<String>) -> Self {
        Self {
            name: name.into(),
            states,
            wildcard: BondWildcard::Question,
            synthetic_wildcard: true,
            ..Self::default()
        }
    }

    pub fn edges(&self) -> &BTreeMap<BondLabel, Site> {
        &self.edges
    }

    pub fn bond_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_bound(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn partner(&self, label: BondLabel) -> Option<Site> {
        self.edges.get(&label).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = BondLabel> + '_ {
        self.edges.keys().copied()
    }

    /// Structural equivalence check shared by matching and canonical
    /// comparison.
    ///
    /// `self` plays the constraining role: its wildcard restricts the bond
    /// count of `other`. Without a wildcard the bond state is left to the
    /// caller to resolve structurally.
    pub fn isomorphic_to(&self, other: &Component, check_state: bool) -> bool {
        if self.name != other.name {
            return false;
        }
        if check_state && self.state != other.state {
            return false;
        }
        if self.states.len() != other.states.len() {
            return false;
        }
        self.wildcard.admits(other.bond_count())
    }

    /// Copy without bonds, used when a component is instantiated in a new graph.
    pub(crate) fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            states: self.states.clone(),
            state: self.state.clone(),
            wildcard: self.wildcard,
            synthetic_wildcard: self.synthetic_wildcard,
            edges: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(state) = &self.state {
            write!(f, "~{state}")?;
        }
        if self.edges.is_empty() {
            if let Some(symbol) = self.wildcard.symbol() {
                write!(f, "!{symbol}")?;
            }
        } else {
            for label in self.edges.keys() {
                write!(f, "!{label}")?;
            }
        }
        Ok(())
    }
}
