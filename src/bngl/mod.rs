//! Reader for BNGL literals: patterns, species, molecule type declarations
//! and single rule lines.
//!
//! This is enough BNGL to build models by hand and to read canonical keys
//! back. Whole model files (blocks, parameters, functions) are not
//! understood; compartment lines are read one at a time.

pub mod error;
mod parser;

pub use error::BnglError;

use crate::compartment::Compartment;
use crate::component::BondWildcard;
use crate::error::PatternError;
use crate::graph::SpeciesGraph;
use crate::molecule_type::MoleculeType;
use crate::rule::ReactionRule;

use parser::Cursor;

fn non_empty(s: &str) -> Result<&str, BnglError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(BnglError::EmptyInput);
    }
    Ok(trimmed)
}

/// Reads a pattern such as `A(b!1,s~?).B(a!1)`. `~?` leaves the state open;
/// `0` is the empty pattern.
pub fn parse_pattern(s: &str) -> Result<SpeciesGraph, BnglError> {
    let mut c = Cursor::new(non_empty(s)?);
    let graph = parser::pattern(&mut c)?;
    c.expect_end()?;
    Ok(graph)
}

/// Reads a concrete species. Bond wildcards are rejected.
pub fn parse_species(s: &str) -> Result<SpeciesGraph, BnglError> {
    let graph = parse_pattern(s)?;
    let has_wildcard = graph
        .molecules()
        .iter()
        .flat_map(|m| m.components.iter())
        .any(|c| c.wildcard != BondWildcard::None);
    if has_wildcard {
        return Err(PatternError::WildcardInSpecies(graph.to_string()).into());
    }
    Ok(graph)
}

/// Reads a declaration such as `A(b~0~1,c,c)`. Repeated names declare
/// multiple copies of a site.
pub fn parse_molecule_type(s: &str) -> Result<MoleculeType, BnglError> {
    let mut c = Cursor::new(non_empty(s)?);
    let mt = parser::molecule_type(&mut c)?;
    c.expect_end()?;
    Ok(mt)
}

/// Reads a compartment line such as `PM 2 10 EC`: name, dimension, size
/// and optional enclosing compartment.
pub fn parse_compartment(s: &str) -> Result<Compartment, BnglError> {
    let mut c = Cursor::new(non_empty(s)?);
    let compartment = parser::compartment(&mut c)?;
    c.expect_end()?;
    Ok(compartment)
}

/// Reads one rule line:
/// `[name:] reactants (->|<->) products rate[, reverse_rate] [modifiers]`.
///
/// Modifiers are `DeleteMolecules`, `include_reactants(i,pattern)` and
/// `exclude_reactants(i,pattern)` with 1-based `i`.
pub fn parse_rule(s: &str) -> Result<ReactionRule, BnglError> {
    let mut c = Cursor::new(non_empty(s)?);
    let rule = parser::rule(&mut c)?;
    c.expect_end()?;
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Site;
    use crate::rule::RateLaw;

    #[test]
    fn pattern_with_bond() {
        let g = parse_pattern("A(b!1,c~p).B(a!1)").unwrap();
        assert_eq!(g.molecule_count(), 2);
        assert_eq!(g.bond_between(Site::new(0, 0), Site::new(1, 0)), Some(1));
        assert_eq!(g.component(Site::new(0, 1)).unwrap().state.as_deref(), Some("p"));
        assert_eq!(g.to_string(), "A(b!1,c~p).B(a!1)");
    }

    #[test]
    fn wildcards_and_any_state() {
        let g = parse_pattern("A(b!+,c~?,d!-,e!?)").unwrap();
        let mol = g.molecule(0);
        assert_eq!(mol.components[0].wildcard, BondWildcard::Plus);
        assert_eq!(mol.components[1].state, None);
        assert_eq!(mol.components[2].wildcard, BondWildcard::Minus);
        assert_eq!(mol.components[3].wildcard, BondWildcard::Question);
    }

    #[test]
    fn bare_molecule_and_null() {
        assert_eq!(parse_pattern("Trash").unwrap().to_string(), "Trash()");
        assert!(parse_pattern("0").unwrap().is_empty());
        assert_eq!(parse_pattern("A()").unwrap().to_string(), "A()");
    }

    #[test]
    fn labels() {
        let g = parse_pattern("A%x(b)").unwrap();
        assert_eq!(g.molecule(0).label.as_deref(), Some("x"));
    }

    #[test]
    fn compartments_on_molecules_and_species() {
        let g = parse_pattern("L(r!1)@EC.R(l!1)@PM").unwrap();
        assert_eq!(g.molecule(0).compartment.as_deref(), Some("EC"));
        assert_eq!(g.molecule(1).compartment.as_deref(), Some("PM"));
        assert_eq!(g.to_string(), "L(r!1)@EC.R(l!1)@PM");

        let g = parse_pattern("@PM:R(l!1).L(r!1)@EC").unwrap();
        assert_eq!(g.molecule(0).compartment.as_deref(), Some("PM"));
        assert_eq!(g.molecule(1).compartment.as_deref(), Some("EC"));

        assert_eq!(parse_pattern("L@EC").unwrap().to_string(), "L()@EC");
        assert!(matches!(
            parse_pattern("@PM R(l)"),
            Err(BnglError::UnexpectedChar { expected: "':'", .. })
        ));
        assert!(parse_molecule_type("L(r)@EC").is_err());
    }

    #[test]
    fn compartment_lines() {
        let pm = parse_compartment("PM 2 10 EC").unwrap();
        assert_eq!(pm.name, "PM");
        assert!(pm.is_surface());
        assert_eq!(pm.size, 10.0);
        assert_eq!(pm.parent.as_deref(), Some("EC"));
        assert_eq!(parse_compartment("EC 3 1e-3").unwrap().parent, None);
        assert_eq!(
            parse_compartment("EC 4 1"),
            Err(BnglError::InvalidDimension { pos: 3 })
        );
        assert_eq!(
            parse_compartment("EC 3 -1"),
            Err(BnglError::InvalidSize { pos: 5 })
        );
        assert!(matches!(
            parse_compartment("EC 3"),
            Err(BnglError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn rule_with_compartments() {
        let rule = parse_rule("bind: L(r)@EC + R(l)@PM -> L(r!1)@EC.R(l!1)@PM kon").unwrap();
        assert_eq!(rule.name, "bind");
        assert_eq!(rule.reactants[1].molecule(0).compartment.as_deref(), Some("PM"));
    }

    #[test]
    fn dangling_bond_rejected() {
        assert_eq!(
            parse_pattern("A(b!1)"),
            Err(BnglError::Pattern(PatternError::DanglingBond { label: 1, count: 1 }))
        );
        assert!(matches!(
            parse_pattern("A(b!1).B(a!1).C(x!1)"),
            Err(BnglError::Pattern(PatternError::DanglingBond { count: 3, .. }))
        ));
    }

    #[test]
    fn contradictory_wildcard_rejected() {
        assert!(matches!(
            parse_pattern("A(b!-!1).B(a!1)"),
            Err(BnglError::Pattern(PatternError::Graph(_)))
        ));
    }

    #[test]
    fn species_rejects_wildcards() {
        assert!(parse_species("A(b)").is_ok());
        assert!(matches!(
            parse_species("A(b!+)"),
            Err(BnglError::Pattern(PatternError::WildcardInSpecies(_)))
        ));
    }

    #[test]
    fn syntax_errors_carry_position() {
        assert_eq!(
            parse_pattern("A(b,)"),
            Err(BnglError::UnexpectedChar {
                pos: 4,
                ch: ')',
                expected: "component name"
            })
        );
        assert_eq!(parse_pattern("  "), Err(BnglError::EmptyInput));
        assert!(matches!(
            parse_pattern("A(b~p~q)"),
            Err(BnglError::MultipleStates { .. })
        ));
    }

    #[test]
    fn molecule_type_declaration() {
        let mt = parse_molecule_type("L(r,r,s~u~p)").unwrap();
        assert_eq!(mt.count("r"), 2);
        assert_eq!(mt.component("s").unwrap().states, vec!["u", "p"]);
        assert!(matches!(
            parse_molecule_type("L(r!1)"),
            Err(BnglError::BondInDeclaration { .. })
        ));
    }

    #[test]
    fn full_rule() {
        let rule = parse_rule("bind: A(b) + B(a) <-> A(b!1).B(a!1) kf, kr DeleteMolecules").unwrap();
        assert_eq!(rule.name, "bind");
        assert_eq!(rule.reactants.len(), 2);
        assert_eq!(rule.products.len(), 1);
        assert_eq!(rule.rate, RateLaw::Expression("kf".into()));
        assert_eq!(rule.reverse_rate, Some(RateLaw::Expression("kr".into())));
        assert!(rule.delete_molecules);
    }

    #[test]
    fn unnamed_synthesis_and_degradation() {
        let syn = parse_rule("0 -> A(b) 1.5").unwrap();
        assert!(syn.name.is_empty());
        assert!(syn.reactants.is_empty());
        assert_eq!(syn.rate, RateLaw::Constant(1.5));
        let deg = parse_rule("A(b~0) -> 0 kdeg").unwrap();
        assert!(deg.products.is_empty());
    }

    #[test]
    fn slot_constraints() {
        let rule = parse_rule("A(b) + B(a) -> A(b!1).B(a!1) k include_reactants(1,A(c~p)) exclude_reactants(2,B(x!+))").unwrap();
        assert_eq!(rule.include.len(), 1);
        assert_eq!(rule.include[0].0, 0);
        assert_eq!(rule.exclude[0].0, 1);
        assert_eq!(
            parse_rule("A(b) -> A(b) k include_reactants(2,A())"),
            Err(BnglError::ReactantIndex { index: 2, reactants: 1 })
        );
    }

    #[test]
    fn rule_errors() {
        assert_eq!(parse_rule("A(b) B(a)"), Err(BnglError::MissingArrow));
        assert_eq!(parse_rule("A(b) -> B(a)"), Err(BnglError::MissingRate));
        assert_eq!(
            parse_rule("A(b) <-> B(a) kf"),
            Err(BnglError::RateCountMismatch { arrow: "<->", rates: 1 })
        );
        assert_eq!(
            parse_rule("A(b) -> B(a) kf MatchOnce"),
            Err(BnglError::UnknownModifier("MatchOnce".into()))
        );
    }
}
