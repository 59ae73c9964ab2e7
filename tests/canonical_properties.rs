use proptest::prelude::*;
use rulecrab::graph_ops::renumber_molecules;
use rulecrab::{canonicalize, parse_species, Component, Molecule, Site, SpeciesGraph};

fn canonical(species: &str) -> String {
    let graph = parse_species(species).unwrap();
    canonicalize(&graph).into_string()
}

// Molecule order must not matter
#[test]
fn molecule_ordering_heterodimer() {
    let a = canonical("A(b!1).B(a!1)");
    let b = canonical("B(a!1).A(b!1)");
    assert_eq!(a, b, "molecule ordering: '{a}' vs '{b}'");
}

// Component order inside a molecule must not matter
#[test]
fn component_ordering() {
    let a = canonical("A(x~p,y,z!1).B(a!1)");
    let b = canonical("B(a!5).A(z!5,y,x~p)");
    assert_eq!(a, b, "component ordering: '{a}' vs '{b}'");
}

// Which copy of a repeated site carries the bond must not matter
#[test]
fn repeated_site_choice() {
    let a = canonical("A(b!1,b).B(a!1)");
    let b = canonical("A(b,b!1).B(a!1)");
    assert_eq!(a, b, "repeated site: '{a}' vs '{b}'");
}

// Same census and bond count, different connectivity
#[test]
fn chain_is_not_ring() {
    let chain = canonical("P(a,b!1).P(a!1,b!2).P(a!2,b!3).P(a!3,b)");
    let ring = canonical("P(a!4,b!1).P(a!1,b!2).P(a!2,b!3).P(a!3,b!4)");
    assert_ne!(chain, ring);
}

// States placed on different partners of a symmetric hub
#[test]
fn hub_state_placement() {
    let a = canonical("L(r!1,r!2).R(l!1,s~p).R(l!2,s~u)");
    let b = canonical("L(r!1,r!2).R(l!1,s~u).R(l!2,s~p)");
    assert_eq!(a, b, "hub states: '{a}' vs '{b}'");
    let c = canonical("L(r!1,r!2).R(l!1,s~p).R(l!2,s~p)");
    assert_ne!(a, c);
}

// Every molecule looks the same locally: a six-ring versus two triangles
#[test]
fn regular_graphs_are_told_apart() {
    let six_ring = canonical(
        "A(x!1,y!2).A(x!2,y!3).A(x!3,y!4).A(x!4,y!5).A(x!5,y!6).A(x!6,y!1)",
    );
    let triangles = canonical(
        "A(x!1,y!2).A(x!2,y!3).A(x!3,y!1).A(x!4,y!5).A(x!5,y!6).A(x!6,y!4)",
    );
    assert_ne!(six_ring, triangles);
    let six_ring_shifted = canonical(
        "A(x!6,y!1).A(x!1,y!2).A(x!2,y!3).A(x!3,y!4).A(x!4,y!5).A(x!5,y!6)",
    );
    assert_eq!(six_ring, six_ring_shifted);
}

/// A linear chain of `len` P molecules, each with a random state on `s`,
/// optionally closed into a ring.
fn chain(states: &[bool], ring: bool) -> SpeciesGraph {
    let mut g = SpeciesGraph::new();
    for &phos in states {
        g.add_molecule(
            Molecule::new("P")
                .with_component(Component::new("a"))
                .with_component(Component::new("b"))
                .with_component(Component::with_states("s", ["u", "p"]).with_state(if phos { "p" } else { "u" })),
        );
    }
    for i in 1..states.len() {
        g.add_bond(Site::new(i - 1, 1), Site::new(i, 0)).unwrap();
    }
    if ring && states.len() > 1 {
        g.add_bond(Site::new(states.len() - 1, 1), Site::new(0, 0)).unwrap();
    }
    g
}

proptest! {
    #[test]
    fn relabeling_preserves_key(
        states in prop::collection::vec(any::<bool>(), 1..7),
        ring in any::<bool>(),
        perm_seed in prop::collection::vec(any::<u32>(), 7),
    ) {
        let graph = chain(&states, ring);
        let n = graph.molecule_count();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| (perm_seed[i], i));
        let shuffled = renumber_molecules(&graph, &order).unwrap();
        prop_assert_eq!(canonicalize(&graph), canonicalize(&shuffled));
    }

    #[test]
    fn key_reparses_to_itself(
        states in prop::collection::vec(any::<bool>(), 1..7),
        ring in any::<bool>(),
    ) {
        let key = canonicalize(&chain(&states, ring));
        let reparsed = parse_species(key.as_str()).unwrap();
        prop_assert_eq!(canonicalize(&reparsed), key);
    }
}
