use crate::*;

fn hub_with_three_partners() -> SpeciesGraph {
    let mut g = SpeciesGraph::new();
    let hub = g.add_molecule(Molecule::new("A").with_component(Component::new("b")));
    for _ in 0..3 {
        let leaf = g.add_molecule(Molecule::new("B").with_component(Component::new("a")));
        g.add_bond(Site::new(hub, 0), Site::new(leaf, 0)).unwrap();
    }
    g
}

#[test]
fn build_species_by_hand() {
    let mut g = SpeciesGraph::new();
    let a = g.add_molecule(
        Molecule::new("A")
            .with_component(Component::new("b"))
            .with_component(Component::with_states("s", ["u", "p"]).with_state("u")),
    );
    let b = g.add_molecule(Molecule::new("B").with_component(Component::new("a")));
    let label = g.add_bond(Site::new(a, 0), Site::new(b, 0)).unwrap();

    assert_eq!(label, 1);
    assert_eq!(g.bond_count(), 1);
    assert!(g.is_connected());
    assert!(g.check_bond_symmetry());
    assert_eq!(g.to_string(), "A(b!1,s~u).B(a!1)");
}

#[test]
fn multi_site_bonding_renders_labels_ascending() {
    let g = hub_with_three_partners();
    assert_eq!(g.molecule(0).components[0].bond_count(), 3);
    assert_eq!(g.to_string(), "A(b!1!2!3).B(a!1).B(a!2).B(a!3)");
}

#[test]
fn wildcards_against_multi_site_target() {
    let target = hub_with_three_partners();
    let embeds = |p: &str| find_embeddings(&parse_pattern(p).unwrap(), &target).count();

    assert_eq!(embeds("A(b!+)"), 1);
    assert_eq!(embeds("A(b!?)"), 0);
    assert_eq!(embeds("A(b!-)"), 0);
    assert_eq!(embeds("A(b)"), 0);

    let free = parse_species("A(b)").unwrap();
    assert!(has_embedding(&parse_pattern("A(b!?)").unwrap(), &free));
    assert!(has_embedding(&parse_pattern("A(b!-)").unwrap(), &free));
    assert!(!has_embedding(&parse_pattern("A(b!+)").unwrap(), &free));
}

#[test]
fn unsatisfiable_wildcard_is_rejected_at_construction() {
    let mut g = SpeciesGraph::new();
    let a = g.add_molecule(
        Molecule::new("A").with_component(Component::new("b").with_wildcard(BondWildcard::Minus)),
    );
    let b = g.add_molecule(Molecule::new("B").with_component(Component::new("a")));
    assert!(matches!(
        g.add_bond(Site::new(a, 0), Site::new(b, 0)),
        Err(GraphError::UnsatisfiableWildcard { .. })
    ));
    assert_eq!(g.bond_count(), 0);
}

#[test]
fn molecule_type_lookup_distinguishes_missing() {
    let mut mt = MoleculeType::new("A");
    mt.add_component("s", ["u", "p"]);
    mt.add_component("b", Vec::<String>::new());
    assert!(mt.component("s").is_some());
    assert!(mt.component("b").unwrap().states.is_empty());
    assert!(mt.component("zz").is_none());

    mt.add_component("s", ["x"]);
    assert_eq!(mt.component("s").unwrap().states, vec!["x"]);
}

#[test]
fn canonical_key_survives_relabeling() {
    let a = parse_species("A(b!1).B(a!1,c!2).C(x!2)").unwrap();
    let b = parse_species("C(x!9).B(c!9,a!4).A(b!4)").unwrap();
    assert_eq!(canonicalize(&a), canonicalize(&b));
    assert!(is_isomorphic(&a, &b));
}

#[test]
fn end_to_end_generation() {
    let mut model = Model::new();
    model
        .add_molecule_type(parse_molecule_type("L(r)").unwrap())
        .add_molecule_type(parse_molecule_type("R(l,y~0~P)").unwrap())
        .add_seed(parse_species("L(r)").unwrap(), 100.0)
        .add_seed(parse_species("R(l,y~0)").unwrap(), 50.0)
        .add_rule(parse_rule("bind: L(r) + R(l) <-> L(r!1).R(l!1) kon, koff").unwrap())
        .add_rule(parse_rule("phos: R(l!+,y~0) -> R(l!+,y~P) kp").unwrap());

    let net = NetworkGenerator::default().generate(&model).unwrap();
    assert!(net.status.is_converged());
    let names: Vec<&str> = net.species.iter().map(Species::name).collect();
    assert_eq!(
        names,
        vec![
            "L(r)",
            "R(l,y~0)",
            "L(r!1).R(l!1,y~0)",
            "L(r!1).R(l!1,y~P)",
            "R(l,y~P)",
        ]
    );
    // bind twice, unbind twice, phosphorylate once
    assert_eq!(net.reactions.len(), 5);
    assert!(net.reactions.iter().all(|r| r.propensity_factor() == 1.0));
}
