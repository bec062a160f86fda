use parvograph::{
    AttributeValue, Binding, DatabaseConfig, GraphDbError, InstanceGraph,
    expr::parse_script,
    literal::parse_graph,
    mutation::{create, delete, set},
};

fn graph(text: &str) -> InstanceGraph {
    InstanceGraph::from_literal(text).expect("graph")
}

#[test]
fn test_create_rejects_unbound_name_of_existing_vertex() {
    let mut g = graph("{'tag': 'NN'}(v1)");
    let pattern = parse_graph("{'tag': 'VB'}(v1), {}(v1,v9), {}(v9)", "edge").expect("pattern");
    let err = create(&mut g, &pattern, &Binding::new(), &DatabaseConfig::default())
        .expect_err("collision");
    assert!(matches!(err, GraphDbError::IdentityCollision(_)));
    assert_eq!((g.vertex_count(), g.edge_count()), (1, 0));
}

#[test]
fn test_create_contracts_vertices_sharing_a_name_when_not_strict() {
    let mut g = graph("{'tag': 'NN'}(v1)");
    let pattern = parse_graph("{'tag': 'VB', 'lemma': 'x'}(v1), {}(v1,v9), {'tag': 'JJ'}(v9)", "edge")
        .expect("pattern");
    let config = DatabaseConfig::default().with_strict_identities(false);
    let outcome = create(&mut g, &pattern, &Binding::new(), &config).expect("create");
    assert_eq!(outcome.vertices_created, 1);
    assert_eq!(outcome.vertices_merged, 1);
    assert_eq!(g.vertex_count(), 2);
    let v1 = &g.vertex("v1").expect("v1").attributes;
    assert_eq!(v1.get("tag"), Some(&AttributeValue::from("NN")));
    assert_eq!(v1.get("lemma"), Some(&AttributeValue::from("x")));
}

#[test]
fn test_generated_names_use_configured_prefix() {
    let mut g = InstanceGraph::new();
    let config = DatabaseConfig::default().with_generated_name_prefix("rel");
    let pattern = parse_graph("{'w': 1}(a,b)", &config.generated_name_prefix).expect("pattern");
    create(&mut g, &pattern, &Binding::new(), &config).expect("create");
    let edge = g.edges().next().expect("edge");
    assert!(edge.name.starts_with("rel"), "got {}", edge.name);
}

#[test]
fn test_bound_edge_placeholder_merges_attributes() {
    let mut g = graph("{}(a), {}(b), {'name': 'e1', 'w': 1}(a,b)");
    let mut binding = Binding::new();
    binding.bind_vertex("x", "a");
    binding.bind_vertex("y", "b");
    binding.bind_edge("r", "e1");
    let pattern = parse_graph("{'name': 'r', 'w': 2, 'label': 'L'}(x,y)", "edge").expect("pattern");
    let outcome = create(&mut g, &pattern, &binding, &DatabaseConfig::default()).expect("create");
    assert_eq!(outcome.edges_merged, 1);
    let edge = g.edge("e1").expect("e1");
    assert_eq!(edge.attributes.get("w"), Some(&AttributeValue::Number(1.0)));
    assert_eq!(edge.attributes.get("label"), Some(&AttributeValue::from("L")));
    assert_eq!(g.edge_count(), 1);
}

#[test]
fn test_delete_prefers_binding_over_literal_names() {
    let mut g = graph("{}(a), {}(x)");
    let mut binding = Binding::new();
    binding.bind_vertex("x", "a");
    delete(&mut g, &["x".to_string()], &binding).expect("delete");
    assert!(!g.contains_vertex("a"));
    assert!(g.contains_vertex("x"));
}

#[test]
fn test_delete_refusal_is_atomic() {
    let mut g = graph("{}(a), {}(b), {}(c), {'name': 'r'}(a,b), {'name': 's'}(b,c)");
    let err = delete(&mut g, &["r".to_string(), "b".to_string()], &Binding::new()).expect_err("dangling");
    assert!(matches!(err, GraphDbError::DanglingEdge(_)));
    assert!(g.contains_edge("r"), "nothing removed when validation fails");
}

#[test]
fn test_set_runs_against_pattern_and_instance_separately() {
    let mut g = graph("{'n': 1}(v1)");
    let mut pattern = parse_graph("{'n': 5}(a)", "edge").expect("pattern");
    let mut binding = Binding::new();
    binding.bind_vertex("a", "v1");
    let script = parse_script(r#"(assoc a "n" (+ (get a "n") 10))"#).expect("script");
    let outcome = set(&mut g, Some(&mut pattern), &script, &binding);
    assert_eq!((outcome.pattern_written, outcome.instance_written), (1, 1));
    assert_eq!(
        pattern.vertex("a").expect("a").attributes.get("n"),
        Some(&AttributeValue::Number(15.0))
    );
    assert_eq!(
        g.vertex("v1").expect("v1").attributes.get("n"),
        Some(&AttributeValue::Number(11.0))
    );
}

#[test]
fn test_set_cannot_rename_entities() {
    let mut g = graph("{}(v1)");
    let mut binding = Binding::new();
    binding.bind_vertex("a", "v1");
    let script = parse_script(r#"(assoc a "name" "v2")"#).expect("script");
    let outcome = set(&mut g, None, &script, &binding);
    assert_eq!(outcome.instance_written, 0);
    assert!(g.contains_vertex("v1"));
}
