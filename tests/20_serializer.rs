mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use bbweb::serialize::{entity_to_json, to_json, Node, SerializeError, SerializeOptions, Serializer};
use bbweb::FieldSelector;
use common::{MockModel, Order, Person};

const NO_FIELDS: &[&str] = &[];

#[test]
fn default_output_keeps_declaration_order() -> Result<()> {
    let out = entity_to_json(&MockModel::new(1, "Name"), false, NO_FIELDS)?;
    assert_eq!(
        out.to_string(),
        r#"{"datetime":"2010-09-10T06:51:25Z","name":"Name","canceled":true,"id":1,"date":"2010-09-10","child":null}"#
    );
    Ok(())
}

#[test]
fn exclusive_tokens_keep_only_named_fields() -> Result<()> {
    let out = entity_to_json(&MockModel::new(1, "Name"), false, &["^id", "^name"])?;
    assert_eq!(out.to_string(), r#"{"name":"Name","id":1}"#);
    Ok(())
}

#[test]
fn exclusion_tokens_drop_named_fields() -> Result<()> {
    let out = entity_to_json(&MockModel::new(1, "Name"), false, &["!id", "!name"])?;
    assert_eq!(
        out,
        json!({"datetime": "2010-09-10T06:51:25Z", "canceled": true, "date": "2010-09-10", "child": null})
    );
    Ok(())
}

#[test]
fn nested_tokens_apply_one_level_down() -> Result<()> {
    let mut parent = MockModel::new(1, "Parent");
    parent.child = Some(Arc::new(MockModel::new(2, "Child")));

    let out = entity_to_json(&parent, false, &["^name", "^child", "child.!name"])?;
    assert_eq!(
        out,
        json!({
            "name": "Parent",
            "child": {
                "datetime": "2010-09-10T06:51:25Z",
                "canceled": true,
                "id": 2,
                "date": "2010-09-10",
                "child": null
            }
        })
    );
    Ok(())
}

#[test]
fn person_visibility_rules() -> Result<()> {
    let person = Person::sample();

    assert_eq!(entity_to_json(&person, false, NO_FIELDS)?, json!({"id": 1, "name": "Name"}));
    assert_eq!(
        entity_to_json(&person, true, NO_FIELDS)?,
        json!({"id": 1, "name": "Name", "ssn": "secret"})
    );
    assert_eq!(entity_to_json(&person, false, &["!name"])?, json!({"id": 1}));
    Ok(())
}

#[test]
fn plain_token_reveals_private_field() -> Result<()> {
    let out = entity_to_json(&Person::sample(), false, &["ssn"])?;
    assert_eq!(out, json!({"id": 1, "name": "Name", "ssn": "secret"}));

    // ^ narrows but does not unlock
    let out = entity_to_json(&Person::sample(), false, &["^ssn"])?;
    assert_eq!(out, json!({}));
    Ok(())
}

#[test]
fn hidden_fields_never_appear() -> Result<()> {
    let selectors: &[&[&str]] = &[
        &[],
        &["password"],
        &["^password"],
        &["password", "^password"],
        &["!id", "password"],
    ];

    for tokens in selectors {
        for allow_private in [false, true] {
            let out = entity_to_json(&Person::sample(), allow_private, tokens)?;
            assert!(out.get("password").is_none(), "password leaked for {:?}", tokens);
        }
    }
    Ok(())
}

#[test]
fn unknown_and_conflicting_tokens() -> Result<()> {
    let person = Person::sample();
    assert_eq!(
        entity_to_json(&person, false, &["nope", "!nada", ".x", "x."])?,
        json!({"id": 1, "name": "Name"})
    );
    assert_eq!(entity_to_json(&person, false, &["name", "!name"])?, json!({"id": 1}));
    Ok(())
}

#[test]
fn single_exclusive_sub_token_collapses_relation() -> Result<()> {
    let loads = Arc::new(AtomicUsize::new(0));
    let order = Order {
        id: 7,
        items: vec![(1, "a"), (2, "b"), (3, "c")],
        loads: loads.clone(),
    };

    let out = entity_to_json(&order, false, &["^items", "items.^id"])?;
    assert_eq!(out, json!({"items": [1, 2, 3]}));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn extra_sub_tokens_keep_objects() -> Result<()> {
    let order = Order {
        id: 7,
        items: vec![(1, "a"), (2, "b")],
        loads: Arc::new(AtomicUsize::new(0)),
    };

    let out = entity_to_json(&order, false, &["^items", "items.^id", "items.^label"])?;
    assert_eq!(
        out,
        json!({"items": [{"id": 1, "label": "a"}, {"id": 2, "label": "b"}]})
    );
    Ok(())
}

#[test]
fn lazy_relation_is_not_loaded_when_excluded() -> Result<()> {
    let loads = Arc::new(AtomicUsize::new(0));
    let order = Order {
        id: 7,
        items: vec![(1, "a")],
        loads: loads.clone(),
    };

    assert_eq!(entity_to_json(&order, false, &["!items"])?, json!({"id": 7}));
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn serialized_output_is_a_fixed_point() -> Result<()> {
    let mut parent = MockModel::new(1, "Name");
    parent.child = Some(Arc::new(MockModel::new(2, "Child")));
    let first = entity_to_json(&parent, false, NO_FIELDS)?;

    let again = to_json(&Node::from(first.clone()), false, &["^id", "!name"])?;
    assert_eq!(again, first);
    Ok(())
}

#[test]
fn mappings_and_sequences_are_transparent() -> Result<()> {
    let node: Node = [
        ("people".to_string(), Node::from(vec![Node::entity(Person::sample())])),
        ("count".to_string(), Node::from(1_i64)),
    ]
    .into_iter()
    .collect();

    let out = to_json(&node, false, &["!name"])?;
    assert_eq!(out, json!({"people": [{"id": 1}], "count": 1}));
    Ok(())
}

#[test]
fn self_relation_is_bounded_by_depth_guard() {
    fn cycle_free_chain(depth: usize) -> MockModel {
        let mut node = MockModel::new(0, "leaf");
        for i in 1..depth {
            let mut parent = MockModel::new(i as i64, "link");
            parent.child = Some(Arc::new(node));
            node = parent;
        }
        node
    }

    let chain = Node::entity(cycle_free_chain(10));
    let selector = FieldSelector::new();

    let bounded = Serializer::new(SerializeOptions::default().with_max_depth(Some(4)));
    assert!(matches!(
        bounded.serialize(&chain, &selector),
        Err(SerializeError::DepthExceeded { max_depth: 4 })
    ));

    let unbounded = Serializer::new(SerializeOptions::default().with_max_depth(None));
    let out = unbounded.serialize(&chain, &selector).unwrap();
    let mut depth = 0;
    let mut cursor = &out;
    while let Some(child) = cursor.get("child").filter(|c| !c.is_null()) {
        depth += 1;
        cursor = child;
    }
    assert_eq!(depth, 9);
    assert_eq!(cursor["name"], Value::from("leaf"));
}
