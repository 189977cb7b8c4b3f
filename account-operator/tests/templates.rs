use account_operator::*;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn context() -> Value {
    let mut account = Account::new(
        "team-a",
        AccountSpec {
            creator: Some("alice".to_string()),
            display_name: Some("Team A".to_string()),
            ..AccountSpec::default()
        },
    );
    account.metadata.namespace = Some("acme-ns".to_string());
    TemplateRenderer::context(&account).unwrap()
}

fn render(template: Value) -> Value {
    let mut target = json!({});
    TemplateRenderer::new()
        .render_extension_spec(template.as_object().unwrap(), &context(), &["spec".to_string()], &mut target)
        .unwrap();
    target
}

#[test]
fn test_creator_rendering() {
    let rendered = render(json!({
        "plain": "{{ .Account.spec.creator }}",
        "loud": "{{ .Account.spec.creator | upper }}",
        "label": "{{ .Account.spec.displayName | kebabcase }}",
        "scope": "{{ .Account.metadata.namespace }}/{{ .Account.metadata.name }}",
    }));
    assert_eq!(rendered["spec"]["plain"], "alice");
    assert_eq!(rendered["spec"]["loud"], "ALICE");
    assert_eq!(rendered["spec"]["label"], "team-a");
    assert_eq!(rendered["spec"]["scope"], "acme-ns/team-a");
}

#[test]
fn test_nested_maps_keep_shape() {
    let rendered = render(json!({
        "outer": { "inner": { "owner": "{{ .Account.spec.creator }}", "count": 3 } },
        "list": ["{{ .Account.spec.creator }}"],
    }));
    assert_eq!(rendered["spec"]["outer"]["inner"]["owner"], "alice");
    assert_eq!(rendered["spec"]["outer"]["inner"]["count"], 3);
    // only string leaves are templates
    assert_eq!(rendered["spec"]["list"], json!(["{{ .Account.spec.creator }}"]));
}

#[test]
fn test_errors_name_the_field() {
    let template = json!({ "bad": "{{ .Account.spec.creator | }}" });
    let err = TemplateRenderer::new()
        .render_extension_spec(template.as_object().unwrap(), &context(), &["spec".to_string()], &mut json!({}))
        .unwrap_err();
    assert!(matches!(err, TemplateError::Parse { ref path, .. } if path == "spec.bad"));
}

#[test]
fn test_depth_bound() {
    let mut template = json!("leaf");
    for _ in 0..40 {
        template = json!({ "x": template });
    }
    let err = TemplateRenderer::new()
        .render_extension_spec(template.as_object().unwrap(), &context(), &[], &mut json!({}))
        .unwrap_err();
    assert!(matches!(err, TemplateError::TooDeep { .. }));
}

#[test]
fn test_non_object_target_is_a_write_error() {
    let template = json!({ "a": "x" });
    let err = TemplateRenderer::new()
        .render_extension_spec(template.as_object().unwrap(), &context(), &["spec".to_string()], &mut json!("scalar"))
        .unwrap_err();
    assert!(matches!(err, TemplateError::Write { .. }));
}

fn non_string_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        prop::collection::vec(any::<u8>().prop_map(|n| json!(n)), 0..4).prop_map(Value::Array),
    ]
}

fn non_string_tree() -> impl Strategy<Value = Map<String, Value>> {
    let leaf = non_string_leaf();
    let tree = leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,6}", inner, 1..4)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    });
    prop::collection::btree_map("[a-z]{1,6}", tree, 0..5).prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn non_string_leaves_are_copied_unchanged(template in non_string_tree()) {
        let mut target = json!({});
        TemplateRenderer::new()
            .render_extension_spec(&template, &context(), &[], &mut target)
            .unwrap();
        prop_assert_eq!(target, Value::Object(template));
    }
}
