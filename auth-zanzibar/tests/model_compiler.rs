use auth_zanzibar::*;
use proptest::prelude::*;

const CORE: &str = r#"
module core

# shared identities
type user

type role
  relations
    define assignee: [user]

type account
  relations
    define parent: [account]
    define owner: [user] or owner from parent
    define member: [user, user:*, role#assignee with in_office] or owner
"#;

const BILLING: &str = r#"
module billing

extend type account
  relations
    define billing_admin: [user] or owner
    define auditor: (member and billing_admin) but not blocked
    define blocked: [user]

condition in_office(hour: int, allowed: list<string>) {
  hour >= 9 &&
  hour < 17
}
"#;

fn files() -> Vec<ModuleFile> {
    vec![ModuleFile::new("core.fga", CORE), ModuleFile::new("billing.fga", BILLING)]
}

#[test]
fn test_modules_merge_into_one_model() {
    let model = compile_modules(&files()).unwrap();
    assert_eq!(model.schema_version, "1.2");

    let names: Vec<&str> = model.type_definitions.iter().map(|t| t.type_name.as_str()).collect();
    assert_eq!(names, vec!["user", "role", "account"]);

    let account = model.type_definition("account").unwrap();
    let relations: Vec<&str> = account.relations.keys().map(String::as_str).collect();
    assert_eq!(
        relations,
        vec!["auditor", "billing_admin", "blocked", "member", "owner", "parent"]
    );
}

#[test]
fn test_module_attribution() {
    let model = compile_modules(&files()).unwrap();
    let account = model.type_definition("account").unwrap();
    let metadata = account.metadata.as_ref().unwrap();
    assert_eq!(metadata.module.as_deref(), Some("core"));
    assert_eq!(metadata.source_info.as_ref().unwrap().file, "core.fga");

    let extended = account.relation_metadata("billing_admin").unwrap();
    assert_eq!(extended.module.as_deref(), Some("billing"));
    assert_eq!(extended.source_info.as_ref().unwrap().file, "billing.fga");

    let own = account.relation_metadata("owner").unwrap();
    assert!(own.module.is_none());
}

#[test]
fn test_rewrites_and_direct_types() {
    let model = compile_modules(&files()).unwrap();
    let account = model.type_definition("account").unwrap();

    assert_eq!(
        account.relations["owner"],
        Userset::Union(Usersets {
            child: vec![Userset::direct(), Userset::tuple_to_userset("parent", "owner")]
        })
    );
    assert!(matches!(account.relations["auditor"], Userset::Difference(_)));

    let member = account.relation_metadata("member").unwrap();
    let direct = &member.directly_related_user_types;
    assert_eq!(direct.len(), 3);
    assert_eq!(direct[1].wildcard, Some(Wildcard {}));
    assert_eq!(direct[2].type_name, "role");
    assert_eq!(direct[2].relation.as_deref(), Some("assignee"));
    assert_eq!(direct[2].condition, "in_office");
}

#[test]
fn test_condition_compiled() {
    let model = compile_modules(&files()).unwrap();
    let condition = &model.conditions["in_office"];
    assert_eq!(condition.expression, "hour >= 9 &&\nhour < 17");
    assert_eq!(condition.parameters["hour"].type_name, "TYPE_NAME_INT");
    assert_eq!(condition.parameters["allowed"].generic_types[0].type_name, "TYPE_NAME_STRING");
    assert_eq!(condition.metadata.as_ref().unwrap().module, "billing");
}

#[test]
fn test_file_order_does_not_matter() {
    let forward = compile_modules(&files()).unwrap();
    let mut reversed_files = files();
    reversed_files.reverse();
    let reversed = compile_modules(&reversed_files).unwrap();
    assert_eq!(
        forward.type_definition("account"),
        reversed.type_definition("account")
    );
}

#[test]
fn test_json_shape() {
    let model = compile_modules(&files()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
    assert_eq!(json["type_definitions"][2]["type"], "account");
    assert_eq!(
        json["type_definitions"][2]["relations"]["parent"],
        serde_json::json!({ "this": {} })
    );
    assert_eq!(
        json["type_definitions"][2]["metadata"]["relations"]["parent"]["directly_related_user_types"][0]["type"],
        "account"
    );
}

#[test]
fn test_duplicate_type_across_modules() {
    let other = ModuleFile::new("other.fga", "module other\ntype user\n");
    let err = compile_modules(&[ModuleFile::new("core.fga", CORE), other]).unwrap_err();
    assert!(matches!(err, ZanzibarError::SchemaValidationFailed(ref m) if m.contains("core.fga")));
}

#[test]
fn test_extension_cannot_redefine_relation() {
    let clash = ModuleFile::new(
        "clash.fga",
        "module clash\nextend type account\n  relations\n    define owner: [user]\n",
    );
    let err = compile_modules(&[ModuleFile::new("core.fga", CORE), clash]).unwrap_err();
    assert!(err.to_string().contains("defined more than once"));
}

#[test]
fn test_extend_undefined_type() {
    let err = compile_modules(&[ModuleFile::new("billing.fga", BILLING)]).unwrap_err();
    assert!(err.to_string().contains("cannot extend undefined type 'account'"));
}

#[test]
fn test_undefined_references() {
    let cases = [
        "module m\ntype user\ntype doc\n  relations\n    define viewer: editor\n",
        "module m\ntype doc\n  relations\n    define viewer: [user]\n",
        "module m\ntype user\ntype doc\n  relations\n    define viewer: [user#member]\n",
        "module m\ntype user\ntype doc\n  relations\n    define viewer: [user with missing]\n",
        "module m\ntype user\ntype doc\n  relations\n    define parent: [user]\n    define viewer: viewer from parent\n",
    ];
    for source in cases {
        let err = compile_modules(&[ModuleFile::new("m.fga", source)]).unwrap_err();
        assert!(matches!(err, ZanzibarError::SchemaValidationFailed(_)), "{source}: {err}");
    }
}

#[test]
fn test_syntax_errors_carry_location() {
    let missing_module = compile_modules(&[ModuleFile::new("a.fga", "type user\n")]).unwrap_err();
    assert!(missing_module.to_string().contains("a.fga:1"));

    let bad_define = "module m\ntype user\ntype doc\n  relations\n    define viewer: [user] or\n";
    let err = compile_modules(&[ModuleFile::new("b.fga", bad_define)]).unwrap_err();
    assert!(err.is_schema_error());
    assert!(err.to_string().contains("b.fga:5"));

    let stray = "module m\ntype user\n  define viewer: [user]\n";
    assert!(compile_modules(&[ModuleFile::new("c.fga", stray)]).is_err());

    let unterminated = "module m\ncondition c(x: int) {\n  x > 1\n";
    assert!(compile_modules(&[ModuleFile::new("d.fga", unterminated)]).is_err());
}

#[test]
fn test_empty_module_list() {
    let model = compile_modules(&[]).unwrap();
    assert!(model.type_definitions.is_empty());
}

proptest! {
    #[test]
    fn normalized_identifiers_have_no_separators(id in "[a-z0-9:#@. -]{1,40}") {
        let normalized = normalize_identifier(&id);
        prop_assert!(!normalized.contains(':'));
        prop_assert!(!normalized.contains('#'));
        prop_assert!(!normalized.chars().any(char::is_whitespace));
        prop_assert_eq!(normalize_identifier(&normalized), normalized.clone());
    }
}
