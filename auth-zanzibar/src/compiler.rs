//! Compiler for the modular authorization model language.
//!
//! A model is split across module files. Each file starts with a `module`
//! declaration and contributes `type` blocks, `extend type` blocks that add
//! relations to a type owned by another module, and `condition` blocks:
//!
//! ```text
//! module core
//!
//! type user
//!
//! type account
//!   relations
//!     define parent: [account]
//!     define owner: [user] or owner from parent
//!     define member: [user, user:*, account#owner with in_office] or owner
//!
//! condition in_office(hour: int) {
//!   hour >= 9 && hour < 17
//! }
//! ```
//!
//! `#` starts a comment at the beginning of a line or after whitespace.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, ZanzibarError};
use crate::schema::*;

/// One model source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    pub name: String,
    pub contents: String,
}

impl ModuleFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Merge module files into one validated model
pub fn compile_modules(files: &[ModuleFile]) -> Result<AuthorizationModel> {
    let mut builder = ModelBuilder::default();
    for file in files {
        builder.parse_file(file)?;
    }
    builder.finish()
}

struct RelationDef {
    name: String,
    rewrite: Userset,
    direct: Vec<RelationReference>,
    line: usize,
}

struct Extension {
    module: String,
    file: String,
    line: usize,
    type_name: String,
    relations: Vec<RelationDef>,
}

enum Target {
    Type(usize),
    Extension(usize),
}

#[derive(Default)]
struct ModelBuilder {
    types: Vec<TypeDefinition>,
    type_index: HashMap<String, usize>,
    type_files: HashMap<String, String>,
    extensions: Vec<Extension>,
    conditions: BTreeMap<String, ConditionDefinition>,
}

fn syntax_error(file: &str, line: usize, message: impl std::fmt::Display) -> ZanzibarError {
    ZanzibarError::InvalidSchema(format!("{file}:{line}: {message}"))
}

impl ModelBuilder {
    fn parse_file(&mut self, file: &ModuleFile) -> Result<()> {
        let mut module: Option<String> = None;
        let mut target: Option<Target> = None;
        let mut in_relations = false;
        let mut lines = file.contents.lines().enumerate();

        while let Some((index, raw)) = lines.next() {
            let line_no = index + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();

            match words.as_slice() {
                ["module", name] => {
                    if module.is_some() {
                        return Err(syntax_error(&file.name, line_no, "module declared twice"));
                    }
                    module = Some(identifier(name, &file.name, line_no)?.to_string());
                }
                _ if module.is_none() => {
                    return Err(syntax_error(&file.name, line_no, "expected 'module <name>' declaration"));
                }
                ["type", name] => {
                    let name = identifier(name, &file.name, line_no)?;
                    if let Some(other) = self.type_files.get(name) {
                        return Err(ZanzibarError::SchemaValidationFailed(format!(
                            "{}:{}: type '{}' is already defined in {}",
                            file.name, line_no, name, other
                        )));
                    }
                    let module_name = module.clone().unwrap_or_default();
                    self.types.push(TypeDefinition {
                        type_name: name.to_string(),
                        relations: BTreeMap::new(),
                        metadata: Some(TypeMetadata {
                            relations: BTreeMap::new(),
                            module: Some(module_name),
                            source_info: Some(SourceInfo { file: file.name.clone() }),
                        }),
                    });
                    self.type_index.insert(name.to_string(), self.types.len() - 1);
                    self.type_files.insert(name.to_string(), file.name.clone());
                    target = Some(Target::Type(self.types.len() - 1));
                    in_relations = false;
                }
                ["extend", "type", name] => {
                    let name = identifier(name, &file.name, line_no)?;
                    self.extensions.push(Extension {
                        module: module.clone().unwrap_or_default(),
                        file: file.name.clone(),
                        line: line_no,
                        type_name: name.to_string(),
                        relations: Vec::new(),
                    });
                    target = Some(Target::Extension(self.extensions.len() - 1));
                    in_relations = false;
                }
                ["relations"] => {
                    if target.is_none() {
                        return Err(syntax_error(&file.name, line_no, "'relations' outside a type block"));
                    }
                    in_relations = true;
                }
                ["define", ..] => {
                    let Some(current) = target.as_ref().filter(|_| in_relations) else {
                        return Err(syntax_error(&file.name, line_no, "'define' outside a relations block"));
                    };
                    let relation = parse_define(line, &file.name, line_no)?;
                    self.add_relation(current, relation, &file.name)?;
                }
                ["condition", ..] => {
                    let mut text = line.to_string();
                    let mut depth = brace_delta(line);
                    let mut opened = line.contains('{');
                    while !opened || depth > 0 {
                        let Some((_, next)) = lines.next() else {
                            return Err(syntax_error(&file.name, line_no, "unterminated condition"));
                        };
                        text.push('\n');
                        text.push_str(next.trim());
                        depth += brace_delta(next);
                        opened |= next.contains('{');
                    }
                    let module_name = module.clone().unwrap_or_default();
                    let condition = parse_condition(&text, &module_name, &file.name, line_no)?;
                    if self.conditions.contains_key(&condition.name) {
                        return Err(ZanzibarError::SchemaValidationFailed(format!(
                            "{}:{}: condition '{}' is defined more than once",
                            file.name, line_no, condition.name
                        )));
                    }
                    self.conditions.insert(condition.name.clone(), condition);
                    target = None;
                    in_relations = false;
                }
                _ => return Err(syntax_error(&file.name, line_no, format!("unexpected '{line}'"))),
            }
        }

        if module.is_none() {
            return Err(ZanzibarError::InvalidSchema(format!("{}: no module declaration", file.name)));
        }
        Ok(())
    }

    fn add_relation(&mut self, target: &Target, relation: RelationDef, file: &str) -> Result<()> {
        match target {
            Target::Type(index) => {
                let definition = self
                    .types
                    .get_mut(*index)
                    .ok_or_else(|| syntax_error(file, relation.line, "relation outside a type"))?;
                insert_relation(definition, relation, None, file)
            }
            Target::Extension(index) => {
                let extension = self
                    .extensions
                    .get_mut(*index)
                    .ok_or_else(|| syntax_error(file, relation.line, "relation outside a type"))?;
                if extension.relations.iter().any(|r| r.name == relation.name) {
                    return Err(ZanzibarError::SchemaValidationFailed(format!(
                        "{}:{}: relation '{}' on type '{}' is defined more than once",
                        file, relation.line, relation.name, extension.type_name
                    )));
                }
                extension.relations.push(relation);
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<AuthorizationModel> {
        for extension in std::mem::take(&mut self.extensions) {
            let definition = self
                .type_index
                .get(&extension.type_name)
                .and_then(|index| self.types.get_mut(*index))
                .ok_or_else(|| {
                    ZanzibarError::SchemaValidationFailed(format!(
                        "{}:{}: cannot extend undefined type '{}'",
                        extension.file, extension.line, extension.type_name
                    ))
                })?;
            for relation in extension.relations {
                insert_relation(definition, relation, Some(&extension.module), &extension.file)?;
            }
        }

        let model = AuthorizationModel {
            schema_version: SCHEMA_VERSION.to_string(),
            type_definitions: self.types,
            conditions: self.conditions,
        };
        validate_model(&model)?;
        Ok(model)
    }
}

fn insert_relation(definition: &mut TypeDefinition, relation: RelationDef, module: Option<&str>, file: &str) -> Result<()> {
    if definition.relations.contains_key(&relation.name) {
        return Err(ZanzibarError::SchemaValidationFailed(format!(
            "{}:{}: relation '{}' on type '{}' is defined more than once",
            file, relation.line, relation.name, definition.type_name
        )));
    }
    let metadata = definition.metadata.get_or_insert_with(TypeMetadata::default);
    metadata.relations.insert(
        relation.name.clone(),
        RelationMetadata {
            directly_related_user_types: relation.direct,
            module: module.map(str::to_string),
            source_info: module.map(|_| SourceInfo { file: file.to_string() }),
        },
    );
    definition.relations.insert(relation.name, relation.rewrite);
    Ok(())
}

/// Check that every reference in the model resolves
pub fn validate_model(model: &AuthorizationModel) -> Result<()> {
    let types: HashMap<&str, &TypeDefinition> = model
        .type_definitions
        .iter()
        .map(|t| (t.type_name.as_str(), t))
        .collect();

    for definition in &model.type_definitions {
        for (name, rewrite) in &definition.relations {
            check_rewrite(&types, definition, name, rewrite)?;

            let direct = definition
                .relation_metadata(name)
                .map(|m| m.directly_related_user_types.as_slice())
                .unwrap_or_default();
            for reference in direct {
                let Some(related) = types.get(reference.type_name.as_str()) else {
                    return Err(ZanzibarError::SchemaValidationFailed(format!(
                        "relation '{}#{}' references undefined type '{}'",
                        definition.type_name, name, reference.type_name
                    )));
                };
                if let Some(relation) = &reference.relation {
                    if !related.relations.contains_key(relation) {
                        return Err(ZanzibarError::SchemaValidationFailed(format!(
                            "relation '{}#{}' references undefined relation '{}#{}'",
                            definition.type_name, name, reference.type_name, relation
                        )));
                    }
                }
                if !reference.condition.is_empty() && !model.conditions.contains_key(&reference.condition) {
                    return Err(ZanzibarError::SchemaValidationFailed(format!(
                        "relation '{}#{}' references undefined condition '{}'",
                        definition.type_name, name, reference.condition
                    )));
                }
            }
        }
    }
    Ok(())
}

fn check_rewrite(
    types: &HashMap<&str, &TypeDefinition>,
    definition: &TypeDefinition,
    relation: &str,
    rewrite: &Userset,
) -> Result<()> {
    let undefined = |missing: &str| {
        ZanzibarError::SchemaValidationFailed(format!(
            "relation '{}#{}' references undefined relation '{}'",
            definition.type_name, relation, missing
        ))
    };

    match rewrite {
        Userset::This(_) => Ok(()),
        Userset::ComputedUserset(computed) => {
            if definition.relations.contains_key(&computed.relation) {
                Ok(())
            } else {
                Err(undefined(&computed.relation))
            }
        }
        Userset::TupleToUserset(ttu) => {
            let tupleset = &ttu.tupleset.relation;
            if !definition.relations.contains_key(tupleset) {
                return Err(undefined(tupleset));
            }
            let resolves = definition
                .relation_metadata(tupleset)
                .map(|m| m.directly_related_user_types.as_slice())
                .unwrap_or_default()
                .iter()
                .filter(|r| r.relation.is_none() && r.wildcard.is_none())
                .filter_map(|r| types.get(r.type_name.as_str()))
                .any(|t| t.relations.contains_key(&ttu.computed_userset.relation));
            if resolves {
                Ok(())
            } else {
                Err(ZanzibarError::SchemaValidationFailed(format!(
                    "relation '{}#{}': no type related through '{}' defines '{}'",
                    definition.type_name, relation, tupleset, ttu.computed_userset.relation
                )))
            }
        }
        Userset::Union(set) | Userset::Intersection(set) => set
            .child
            .iter()
            .try_for_each(|child| check_rewrite(types, definition, relation, child)),
        Userset::Difference(difference) => {
            check_rewrite(types, definition, relation, &difference.base)?;
            check_rewrite(types, definition, relation, &difference.subtract)
        }
    }
}

fn strip_comment(line: &str) -> &str {
    let mut previous: Option<char> = None;
    for (index, c) in line.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(c);
    }
    line
}

fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn identifier<'a>(value: &'a str, file: &str, line: usize) -> Result<&'a str> {
    if is_identifier(value) {
        Ok(value)
    } else {
        Err(syntax_error(file, line, format!("invalid identifier '{value}'")))
    }
}

fn parse_define(line: &str, file: &str, line_no: usize) -> Result<RelationDef> {
    let rest = line.trim_start_matches("define").trim();
    let (name, expression) = rest
        .split_once(':')
        .ok_or_else(|| syntax_error(file, line_no, "expected 'define <relation>: <expression>'"))?;
    let name = identifier(name.trim(), file, line_no)?;
    let (rewrite, direct) = parse_rewrite(expression).map_err(|message| syntax_error(file, line_no, message))?;
    Ok(RelationDef {
        name: name.to_string(),
        rewrite,
        direct,
        line: line_no,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Direct(String),
    Open,
    Close,
    Word(String),
}

fn tokenize(expression: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '[' => {
                let mut content = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => content.push(c),
                        None => return Err("unclosed '['".to_string()),
                    }
                }
                tokens.push(Token::Direct(content));
            }
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            ']' => return Err("unexpected ']'".to_string()),
            c => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '[' | ']' | '(' | ')') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

/// Parse a relation expression into its rewrite and direct type restrictions
fn parse_rewrite(expression: &str) -> std::result::Result<(Userset, Vec<RelationReference>), String> {
    let mut parser = ExpressionParser {
        tokens: tokenize(expression)?,
        pos: 0,
        direct: Vec::new(),
    };
    let rewrite = parser.parse_expression()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected {token:?} after expression"));
    }
    Ok((rewrite, parser.direct))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    Or,
    And,
}

const KEYWORDS: &[&str] = &["or", "and", "but", "not", "from", "with"];

struct ExpressionParser {
    tokens: Vec<Token>,
    pos: usize,
    direct: Vec<RelationReference>,
}

impl ExpressionParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expression(&mut self) -> std::result::Result<Userset, String> {
        let mut children = vec![self.parse_term()?];
        let mut operator: Option<Operator> = None;

        loop {
            let word = match self.peek() {
                Some(Token::Word(word)) => word.clone(),
                _ => break,
            };
            let next = match word.as_str() {
                "or" => Operator::Or,
                "and" => Operator::And,
                "but" => {
                    self.pos += 1;
                    if !matches!(self.advance(), Some(Token::Word(w)) if w == "not") {
                        return Err("expected 'not' after 'but'".to_string());
                    }
                    if operator.is_some() {
                        return Err("'but not' cannot be combined with 'or'/'and' without parentheses".to_string());
                    }
                    let base = children.pop().ok_or_else(|| "missing base expression".to_string())?;
                    let subtract = self.parse_term()?;
                    if matches!(self.peek(), Some(Token::Word(_))) {
                        return Err("operators after 'but not' require parentheses".to_string());
                    }
                    return Ok(Userset::Difference(Difference {
                        base: Box::new(base),
                        subtract: Box::new(subtract),
                    }));
                }
                other => return Err(format!("unexpected '{other}'")),
            };
            if operator.is_some_and(|current| current != next) {
                return Err("cannot mix 'or' and 'and' without parentheses".to_string());
            }
            operator = Some(next);
            self.pos += 1;
            children.push(self.parse_term()?);
        }

        match operator {
            Some(Operator::Or) => Ok(Userset::Union(Usersets { child: children })),
            Some(Operator::And) => Ok(Userset::Intersection(Usersets { child: children })),
            None => children.pop().ok_or_else(|| "empty expression".to_string()),
        }
    }

    fn parse_term(&mut self) -> std::result::Result<Userset, String> {
        match self.advance() {
            Some(Token::Direct(content)) => {
                self.direct.extend(parse_direct_types(&content)?);
                Ok(Userset::direct())
            }
            Some(Token::Open) => {
                let inner = self.parse_expression()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(Token::Word(word)) => {
                if KEYWORDS.contains(&word.as_str()) || !is_identifier(&word) {
                    return Err(format!("expected relation, found '{word}'"));
                }
                if matches!(self.peek(), Some(Token::Word(w)) if w == "from") {
                    self.pos += 1;
                    match self.advance() {
                        Some(Token::Word(tupleset)) if is_identifier(&tupleset) && !KEYWORDS.contains(&tupleset.as_str()) => {
                            Ok(Userset::tuple_to_userset(tupleset, word))
                        }
                        _ => Err(format!("expected relation after '{word} from'")),
                    }
                } else {
                    Ok(Userset::computed(word))
                }
            }
            Some(Token::Close) => Err("unexpected ')'".to_string()),
            None => Err("expected expression".to_string()),
        }
    }
}

fn parse_direct_types(content: &str) -> std::result::Result<Vec<RelationReference>, String> {
    content
        .split(',')
        .map(str::trim)
        .map(|item| {
            if item.is_empty() {
                return Err("empty type restriction".to_string());
            }
            let (base, condition) = match item.split_once(" with ") {
                Some((base, condition)) => (base.trim(), condition.trim().to_string()),
                None => (item, String::new()),
            };
            if !condition.is_empty() && !is_identifier(&condition) {
                return Err(format!("invalid condition name '{condition}'"));
            }

            let mut reference = RelationReference {
                type_name: base.to_string(),
                relation: None,
                wildcard: None,
                condition,
            };
            if let Some(type_name) = base.strip_suffix(":*") {
                reference.type_name = type_name.to_string();
                reference.wildcard = Some(Wildcard {});
            } else if let Some((type_name, relation)) = base.split_once('#') {
                if !is_identifier(relation) {
                    return Err(format!("invalid relation in '{item}'"));
                }
                reference.type_name = type_name.to_string();
                reference.relation = Some(relation.to_string());
            }
            if !is_identifier(&reference.type_name) {
                return Err(format!("invalid type restriction '{item}'"));
            }
            Ok(reference)
        })
        .collect()
}

fn parse_condition(text: &str, module: &str, file: &str, line: usize) -> Result<ConditionDefinition> {
    let malformed = |detail: &str| syntax_error(file, line, format!("malformed condition: {detail}"));

    let rest = text.trim_start_matches("condition").trim_start();
    let open = rest.find('(').ok_or_else(|| malformed("missing '('"))?;
    let close = rest.find(')').filter(|close| *close > open).ok_or_else(|| malformed("missing ')'"))?;
    let name = identifier(rest[..open].trim(), file, line)?;

    let mut parameters = BTreeMap::new();
    let params = rest[open + 1..close].trim();
    if !params.is_empty() {
        for param in params.split(',') {
            let (param_name, type_name) = param.split_once(':').ok_or_else(|| malformed("parameter without type"))?;
            let param_name = identifier(param_name.trim(), file, line)?;
            let type_ref = parse_param_type(type_name.trim()).map_err(|message| syntax_error(file, line, message))?;
            parameters.insert(param_name.to_string(), type_ref);
        }
    }

    let body = rest[close + 1..].trim();
    let expression = body
        .strip_prefix('{')
        .and_then(|b| b.strip_suffix('}'))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| malformed("expected '{ <expression> }'"))?;

    Ok(ConditionDefinition {
        name: name.to_string(),
        expression: expression.to_string(),
        parameters,
        metadata: Some(ConditionMetadata {
            module: module.to_string(),
            source_info: SourceInfo { file: file.to_string() },
        }),
    })
}

fn parse_param_type(value: &str) -> std::result::Result<ConditionParamTypeRef, String> {
    let (base, generic) = match value.find('<') {
        Some(open) => {
            let inner = value[open + 1..]
                .strip_suffix('>')
                .ok_or_else(|| format!("unclosed generic in '{value}'"))?;
            (&value[..open], Some(parse_param_type(inner.trim())?))
        }
        None => (value, None),
    };

    let type_name = match base.trim() {
        "int" => "TYPE_NAME_INT",
        "uint" => "TYPE_NAME_UINT",
        "double" => "TYPE_NAME_DOUBLE",
        "bool" => "TYPE_NAME_BOOL",
        "bytes" => "TYPE_NAME_BYTES",
        "string" => "TYPE_NAME_STRING",
        "duration" => "TYPE_NAME_DURATION",
        "timestamp" => "TYPE_NAME_TIMESTAMP",
        "any" => "TYPE_NAME_ANY",
        "ipaddress" => "TYPE_NAME_IPADDRESS",
        "list" => "TYPE_NAME_LIST",
        "map" => "TYPE_NAME_MAP",
        other => return Err(format!("unknown parameter type '{other}'")),
    };

    let is_generic = matches!(type_name, "TYPE_NAME_LIST" | "TYPE_NAME_MAP");
    if is_generic != generic.is_some() {
        return Err(format!("parameter type '{value}' has wrong generic arity"));
    }

    Ok(ConditionParamTypeRef {
        type_name: type_name.to_string(),
        generic_types: generic.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comment_only_after_whitespace() {
        assert_eq!(strip_comment("# header"), "");
        assert_eq!(strip_comment("define a: [user] # note"), "define a: [user] ");
        assert_eq!(strip_comment("define a: [group#member]"), "define a: [group#member]");
    }

    #[test]
    fn test_parse_union_with_direct_types() {
        let (rewrite, direct) = parse_rewrite("[user, user:*, group#member with c] or owner").unwrap();
        assert_eq!(
            rewrite,
            Userset::Union(Usersets {
                child: vec![Userset::direct(), Userset::computed("owner")]
            })
        );
        assert_eq!(direct.len(), 3);
        assert!(direct[1].wildcard.is_some());
        assert_eq!(direct[2].relation.as_deref(), Some("member"));
        assert_eq!(direct[2].condition, "c");
    }

    #[test]
    fn test_parse_tuple_to_userset() {
        let (rewrite, direct) = parse_rewrite("owner from parent").unwrap();
        assert_eq!(rewrite, Userset::tuple_to_userset("parent", "owner"));
        assert!(direct.is_empty());
    }

    #[test]
    fn test_parse_difference() {
        let (rewrite, _) = parse_rewrite("(viewer or editor) but not blocked").unwrap();
        match rewrite {
            Userset::Difference(d) => {
                assert!(matches!(*d.base, Userset::Union(_)));
                assert_eq!(*d.subtract, Userset::computed("blocked"));
            }
            other => panic!("unexpected rewrite {other:?}"),
        }
    }

    #[test]
    fn test_mixed_operators_need_parentheses() {
        assert!(parse_rewrite("a or b and c").is_err());
        assert!(parse_rewrite("a but not b or c").is_err());
        assert!(parse_rewrite("(a or b) and c").is_ok());
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse_rewrite("").is_err());
        assert!(parse_rewrite("[user").is_err());
        assert!(parse_rewrite("(a or b").is_err());
        assert!(parse_rewrite("a or").is_err());
        assert!(parse_rewrite("owner from").is_err());
        assert!(parse_rewrite("a b").is_err());
    }

    #[test]
    fn test_param_types() {
        let list = parse_param_type("list<string>").unwrap();
        assert_eq!(list.type_name, "TYPE_NAME_LIST");
        assert_eq!(list.generic_types[0].type_name, "TYPE_NAME_STRING");
        assert!(parse_param_type("list").is_err());
        assert!(parse_param_type("int<string>").is_err());
        assert!(parse_param_type("float").is_err());
    }
}
