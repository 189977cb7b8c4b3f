//! Rendering of extension templates against an account snapshot.
//!
//! Templates use Go template syntax (`{{ .Account.spec.creator | upper }}`).
//! They are translated into handlebars and rendered with a registry that
//! carries the string helpers extension authors rely on. The render context
//! is `{ "Account": <serialized account> }`.

use handlebars::{handlebars_helper, no_escape, Handlebars, Template};
use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::api::Account;

/// Largest accepted template source
pub const MAX_TEMPLATE_BYTES: usize = 64 * 1024;
/// Deepest accepted template map nesting
pub const MAX_TEMPLATE_DEPTH: usize = 32;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template at {path} is {size} bytes, more than the {limit} allowed")]
    TooLarge { path: String, size: usize, limit: usize },

    #[error("template at {path} is nested deeper than {limit} levels")]
    TooDeep { path: String, limit: usize },

    #[error("failed to parse template at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("failed to execute template at {path}: {message}")]
    Render { path: String, message: String },

    #[error("failed to write rendered value at {path}: {message}")]
    Write { path: String, message: String },

    #[error("failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
}

pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.set_strict_mode(false);
        registry.register_helper("upper", Box::new(upper));
        registry.register_helper("lower", Box::new(lower));
        registry.register_helper("title", Box::new(title));
        registry.register_helper("trim", Box::new(trim));
        registry.register_helper("trimPrefix", Box::new(trim_prefix));
        registry.register_helper("trimSuffix", Box::new(trim_suffix));
        registry.register_helper("replace", Box::new(replace));
        registry.register_helper("trunc", Box::new(trunc));
        registry.register_helper("default", Box::new(default_value));
        registry.register_helper("quote", Box::new(quote));
        registry.register_helper("nospace", Box::new(nospace));
        registry.register_helper("kebabcase", Box::new(kebabcase));
        registry.register_helper("snakecase", Box::new(snakecase));
        registry.register_helper("camelcase", Box::new(camelcase));
        Self { registry }
    }

    /// Context exposing the whole account under `Account`
    pub fn context(account: &Account) -> Result<Value, TemplateError> {
        Ok(json!({ "Account": serde_json::to_value(account)? }))
    }

    /// Render one template string
    pub fn render_str(&self, source: &str, context: &Value, path: &str) -> Result<String, TemplateError> {
        if source.len() > MAX_TEMPLATE_BYTES {
            return Err(TemplateError::TooLarge {
                path: path.to_string(),
                size: source.len(),
                limit: MAX_TEMPLATE_BYTES,
            });
        }
        if !source.contains("{{") {
            return Ok(source.to_string());
        }

        let parse_error = |message: String| TemplateError::Parse {
            path: path.to_string(),
            message,
        };
        let translated = translate(source).map_err(parse_error)?;
        Template::compile(&translated).map_err(|e| parse_error(e.to_string()))?;
        self.registry
            .render_template(&translated, context)
            .map_err(|e| TemplateError::Render {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Render `template` into `target` below `field_path`.
    ///
    /// String leaves are rendered, maps are descended into and every other
    /// value is copied unchanged.
    pub fn render_extension_spec(
        &self,
        template: &Map<String, Value>,
        context: &Value,
        field_path: &[String],
        target: &mut Value,
    ) -> Result<(), TemplateError> {
        if field_path.len() > MAX_TEMPLATE_DEPTH {
            return Err(TemplateError::TooDeep {
                path: field_path.join("."),
                limit: MAX_TEMPLATE_DEPTH,
            });
        }

        for (key, value) in template {
            let mut path = field_path.to_vec();
            path.push(key.clone());
            match value {
                Value::String(source) => {
                    let rendered = self.render_str(source, context, &path.join("."))?;
                    set_nested(target, &path, Value::String(rendered))?;
                }
                Value::Object(nested) => {
                    self.render_extension_spec(nested, context, &path, target)?;
                }
                other => set_nested(target, &path, other.clone())?,
            }
        }
        Ok(())
    }

    /// Render a metadata template into a fresh object value
    pub fn render_metadata(&self, template: &Map<String, Value>, context: &Value) -> Result<Value, TemplateError> {
        let mut rendered = Value::Object(Map::new());
        self.render_extension_spec(template, context, &[], &mut rendered)?;
        Ok(rendered)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn set_nested(target: &mut Value, path: &[String], value: Value) -> Result<(), TemplateError> {
    let write_error = |message: &str| TemplateError::Write {
        path: path.join("."),
        message: message.to_string(),
    };
    let Some((last, parents)) = path.split_last() else {
        return Err(write_error("empty field path"));
    };

    let mut current = target;
    for segment in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| write_error(&format!("'{segment}' is not inside an object")))?;
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    current
        .as_object_mut()
        .ok_or_else(|| write_error("parent is not an object"))?
        .insert(last.clone(), value);
    Ok(())
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace() || c == '-' || c == '_';
    }
    out
}

fn truncate(n: i64, s: &str) -> String {
    let count = s.chars().count();
    let keep = usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX).min(count);
    if n >= 0 {
        s.chars().take(keep).collect()
    } else {
        s.chars().skip(count - keep).collect()
    }
}

handlebars_helper!(upper: |v: Json| text(v).to_uppercase());
handlebars_helper!(lower: |v: Json| text(v).to_lowercase());
handlebars_helper!(title: |v: Json| title_case(&text(v)));
handlebars_helper!(trim: |v: Json| text(v).trim().to_string());
handlebars_helper!(trim_prefix: |prefix: Json, v: Json| {
    let (prefix, v) = (text(prefix), text(v));
    v.strip_prefix(prefix.as_str()).unwrap_or(&v).to_string()
});
handlebars_helper!(trim_suffix: |suffix: Json, v: Json| {
    let (suffix, v) = (text(suffix), text(v));
    v.strip_suffix(suffix.as_str()).unwrap_or(&v).to_string()
});
handlebars_helper!(replace: |old: Json, new: Json, v: Json| text(v).replace(&text(old), &text(new)));
handlebars_helper!(trunc: |n: i64, v: Json| truncate(n, &text(v)));
handlebars_helper!(default_value: |fallback: Json, v: Json| {
    if is_empty_value(v) { fallback.clone() } else { v.clone() }
});
handlebars_helper!(quote: |v: Json| format!("\"{}\"", text(v).replace('"', "\\\"")));
handlebars_helper!(nospace: |v: Json| text(v).chars().filter(|c| !c.is_whitespace()).collect::<String>());
handlebars_helper!(kebabcase: |v: Json| text(v).to_kebab_case());
handlebars_helper!(snakecase: |v: Json| text(v).to_snake_case());
handlebars_helper!(camelcase: |v: Json| text(v).to_lower_camel_case());

enum Block {
    If { chained: usize },
    With,
    Range,
}

/// Translate Go template syntax into handlebars
pub(crate) fn translate(source: &str) -> Result<String, String> {
    let mut out = String::with_capacity(source.len() + 16);
    let mut stack: Vec<Block> = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| "unclosed action".to_string())?;
        let mut action = &after[..end];
        rest = &after[end + 2..];

        if let Some(stripped) = action.strip_prefix('-').filter(|a| a.starts_with(char::is_whitespace)) {
            action = stripped;
            out.truncate(out.trim_end().len());
        }
        if let Some(stripped) = action.strip_suffix('-').filter(|a| a.ends_with(char::is_whitespace)) {
            action = stripped;
            rest = rest.trim_start();
        }
        let action = action.trim();

        if action.starts_with("/*") {
            if !action.ends_with("*/") {
                return Err("unclosed comment".to_string());
            }
            continue;
        }

        let tokens = tokenize(action)?;
        match tokens.first() {
            None => return Err("empty action".to_string()),
            Some(Token::Ident(keyword)) => match keyword.as_str() {
                "if" => {
                    out.push_str(&format!("{{{{#if {}}}}}", expression(&tokens[1..])?));
                    stack.push(Block::If { chained: 0 });
                }
                "with" => {
                    out.push_str(&format!("{{{{#with {}}}}}", expression(&tokens[1..])?));
                    stack.push(Block::With);
                }
                "range" => {
                    out.push_str(&format!("{{{{#each {}}}}}", expression(&tokens[1..])?));
                    stack.push(Block::Range);
                }
                "else" => match (stack.last_mut(), tokens.get(1)) {
                    (None, _) => return Err("else outside a block".to_string()),
                    (Some(Block::If { chained }), Some(Token::Ident(next))) if next == "if" => {
                        out.push_str(&format!("{{{{else}}}}{{{{#if {}}}}}", expression(&tokens[2..])?));
                        *chained += 1;
                    }
                    (Some(_), None) => out.push_str("{{else}}"),
                    (Some(_), Some(_)) => return Err(format!("unsupported else clause '{action}'")),
                },
                "end" => match stack.pop() {
                    None => return Err("end without a block".to_string()),
                    Some(Block::If { chained }) => {
                        for _ in 0..=chained {
                            out.push_str("{{/if}}");
                        }
                    }
                    Some(Block::With) => out.push_str("{{/with}}"),
                    Some(Block::Range) => out.push_str("{{/each}}"),
                },
                "define" | "template" | "block" | "break" | "continue" => {
                    return Err(format!("'{keyword}' is not supported"));
                }
                _ => emit_value(&mut out, &tokens)?,
            },
            Some(_) => emit_value(&mut out, &tokens)?,
        }
    }
    out.push_str(rest);

    if !stack.is_empty() {
        return Err("unclosed block, missing {{ end }}".to_string());
    }
    Ok(out)
}

fn emit_value(out: &mut String, tokens: &[Token]) -> Result<(), String> {
    let expr = expression(tokens)?;
    if let Some(call) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        out.push_str(&format!("{{{{{call}}}}}"));
    } else if let [Token::Str(literal)] = tokens {
        out.push_str(literal);
    } else {
        out.push_str(&format!("{{{{{expr}}}}}"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Ident(String),
    Str(String),
    Number(String),
    Pipe,
    Open,
    Close,
}

fn tokenize(action: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = action.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '|' => tokens.push(Token::Pipe),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => literal.push('\n'),
                            Some('t') => literal.push('\t'),
                            Some(escaped) => literal.push(escaped),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(c) => literal.push(c),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(literal));
            }
            '`' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('`') => break,
                        Some(c) => literal.push(c),
                        None => return Err("unterminated raw string".to_string()),
                    }
                }
                tokens.push(Token::Str(literal));
            }
            ':' if chars.peek() == Some(&'=') => return Err("variables are not supported".to_string()),
            c => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '|' | '(' | ')' | '"' | '`') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                let token = if word.starts_with('.') || word.starts_with('$') {
                    Token::Field(word)
                } else if word.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
                    Token::Number(word)
                } else {
                    Token::Ident(word)
                };
                tokens.push(token);
            }
        }
    }
    Ok(tokens)
}

/// Handlebars expression for a Go pipeline. Calls come back parenthesised.
fn expression(tokens: &[Token]) -> Result<String, String> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.pipeline()?;
    if parser.pos != tokens.len() {
        return Err("unexpected tokens after expression".to_string());
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn pipeline(&mut self) -> Result<String, String> {
        let mut expr = self.command(None)?;
        while self.tokens.get(self.pos) == Some(&Token::Pipe) {
            self.pos += 1;
            expr = self.command(Some(expr))?;
        }
        Ok(expr)
    }

    /// One command; in a pipeline stage the previous value is the final argument
    fn command(&mut self, piped: Option<String>) -> Result<String, String> {
        let mut operands = Vec::new();
        let mut function: Option<String> = None;

        while let Some(token) = self.tokens.get(self.pos) {
            match token {
                Token::Pipe | Token::Close => break,
                Token::Ident(name) if function.is_none() && operands.is_empty() && !is_literal_ident(name) => {
                    function = Some(helper_name(name));
                    self.pos += 1;
                }
                _ => operands.push(self.operand()?),
            }
        }
        if let Some(previous) = piped {
            if function.is_none() {
                return Err("pipeline stage must be a function call".to_string());
            }
            operands.push(previous);
        }

        match function {
            Some(name) if name == "lookup" && operands.len() > 2 => {
                let mut iter = operands.into_iter();
                let mut expr = iter.next().unwrap_or_default();
                for key in iter {
                    expr = format!("(lookup {expr} {key})");
                }
                Ok(expr)
            }
            Some(name) if operands.is_empty() => Ok(format!("({name})")),
            Some(name) => Ok(format!("({} {})", name, operands.join(" "))),
            None if operands.len() == 1 => Ok(operands.remove(0)),
            None if operands.is_empty() => Err("missing value".to_string()),
            None => Err(format!("'{}' is not a function", operands[0])),
        }
    }

    fn operand(&mut self) -> Result<String, String> {
        let token = self.tokens.get(self.pos).ok_or_else(|| "missing operand".to_string())?;
        self.pos += 1;
        match token {
            Token::Field(path) => field_path(path),
            Token::Str(literal) => Ok(format!("\"{}\"", literal.replace('\\', "\\\\").replace('"', "\\\""))),
            Token::Number(number) => Ok(number.clone()),
            Token::Ident(name) if name == "nil" => Ok("null".to_string()),
            Token::Ident(name) if is_literal_ident(name) => Ok(name.clone()),
            Token::Ident(name) => Ok(format!("({})", helper_name(name))),
            Token::Open => {
                let inner = self.pipeline()?;
                if self.tokens.get(self.pos) != Some(&Token::Close) {
                    return Err("missing ')'".to_string());
                }
                self.pos += 1;
                Ok(inner)
            }
            Token::Pipe | Token::Close => Err("unexpected token".to_string()),
        }
    }
}

fn is_literal_ident(name: &str) -> bool {
    matches!(name, "true" | "false" | "nil")
}

fn helper_name(name: &str) -> String {
    match name {
        "index" => "lookup",
        "le" => "lte",
        "ge" => "gte",
        other => other,
    }
    .to_string()
}

/// `.Account.spec` -> `Account.spec`, `.` -> `this`, `$.x` -> `@root.x`
fn field_path(path: &str) -> Result<String, String> {
    let (base, rest) = if let Some(rest) = path.strip_prefix('$') {
        ("@root", rest)
    } else {
        ("", path)
    };
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    if rest.is_empty() {
        return Ok(if base.is_empty() { "this".to_string() } else { base.to_string() });
    }

    let mut segments: Vec<String> = Vec::new();
    if !base.is_empty() {
        segments.push(base.to_string());
    }
    for segment in rest.split('.') {
        if segment.is_empty() {
            return Err(format!("invalid field '{path}'"));
        }
        if segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            segments.push(segment.to_string());
        } else {
            segments.push(format!("[{segment}]"));
        }
    }
    Ok(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        let context = json!({
            "Account": {
                "metadata": { "name": "team-1", "labels": { "app.kubernetes.io/name": "portal" } },
                "spec": { "creator": "alice", "type": "account", "tags": ["a", "b"] }
            }
        });
        TemplateRenderer::new().render_str(source, &context, "test").unwrap()
    }

    #[test]
    fn test_translate_paths_and_pipelines() {
        assert_eq!(translate("{{ .Account.spec.creator }}").unwrap(), "{{Account.spec.creator}}");
        assert_eq!(translate("{{ .x | upper }}").unwrap(), "{{upper x}}");
        assert_eq!(
            translate(r#"{{ .x | replace "a" "b" | trunc 3 }}"#).unwrap(),
            r#"{{trunc 3 (replace "a" "b" x)}}"#
        );
        assert_eq!(translate("{{ $.x }}").unwrap(), "{{@root.x}}");
        assert_eq!(translate("{{ . }}").unwrap(), "{{this}}");
    }

    #[test]
    fn test_translate_blocks() {
        assert_eq!(
            translate("{{ if .a }}A{{ else if .b }}B{{ else }}C{{ end }}").unwrap(),
            "{{#if a}}A{{else}}{{#if b}}B{{else}}C{{/if}}{{/if}}"
        );
        assert_eq!(translate("{{ range .xs }}{{ . }}{{ end }}").unwrap(), "{{#each xs}}{{this}}{{/each}}");
    }

    #[test]
    fn test_translate_rejects_unsupported() {
        assert!(translate("{{ if .a }}").is_err());
        assert!(translate("{{ end }}").is_err());
        assert!(translate("{{ $x := .a }}").is_err());
        assert!(translate("{{ template \"x\" }}").is_err());
        assert!(translate("{{ .a ").is_err());
    }

    #[test]
    fn test_render_creator() {
        assert_eq!(render("{{ .Account.spec.creator }}"), "alice");
        assert_eq!(render("{{ .Account.spec.creator | upper }}"), "ALICE");
        assert_eq!(render("{{ upper .Account.spec.creator }}"), "ALICE");
    }

    #[test]
    fn test_render_helpers() {
        assert_eq!(render(r#"{{ .Account.metadata.name | replace "-" "_" }}"#), "team_1");
        assert_eq!(render("{{ .Account.metadata.name | trunc 4 }}"), "team");
        assert_eq!(render(r#"{{ .Account.spec.missing | default "none" }}"#), "none");
        assert_eq!(render(r#"{{ .Account.metadata.name | trimPrefix "team-" }}"#), "1");
        assert_eq!(render("{{ .Account.spec.creator | quote }}"), "\"alice\"");
        assert_eq!(render("{{ .Account.spec.creator | title }}"), "Alice");
        assert_eq!(render(r#"{{ "Hello World" | kebabcase }}"#), "hello-world");
        assert_eq!(render(r#"{{ (index .Account.metadata.labels "app.kubernetes.io/name") | upper }}"#), "PORTAL");
    }

    #[test]
    fn test_render_blocks_and_trimming() {
        assert_eq!(render(r#"{{ if eq .Account.spec.type "account" }}branch{{ else }}org{{ end }}"#), "branch");
        assert_eq!(render("{{ range .Account.spec.tags }}[{{ . }}]{{ end }}"), "[a][b]");
        assert_eq!(render("a  {{- .Account.spec.creator -}}  b"), "aaliceb");
        assert_eq!(render("{{ with .Account.spec }}{{ .creator }}{{ end }}"), "alice");
    }

    #[test]
    fn test_render_plain_text_untouched() {
        assert_eq!(render("no actions here"), "no actions here");
        assert_eq!(render("{{/* note */}}x"), "x");
    }

    #[test]
    fn test_size_limit() {
        let source = "x".repeat(MAX_TEMPLATE_BYTES + 1);
        let err = TemplateRenderer::new().render_str(&source, &json!({}), "spec.big").unwrap_err();
        assert!(matches!(err, TemplateError::TooLarge { .. }));
    }

    #[test]
    fn test_truncate_negative() {
        assert_eq!(truncate(-2, "team-1"), "-1");
        assert_eq!(truncate(10, "abc"), "abc");
    }
}
