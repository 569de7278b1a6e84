//! Placeholder templates.
//!
//! Grammar: `{{NAME}}` inserts a binding; `{{#name}}...{{/name}}` renders its
//! body only when the binding `NAME` has a value. A block tag alone on its line
//! removes the whole line.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ForgeError, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Lexical unit of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text.
    Text(&'a str),
    /// `{{NAME}}`.
    Placeholder(&'a str),
    /// `{{#name}}`.
    Open(&'a str),
    /// `{{/name}}`.
    Close(&'a str),
}

#[derive(Debug)]
enum Node<'a> {
    Text(&'a str),
    Placeholder(&'a str),
    Block { key: &'a str, children: Vec<Node<'a>> },
}

/// Named values available to a template.
///
/// A binding may be absent. Block tags test presence; placeholders render the
/// value, else the binding's fallback, else fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    value: Option<String>,
    fallback: Option<String>,
}

impl Bindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a value, or mark it absent with `None`.
    pub fn set(&mut self, name: &str, value: Option<String>) -> &mut Self {
        self.insert(name, value, None)
    }

    /// Bind `name`, rendering `fallback` for placeholders when the value is absent.
    pub fn set_or(&mut self, name: &str, value: Option<String>, fallback: &str) -> &mut Self {
        self.insert(name, value, Some(fallback.to_string()))
    }

    fn insert(&mut self, name: &str, value: Option<String>, fallback: Option<String>) -> &mut Self {
        self.values
            .insert(name.to_ascii_uppercase(), Slot { value, fallback });
        self
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.values
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| ForgeError::UnresolvedPlaceholder(name.to_string()))
    }

    fn is_present(&self, key: &str) -> Result<bool> {
        Ok(self.slot(key)?.value.is_some())
    }

    fn text(&self, name: &str) -> Result<&str> {
        let slot = self.slot(name)?;
        slot.value
            .as_deref()
            .or(slot.fallback.as_deref())
            .ok_or_else(|| ForgeError::UnresolvedPlaceholder(name.to_string()))
    }
}

/// Split a template into tokens.
pub fn tokenize(template: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(offset) = template[pos..].find(OPEN) {
        let start = pos + offset;
        let inner_start = start + OPEN.len();
        let Some(close) = template[inner_start..].find(CLOSE) else {
            return Err(ForgeError::TemplateSyntax(format!(
                "unterminated tag at byte {start}"
            )));
        };
        let inner = template[inner_start..inner_start + close].trim();
        let mut end = inner_start + close + CLOSE.len();

        let token = if let Some(name) = inner.strip_prefix('#') {
            Token::Open(tag_name(name.trim(), start)?)
        } else if let Some(name) = inner.strip_prefix('/') {
            Token::Close(tag_name(name.trim(), start)?)
        } else {
            Token::Placeholder(tag_name(inner, start)?)
        };

        let mut text_end = start;
        if matches!(token, Token::Open(_) | Token::Close(_)) {
            let line_start = template[..start].rfind('\n').map_or(0, |index| index + 1);
            let indent = &template[line_start..start];
            let rest = &template[end..];
            let newline = if rest.starts_with("\r\n") {
                Some(2)
            } else if rest.starts_with('\n') || rest.is_empty() {
                Some(rest.len().min(1))
            } else {
                None
            };
            if let Some(skip) = newline
                && line_start >= pos
                && indent.trim().is_empty()
            {
                text_end = line_start;
                end += skip;
            }
        }

        if text_end > pos {
            tokens.push(Token::Text(&template[pos..text_end]));
        }
        tokens.push(token);
        pos = end;
    }
    if pos < template.len() {
        tokens.push(Token::Text(&template[pos..]));
    }
    Ok(tokens)
}

fn tag_name(name: &str, start: usize) -> Result<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(name)
    } else {
        Err(ForgeError::TemplateSyntax(format!(
            "invalid tag name {name:?} at byte {start}"
        )))
    }
}

fn build_tree<'a>(tokens: &[Token<'a>]) -> Result<Vec<Node<'a>>> {
    let mut stack: Vec<(&'a str, Vec<Node<'a>>)> = vec![("", Vec::new())];
    for token in tokens {
        match *token {
            Token::Text(text) => push_node(&mut stack, Node::Text(text)),
            Token::Placeholder(name) => push_node(&mut stack, Node::Placeholder(name)),
            Token::Open(key) => stack.push((key, Vec::new())),
            Token::Close(key) => {
                if stack.len() < 2 {
                    return Err(ForgeError::TemplateSyntax(format!(
                        "closing tag {{{{/{key}}}}} has no opening tag"
                    )));
                }
                let (open, children) = stack.pop().unwrap_or_default();
                if open != key {
                    return Err(ForgeError::TemplateSyntax(format!(
                        "block {{{{#{open}}}}} closed by {{{{/{key}}}}}"
                    )));
                }
                push_node(&mut stack, Node::Block { key, children });
            }
        }
    }
    if stack.len() > 1 {
        let open = stack.last().map(|(key, _)| *key).unwrap_or_default();
        return Err(ForgeError::TemplateSyntax(format!(
            "block {{{{#{open}}}}} is never closed"
        )));
    }
    Ok(stack.pop().map(|(_, nodes)| nodes).unwrap_or_default())
}

fn push_node<'a>(stack: &mut [(&'a str, Vec<Node<'a>>)], node: Node<'a>) {
    if let Some((_, nodes)) = stack.last_mut() {
        nodes.push(node);
    }
}

/// Every placeholder and block key a template references, uppercased.
pub fn referenced_names(template: &str) -> Result<BTreeSet<String>> {
    let tokens = tokenize(template)?;
    build_tree(&tokens)?;
    Ok(tokens
        .iter()
        .filter_map(|token| match token {
            Token::Text(_) => None,
            Token::Placeholder(name) | Token::Open(name) | Token::Close(name) => {
                Some(name.to_ascii_uppercase())
            }
        })
        .collect())
}

/// Render a template against bindings.
///
/// Every referenced name must be bound, even inside omitted blocks, and a
/// placeholder rendered outside a guarding block must have a value.
pub fn render(template: &str, bindings: &Bindings) -> Result<String> {
    for name in referenced_names(template)? {
        bindings.slot(&name)?;
    }
    let tokens = tokenize(template)?;
    let nodes = build_tree(&tokens)?;
    let mut output = String::with_capacity(template.len());
    render_nodes(&nodes, bindings, &mut output)?;
    Ok(output)
}

fn render_nodes(nodes: &[Node<'_>], bindings: &Bindings, output: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Placeholder(name) => output.push_str(bindings.text(name)?),
            Node::Block { key, children } => {
                if bindings.is_present(key)? {
                    render_nodes(children, bindings, output)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, Option<&str>)]) -> Bindings {
        let mut bindings = Bindings::new();
        for (name, value) in pairs {
            bindings.set(name, value.map(str::to_string));
        }
        bindings
    }

    #[test]
    fn tokenizes_placeholders_and_blocks() {
        let tokens = tokenize("a {{NAME}} b{{#x}}c{{/x}}").expect("tokens");
        assert_eq!(
            tokens,
            vec![
                Token::Text("a "),
                Token::Placeholder("NAME"),
                Token::Text(" b"),
                Token::Open("x"),
                Token::Text("c"),
                Token::Close("x"),
            ]
        );
    }

    #[test]
    fn standalone_block_tags_remove_their_lines() {
        let template = "top\n{{#framework}}\nuses {{FRAMEWORK}}\n{{/framework}}\nbottom\n";
        let with = render(template, &bindings(&[("FRAMEWORK", Some("fastapi"))])).expect("render");
        assert_eq!(with, "top\nuses fastapi\nbottom\n");
        let without = render(template, &bindings(&[("FRAMEWORK", None)])).expect("render");
        assert_eq!(without, "top\nbottom\n");
    }

    #[test]
    fn unknown_placeholder_fails() {
        let error = render("{{MISSING}}", &Bindings::new()).expect_err("unresolved");
        assert!(matches!(error, ForgeError::UnresolvedPlaceholder(name) if name == "MISSING"));
    }

    #[test]
    fn unknown_names_fail_even_inside_omitted_blocks() {
        let error = render("{{#ci}}{{TYPO}}{{/ci}}", &bindings(&[("CI", None)]))
            .expect_err("unresolved");
        assert!(matches!(error, ForgeError::UnresolvedPlaceholder(name) if name == "TYPO"));
    }

    #[test]
    fn absent_value_outside_block_fails() {
        let error = render("v{{VERSION}}", &bindings(&[("VERSION", None)])).expect_err("absent");
        assert!(matches!(error, ForgeError::UnresolvedPlaceholder(_)));
    }

    #[test]
    fn fallback_renders_but_block_stays_closed() {
        let mut bindings = Bindings::new();
        bindings.set_or("CI", None, "none");
        let rendered = render("CI: {{CI}}\n{{#ci}}\nconfigured\n{{/ci}}\n", &bindings)
            .expect("render");
        assert_eq!(rendered, "CI: none\n");
    }

    #[test]
    fn unbalanced_blocks_are_syntax_errors() {
        for template in ["{{#a}}x", "x{{/a}}", "{{#a}}{{/b}}", "{{NAME", "{{}}"] {
            let error = referenced_names(template).expect_err(template);
            assert!(matches!(error, ForgeError::TemplateSyntax(_)), "{template}");
        }
    }

    #[test]
    fn referenced_names_are_uppercased() {
        let names = referenced_names("{{#framework}}{{FRAMEWORK}}{{/framework}} {{NAME}}")
            .expect("names");
        let names: Vec<String> = names.into_iter().collect();
        assert_eq!(names, vec!["FRAMEWORK".to_string(), "NAME".to_string()]);
    }
}
