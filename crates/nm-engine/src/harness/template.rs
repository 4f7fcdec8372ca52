//! A parser for the template subset the harness renders.
//!
//! Supported markup:
//!
//! - elements, including self-closing tags and void elements (`<input>`)
//! - text
//! - comments (dropped)
//! - `ng-content` projection slots (plain elements to the parser)
//! - attributes: `plain="v"`, `[input]="expr"`, `(output)="handler($event)"`,
//!   `[(twoWay)]="expr"`, `*structural="expr"` and `#reference`
//!
//! # Examples
//!
//! ```
//! use nm_engine::harness::{AttrKind, Node, parse_template};
//!
//! let nodes = parse_template(r#"<div *appWhen="false" id="x">hi</div>"#).unwrap();
//! let Node::Element(div) = &nodes[0] else { unreachable!() };
//! assert_eq!(div.tag, "div");
//! assert_eq!(div.attributes[0].kind, AttrKind::Structural);
//! assert_eq!(div.attributes[0].name, "appWhen");
//! assert_eq!(div.children, vec![Node::Text("hi".to_owned())]);
//! ```

use nm_core::TemplateError;

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Returns `true` for elements without a closing tag.
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// A template node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with its children.
    Element(Element),
    /// Raw text, interpolations included.
    Text(String),
}

/// An element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// Attributes in source order.
    pub attributes: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Returns the structural attribute, if any.
    #[must_use]
    pub fn structural(&self) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.kind == AttrKind::Structural)
    }

    /// Attribute names used for selector matching, structural ones excluded.
    #[must_use]
    pub fn match_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|attr| !matches!(attr.kind, AttrKind::Structural | AttrKind::Reference))
            .map(|attr| attr.name.as_str())
            .collect()
    }
}

/// How an attribute binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// `name="value"`.
    Plain,
    /// `[name]="expr"`.
    Input,
    /// `(name)="handler"`.
    Output,
    /// `[(name)]="expr"`.
    TwoWay,
    /// `*name="expr"`.
    Structural,
    /// `#name`.
    Reference,
}

/// An attribute with its binding syntax stripped from the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Binding kind.
    pub kind: AttrKind,
    /// Name without brackets, parentheses or prefix.
    pub name: String,
    /// Raw value, if any.
    pub value: Option<String>,
}

impl Attribute {
    fn from_raw(raw: &str, value: Option<String>) -> Self {
        let (kind, name) = if let Some(name) = raw
            .strip_prefix("[(")
            .and_then(|rest| rest.strip_suffix(")]"))
        {
            (AttrKind::TwoWay, name)
        } else if let Some(name) = raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            (AttrKind::Input, name)
        } else if let Some(name) = raw.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
            (AttrKind::Output, name)
        } else if let Some(name) = raw.strip_prefix('*') {
            (AttrKind::Structural, name)
        } else if let Some(name) = raw.strip_prefix('#') {
            (AttrKind::Reference, name)
        } else {
            (AttrKind::Plain, raw)
        };
        Self {
            kind,
            name: name.to_owned(),
            value,
        }
    }
}

/// Parses a template into nodes.
pub fn parse_template(source: &str) -> Result<Vec<Node>, TemplateError> {
    Parser { src: source, pos: 0 }.parse()
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Vec<Node>, TemplateError> {
        let mut roots = Vec::new();
        let mut open: Vec<Element> = Vec::new();

        while !self.at_end() {
            if self.rest().starts_with("<!--") {
                let end = self.rest()[4..]
                    .find("-->")
                    .ok_or(TemplateError::UnexpectedEnd(self.src.len()))?;
                self.pos += 4 + end + 3;
            } else if self.rest().starts_with("</") {
                let offset = self.pos;
                self.pos += 2;
                let tag = self.read_name()?;
                self.skip_whitespace();
                self.expect('>')?;
                let element = open.pop().ok_or_else(|| TemplateError::Malformed {
                    offset,
                    reason: format!("closing tag </{tag}> without an open element"),
                })?;
                if element.tag != tag {
                    return Err(TemplateError::MismatchedClose {
                        expected: element.tag,
                        found: tag,
                        offset,
                    });
                }
                append(&mut open, &mut roots, Node::Element(element));
            } else if self.rest().starts_with('<') {
                self.pos += 1;
                let (element, closed) = self.read_open_tag()?;
                if closed || is_void(&element.tag) {
                    append(&mut open, &mut roots, Node::Element(element));
                } else {
                    open.push(element);
                }
            } else {
                let end = self.rest().find('<').unwrap_or(self.rest().len());
                let text = self.rest()[..end].to_owned();
                self.pos += end;
                append(&mut open, &mut roots, Node::Text(text));
            }
        }

        match open.pop() {
            Some(element) => Err(TemplateError::Unclosed(element.tag)),
            None => Ok(roots),
        }
    }

    /// Reads the rest of an opening tag; returns whether it was self-closing.
    fn read_open_tag(&mut self) -> Result<(Element, bool), TemplateError> {
        let tag = self.read_name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(TemplateError::UnexpectedEnd(self.pos));
            }
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((element(tag, attributes), true));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                return Ok((element(tag, attributes), false));
            }
            attributes.push(self.read_attribute()?);
        }
    }

    fn read_attribute(&mut self) -> Result<Attribute, TemplateError> {
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(TemplateError::Malformed {
                offset: start,
                reason: "expected an attribute name".to_owned(),
            });
        }
        let name = &self.src[start..start + len];
        self.pos += len;
        self.skip_whitespace();

        let value = if self.rest().starts_with('=') {
            self.pos += 1;
            self.skip_whitespace();
            Some(self.read_value()?)
        } else {
            None
        };
        Ok(Attribute::from_raw(name, value))
    }

    fn read_value(&mut self) -> Result<String, TemplateError> {
        let quote = match self.rest().chars().next() {
            Some(quote @ ('"' | '\'')) => quote,
            Some(_) => {
                let len = self
                    .rest()
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.rest().len());
                let value = self.rest()[..len].to_owned();
                self.pos += len;
                return Ok(value);
            }
            None => return Err(TemplateError::UnexpectedEnd(self.pos)),
        };
        self.pos += 1;
        let len = self
            .rest()
            .find(quote)
            .ok_or(TemplateError::UnexpectedEnd(self.src.len()))?;
        let value = self.rest()[..len].to_owned();
        self.pos += len + 1;
        Ok(value)
    }

    fn read_name(&mut self) -> Result<String, TemplateError> {
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(if self.at_end() {
                TemplateError::UnexpectedEnd(self.pos)
            } else {
                TemplateError::Malformed {
                    offset: self.pos,
                    reason: "expected a tag name".to_owned(),
                }
            });
        }
        let name = self.rest()[..len].to_owned();
        self.pos += len;
        Ok(name)
    }

    fn expect(&mut self, c: char) -> Result<(), TemplateError> {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else if self.at_end() {
            Err(TemplateError::UnexpectedEnd(self.pos))
        } else {
            Err(TemplateError::Malformed {
                offset: self.pos,
                reason: format!("expected '{c}'"),
            })
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }
}

fn element(tag: String, attributes: Vec<Attribute>) -> Element {
    Element {
        tag,
        attributes,
        children: Vec::new(),
    }
}

fn append(open: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_element(nodes: &[Node]) -> &Element {
        match nodes {
            [Node::Element(element)] => element,
            other => panic!("expected one element, got {other:?}"),
        }
    }

    #[test]
    fn test_attribute_kinds() {
        let nodes = parse_template(
            concat!(
                r#"<app-item plain="v" [input]="expr" (output)="handle($event)" "#,
                r#"[(model)]="m" #ref bare></app-item>"#,
            ),
        )
        .unwrap();
        let kinds: Vec<(AttrKind, &str)> = only_element(&nodes)
            .attributes
            .iter()
            .map(|attr| (attr.kind, attr.name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (AttrKind::Plain, "plain"),
                (AttrKind::Input, "input"),
                (AttrKind::Output, "output"),
                (AttrKind::TwoWay, "model"),
                (AttrKind::Reference, "ref"),
                (AttrKind::Plain, "bare"),
            ]
        );
    }

    #[test]
    fn test_nested_and_text() {
        let nodes = parse_template("child:1 <my-component>real content</my-component>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], Node::Text("child:1 ".to_owned()));
        let Node::Element(element) = &nodes[1] else {
            panic!("expected element");
        };
        assert_eq!(element.children, vec![Node::Text("real content".to_owned())]);
    }

    #[test]
    fn test_void_and_self_closing() {
        let nodes = parse_template(r#"<input value="1"><br/><ng-content select="x" />"#).unwrap();
        assert_eq!(nodes.len(), 3);
        let Node::Element(content) = &nodes[2] else {
            panic!("expected element");
        };
        assert_eq!(content.tag, "ng-content");
        assert_eq!(content.attributes[0].value.as_deref(), Some("x"));
    }

    #[test]
    fn test_comments_dropped() {
        let nodes = parse_template("<!-- note --><b>x</b>").unwrap();
        assert_eq!(only_element(&nodes).tag, "b");
    }

    #[test]
    fn test_mismatched_close() {
        let err = parse_template("<div><span></div>").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::MismatchedClose { ref expected, .. } if expected == "span"
        ));
    }

    #[test]
    fn test_unclosed() {
        assert_eq!(
            parse_template("<div>").unwrap_err(),
            TemplateError::Unclosed("div".to_owned())
        );
        assert!(matches!(
            parse_template(r#"<div id="x"#).unwrap_err(),
            TemplateError::UnexpectedEnd(_)
        ));
    }

    #[test]
    fn test_match_names_skip_structural() {
        let nodes = parse_template(r#"<div *if="x" [a]="1" (b)="c()" #r></div>"#).unwrap();
        assert_eq!(only_element(&nodes).match_names(), vec!["a", "b"]);
        assert_eq!(only_element(&nodes).structural().map(|a| a.name.as_str()), Some("if"));
    }
}
