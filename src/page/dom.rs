//! A small element tree standing in for the page DOM.

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &["meta", "link", "img", "br", "hr", "input"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Element(Element),
  Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  tag: String,
  /// Attributes in insertion order
  attrs: Vec<(String, String)>,
  children: Vec<Node>,
}

impl Element {
  pub fn new(tag: &str) -> Self {
    Self {
      tag: tag.to_ascii_lowercase(),
      attrs: Vec::new(),
      children: Vec::new(),
    }
  }

  pub fn with_attr(mut self, name: &str, value: &str) -> Self {
    self.set_attr(name, value);
    self
  }

  pub fn with_class(self, class: &str) -> Self {
    self.with_attr("class", class)
  }

  pub fn with_child(mut self, child: Element) -> Self {
    self.append_child(child);
    self
  }

  pub fn with_text(mut self, text: &str) -> Self {
    self.children.push(Node::Text(text.to_string()));
    self
  }

  pub fn set_attr(&mut self, name: &str, value: &str) {
    match self.attrs.iter_mut().find(|(n, _)| n == name) {
      Some((_, v)) => *v = value.to_string(),
      None => self.attrs.push((name.to_string(), value.to_string())),
    }
  }

  pub fn attr(&self, name: &str) -> Option<&str> {
    self
      .attrs
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  pub fn has_class(&self, class: &str) -> bool {
    self
      .attr("class")
      .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
  }

  pub fn append_child(&mut self, child: Element) {
    self.children.push(Node::Element(child));
  }

  pub fn clear_children(&mut self) {
    self.children.clear();
  }

  /// First descendant (or self) matching a `.class` or `tag` selector.
  pub fn query_selector_mut(&mut self, selector: &str) -> Option<&mut Element> {
    if self.matches(selector) {
      return Some(self);
    }

    self.children.iter_mut().find_map(|node| match node {
      Node::Element(e) => e.query_selector_mut(selector),
      Node::Text(_) => None,
    })
  }

  fn matches(&self, selector: &str) -> bool {
    match selector.strip_prefix('.') {
      Some(class) => self.has_class(class),
      None => self.tag.eq_ignore_ascii_case(selector),
    }
  }

  fn write_html(&self, out: &mut String) {
    out.push('<');
    out.push_str(&self.tag);
    for (name, value) in &self.attrs {
      out.push_str(&format!(" {}=\"{}\"", name, escape(value, true)));
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&self.tag.as_str()) {
      return;
    }

    for node in &self.children {
      match node {
        Node::Element(e) => e.write_html(out),
        Node::Text(t) => out.push_str(&escape(t, false)),
      }
    }

    out.push_str("</");
    out.push_str(&self.tag);
    out.push('>');
  }

  pub fn to_html(&self) -> String {
    let mut out = String::new();
    self.write_html(&mut out);
    out
  }
}

/// Read access used to inspect rendered trees.
#[cfg(test)]
impl Element {
  pub fn tag(&self) -> &str {
    &self.tag
  }

  pub fn children(&self) -> &[Node] {
    &self.children
  }

  /// Child elements, skipping text
  pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(|node| match node {
      Node::Element(e) => Some(e),
      Node::Text(_) => None,
    })
  }

  /// Concatenated text of this element and its descendants
  pub fn text_content(&self) -> String {
    let mut out = String::new();
    for node in &self.children {
      match node {
        Node::Text(t) => out.push_str(t),
        Node::Element(e) => out.push_str(&e.text_content()),
      }
    }
    out
  }

  pub fn query_selector(&self, selector: &str) -> Option<&Element> {
    if self.matches(selector) {
      return Some(self);
    }

    self.child_elements().find_map(|e| e.query_selector(selector))
  }
}

/// An HTML document rooted at `<html>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  root: Element,
}

impl Document {
  pub fn new(root: Element) -> Self {
    Self { root }
  }

  /// The static application shell: head with manifest and stylesheet, a
  /// `.resources` container holding one placeholder item, and the page script.
  pub fn shell(title: &str) -> Self {
    let head = Element::new("head")
      .with_child(Element::new("meta").with_attr("charset", "utf-8"))
      .with_child(
        Element::new("meta")
          .with_attr("name", "viewport")
          .with_attr("content", "width=device-width, initial-scale=1"),
      )
      .with_child(Element::new("title").with_text(title))
      .with_child(
        Element::new("link")
          .with_attr("rel", "manifest")
          .with_attr("href", "/manifest.json"),
      )
      .with_child(
        Element::new("link")
          .with_attr("rel", "stylesheet")
          .with_attr("href", "/css/styles.css"),
      );

    let placeholder = Element::new("a")
      .with_attr("href", "#")
      .with_class("resource-item")
      .with_child(Element::new("div").with_child(Element::new("h3").with_text("Loading")));

    let body = Element::new("body")
      .with_child(Element::new("header").with_child(Element::new("h1").with_text(title)))
      .with_child(Element::new("main").with_class("resources").with_child(placeholder))
      .with_child(Element::new("script").with_attr("src", "/js/app.js"));

    Self::new(
      Element::new("html")
        .with_attr("lang", "en")
        .with_child(head)
        .with_child(body),
    )
  }

  pub fn query_selector_mut(&mut self, selector: &str) -> Option<&mut Element> {
    self.root.query_selector_mut(selector)
  }

  pub fn to_html(&self) -> String {
    format!("<!DOCTYPE html>{}", self.root.to_html())
  }
}

#[cfg(test)]
impl Document {
  pub fn query_selector(&self, selector: &str) -> Option<&Element> {
    self.root.query_selector(selector)
  }
}

fn escape(s: &str, attribute: bool) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' if attribute => out.push_str("&quot;"),
      c => out.push(c),
    }
  }
  out
}
