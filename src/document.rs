//! Owned, mutable HTML tree of a page body.
//!
//! Each pipeline stage takes the `Document` by value, edits it and hands it
//! on, so there is never more than one owner of the tree.

use ego_tree::NodeId;
use html5ever::tendril::StrTendril;
use html5ever::{LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node};

#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a body fragment (no `<html>`/`<body>` wrapper required).
    pub fn parse(body_html: &str) -> Self {
        Self {
            html: Html::parse_fragment(body_html),
        }
    }

    /// Serializes the fragment back to HTML.
    pub fn to_html(&self) -> String {
        self.html.root_element().inner_html()
    }

    /// Ids of all elements accepted by `matches`, in document order.
    pub fn select(&self, matches: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| matches(element.value()))
            .map(|element| element.id())
            .collect()
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.value().attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.with_element(id, |element| {
            element.attrs.insert(attr_name(name), StrTendril::from(value));
        });
    }

    /// Removes an attribute and returns its previous value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.with_element(id, |element| {
            let mut removed = None;
            element.attrs.retain(|key, value| {
                if &*key.local == name {
                    removed = Some(value.to_string());
                    false
                } else {
                    true
                }
            });
            removed
        })
        .flatten()
    }

    /// Turns the element into an empty `<tag>` carrying only `attrs`.
    pub fn replace_element(&mut self, id: NodeId, tag: &str, attrs: &[(&str, String)]) {
        self.detach_children(id);
        self.with_element(id, |element| {
            element.name = QualName::new(None, element.name.ns.clone(), LocalName::from(tag));
            element.attrs.retain(|_, _| false);
            for (name, value) in attrs {
                element
                    .attrs
                    .insert(attr_name(name), StrTendril::from(value.as_str()));
            }
        });
    }

    /// Turns the element into `<p>text</p>`.
    pub fn replace_with_paragraph(&mut self, id: NodeId, text: &str) {
        self.replace_element(id, "p", &[]);
        self.set_text(id, text);
    }

    /// Changes the tag name, keeping attributes and children.
    pub fn rename(&mut self, id: NodeId, tag: &str) {
        self.with_element(id, |element| {
            element.name = QualName::new(None, element.name.ns.clone(), LocalName::from(tag));
        });
    }

    /// Replaces the element's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.detach_children(id);
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.append(Node::Text(Text {
                text: StrTendril::from(text),
            }));
        }
    }

    /// Detaches the element (and its subtree) from the document.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    fn detach_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = match self.html.tree.get(id) {
            Some(node) => node.children().map(|child| child.id()).collect(),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
    }

    fn with_element<R>(&mut self, id: NodeId, edit: impl FnOnce(&mut Element) -> R) -> Option<R> {
        let mut node = self.html.tree.get_mut(id)?;
        match node.value() {
            Node::Element(element) => Some(edit(element)),
            _ => None,
        }
    }
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// Leading integer of a dimension such as `400`, `400px` or ` 400.5 `.
pub fn parse_pixels(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value, |end| &value[..end]);
    digits.parse().ok()
}
