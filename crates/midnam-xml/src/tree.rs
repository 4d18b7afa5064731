//! Owned element tree.
//!
//! Every node has exactly one parent: children are stored by value, so moving
//! an element between parents is always a detach followed by an attach.

use std::slice;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    /// Character data with surrounding whitespace trimmed.
    Text(String),
    Comment(String),
}

impl XmlNode {
    /// Borrow the element when this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable variant of [`XmlNode::as_element`].
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// `true` when this node is an element with the given tag.
    pub fn is_element(&self, name: &str) -> bool {
        self.as_element().is_some_and(|element| element.is(name))
    }
}

impl From<Element> for XmlNode {
    fn from(element: Element) -> Self {
        XmlNode::Element(element)
    }
}

/// XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl Element {
    /// Create an empty element with the given tag name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Builder-style text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when the tag name equals `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Attribute value by key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set an attribute, keeping its original position when it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(index).1)
    }

    /// First text child, if any.
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Replace all text children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|node| !matches!(node, XmlNode::Text(_)));
        self.children.insert(0, XmlNode::Text(text.into()));
    }

    /// All child nodes in order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Number of child nodes (elements, text, and comments).
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// `true` when the element has no child nodes.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Direct child elements, mutably.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// Direct child elements with the given tag.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.is(name))
    }

    /// First direct child element with the given tag.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.is(name))
    }

    /// Mutable variant of [`Element::child`].
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|element| element.is(name))
    }

    /// Element stored at node index `index`.
    pub fn child_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.children.get_mut(index).and_then(XmlNode::as_element_mut)
    }

    /// Node index of the first child element matching `pred`.
    pub fn position_where<P>(&self, mut pred: P) -> Option<usize>
    where
        P: FnMut(&Element) -> bool,
    {
        self.children
            .iter()
            .position(|node| node.as_element().is_some_and(&mut pred))
    }

    /// Node index of the last child element matching `pred`.
    pub fn last_position_where<P>(&self, mut pred: P) -> Option<usize>
    where
        P: FnMut(&Element) -> bool,
    {
        self.children
            .iter()
            .rposition(|node| node.as_element().is_some_and(&mut pred))
    }

    /// Node index of the first child element with the given tag.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.position_where(|element| element.is(name))
    }

    /// Node index of the last child element with the given tag.
    pub fn last_position(&self, name: &str) -> Option<usize> {
        self.last_position_where(|element| element.is(name))
    }

    /// Insert a node at `index`, clamped to the current child count.
    pub fn insert(&mut self, index: usize, node: impl Into<XmlNode>) {
        let index = index.min(self.children.len());
        self.children.insert(index, node.into());
    }

    /// Append a node.
    pub fn push(&mut self, node: impl Into<XmlNode>) {
        self.children.push(node.into());
    }

    /// Remove and return the node at `index`.
    pub fn remove(&mut self, index: usize) -> Option<XmlNode> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Detach every direct child element matching `pred`, returning them in
    /// document order.
    pub fn detach_where<P>(&mut self, mut pred: P) -> Vec<Element>
    where
        P: FnMut(&Element) -> bool,
    {
        let mut detached = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                XmlNode::Element(element) if pred(&element) => detached.push(element),
                other => kept.push(other),
            }
        }
        self.children = kept;
        detached
    }

    /// Detach every direct child element with the given tag.
    pub fn detach_named(&mut self, name: &str) -> Vec<Element> {
        self.detach_where(|element| element.is(name))
    }

    /// Remove and return all child nodes.
    pub fn take_children(&mut self) -> Vec<XmlNode> {
        std::mem::take(&mut self.children)
    }

    /// Remove all child nodes.
    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Descendant elements in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// First descendant element with the given tag.
    pub fn find_first(&self, name: &str) -> Option<&Element> {
        self.descendants().find(|element| element.is(name))
    }

    /// All descendant elements with the given tag.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |element| element.is(name))
    }

    /// First descendant element matching `pred`, mutably.
    pub fn find_first_mut_where<P>(&mut self, pred: &P) -> Option<&mut Element>
    where
        P: Fn(&Element) -> bool,
    {
        for node in self.children.iter_mut() {
            if let XmlNode::Element(element) = node {
                if pred(element) {
                    return Some(element);
                }
                if let Some(found) = element.find_first_mut_where(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// First descendant element with the given tag, mutably.
    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.find_first_mut_where(&|element: &Element| element.is(name))
    }

    /// Visit `self` and then every descendant element in pre-order.
    pub fn walk_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut Element),
    {
        visit(self);
        for node in self.children.iter_mut() {
            if let XmlNode::Element(element) = node {
                element.walk_mut(visit);
            }
        }
    }
}

/// Pre-order iterator over descendant elements.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<slice::Iter<'a, XmlNode>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(XmlNode::Element(element)) => {
                    self.stack.push(element.children.iter());
                    return Some(element);
                }
                Some(_) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}
