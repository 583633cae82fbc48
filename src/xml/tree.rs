//! In-memory document tree with per-document namespace bookkeeping.

/// The XML declaration of a document, if one was present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// A single attribute as written in the source.
///
/// `name` is the raw qualified name (`xmlns:dc`, `rdf:about`, ...); `value` is
/// stored unescaped and re-escaped on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A node in element content.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, unescaped. Whitespace between elements is kept.
    Text(String),
    /// CDATA section contents, verbatim.
    CData(String),
    Comment(String),
    /// Processing instruction, target and content verbatim.
    ProcessingInstruction(String),
}

/// An element with its raw name, resolved namespace, attributes and children.
///
/// The raw qualified name (`atom:link`) is what serialization emits; the
/// resolved namespace URI is what lookups match against, so prefix choice
/// never affects matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) children: Vec<Node>,
    /// Written as `<foo/>` in the source; reproduced that way when still empty.
    pub(crate) self_closing: bool,
}

impl Element {
    pub(crate) fn new(name: String, namespace: Option<String>, attributes: Vec<Attribute>) -> Self {
        Element {
            name,
            namespace,
            attributes,
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// The qualified name exactly as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The local part of the name (`title` for `atom:title`).
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    /// The resolved namespace URI, if the element is in a namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Iterates over direct child elements in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First direct child element matching `namespace` and `local` name.
    ///
    /// `None` for `namespace` matches only elements that are not in any
    /// namespace — an un-namespaced `<title>` does not match when the child
    /// sits in a default namespace, and vice versa.
    pub fn find_child(&self, namespace: Option<&str>, local: &str) -> Option<&Element> {
        self.child_elements()
            .find(|el| el.namespace.as_deref() == namespace && el.local_name() == local)
    }

    pub fn find_child_mut(&mut self, namespace: Option<&str>, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(el)
                if el.namespace.as_deref() == namespace && el.local_name() == local =>
            {
                Some(el)
            }
            _ => None,
        })
    }

    /// Concatenated direct text and CDATA content.
    ///
    /// Returns `None` when the element has no character data at all, so a
    /// missing `<title>` body reads as an absent field rather than `""`.
    pub fn text(&self) -> Option<String> {
        let mut out = String::new();
        let mut seen = false;
        for node in &self.children {
            match node {
                Node::Text(t) => {
                    out.push_str(t);
                    seen = true;
                }
                Node::CData(t) => {
                    out.push_str(t);
                    seen = true;
                }
                _ => {}
            }
        }
        seen.then_some(out)
    }

    /// Appends `suffix` to the element's character data.
    ///
    /// Extends the last text child in place, or starts one if the element had
    /// no character data.
    pub fn append_text(&mut self, suffix: &str) {
        if let Some(Node::Text(t)) = self
            .children
            .iter_mut()
            .rev()
            .find(|n| matches!(n, Node::Text(_)))
        {
            t.push_str(suffix);
        } else {
            self.children.push(Node::Text(suffix.to_string()));
        }
        self.self_closing = false;
    }
}

/// Ordered mapping of namespace prefix to URI, in source order of first
/// declaration. The default namespace is recorded under the empty prefix.
///
/// One map exists per [`Document`]; nothing here is shared between documents,
/// which keeps concurrent requests from observing each other's prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    entries: Vec<(String, String)>,
}

impl NamespaceMap {
    /// Records a declaration. The first declaration of a prefix wins the map
    /// slot; later re-declarations (shadowing) do not reorder the map.
    pub(crate) fn declare(&mut self, prefix: &str, uri: &str) {
        if !self.entries.iter().any(|(p, _)| p == prefix) {
            self.entries.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// URI bound to `prefix` (`""` for the default namespace).
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// `(prefix, uri)` pairs in first-declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed feed document: prolog, root element, trailing misc nodes, and the
/// ordered namespace map observed during parsing.
///
/// Owned by a single pipeline invocation; mutation (entry removal, title
/// marking) happens in place and the document is discarded after
/// serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) decl: Option<XmlDecl>,
    /// Comments, PIs, and whitespace before the root element.
    pub(crate) prolog: Vec<Node>,
    /// Raw DOCTYPE contents, if present.
    pub(crate) doctype: Option<String>,
    pub(crate) root: Element,
    /// Comments and whitespace after the root element.
    pub(crate) epilog: Vec<Node>,
    pub(crate) namespaces: NamespaceMap,
}

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// The prefixes declared in this document, in source order.
    pub fn namespaces(&self) -> &NamespaceMap {
        &self.namespaces
    }
}
