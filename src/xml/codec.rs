//! Event-based XML parse and serialize built on `quick-xml`.
//!
//! The reader is `NsReader`, so element namespaces are resolved with proper
//! scoping (shadowed and re-declared prefixes included) while the raw
//! qualified names and `xmlns` attributes are kept verbatim for output.
//!
//! XXE safety: quick-xml (0.37) never parses `<!ENTITY>` declarations from a
//! DOCTYPE. Entity resolution only covers the five XML builtins and numeric
//! character references; anything else surfaces as a parse error here rather
//! than expanding.

use std::io::Cursor;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::writer::Writer;

use super::tree::{Attribute, Document, Element, NamespaceMap, Node, XmlDecl};
use super::XmlError;

fn parse_err(e: impl std::fmt::Display) -> XmlError {
    XmlError::Parse(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> XmlError {
    XmlError::Serialize(e.to_string())
}

/// Parses a feed document, recording every namespace-prefix declaration in
/// source order.
///
/// Whitespace between elements, comments, CDATA sections, processing
/// instructions, the XML declaration and the DOCTYPE are all preserved in the
/// tree, so an unmodified document serializes back to an equivalent one.
///
/// # Errors
///
/// Returns [`XmlError::Parse`] for malformed XML (including unresolvable
/// entity references) and [`XmlError::NoRootElement`] for input with no
/// element at all.
pub fn parse(bytes: &[u8]) -> Result<Document, XmlError> {
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut decl: Option<XmlDecl> = None;
    let mut prolog: Vec<Node> = Vec::new();
    let mut doctype: Option<String> = None;
    let mut root: Option<Element> = None;
    let mut epilog: Vec<Node> = Vec::new();
    let mut namespaces = NamespaceMap::default();
    // Open elements, innermost last
    let mut stack: Vec<Element> = Vec::new();

    loop {
        // Decoder is a small Copy snapshot; taken before the read so the
        // resolved-namespace borrow of the reader stays undisturbed
        let decoder = reader.decoder();
        let (resolution, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(parse_err)?;
        match event {
            Event::Decl(d) => {
                decl = Some(read_decl(decoder, &d)?);
            }
            Event::DocType(t) => {
                let content = decoder.decode(&t).map_err(parse_err)?;
                doctype = Some(content.trim().to_string());
            }
            Event::Start(e) => {
                let el = read_element(decoder, &e, &resolution, &mut namespaces)?;
                stack.push(el);
            }
            Event::Empty(e) => {
                let mut el = read_element(decoder, &e, &resolution, &mut namespaces)?;
                el.self_closing = true;
                place(el, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // Mismatched closing tags are already reader errors
                let el = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unexpected closing tag".into()))?;
                place(el, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(parse_err)?;
                match stack.last_mut() {
                    Some(parent) => push_text(&mut parent.children, &text),
                    None if root.is_none() => push_text(&mut prolog, &text),
                    None => push_text(&mut epilog, &text),
                }
            }
            Event::CData(t) => {
                let content = decoder.decode(&t).map_err(parse_err)?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(content)),
                    None => return Err(XmlError::Parse("CDATA outside root element".into())),
                }
            }
            Event::Comment(t) => {
                let content = decoder.decode(&t).map_err(parse_err)?.into_owned();
                let target = match stack.last_mut() {
                    Some(parent) => &mut parent.children,
                    None if root.is_none() => &mut prolog,
                    None => &mut epilog,
                };
                target.push(Node::Comment(content));
            }
            Event::PI(p) => {
                let content = decoder.decode(&p).map_err(parse_err)?.into_owned();
                let target = match stack.last_mut() {
                    Some(parent) => &mut parent.children,
                    None if root.is_none() => &mut prolog,
                    None => &mut epilog,
                };
                target.push(Node::ProcessingInstruction(content));
            }
            Event::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse("unclosed element at end of input".into()));
    }

    let root = root.ok_or(XmlError::NoRootElement)?;
    Ok(Document {
        decl,
        prolog,
        doctype,
        root,
        epilog,
        namespaces,
    })
}

/// Parses a document from a string slice. See [`parse`].
pub fn parse_str(content: &str) -> Result<Document, XmlError> {
    parse(content.as_bytes())
}

fn read_decl(decoder: Decoder, d: &BytesDecl<'_>) -> Result<XmlDecl, XmlError> {
    let decode = |bytes: &[u8]| -> Result<String, XmlError> {
        Ok(decoder.decode(bytes).map_err(parse_err)?.into_owned())
    };
    let version = decode(&d.version().map_err(parse_err)?)?;
    let encoding = match d.encoding() {
        Some(enc) => Some(decode(&enc.map_err(parse_err)?)?),
        None => None,
    };
    let standalone = match d.standalone() {
        Some(sa) => Some(decode(&sa.map_err(parse_err)?)?),
        None => None,
    };
    Ok(XmlDecl {
        version,
        encoding,
        standalone,
    })
}

fn read_element(
    decoder: Decoder,
    e: &BytesStart<'_>,
    resolution: &ResolveResult<'_>,
    namespaces: &mut NamespaceMap,
) -> Result<Element, XmlError> {
    let name = decoder.decode(e.name().as_ref()).map_err(parse_err)?.into_owned();
    let namespace = match resolution {
        ResolveResult::Bound(ns) => Some(decoder.decode(ns.0).map_err(parse_err)?.into_owned()),
        _ => None,
    };

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(parse_err)?;
        let key = decoder.decode(attr.key.as_ref()).map_err(parse_err)?.into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(parse_err)?
            .into_owned();

        // Record declarations, but keep them in place as ordinary attributes
        // so output re-declares each prefix exactly where the source did.
        if key == "xmlns" {
            namespaces.declare("", &value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.declare(prefix, &value);
        }
        attributes.push(Attribute { name: key, value });
    }

    Ok(Element::new(name, namespace, attributes))
}

/// Attaches a completed element to its parent, or installs it as the root.
fn place(el: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => {
            if root.is_some() {
                return Err(XmlError::Parse("multiple root elements".into()));
            }
            *root = Some(el);
        }
    }
    Ok(())
}

/// Merges adjacent character data into a single text node.
fn push_text(children: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(Node::Text(text.to_string()));
    }
}

impl Document {
    /// Serializes the document, re-emitting the namespace declarations
    /// recorded at parse time with their original prefixes and positions.
    ///
    /// Text and attribute values are re-escaped on the way out; CDATA,
    /// comments, and processing instructions are written verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Serialize`] if writing fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        if let Some(d) = &self.decl {
            let decl = BytesDecl::new(&d.version, d.encoding.as_deref(), d.standalone.as_deref());
            writer.write_event(Event::Decl(decl)).map_err(ser_err)?;
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        if let Some(dt) = &self.doctype {
            use std::io::Write;
            write!(writer.get_mut(), "<!DOCTYPE {}>", dt).map_err(ser_err)?;
        }
        write_node(&mut writer, &Node::Element(self.root.clone()))?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }

        Ok(writer.into_inner().into_inner())
    }
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &Node) -> Result<(), XmlError> {
    match node {
        Node::Element(el) => write_element(writer, el),
        Node::Text(t) => writer
            .write_event(Event::Text(BytesText::new(t)))
            .map_err(ser_err),
        Node::CData(t) => writer
            .write_event(Event::CData(BytesCData::new(t)))
            .map_err(ser_err),
        Node::Comment(t) => writer
            .write_event(Event::Comment(BytesText::from_escaped(t.as_str())))
            .map_err(ser_err),
        Node::ProcessingInstruction(t) => writer
            .write_event(Event::PI(BytesPI::new(t.as_str())))
            .map_err(ser_err),
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, el: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(el.name());
    for attr in el.attributes() {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    if el.children().is_empty() && el.self_closing {
        return writer.write_event(Event::Empty(start)).map_err(ser_err);
    }

    writer.write_event(Event::Start(start)).map_err(ser_err)?;
    for child in el.children() {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name())))
        .map_err(ser_err)
}
