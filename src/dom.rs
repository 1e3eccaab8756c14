use std::io;

use html5ever::parse_document;
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Child-index path from the document node down to a node.
///
/// Paths stay valid for as long as the tree keeps its shape; edits only ever
/// touch text contents and attribute values, never the child lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn steps(&self) -> &[usize] {
        &self.0
    }
}

pub fn parse_html(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

pub fn elem_tag_lower(h: &Handle) -> Option<String> {
    match &h.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn attr_get(h: &Handle, attr: &str) -> Option<String> {
    match &h.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.to_string().eq_ignore_ascii_case(attr))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Overwrites an existing attribute value. Returns false when `h` is not an
/// element or has no such attribute.
pub fn attr_set(h: &Handle, attr: &str, value: &str) -> bool {
    let NodeData::Element { attrs, .. } = &h.data else {
        return false;
    };
    let mut attrs = attrs.borrow_mut();
    match attrs
        .iter_mut()
        .find(|a| a.name.local.to_string().eq_ignore_ascii_case(attr))
    {
        Some(a) => {
            a.value = StrTendril::from_slice(value);
            true
        }
        None => false,
    }
}

pub fn text_set(h: &Handle, text: &str) -> bool {
    match &h.data {
        NodeData::Text { contents } => {
            *contents.borrow_mut() = StrTendril::from_slice(text);
            true
        }
        _ => false,
    }
}

pub fn find_body(dom: &RcDom) -> Option<(NodePath, Handle)> {
    fn find_elem(node: &Handle, name: &str, path: &mut Vec<usize>) -> Option<Handle> {
        if let NodeData::Element { name: q, .. } = &node.data {
            if q.local.to_string().eq_ignore_ascii_case(name) {
                return Some(node.clone());
            }
        }
        for (i, c) in node.children.borrow().iter().enumerate() {
            path.push(i);
            if let Some(x) = find_elem(c, name, path) {
                return Some(x);
            }
            path.pop();
        }
        None
    }

    let mut path = Vec::new();
    let body = find_elem(&dom.document, "body", &mut path)?;
    Some((NodePath(path), body))
}

/// Pre-order walk over the descendants of `root` (not `root` itself).
pub fn walk_descendants<F>(root: &Handle, root_path: &NodePath, visit: &mut F)
where
    F: FnMut(&Handle, &NodePath),
{
    fn walk<F>(node: &Handle, path: &mut Vec<usize>, visit: &mut F)
    where
        F: FnMut(&Handle, &NodePath),
    {
        for (i, c) in node.children.borrow().iter().enumerate() {
            path.push(i);
            let here = NodePath(path.clone());
            visit(c, &here);
            walk(c, path, visit);
            path.pop();
        }
    }

    let mut path = root_path.0.clone();
    walk(root, &mut path, visit);
}

pub fn node_at(dom: &RcDom, path: &NodePath) -> Option<Handle> {
    let mut node = dom.document.clone();
    for &i in path.steps() {
        let next = node.children.borrow().get(i).cloned()?;
        node = next;
    }
    Some(node)
}

/// Every element named `tag` in document order, with its path.
pub fn elements_by_tag(dom: &RcDom, tag: &str) -> Vec<(NodePath, Handle)> {
    let mut out = Vec::new();
    let mut collect = |node: &Handle, path: &NodePath| {
        if elem_tag_lower(node).as_deref() == Some(tag) {
            out.push((path.clone(), node.clone()));
        }
    };
    walk_descendants(&dom.document, &NodePath::default(), &mut collect);
    out
}

/// Serializable subtree that also writes `<template>` contents, which rcdom
/// keeps in `template_contents` instead of the child list.
struct Subtree(Handle);

impl Serialize for Subtree {
    fn serialize<S>(&self, serializer: &mut S, scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        match scope {
            TraversalScope::IncludeNode => write_node(serializer, &self.0),
            TraversalScope::ChildrenOnly(_) => write_children(serializer, &self.0),
        }
    }
}

fn write_children<S: Serializer>(serializer: &mut S, node: &Handle) -> io::Result<()> {
    for child in node.children.borrow().iter() {
        write_node(serializer, child)?;
    }
    Ok(())
}

fn write_node<S: Serializer>(serializer: &mut S, node: &Handle) -> io::Result<()> {
    match &node.data {
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            serializer.start_elem(
                name.clone(),
                attrs.borrow().iter().map(|a| (&a.name, &a.value[..])),
            )?;
            write_children(serializer, node)?;
            if let Some(contents) = template_contents.borrow().as_ref() {
                write_children(serializer, contents)?;
            }
            serializer.end_elem(name.clone())
        }
        NodeData::Doctype { name, .. } => serializer.write_doctype(name),
        NodeData::Text { contents } => serializer.write_text(&contents.borrow()),
        NodeData::Comment { contents } => serializer.write_comment(contents),
        NodeData::ProcessingInstruction { target, contents } => {
            serializer.write_processing_instruction(target, contents)
        }
        NodeData::Document => write_children(serializer, node),
    }
}

fn serialize_scope(handle: &Handle, scope: TraversalScope) -> String {
    let mut out = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    if let Err(e) = serialize(&mut out, &Subtree(handle.clone()), opts) {
        tracing::warn!("HTML serialization stopped early: {e}");
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Inner markup of an element.
pub fn serialize_children(handle: &Handle) -> String {
    serialize_scope(handle, TraversalScope::ChildrenOnly(None))
}

/// The whole document, doctype included.
pub fn serialize_document(dom: &RcDom) -> String {
    serialize_scope(&dom.document, TraversalScope::ChildrenOnly(None))
}
