use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde::{Deserialize, Serialize};

use crate::dom::{find_body, walk_descendants, NodePath};

/// One editable text node. `index` is the node's 1-based position among the
/// non-blank text nodes under `<body>` and is its only identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNodeRecord {
    pub index: usize,
    pub original: String,
    pub updated: String,
}

/// A record plus the address of the node it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedText {
    pub record: TextNodeRecord,
    pub path: NodePath,
}

/// Document-order walk over the text under `<body>`. Whitespace-only nodes
/// are skipped and do not consume an index.
pub fn index_text_nodes(dom: &RcDom) -> Vec<IndexedText> {
    let Some((body_path, body)) = find_body(dom) else {
        return Vec::new();
    };

    let mut out: Vec<IndexedText> = Vec::new();
    walk_descendants(&body, &body_path, &mut |node: &Handle, path: &NodePath| {
        let NodeData::Text { contents } = &node.data else {
            return;
        };
        let text = contents.borrow().to_string();
        if text.trim().is_empty() {
            return;
        }
        let index = out.len() + 1;
        out.push(IndexedText {
            record: TextNodeRecord {
                index,
                original: text.clone(),
                updated: text,
            },
            path: path.clone(),
        });
    });
    tracing::debug!(count = out.len(), "indexed text nodes");
    out
}
