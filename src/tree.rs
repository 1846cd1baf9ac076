//! Output tag/parameter tree
//!
//! The engine assembles its output as a tree of tagged nodes, each with
//! an ordered parameter list. The walker only talks to the `Sink` trait;
//! `TagTree` is the concrete arena-backed implementation used by the
//! public conversion entry points, and also knows how to render itself
//! to the target notation's textual form.

use serde::Serialize;

use crate::errors::EngineError;

/// One tag parameter: a value plus whether it renders quoted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub value: String,
    pub quoted: bool,
}

impl Param {
    /// Quoted string parameter
    pub fn text(value: impl Into<String>) -> Self {
        Param { value: value.into(), quoted: true }
    }

    /// Bare (numeric or keyword) parameter
    pub fn raw(value: impl Into<String>) -> Self {
        Param { value: value.into(), quoted: false }
    }
}

/// Index of an open scope inside a `TagTree`
pub type ScopeHandle = usize;

/// Minimal output interface required by the conversion core
pub trait Sink {
    /// Open a nested scope under the current one and make it current
    fn open_scope(&mut self, tag: &str) -> ScopeHandle {
        self.open_scope_with(tag, Vec::new())
    }

    /// Open a nested scope carrying parameters (e.g. a tuplet ratio)
    fn open_scope_with(&mut self, tag: &str, params: Vec<Param>) -> ScopeHandle;

    /// Close a scope. The handle must be the innermost open scope;
    /// anything else is an engine invariant violation.
    fn close_scope(&mut self, handle: ScopeHandle) -> Result<(), EngineError>;

    /// Append a childless node to the current scope
    fn append_leaf(&mut self, tag: &str, params: Vec<Param>);

    /// Append a comment node to the current scope
    fn append_comment(&mut self, text: &str);

    /// Handle of the innermost open scope
    fn current(&self) -> ScopeHandle;
}

#[derive(Debug, Clone, Serialize)]
struct TagNode {
    name: String,
    params: Vec<Param>,
    children: Vec<usize>,
}

const COMMENT_TAG: &str = "(*";

/// Arena-backed output tree. Node 0 is the root; each voice walk opens
/// one `seq` scope under it.
#[derive(Debug, Clone, Serialize)]
pub struct TagTree {
    nodes: Vec<TagNode>,
    open: Vec<usize>,
}

impl TagTree {
    pub fn new() -> Self {
        TagTree {
            nodes: vec![TagNode { name: String::new(), params: Vec::new(), children: Vec::new() }],
            open: vec![0],
        }
    }

    fn add_node(&mut self, tag: &str, params: Vec<Param>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TagNode { name: tag.to_string(), params, children: Vec::new() });
        let parent = *self.open.last().expect("root scope always open");
        self.nodes[parent].children.push(id);
        id
    }

    /// Number of nodes excluding the root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf/tag names in emission order, for tests and diagnostics
    pub fn flat_names(&self) -> Vec<&str> {
        fn walk<'a>(tree: &'a TagTree, id: usize, out: &mut Vec<&'a str>) {
            if id != 0 {
                out.push(tree.nodes[id].name.as_str());
            }
            for &c in &tree.nodes[id].children {
                walk(tree, c, out);
            }
        }
        let mut out = Vec::new();
        walk(self, 0, &mut out);
        out
    }

    /// Render the tree to the target notation's textual form
    pub fn render(&self) -> String {
        let root = &self.nodes[0];
        let voices: Vec<String> = root.children.iter().map(|&c| self.render_node(c)).collect();
        match voices.len() {
            0 => String::new(),
            1 => voices.into_iter().next().unwrap(),
            _ => format!("{{\n  {}\n}}", voices.join(",\n  ")),
        }
    }

    fn render_params(params: &[Param]) -> String {
        params
            .iter()
            .map(|p| {
                if p.quoted {
                    format!("\"{}\"", p.value)
                } else {
                    p.value.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_node(&self, id: usize) -> String {
        let node = &self.nodes[id];
        let children: Vec<String> = node.children.iter().map(|&c| self.render_node(c)).collect();
        let body = children.join(" ");
        let params = Self::render_params(&node.params);

        match node.name.as_str() {
            "seq" => format!("[ {} ]", body),
            "chord" => format!("{{ {} }}", body),
            COMMENT_TAG => format!("(* {} *)", params.trim_matches('"')),
            name if name.starts_with('\\') => {
                let mut s = name.to_string();
                if !params.is_empty() {
                    s.push_str(&format!("<{}>", params));
                }
                if !children.is_empty() {
                    s.push_str(&format!("({})", body));
                }
                s
            }
            name => {
                let mut s = name.to_string();
                if !params.is_empty() {
                    s.push_str(&format!("<{}>", params));
                }
                s
            }
        }
    }
}

impl Default for TagTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for TagTree {
    fn open_scope_with(&mut self, tag: &str, params: Vec<Param>) -> ScopeHandle {
        let id = self.add_node(tag, params);
        self.open.push(id);
        id
    }

    fn close_scope(&mut self, handle: ScopeHandle) -> Result<(), EngineError> {
        if self.open.len() <= 1 {
            return Err(EngineError::EmptyScopeStack("output"));
        }
        if *self.open.last().unwrap() != handle {
            return Err(EngineError::ScopeOrderViolation(handle));
        }
        self.open.pop();
        Ok(())
    }

    fn append_leaf(&mut self, tag: &str, params: Vec<Param>) {
        self.add_node(tag, params);
    }

    fn append_comment(&mut self, text: &str) {
        self.add_node(COMMENT_TAG, vec![Param::text(text)]);
    }

    fn current(&self) -> ScopeHandle {
        *self.open.last().expect("root scope always open")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_nest_and_render() {
        let mut tree = TagTree::new();
        let seq = tree.open_scope("seq");
        tree.append_leaf("\\clef", vec![Param::text("g2")]);
        let grace = tree.open_scope("\\grace");
        tree.append_leaf("d2*1/16", vec![]);
        tree.close_scope(grace).unwrap();
        tree.append_leaf("c1*1/4", vec![]);
        tree.close_scope(seq).unwrap();

        assert_eq!(tree.render(), "[ \\clef<\"g2\"> \\grace(d2*1/16) c1*1/4 ]");
    }

    #[test]
    fn out_of_order_close_is_an_engine_error() {
        let mut tree = TagTree::new();
        let outer = tree.open_scope("seq");
        let _inner = tree.open_scope("\\grace");
        assert!(matches!(
            tree.close_scope(outer),
            Err(EngineError::ScopeOrderViolation(_))
        ));
    }

    #[test]
    fn closing_the_root_is_an_engine_error() {
        let mut tree = TagTree::new();
        assert!(matches!(
            tree.close_scope(0),
            Err(EngineError::EmptyScopeStack(_))
        ));
    }

    #[test]
    fn multiple_voices_render_as_parallel_sequences() {
        let mut tree = TagTree::new();
        let v1 = tree.open_scope("seq");
        tree.append_leaf("c1*1/4", vec![]);
        tree.close_scope(v1).unwrap();
        let v2 = tree.open_scope("seq");
        tree.append_leaf("e1*1/4", vec![]);
        tree.close_scope(v2).unwrap();

        assert_eq!(tree.render(), "{\n  [ c1*1/4 ],\n  [ e1*1/4 ]\n}");
    }

    #[test]
    fn comment_rendering() {
        let mut tree = TagTree::new();
        let seq = tree.open_scope("seq");
        tree.append_comment("measure 2");
        tree.close_scope(seq).unwrap();
        assert_eq!(tree.render(), "[ (* measure 2 *) ]");
    }
}
