//! The widget tree.
//!
//! Widgets live in a [`SlotMap`] arena and are linked into a
//! parent / first-child / next-sibling forest by [`WidgetId`] handles. A
//! distinguished root widget is created with the tree; everything attached
//! below it, directly or indirectly, is "in the tree" for the purposes of
//! pointer capture and queued delivery.
//!
//! Widgets outside the root's subtree are still valid: a screen can be built
//! as a detached subtree and attached in one call, or detached again to swap
//! screens.
//!
//! # Related
//!
//! - [`crate::dispatch`] - Message delivery over this tree
//! - [`crate::WidgetContext`] - Owns a tree together with its message queue

use slotmap::SlotMap;

use crate::error::{TreeError, TreeResult};
use crate::geometry::Rectangle;
use crate::logging::targets;
use crate::widget::{DefaultHandler, DisplayId, Widget, WidgetId, WidgetNode};

/// An arena-backed widget forest with a root sentinel and pointer-capture
/// state.
pub struct WidgetTree {
    pub(crate) nodes: SlotMap<WidgetId, WidgetNode>,
    root: WidgetId,
    /// Widget owning the in-progress pointer gesture, if any.
    pub(crate) pointer_capture: Option<WidgetId>,
}

impl WidgetTree {
    /// Create a tree containing only the root widget.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(WidgetNode::from(
            Widget::new(Rectangle::ZERO)
                .with_name("root")
                .with_handler(DefaultHandler),
        ));
        Self {
            nodes,
            root,
            pointer_capture: None,
        }
    }

    /// The root widget. Use it as the target of tree-wide messages.
    #[inline]
    pub fn root(&self) -> WidgetId {
        self.root
    }

    /// Store a new widget in the arena.
    ///
    /// The widget starts outside the tree; call [`attach`](Self::attach) to
    /// link it in.
    pub fn insert(&mut self, widget: Widget) -> WidgetId {
        let id = self.nodes.insert(WidgetNode::from(widget));
        tracing::trace!(target: targets::TREE, ?id, "inserted widget");
        id
    }

    /// Check if the handle refers to a live widget.
    #[inline]
    pub fn contains(&self, id: WidgetId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of widgets in the arena, the root included.
    pub fn widget_count(&self) -> usize {
        self.nodes.len()
    }

    /// Append `widget` as the last child of `parent`.
    ///
    /// Attaching a widget that is already a child of `parent` does nothing.
    /// A widget attached elsewhere is first detached from its old parent. The
    /// widget keeps its own children, so a pre-built subtree attaches as a
    /// unit.
    pub fn attach(&mut self, parent: WidgetId, widget: WidgetId) -> TreeResult<()> {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(widget) {
            return Err(TreeError::InvalidWidgetId);
        }
        if widget == self.root {
            return Err(TreeError::RootNotAttachable);
        }
        if widget == parent || self.is_in_tree(widget, parent) {
            return Err(TreeError::CircularParentage);
        }

        // Walk to the end of the child chain, bailing out if the widget is
        // already there. A duplicate entry would loop delivery forever.
        let mut last = None;
        let mut cursor = self.nodes[parent].first_child;
        while let Some(child) = cursor {
            if child == widget {
                tracing::trace!(target: targets::TREE, ?parent, ?widget, "widget already attached");
                return Ok(());
            }
            last = Some(child);
            cursor = self.nodes[child].next_sibling;
        }

        if self.nodes[widget].parent.is_some() {
            self.detach(widget);
        }

        match last {
            Some(last) => self.nodes[last].next_sibling = Some(widget),
            None => self.nodes[parent].first_child = Some(widget),
        }
        let node = &mut self.nodes[widget];
        node.parent = Some(parent);
        node.next_sibling = None;

        tracing::trace!(target: targets::TREE, ?parent, ?widget, "attached widget");
        Ok(())
    }

    /// Remove `widget` from its parent's child chain.
    ///
    /// Returns `false` without changing anything if the widget has no parent
    /// or is not reachable from it. The widget keeps its children. If the
    /// pointer-capture owner is no longer reachable from the root afterwards,
    /// capture is released.
    pub fn detach(&mut self, widget: WidgetId) -> bool {
        let Some(parent) = self.nodes.get(widget).and_then(|node| node.parent) else {
            return false;
        };
        if !self.nodes.contains_key(parent) || !self.is_in_tree(parent, widget) {
            return false;
        }

        let next = self.nodes[widget].next_sibling;
        if self.nodes[parent].first_child == Some(widget) {
            self.nodes[parent].first_child = next;
        } else {
            let mut cursor = self.nodes[parent].first_child;
            while let Some(child) = cursor {
                if self.nodes[child].next_sibling == Some(widget) {
                    self.nodes[child].next_sibling = next;
                    break;
                }
                cursor = self.nodes[child].next_sibling;
            }
        }

        let node = &mut self.nodes[widget];
        node.next_sibling = None;
        node.parent = None;

        if let Some(captured) = self.pointer_capture {
            if !self.is_in_tree(self.root, captured) {
                tracing::debug!(
                    target: targets::TREE,
                    ?captured,
                    "pointer capture owner left the tree"
                );
                self.pointer_capture = None;
            }
        }

        tracing::trace!(target: targets::TREE, ?parent, ?widget, "detached widget");
        true
    }

    /// Detach `widget` and release it and all of its descendants from the
    /// arena.
    ///
    /// Returns the number of widgets destroyed.
    pub fn destroy(&mut self, widget: WidgetId) -> TreeResult<usize> {
        if widget == self.root {
            return Err(TreeError::RootNotAttachable);
        }
        if !self.nodes.contains_key(widget) {
            return Err(TreeError::InvalidWidgetId);
        }

        self.detach(widget);

        let mut doomed = vec![widget];
        let mut stack = self.children(widget).collect::<Vec<_>>();
        while let Some(id) = stack.pop() {
            stack.extend(self.children(id));
            doomed.push(id);
        }
        for id in &doomed {
            self.nodes.remove(*id);
        }
        if self.pointer_capture.is_some_and(|captured| !self.nodes.contains_key(captured)) {
            self.pointer_capture = None;
        }

        tracing::trace!(
            target: targets::TREE,
            ?widget,
            count = doomed.len(),
            "destroyed widget subtree"
        );
        Ok(doomed.len())
    }

    /// Check whether `find` is a descendant of `widget` at any depth.
    ///
    /// A widget is not its own descendant. The search walks the child and
    /// sibling links downward from `widget`, so it answers for the links as
    /// they are, independent of the parent back-links.
    pub fn is_in_tree(&self, widget: WidgetId, find: WidgetId) -> bool {
        let Some(start) = self.nodes.get(widget) else {
            return false;
        };
        let mut stack = Vec::new();
        stack.extend(start.first_child);
        while let Some(id) = stack.pop() {
            if id == find {
                return true;
            }
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.next_sibling);
                stack.extend(node.first_child);
            }
        }
        false
    }

    /// Check whether `widget` is `top` or sits below it, following parent
    /// links upward.
    pub(crate) fn is_within(&self, top: WidgetId, widget: WidgetId) -> bool {
        let mut current = Some(widget);
        while let Some(id) = current {
            if id == top {
                return true;
            }
            current = self.nodes.get(id).and_then(|node| node.parent);
        }
        false
    }

    /// The parent of a widget, or `None` for the root and detached widgets.
    pub fn parent(&self, widget: WidgetId) -> TreeResult<Option<WidgetId>> {
        self.node(widget).map(|node| node.parent)
    }

    /// The first child of a widget.
    pub fn first_child(&self, widget: WidgetId) -> TreeResult<Option<WidgetId>> {
        self.node(widget).map(|node| node.first_child)
    }

    /// The sibling following a widget in its parent's child chain.
    pub fn next_sibling(&self, widget: WidgetId) -> TreeResult<Option<WidgetId>> {
        self.node(widget).map(|node| node.next_sibling)
    }

    /// Iterate over the direct children of a widget in chain order.
    ///
    /// Yields nothing for a stale handle.
    pub fn children(&self, widget: WidgetId) -> Children<'_> {
        Children {
            tree: self,
            next: self.nodes.get(widget).and_then(|node| node.first_child),
        }
    }

    /// The bounding rectangle of a widget.
    pub fn rect(&self, widget: WidgetId) -> TreeResult<Rectangle> {
        self.node(widget).map(|node| node.rect)
    }

    /// Move or resize a widget.
    pub fn set_rect(&mut self, widget: WidgetId, rect: Rectangle) -> TreeResult<()> {
        self.node_mut(widget).map(|node| node.rect = rect)
    }

    /// The display a widget draws on.
    pub fn display(&self, widget: WidgetId) -> TreeResult<Option<DisplayId>> {
        self.node(widget).map(|node| node.display)
    }

    /// The name given to a widget at creation.
    pub fn name(&self, widget: WidgetId) -> TreeResult<&str> {
        self.node(widget).map(|node| node.name.as_str())
    }

    /// The widget currently owning the pointer gesture.
    #[inline]
    pub fn pointer_capture(&self) -> Option<WidgetId> {
        self.pointer_capture
    }

    fn node(&self, widget: WidgetId) -> TreeResult<&WidgetNode> {
        self.nodes.get(widget).ok_or(TreeError::InvalidWidgetId)
    }

    fn node_mut(&mut self, widget: WidgetId) -> TreeResult<&mut WidgetNode> {
        self.nodes.get_mut(widget).ok_or(TreeError::InvalidWidgetId)
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WidgetTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetTree")
            .field("root", &self.root)
            .field("widgets", &self.nodes.len())
            .field("pointer_capture", &self.pointer_capture)
            .finish()
    }
}

/// Iterator over the direct children of a widget.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    tree: &'a WidgetTree,
    next: Option<WidgetId>,
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        let current = self.next?;
        self.next = self.tree.nodes.get(current).and_then(|node| node.next_sibling);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut WidgetTree, name: &str) -> WidgetId {
        tree.insert(Widget::new(Rectangle::ZERO).with_name(name))
    }

    #[test]
    fn test_attach_appends_in_order() {
        let mut tree = WidgetTree::new();
        let a = leaf(&mut tree, "a");
        let b = leaf(&mut tree, "b");
        let c = leaf(&mut tree, "c");

        tree.attach(tree.root(), a).unwrap();
        tree.attach(tree.root(), b).unwrap();
        tree.attach(tree.root(), c).unwrap();

        assert_eq!(tree.children(tree.root()).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(tree.parent(b).unwrap(), Some(tree.root()));
    }

    #[test]
    fn test_attach_twice_is_noop() {
        let mut tree = WidgetTree::new();
        let a = leaf(&mut tree, "a");
        let b = leaf(&mut tree, "b");
        tree.attach(tree.root(), a).unwrap();
        tree.attach(tree.root(), b).unwrap();

        let before = tree.children(tree.root()).count();
        tree.attach(tree.root(), a).unwrap();
        tree.attach(tree.root(), b).unwrap();
        assert_eq!(tree.children(tree.root()).count(), before);
    }

    #[test]
    fn test_attach_moves_between_parents() {
        let mut tree = WidgetTree::new();
        let left = leaf(&mut tree, "left");
        let right = leaf(&mut tree, "right");
        let item = leaf(&mut tree, "item");
        tree.attach(tree.root(), left).unwrap();
        tree.attach(tree.root(), right).unwrap();

        tree.attach(left, item).unwrap();
        tree.attach(right, item).unwrap();

        assert_eq!(tree.children(left).count(), 0);
        assert_eq!(tree.children(right).collect::<Vec<_>>(), vec![item]);
    }

    #[test]
    fn test_circular_attach_rejected() {
        let mut tree = WidgetTree::new();
        let outer = leaf(&mut tree, "outer");
        let inner = leaf(&mut tree, "inner");
        tree.attach(outer, inner).unwrap();

        assert_eq!(tree.attach(inner, outer), Err(TreeError::CircularParentage));
        assert_eq!(tree.attach(outer, outer), Err(TreeError::CircularParentage));
        assert_eq!(tree.attach(outer, tree.root()), Err(TreeError::RootNotAttachable));
    }

    #[test]
    fn test_attach_prebuilt_subtree() {
        let mut tree = WidgetTree::new();
        let screen = leaf(&mut tree, "screen");
        let title = leaf(&mut tree, "title");
        let body = leaf(&mut tree, "body");
        tree.attach(screen, title).unwrap();
        tree.attach(screen, body).unwrap();
        assert!(!tree.is_in_tree(tree.root(), body));

        tree.attach(tree.root(), screen).unwrap();
        assert!(tree.is_in_tree(tree.root(), title));
        assert!(tree.is_in_tree(tree.root(), body));
    }

    #[test]
    fn test_detach_middle_child() {
        let mut tree = WidgetTree::new();
        let a = leaf(&mut tree, "a");
        let b = leaf(&mut tree, "b");
        let c = leaf(&mut tree, "c");
        let grandchild = leaf(&mut tree, "grandchild");
        tree.attach(tree.root(), a).unwrap();
        tree.attach(tree.root(), b).unwrap();
        tree.attach(tree.root(), c).unwrap();
        tree.attach(b, grandchild).unwrap();

        assert!(tree.detach(b));
        assert_eq!(tree.children(tree.root()).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.next_sibling(b).unwrap(), None);
        assert_eq!(tree.parent(b).unwrap(), None);
        // The subtree travels with the detached widget.
        assert_eq!(tree.first_child(b).unwrap(), Some(grandchild));
        assert!(!tree.is_in_tree(tree.root(), grandchild));
    }

    #[test]
    fn test_detach_without_parent_is_noop() {
        let mut tree = WidgetTree::new();
        let lonely = leaf(&mut tree, "lonely");
        assert!(!tree.detach(lonely));
        assert!(!tree.detach(tree.root()));
    }

    #[test]
    fn test_is_in_tree() {
        let mut tree = WidgetTree::new();
        let a = leaf(&mut tree, "a");
        let b = leaf(&mut tree, "b");
        let deep = leaf(&mut tree, "deep");
        tree.attach(tree.root(), a).unwrap();
        tree.attach(a, b).unwrap();
        tree.attach(b, deep).unwrap();

        assert!(tree.is_in_tree(tree.root(), deep));
        assert!(tree.is_in_tree(a, deep));
        assert!(!tree.is_in_tree(a, a));
        assert!(!tree.is_in_tree(deep, a));
    }

    #[test]
    fn test_destroy_releases_subtree() {
        let mut tree = WidgetTree::new();
        let panel = leaf(&mut tree, "panel");
        let label = leaf(&mut tree, "label");
        tree.attach(tree.root(), panel).unwrap();
        tree.attach(panel, label).unwrap();

        assert_eq!(tree.destroy(panel), Ok(2));
        assert!(!tree.contains(panel));
        assert!(!tree.contains(label));
        assert_eq!(tree.widget_count(), 1);
        assert_eq!(tree.children(tree.root()).count(), 0);
        assert_eq!(tree.attach(tree.root(), panel), Err(TreeError::InvalidWidgetId));
    }
}
