//! Message delivery over a widget subtree.
//!
//! Two depth-first traversals are provided, both iterative so deep trees do
//! not grow the call stack:
//!
//! - **Pre-order** ([`WidgetTree::send_pre_order`]) visits a widget before its
//!   children. Paint uses it so containers fill their background before their
//!   contents draw on top.
//! - **Post-order** ([`WidgetTree::send_post_order`]) visits children before
//!   their parent, giving the innermost widget the first chance at pointer
//!   input. Pointer-move and pointer-up skip the traversal and go straight to
//!   the widget holding pointer capture.
//!
//! Traversal covers the target widget and its descendants. With
//! stop-on-success, the first non-zero handler result ends the traversal and
//! is returned; otherwise the send returns 0.
//!
//! # Tree mutation during delivery
//!
//! Handlers receive mutable access to the tree and may attach, detach or
//! destroy widgets, including themselves. A send records the visit order of
//! the subtree before the first handler runs and walks that list, never the
//! live links. Before each call the widget is checked, through its parent
//! links, to still be inside the subtree; widgets that have left it or been
//! destroyed are skipped. Every widget is therefore visited at most once per
//! send, a widget moved elsewhere inside the subtree is visited at its
//! original position, and widgets attached after the send started wait for
//! the next one.

use crate::geometry::Rectangle;
use crate::logging::targets;
use crate::message::{Delivery, Message, MessageKind, TraversalOrder};
use crate::queue::MessageQueue;
use crate::tree::WidgetTree;
use crate::widget::{DisplayId, WidgetId};

/// What a handler can see and touch while processing a message.
pub struct MessageContext<'a> {
    tree: &'a mut WidgetTree,
    queue: Option<&'a MessageQueue>,
    widget: WidgetId,
}

impl<'a> MessageContext<'a> {
    /// The widget receiving the message.
    #[inline]
    pub fn widget(&self) -> WidgetId {
        self.widget
    }

    /// The receiving widget's bounds.
    pub fn rect(&self) -> Rectangle {
        self.tree.rect(self.widget).unwrap_or_default()
    }

    /// The display the receiving widget draws on.
    pub fn display(&self) -> Option<DisplayId> {
        self.tree.display(self.widget).ok().flatten()
    }

    /// Read access to the whole tree.
    #[inline]
    pub fn tree(&self) -> &WidgetTree {
        self.tree
    }

    /// Mutable access to the whole tree, for attaching and detaching widgets.
    #[inline]
    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        self.tree
    }

    /// The message queue, when the message arrived through one.
    ///
    /// Synchronous sends made directly on a [`WidgetTree`] have no queue.
    #[inline]
    pub fn queue(&self) -> Option<&'a MessageQueue> {
        self.queue
    }

    /// Synchronously send a message pre-order to another subtree.
    pub fn send_pre_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.tree
            .deliver_pre_order(widget, message, stop_on_success, self.queue)
    }

    /// Synchronously send a message post-order to another subtree.
    pub fn send_post_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.tree
            .deliver_post_order(widget, message, stop_on_success, self.queue)
    }
}

impl WidgetTree {
    /// Send a message to `widget` and its descendants, parents first.
    ///
    /// Returns the first non-zero handler result when `stop_on_success` is
    /// set, or 0.
    pub fn send_pre_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.deliver_pre_order(widget, message, stop_on_success, None)
    }

    /// Send a message to `widget` and its descendants, children first.
    ///
    /// Pointer-move and pointer-up go only to the widget holding pointer
    /// capture and are dropped when nothing holds it; pointer-up releases
    /// capture. For pointer-down, the first widget returning non-zero takes
    /// capture, provided it is still attached under the root once its handler
    /// returns.
    pub fn send_post_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.deliver_post_order(widget, message, stop_on_success, None)
    }

    /// Deliver a message using a stored delivery mode.
    pub(crate) fn deliver(
        &mut self,
        widget: WidgetId,
        message: Message,
        delivery: Delivery,
        queue: Option<&MessageQueue>,
    ) -> u32 {
        match delivery.order {
            TraversalOrder::PreOrder => {
                self.deliver_pre_order(widget, message, delivery.stop_on_success, queue)
            }
            TraversalOrder::PostOrder => {
                self.deliver_post_order(widget, message, delivery.stop_on_success, queue)
            }
        }
    }

    fn deliver_pre_order(
        &mut self,
        top: WidgetId,
        message: Message,
        stop_on_success: bool,
        queue: Option<&MessageQueue>,
    ) -> u32 {
        if !self.contains(top) {
            tracing::debug!(
                target: targets::DISPATCH,
                widget = ?top,
                kind = %message.kind,
                "target widget no longer exists"
            );
            return 0;
        }

        let visits = self.pre_order_visits(top);
        self.deliver_each(
            top,
            &visits,
            TraversalOrder::PreOrder,
            message,
            stop_on_success,
            queue,
        )
    }

    fn deliver_post_order(
        &mut self,
        top: WidgetId,
        message: Message,
        stop_on_success: bool,
        queue: Option<&MessageQueue>,
    ) -> u32 {
        if matches!(message.kind, MessageKind::PointerMove | MessageKind::PointerUp) {
            return self.deliver_to_capture(message, queue);
        }

        if !self.contains(top) {
            tracing::debug!(
                target: targets::DISPATCH,
                widget = ?top,
                kind = %message.kind,
                "target widget no longer exists"
            );
            return 0;
        }

        let visits = self.post_order_visits(top);
        self.deliver_each(
            top,
            &visits,
            TraversalOrder::PostOrder,
            message,
            stop_on_success,
            queue,
        )
    }

    /// Invoke each widget in `visits` that is still inside `top`.
    fn deliver_each(
        &mut self,
        top: WidgetId,
        visits: &[WidgetId],
        order: TraversalOrder,
        message: Message,
        stop_on_success: bool,
        queue: Option<&MessageQueue>,
    ) -> u32 {
        for &widget in visits {
            if !self.is_within(top, widget) {
                tracing::debug!(
                    target: targets::DISPATCH,
                    ?widget,
                    ?order,
                    "widget left the subtree during delivery, skipped"
                );
                continue;
            }

            let result = self.invoke(widget, message, queue);

            if order == TraversalOrder::PostOrder
                && message.kind == MessageKind::PointerDown
                && result != 0
            {
                // A widget that detached itself while handling the press does
                // not get the rest of the gesture.
                if self.is_in_tree(self.root(), widget) {
                    tracing::debug!(target: targets::DISPATCH, ?widget, "pointer captured");
                    self.pointer_capture = Some(widget);
                } else {
                    self.pointer_capture = None;
                }
            }

            if result != 0 && stop_on_success {
                return result;
            }
        }

        0
    }

    fn deliver_to_capture(&mut self, message: Message, queue: Option<&MessageQueue>) -> u32 {
        let Some(captured) = self.pointer_capture else {
            tracing::debug!(
                target: targets::DISPATCH,
                kind = %message.kind,
                "no widget holds pointer capture, message dropped"
            );
            return 0;
        };

        let result = self.invoke(captured, message, queue);
        if message.kind == MessageKind::PointerUp {
            tracing::debug!(
                target: targets::DISPATCH,
                widget = ?captured,
                "pointer capture released"
            );
            self.pointer_capture = None;
        }
        result
    }

    /// Run one widget's handler.
    ///
    /// The handler is moved out of its slot for the duration of the call so it
    /// can borrow the tree mutably. A message reaching the same widget again
    /// while its handler is running gets 0.
    fn invoke(&mut self, widget: WidgetId, message: Message, queue: Option<&MessageQueue>) -> u32 {
        let Some(mut handler) = self
            .nodes
            .get_mut(widget)
            .and_then(|node| node.handler.take())
        else {
            tracing::trace!(
                target: targets::DISPATCH,
                ?widget,
                kind = %message.kind,
                "handler busy or widget gone"
            );
            return 0;
        };

        let result = {
            let mut cx = MessageContext {
                tree: self,
                queue,
                widget,
            };
            handler.handle_message(&mut cx, message)
        };

        // The handler may have destroyed its own widget.
        if let Some(node) = self.nodes.get_mut(widget) {
            node.handler = Some(handler);
        }

        tracing::trace!(
            target: targets::DISPATCH,
            ?widget,
            kind = %message.kind,
            param1 = message.param1,
            param2 = message.param2,
            result,
            "delivered message"
        );
        result
    }

    /// `top` and its descendants, parents before children.
    fn pre_order_visits(&self, top: WidgetId) -> Vec<WidgetId> {
        let mut visits = Vec::new();
        let mut current = Some(top);
        while let Some(widget) = current {
            visits.push(widget);
            current = self
                .nodes
                .get(widget)
                .and_then(|node| node.first_child)
                .or_else(|| self.next_after_subtree(top, widget));
        }
        visits
    }

    /// `top` and its descendants, children before parents.
    fn post_order_visits(&self, top: WidgetId) -> Vec<WidgetId> {
        let mut visits = Vec::new();
        let mut current = Some(self.deepest_first_child(top));
        while let Some(widget) = current {
            visits.push(widget);
            if widget == top {
                break;
            }
            current = self.nodes.get(widget).and_then(|node| match node.next_sibling {
                Some(next) => Some(self.deepest_first_child(next)),
                None => node.parent,
            });
        }
        visits
    }

    /// Follow first-child links from `widget` down to a leaf.
    fn deepest_first_child(&self, widget: WidgetId) -> WidgetId {
        let mut current = widget;
        while let Some(child) = self.nodes.get(current).and_then(|node| node.first_child) {
            current = child;
        }
        current
    }

    /// The pre-order successor of `widget` once its subtree is done, without
    /// leaving `top`.
    fn next_after_subtree(&self, top: WidgetId, widget: WidgetId) -> Option<WidgetId> {
        let mut current = widget;
        loop {
            if current == top {
                return None;
            }
            let node = self.nodes.get(current)?;
            if let Some(next) = node.next_sibling {
                return Some(next);
            }
            current = node.parent?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::widget::Widget;

    type Log = Arc<Mutex<Vec<(String, MessageKind)>>>;

    /// Insert a widget that records every message and answers with `result`.
    fn recorder(tree: &mut WidgetTree, log: &Log, name: &str, result: u32) -> WidgetId {
        let log = Arc::clone(log);
        let label = name.to_string();
        tree.insert(
            Widget::new(Rectangle::ZERO)
                .with_name(name)
                .with_handler_fn(move |_cx, message| {
                    log.lock().push((label.clone(), message.kind));
                    result
                }),
        )
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// root -> [a -> [a1, a2], b]
    fn sample_tree(log: &Log) -> (WidgetTree, [WidgetId; 4]) {
        let mut tree = WidgetTree::new();
        let a = recorder(&mut tree, log, "a", 0);
        let a1 = recorder(&mut tree, log, "a1", 0);
        let a2 = recorder(&mut tree, log, "a2", 0);
        let b = recorder(&mut tree, log, "b", 0);
        tree.attach(tree.root(), a).unwrap();
        tree.attach(a, a1).unwrap();
        tree.attach(a, a2).unwrap();
        tree.attach(tree.root(), b).unwrap();
        (tree, [a, a1, a2, b])
    }

    #[test]
    fn test_pre_order_visits_parents_first() {
        let log = Log::default();
        let (mut tree, _) = sample_tree(&log);
        let root = tree.root();

        assert_eq!(tree.send_pre_order(root, Message::paint(), false), 0);
        assert_eq!(names(&log), ["a", "a1", "a2", "b"]);
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let log = Log::default();
        let (mut tree, _) = sample_tree(&log);
        let root = tree.root();

        tree.send_post_order(root, Message::key(MessageKind::KeySelect, 0), false);
        assert_eq!(names(&log), ["a1", "a2", "a", "b"]);
    }

    #[test]
    fn test_send_is_bounded_to_subtree() {
        let log = Log::default();
        let (mut tree, [a, ..]) = sample_tree(&log);

        tree.send_pre_order(a, Message::paint(), false);
        assert_eq!(names(&log), ["a", "a1", "a2"]);

        log.lock().clear();
        tree.send_post_order(a, Message::paint(), false);
        assert_eq!(names(&log), ["a1", "a2", "a"]);
    }

    #[test]
    fn test_stop_on_success_returns_first_result() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let first = recorder(&mut tree, &log, "first", 0);
        let claimer = recorder(&mut tree, &log, "claimer", 7);
        let last = recorder(&mut tree, &log, "last", 9);
        for id in [first, claimer, last] {
            tree.attach(tree.root(), id).unwrap();
        }
        let root = tree.root();

        assert_eq!(tree.send_pre_order(root, Message::paint(), true), 7);
        assert_eq!(names(&log), ["first", "claimer"]);

        log.lock().clear();
        assert_eq!(tree.send_pre_order(root, Message::paint(), false), 0);
        assert_eq!(names(&log), ["first", "claimer", "last"]);
    }

    #[test]
    fn test_pre_order_survives_self_detach() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let log_clone = Arc::clone(&log);
        let vanishing = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("vanishing".into(), message.kind));
                let me = cx.widget();
                cx.tree_mut().detach(me);
                0
            },
        ));
        let child = recorder(&mut tree, &log, "child", 0);
        let sibling = recorder(&mut tree, &log, "sibling", 0);
        tree.attach(tree.root(), vanishing).unwrap();
        tree.attach(vanishing, child).unwrap();
        tree.attach(tree.root(), sibling).unwrap();
        let root = tree.root();

        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["vanishing", "sibling"]);
    }

    #[test]
    fn test_pre_order_skips_sibling_detached_by_handler() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let doomed = recorder(&mut tree, &log, "doomed", 0);
        let log_clone = Arc::clone(&log);
        let remover = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("remover".into(), message.kind));
                cx.tree_mut().detach(doomed);
                0
            },
        ));
        let tail = recorder(&mut tree, &log, "tail", 0);
        tree.attach(tree.root(), remover).unwrap();
        tree.attach(tree.root(), doomed).unwrap();
        tree.attach(tree.root(), tail).unwrap();
        let root = tree.root();

        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["remover", "tail"]);
    }

    /// root -> [a, b, c], where `a` moves itself to the end of the root's
    /// children when handling any message.
    fn raise_to_end_tree(log: &Log) -> WidgetTree {
        let mut tree = WidgetTree::new();
        let log_clone = Arc::clone(log);
        let a = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("a".into(), message.kind));
                let me = cx.widget();
                let root = cx.tree().root();
                cx.tree_mut().detach(me);
                cx.tree_mut().attach(root, me).unwrap();
                0
            },
        ));
        let b = recorder(&mut tree, log, "b", 0);
        let c = recorder(&mut tree, log, "c", 0);
        for id in [a, b, c] {
            tree.attach(tree.root(), id).unwrap();
        }
        tree
    }

    #[test]
    fn test_pre_order_survives_raise_to_end() {
        let log = Log::default();
        let mut tree = raise_to_end_tree(&log);
        let root = tree.root();

        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["a", "b", "c"]);
    }

    #[test]
    fn test_post_order_survives_raise_to_end() {
        let log = Log::default();
        let mut tree = raise_to_end_tree(&log);
        let root = tree.root();

        tree.send_post_order(root, Message::key(MessageKind::KeySelect, 0), false);
        assert_eq!(names(&log), ["a", "b", "c"]);

        // The new order holds for the next send.
        log.lock().clear();
        tree.send_post_order(root, Message::key(MessageKind::KeySelect, 0), false);
        assert_eq!(names(&log), ["b", "c", "a"]);
    }

    #[test]
    fn test_detaching_self_and_next_sibling_keeps_later_siblings() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let b = recorder(&mut tree, &log, "b", 0);
        let c = recorder(&mut tree, &log, "c", 0);
        let log_clone = Arc::clone(&log);
        let a = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("a".into(), message.kind));
                let me = cx.widget();
                cx.tree_mut().detach(me);
                cx.tree_mut().detach(b);
                0
            },
        ));
        for id in [a, b, c] {
            tree.attach(tree.root(), id).unwrap();
        }
        let root = tree.root();

        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["a", "c"]);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![c]);
    }

    #[test]
    fn test_widget_attached_during_send_waits_for_next_send() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let late = recorder(&mut tree, &log, "late", 0);
        let log_clone = Arc::clone(&log);
        let spawner = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("spawner".into(), message.kind));
                let me = cx.widget();
                cx.tree_mut().attach(me, late).unwrap();
                0
            },
        ));
        tree.attach(tree.root(), spawner).unwrap();
        let root = tree.root();

        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["spawner"]);

        log.lock().clear();
        tree.send_pre_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["spawner", "late"]);
    }

    #[test]
    fn test_post_order_survives_self_destroy() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let holder = recorder(&mut tree, &log, "holder", 0);
        let log_clone = Arc::clone(&log);
        let vanishing = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(
            move |cx, message| {
                log_clone.lock().push(("vanishing".into(), message.kind));
                let me = cx.widget();
                cx.tree_mut().destroy(me).unwrap();
                0
            },
        ));
        let after = recorder(&mut tree, &log, "after", 0);
        tree.attach(tree.root(), holder).unwrap();
        tree.attach(holder, vanishing).unwrap();
        tree.attach(holder, after).unwrap();
        let root = tree.root();

        tree.send_post_order(root, Message::paint(), false);
        assert_eq!(names(&log), ["vanishing", "after", "holder"]);
        assert!(!tree.contains(vanishing));
    }

    #[test]
    fn test_pointer_down_capture_requires_widget_in_tree() {
        let mut tree = WidgetTree::new();
        let quitter = tree.insert(Widget::new(Rectangle::ZERO).with_handler_fn(|cx, _message| {
            let me = cx.widget();
            cx.tree_mut().detach(me);
            1
        }));
        tree.attach(tree.root(), quitter).unwrap();
        let root = tree.root();

        let press = Message::pointer(MessageKind::PointerDown, 1, 1);
        let result = tree.send_post_order(root, press, true);
        assert_eq!(result, 1);
        assert_eq!(tree.pointer_capture(), None);
    }

    #[test]
    fn test_nested_send_through_context() {
        let log = Log::default();
        let mut tree = WidgetTree::new();
        let target = recorder(&mut tree, &log, "target", 3);
        let relay = tree.insert(
            Widget::new(Rectangle::ZERO)
                .with_handler_fn(move |cx, message| cx.send_pre_order(target, message, true)),
        );
        tree.attach(tree.root(), relay).unwrap();

        assert_eq!(tree.send_pre_order(relay, Message::key(MessageKind::KeyUp, 0), true), 3);
        assert_eq!(names(&log), ["target"]);
    }
}
