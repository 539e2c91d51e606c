//! The widget context: one tree, one message queue.
//!
//! [`WidgetContext`] owns everything the dispatch core needs at runtime: the
//! widget tree with its root and pointer-capture state, and the message queue.
//! Applications build one at startup and drive it from their main loop:
//!
//! ```
//! use grwidget::{Message, MessageKind, Rectangle, Widget, WidgetContext};
//!
//! let mut context = WidgetContext::builder()
//!     .name("main-screen")
//!     .queue_capacity(32)
//!     .build()
//!     .unwrap();
//!
//! let button = context.tree_mut().insert(
//!     Widget::new(Rectangle::new(0, 0, 59, 29))
//!         .with_handler_fn(|cx, message| match message.kind {
//!             MessageKind::PointerDown => {
//!                 let (x, y) = message.pointer_position();
//!                 u32::from(cx.rect().contains(x, y))
//!             }
//!             _ => 0,
//!         }),
//! );
//! let root = context.root();
//! context.attach(root, button).unwrap();
//!
//! // A touch driver, possibly on another thread, posts through the queue.
//! let queue = context.queue();
//! let press = Message::pointer(MessageKind::PointerDown, 10, 10);
//! queue.post(root, press, grwidget::Delivery::POINTER).unwrap();
//!
//! // The main loop drains it.
//! assert_eq!(context.process_queue(), 1);
//! assert_eq!(context.tree().pointer_capture(), Some(button));
//! ```

use std::sync::Arc;

use crate::error::{QueueError, Result, TreeResult};
use crate::logging::targets;
use crate::message::{Delivery, Message, MessageKind};
use crate::queue::{DEFAULT_QUEUE_CAPACITY, MessageQueue};
use crate::tree::WidgetTree;
use crate::widget::WidgetId;

/// Configuration for a [`WidgetContext`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Name recorded on log spans.
    pub name: String,
    /// Number of queue slots. One is always kept free, so this must be at
    /// least 2.
    pub queue_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: "grwidget".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Builder for creating a [`WidgetContext`] with custom configuration.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name recorded on log spans.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the number of queue slots.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Build the context.
    ///
    /// Fails if the queue capacity is below 2.
    pub fn build(self) -> Result<WidgetContext> {
        WidgetContext::with_config(self.config)
    }
}

/// Owns a widget tree and the message queue that feeds it.
pub struct WidgetContext {
    name: String,
    tree: WidgetTree,
    queue: Arc<MessageQueue>,
}

static_assertions::assert_impl_all!(WidgetContext: Send);

impl WidgetContext {
    /// Create a context with the default configuration.
    pub fn new() -> Self {
        Self {
            name: ContextConfig::default().name,
            tree: WidgetTree::new(),
            queue: Arc::new(MessageQueue::default()),
        }
    }

    /// Start building a context with custom configuration.
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Create a context from an explicit configuration.
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        let queue = MessageQueue::new(config.queue_capacity)?;
        tracing::debug!(
            target: targets::QUEUE,
            name = %config.name,
            capacity = config.queue_capacity,
            "created widget context"
        );
        Ok(Self {
            name: config.name,
            tree: WidgetTree::new(),
            queue: Arc::new(queue),
        })
    }

    /// The context's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The widget tree.
    #[inline]
    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    /// Mutable access to the widget tree.
    #[inline]
    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut self.tree
    }

    /// The root widget.
    #[inline]
    pub fn root(&self) -> WidgetId {
        self.tree.root()
    }

    /// A shared handle to the queue for producer contexts.
    ///
    /// Producers may post through the handle at any time. Only this context
    /// drains it.
    pub fn queue(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.queue)
    }

    /// Attach `widget` as the last child of `parent`.
    pub fn attach(&mut self, parent: WidgetId, widget: WidgetId) -> TreeResult<()> {
        self.tree.attach(parent, widget)
    }

    /// Detach `widget` from its parent.
    pub fn detach(&mut self, widget: WidgetId) -> bool {
        self.tree.detach(widget)
    }

    /// Queue a message for the subtree rooted at `target`.
    pub fn enqueue(
        &self,
        target: WidgetId,
        message: Message,
        delivery: Delivery,
    ) -> std::result::Result<(), QueueError> {
        self.queue.post(target, message, delivery)
    }

    /// Queue a paint of `widget` and everything below it.
    pub fn paint(&self, widget: WidgetId) -> std::result::Result<(), QueueError> {
        self.enqueue(widget, Message::paint(), Delivery::PAINT)
    }

    /// Queue a pointer message for the whole tree.
    ///
    /// This is the entry point for touch-screen and mouse drivers: the message
    /// goes to the root, post-order, stopping at the first widget that claims
    /// it.
    pub fn pointer_message(
        &self,
        kind: MessageKind,
        x: i32,
        y: i32,
    ) -> std::result::Result<(), QueueError> {
        debug_assert!(kind.is_pointer(), "{kind} is not a pointer message");
        self.enqueue(self.root(), Message::pointer(kind, x, y), Delivery::POINTER)
    }

    /// Deliver a message immediately, parents first. See
    /// [`WidgetTree::send_pre_order`].
    pub fn send_pre_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.tree.send_pre_order(widget, message, stop_on_success)
    }

    /// Deliver a message immediately, children first. See
    /// [`WidgetTree::send_post_order`].
    pub fn send_post_order(
        &mut self,
        widget: WidgetId,
        message: Message,
        stop_on_success: bool,
    ) -> u32 {
        self.tree.send_post_order(widget, message, stop_on_success)
    }

    /// Deliver queued messages until the queue is empty.
    ///
    /// Messages posted while draining, by handlers or by other contexts, are
    /// delivered in the same call. Returns the number of messages delivered.
    #[tracing::instrument(
        skip(self),
        fields(context = %self.name),
        target = "grwidget::queue",
        level = "trace"
    )]
    pub fn process_queue(&mut self) -> usize {
        let queue = Arc::clone(&self.queue);
        let mut delivered = 0;
        while let Some(queued) = queue.pop() {
            tracing::trace!(
                target: targets::QUEUE,
                target_widget = ?queued.target,
                kind = %queued.message.kind,
                "delivering queued message"
            );
            self.tree.deliver(
                queued.target,
                queued.message,
                queued.delivery,
                Some(queue.as_ref()),
            );
            delivered += 1;
        }
        delivered
    }
}

impl Default for WidgetContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetContext")
            .field("name", &self.name)
            .field("tree", &self.tree)
            .field("queue", &self.queue)
            .finish()
    }
}
