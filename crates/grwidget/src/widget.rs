//! Widget handles, node records and the message handler capability.
//!
//! Every widget in a [`WidgetTree`](crate::WidgetTree) is an arena slot
//! holding a bounding [`Rectangle`], an optional display link, the navigation
//! links and one boxed [`MessageHandler`]. Applications describe a widget with
//! [`Widget`] and hand it to [`WidgetTree::insert`](crate::WidgetTree::insert),
//! which returns the stable [`WidgetId`] used by every other operation.
//!
//! # Example
//!
//! ```
//! use grwidget::{Message, MessageContext, MessageKind, Rectangle, Widget, WidgetTree};
//! use grwidget::widget::default_handler;
//!
//! let mut tree = WidgetTree::new();
//! let button = tree.insert(
//!     Widget::new(Rectangle::new(0, 0, 39, 19))
//!         .with_name("button")
//!         .with_handler_fn(|cx, message| match message.kind {
//!             MessageKind::PointerDown => {
//!                 let (x, y) = message.pointer_position();
//!                 u32::from(cx.rect().contains(x, y))
//!             }
//!             _ => default_handler(cx, message),
//!         }),
//! );
//! tree.attach(tree.root(), button).unwrap();
//! ```

use slotmap::new_key_type;

use crate::dispatch::MessageContext;
use crate::geometry::Rectangle;
use crate::message::Message;

new_key_type! {
    /// A stable handle to a widget stored in a [`WidgetTree`](crate::WidgetTree).
    ///
    /// Handles survive attach and detach. They become invalid only when the
    /// widget is destroyed.
    pub struct WidgetId;
}

impl WidgetId {
    /// Convert the id to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Identifies the display surface a widget draws on.
///
/// The core never touches the display; it only carries the link so handlers
/// can find their drawing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u32);

/// The capability every widget provides: process a message, return a result.
///
/// A non-zero result means "handled". During stop-on-success delivery the
/// first non-zero result ends the traversal and becomes the result of the
/// send. Unrecognized messages should be forwarded to [`default_handler`].
///
/// Closures of the form `FnMut(&mut MessageContext<'_>, Message) -> u32`
/// implement this trait directly.
pub trait MessageHandler: Send {
    /// Handle a message sent to the widget described by `cx`.
    fn handle_message(&mut self, cx: &mut MessageContext<'_>, message: Message) -> u32;
}

impl<F> MessageHandler for F
where
    F: FnMut(&mut MessageContext<'_>, Message) -> u32 + Send,
{
    fn handle_message(&mut self, cx: &mut MessageContext<'_>, message: Message) -> u32 {
        self(cx, message)
    }
}

/// The handler every widget chains to for messages it does not recognize.
///
/// Returns 0 ("not handled") for every message.
#[inline]
pub fn default_handler(_cx: &mut MessageContext<'_>, _message: Message) -> u32 {
    0
}

/// A handler that ignores every message. Used by the root widget.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl MessageHandler for DefaultHandler {
    fn handle_message(&mut self, cx: &mut MessageContext<'_>, message: Message) -> u32 {
        default_handler(cx, message)
    }
}

/// Initialization record for a widget, consumed by
/// [`WidgetTree::insert`](crate::WidgetTree::insert).
pub struct Widget {
    pub(crate) name: String,
    pub(crate) rect: Rectangle,
    pub(crate) display: Option<DisplayId>,
    pub(crate) handler: Box<dyn MessageHandler>,
}

impl Widget {
    /// Describe a widget with the given bounds and the default handler.
    pub fn new(rect: Rectangle) -> Self {
        Self {
            name: String::new(),
            rect,
            display: None,
            handler: Box::new(DefaultHandler),
        }
    }

    /// Set a name used in tree dumps and log output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Link the widget to a display surface.
    pub fn with_display(mut self, display: DisplayId) -> Self {
        self.display = Some(display);
        self
    }

    /// Install a message handler.
    pub fn with_handler<H: MessageHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Box::new(handler);
        self
    }

    /// Install a closure as the message handler.
    pub fn with_handler_fn<F>(self, handler: F) -> Self
    where
        F: FnMut(&mut MessageContext<'_>, Message) -> u32 + Send + 'static,
    {
        self.with_handler(handler)
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("rect", &self.rect)
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

/// Arena record for one widget.
pub(crate) struct WidgetNode {
    pub(crate) name: String,
    pub(crate) rect: Rectangle,
    pub(crate) display: Option<DisplayId>,
    /// `None` while the handler is running.
    pub(crate) handler: Option<Box<dyn MessageHandler>>,
    pub(crate) parent: Option<WidgetId>,
    pub(crate) first_child: Option<WidgetId>,
    pub(crate) next_sibling: Option<WidgetId>,
}

impl From<Widget> for WidgetNode {
    fn from(widget: Widget) -> Self {
        Self {
            name: widget.name,
            rect: widget.rect,
            display: widget.display,
            handler: Some(widget.handler),
            parent: None,
            first_child: None,
            next_sibling: None,
        }
    }
}
