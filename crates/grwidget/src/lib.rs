//! Widget tree, message queue and dispatch core for small embedded displays.
//!
//! This crate provides the runtime underneath a retained-widget GUI:
//!
//! - **Widget Tree**: An arena of widgets linked parent / first-child /
//!   next-sibling, with a root widget created up front
//! - **Message Queue**: A fixed-capacity ring of pending messages that
//!   interrupting producers post to without ever blocking
//! - **Dispatcher**: Iterative pre-order and post-order delivery with
//!   stop-on-success
//! - **Pointer Capture**: The widget that accepts a pointer-down receives the
//!   rest of the gesture
//!
//! Concrete widgets (buttons, menus, charts) are out of scope; they plug in
//! through the [`MessageHandler`] trait.
//!
//! # Example
//!
//! ```
//! use grwidget::{Message, MessageKind, Rectangle, Widget, WidgetContext};
//! use grwidget::widget::default_handler;
//!
//! let mut context = WidgetContext::new();
//! let root = context.root();
//!
//! let slider = context.tree_mut().insert(
//!     Widget::new(Rectangle::new(0, 100, 319, 139))
//!         .with_name("slider")
//!         .with_handler_fn(|cx, message| match message.kind {
//!             MessageKind::PointerDown => {
//!                 let (x, y) = message.pointer_position();
//!                 u32::from(cx.rect().contains(x, y))
//!             }
//!             MessageKind::PointerMove | MessageKind::PointerUp => 1,
//!             _ => default_handler(cx, message),
//!         }),
//! );
//! context.attach(root, slider).unwrap();
//!
//! // Paint everything, then feed a drag gesture through the queue.
//! context.paint(root).unwrap();
//! context.pointer_message(MessageKind::PointerDown, 10, 120).unwrap();
//! context.pointer_message(MessageKind::PointerMove, 40, 300).unwrap();
//! context.pointer_message(MessageKind::PointerUp, 45, 300).unwrap();
//! assert_eq!(context.process_queue(), 4);
//!
//! // Capture was released by the pointer-up.
//! assert_eq!(context.tree().pointer_capture(), None);
//! ```

mod context;
pub mod dispatch;
mod error;
pub mod geometry;
pub mod logging;
pub mod message;
pub mod mutex;
pub mod queue;
pub mod tree;
pub mod widget;

pub use context::{ContextBuilder, ContextConfig, WidgetContext};
pub use dispatch::MessageContext;
pub use error::{QueueError, Result, TreeError, TreeResult, WidgetError};
pub use geometry::Rectangle;
pub use logging::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use message::{Delivery, Message, MessageKind, TraversalOrder};
pub use mutex::{WidgetMutex, WidgetMutexGuard};
pub use queue::{MessageQueue, QueueStats, QueuedMessage, DEFAULT_QUEUE_CAPACITY};
pub use tree::{Children, WidgetTree};
pub use widget::{DefaultHandler, DisplayId, MessageHandler, Widget, WidgetId};
