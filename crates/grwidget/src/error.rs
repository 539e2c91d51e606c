//! Error types for grwidget.

use std::fmt;

/// The main error type for grwidget operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// Widget tree error.
    Tree(TreeError),
    /// Message queue error.
    Queue(QueueError),
    /// The requested queue capacity cannot hold a single message.
    InvalidQueueCapacity(usize),
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "Widget tree error: {err}"),
            Self::Queue(err) => write!(f, "Message queue error: {err}"),
            Self::InvalidQueueCapacity(capacity) => {
                write!(
                    f,
                    "Invalid queue capacity {capacity}: one slot is reserved, \
                     so at least 2 are required"
                )
            }
        }
    }
}

impl std::error::Error for WidgetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Queue(err) => Some(err),
            Self::InvalidQueueCapacity(_) => None,
        }
    }
}

/// Errors raised by widget tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The widget handle is stale or was never issued by this tree.
    InvalidWidgetId,
    /// Attaching would make a widget its own ancestor.
    CircularParentage,
    /// The root widget cannot be attached below another widget.
    RootNotAttachable,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWidgetId => write!(f, "Invalid or destroyed widget ID"),
            Self::CircularParentage => {
                write!(f, "Cannot attach a widget below itself or one of its descendants")
            }
            Self::RootNotAttachable => write!(f, "The root widget cannot be attached to a parent"),
        }
    }
}

impl std::error::Error for TreeError {}

/// Reasons a message was not added to the queue.
///
/// Both variants mean the message was dropped. Producers running in an
/// interrupting context are expected to discard the event rather than retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Every usable slot is occupied.
    Full,
    /// The queue mutex was held by another context.
    Busy,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "Message queue is full"),
            Self::Busy => write!(f, "Message queue is locked by another context"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<TreeError> for WidgetError {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

impl From<QueueError> for WidgetError {
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

/// Result type for widget tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// A specialized Result type for grwidget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;
