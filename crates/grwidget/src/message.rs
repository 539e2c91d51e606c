//! Message kinds and delivery options.
//!
//! A [`Message`] is a kind tag plus two opaque 32-bit parameters. Pointer
//! messages carry the X and Y coordinates as the two parameters; key messages
//! carry whatever identifier the sending driver chooses in the first.
//!
//! How a message travels through the tree is described separately by
//! [`Delivery`], which pairs a [`TraversalOrder`] with the stop-on-success
//! flag.

use std::fmt;

/// The kind of a widget message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Draw the widget.
    Paint = 1,
    /// The pointer went down at (param1, param2).
    PointerDown = 2,
    /// The pointer moved to (param1, param2) while down.
    PointerMove = 3,
    /// The pointer was released at (param1, param2).
    PointerUp = 4,
    /// The "up" key was pressed.
    KeyUp = 5,
    /// The "down" key was pressed.
    KeyDown = 6,
    /// The "left" key was pressed.
    KeyLeft = 7,
    /// The "right" key was pressed.
    KeyRight = 8,
    /// The "select" key was pressed.
    KeySelect = 9,
}

impl MessageKind {
    /// The numeric message code.
    #[inline]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Map a numeric message code back to its kind.
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Paint),
            2 => Some(Self::PointerDown),
            3 => Some(Self::PointerMove),
            4 => Some(Self::PointerUp),
            5 => Some(Self::KeyUp),
            6 => Some(Self::KeyDown),
            7 => Some(Self::KeyLeft),
            8 => Some(Self::KeyRight),
            9 => Some(Self::KeySelect),
            _ => None,
        }
    }

    /// Check if this is one of the three pointer messages.
    #[inline]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Self::PointerDown | Self::PointerMove | Self::PointerUp)
    }

    /// Check if this is one of the five key messages.
    #[inline]
    pub const fn is_key(self) -> bool {
        matches!(
            self,
            Self::KeyUp | Self::KeyDown | Self::KeyLeft | Self::KeyRight | Self::KeySelect
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Paint => "paint",
            Self::PointerDown => "pointer-down",
            Self::PointerMove => "pointer-move",
            Self::PointerUp => "pointer-up",
            Self::KeyUp => "key-up",
            Self::KeyDown => "key-down",
            Self::KeyLeft => "key-left",
            Self::KeyRight => "key-right",
            Self::KeySelect => "key-select",
        };
        f.write_str(name)
    }
}

/// A message delivered to widget handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    /// What happened.
    pub kind: MessageKind,
    /// First opaque parameter.
    pub param1: u32,
    /// Second opaque parameter.
    pub param2: u32,
}

impl Message {
    /// Create a message with explicit parameters.
    #[inline]
    pub const fn new(kind: MessageKind, param1: u32, param2: u32) -> Self {
        Self {
            kind,
            param1,
            param2,
        }
    }

    /// Create a paint message.
    #[inline]
    pub const fn paint() -> Self {
        Self::new(MessageKind::Paint, 0, 0)
    }

    /// Create a pointer message at screen coordinates `(x, y)`.
    ///
    /// The coordinates are stored bit-for-bit in the two parameters, so
    /// negative positions survive the round trip through
    /// [`pointer_position`](Self::pointer_position).
    #[inline]
    pub const fn pointer(kind: MessageKind, x: i32, y: i32) -> Self {
        Self::new(kind, x as u32, y as u32)
    }

    /// Create a key message carrying a caller-chosen identifier.
    #[inline]
    pub const fn key(kind: MessageKind, param1: u32) -> Self {
        Self::new(kind, param1, 0)
    }

    /// Interpret the parameters as pointer coordinates.
    #[inline]
    pub const fn pointer_position(&self) -> (i32, i32) {
        (self.param1 as i32, self.param2 as i32)
    }
}

/// The order in which a message visits a widget subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraversalOrder {
    /// A widget is visited before its children.
    #[default]
    PreOrder,
    /// A widget's children are visited before the widget.
    PostOrder,
}

/// How a queued message is delivered once it leaves the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Delivery {
    /// Traversal order through the target subtree.
    pub order: TraversalOrder,
    /// Stop at the first handler that returns non-zero.
    pub stop_on_success: bool,
}

impl Delivery {
    /// Pre-order broadcast, used for painting: containers draw before their
    /// contents and every widget sees the message.
    pub const PAINT: Self = Self {
        order: TraversalOrder::PreOrder,
        stop_on_success: false,
    };

    /// Post-order, stop on the first widget that claims the message. Used for
    /// pointer input so the innermost widget gets the first chance.
    pub const POINTER: Self = Self {
        order: TraversalOrder::PostOrder,
        stop_on_success: true,
    };

    /// Create a delivery mode.
    #[inline]
    pub const fn new(order: TraversalOrder, stop_on_success: bool) -> Self {
        Self {
            order,
            stop_on_success,
        }
    }
}
