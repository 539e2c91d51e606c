//! Logging and debugging facilities for grwidget.
//!
//! This module provides:
//! - The `tracing` targets used throughout the crate
//! - Debug visualization for widget trees
//!
//! # Tracing Integration
//!
//! grwidget emits events through the `tracing` crate and never installs a
//! subscriber itself. To see them, install one in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("grwidget::queue=debug,grwidget::dispatch=trace")
//!     .init();
//! ```
//!
//! Dropped messages (queue full, mutex clash, no pointer capture owner) are
//! logged at `debug`; every delivery and queue operation at `trace`.
//!
//! # Debug Visualization
//!
//! ```
//! use grwidget::{Rectangle, Widget, WidgetTree};
//! use grwidget::logging::TreeDebug;
//!
//! let mut tree = WidgetTree::new();
//! let panel = tree.insert(Widget::new(Rectangle::new(0, 0, 99, 49)).with_name("panel"));
//! tree.attach(tree.root(), panel).unwrap();
//!
//! let dump = TreeDebug::new().format_subtree(&tree, tree.root());
//! assert!(dump.contains("panel"));
//! ```

use std::fmt::Write as FmtWrite;

use crate::tree::WidgetTree;
use crate::widget::WidgetId;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Widget tree structure changes.
    pub const TREE: &str = "grwidget::tree";
    /// Message queue operations.
    pub const QUEUE: &str = "grwidget::queue";
    /// Message delivery and pointer capture.
    pub const DISPATCH: &str = "grwidget::dispatch";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show widget ids.
    pub show_ids: bool,
    /// Whether to show bounding rectangles.
    pub show_rects: bool,
    /// Maximum depth to descend (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_rects: true,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_rects: false,
            ..Default::default()
        }
    }
}

/// Renders a widget subtree as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format `top` and its descendants, one widget per line.
    ///
    /// A stale handle produces an empty string.
    pub fn format_subtree(&self, tree: &WidgetTree, top: WidgetId) -> String {
        let mut output = String::new();
        if !tree.contains(top) {
            return output;
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|   ", "+-- ", "`-- "),
            TreeStyle::Unicode => (
                "\u{2502}   ",
                "\u{251c}\u{2500}\u{2500} ",
                "\u{2514}\u{2500}\u{2500} ",
            ),
        };

        // (widget, depth, is_last_child, indent drawn for the ancestors)
        let mut stack = vec![(top, 0usize, true, String::new())];
        while let Some((id, depth, is_last, indent)) = stack.pop() {
            output.push_str(&indent);
            if depth > 0 {
                output.push_str(if is_last { corner } else { tee });
            }
            self.format_line(tree, id, &mut output);

            if self.options.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            let child_indent = match depth {
                0 => String::new(),
                _ if is_last => format!("{indent}    "),
                _ => format!("{indent}{branch}"),
            };
            let children = tree.children(id).collect::<Vec<_>>();
            let count = children.len();
            for (index, child) in children.into_iter().enumerate().rev() {
                stack.push((child, depth + 1, index + 1 == count, child_indent.clone()));
            }
        }

        output
    }

    fn format_line(&self, tree: &WidgetTree, id: WidgetId, output: &mut String) {
        let name = tree.name(id).unwrap_or_default();
        output.push_str(if name.is_empty() { "(unnamed)" } else { name });

        if self.options.show_ids {
            let _ = write!(output, " [{id:?}]");
        }
        if self.options.show_rects {
            if let Ok(rect) = tree.rect(id) {
                let _ = write!(
                    output,
                    " ({},{})-({},{})",
                    rect.x_min, rect.y_min, rect.x_max, rect.y_max
                );
            }
        }
        if tree.pointer_capture() == Some(id) {
            output.push_str(" *captured*");
        }
        output.push('\n');
    }
}
