//! A simulated touch driver feeding a slider through the message queue.
//!
//! A background thread plays the role of a touch-screen interrupt, posting a
//! drag gesture far faster than the main loop drains it. Pointer moves
//! coalesce in the queue, so the slider only sees the latest position.
//!
//! Run with: RUST_LOG=grwidget=debug cargo run -p grwidget --example pointer_stream

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use grwidget::logging::{TreeDebug, TreeFormatOptions};
use grwidget::{Delivery, Message, MessageKind, Rectangle, Widget, WidgetContext};
use tracing_subscriber::EnvFilter;

const SLIDER: Rectangle = Rectangle::new(20, 100, 299, 139);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grwidget=info")),
        )
        .init();

    let mut context = WidgetContext::builder()
        .name("pointer-stream")
        .queue_capacity(8)
        .build()
        .expect("valid queue capacity");

    let panel = context
        .tree_mut()
        .insert(Widget::new(Rectangle::new(0, 0, 319, 239)).with_name("panel"));
    let slider = context.tree_mut().insert(
        Widget::new(SLIDER)
            .with_name("slider")
            .with_handler_fn(|cx, message| match message.kind {
                MessageKind::PointerDown => {
                    let (x, y) = message.pointer_position();
                    u32::from(cx.rect().contains(x, y))
                }
                MessageKind::PointerMove | MessageKind::PointerUp => {
                    let (x, _) = message.pointer_position();
                    let rect = cx.rect();
                    let clamped = x.clamp(i32::from(rect.x_min), i32::from(rect.x_max));
                    let percent = (clamped - i32::from(rect.x_min)) * 100 / (rect.width() - 1);
                    println!("slider {}: {percent}%", message.kind);
                    1
                }
                _ => 0,
            }),
    );
    let root = context.root();
    context.attach(root, panel).expect("panel attaches under root");
    context.attach(panel, slider).expect("slider attaches under panel");

    let dump = TreeDebug::with_options(TreeFormatOptions::minimal());
    print!("{}", dump.format_subtree(context.tree(), root));

    let queue = context.queue();
    let done = Arc::new(AtomicBool::new(false));
    let driver = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let post = |kind, x| {
                let _ = queue.post(root, Message::pointer(kind, x, 120), Delivery::POINTER);
            };
            post(MessageKind::PointerDown, 30);
            for x in (30..290).step_by(4) {
                post(MessageKind::PointerMove, x);
                thread::sleep(Duration::from_micros(200));
            }
            post(MessageKind::PointerUp, 290);
            done.store(true, Ordering::Release);
        })
    };

    let mut delivered = 0;
    loop {
        let finished = done.load(Ordering::Acquire);
        delivered += context.process_queue();
        if finished {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    driver.join().expect("driver thread panicked");

    let stats = context.queue().stats();
    println!(
        "delivered {delivered} messages, coalesced {} moves, {} overflows, {} mutex clashes",
        stats.coalesced_moves, stats.overflows, stats.mutex_clashes
    );
}
