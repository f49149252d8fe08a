//! Panic recovery.
//!
//! A panicking handler would otherwise tear down its connection task and the
//! client would see a reset. [`Recoverer`] catches the unwind, reports it, and
//! answers `500 Internal Server Error` instead.
//!
//! The stack is captured by a process panic hook while the panicking frames
//! are still live, and handed over through a thread-local. Panics inside a
//! `Recoverer` are reported only through the log entry; the previous hook
//! (by default, the stderr report) still sees every other panic.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::{Future, poll_fn};
use std::panic::{AssertUnwindSafe, PanicHookInfo};
use std::pin::pin;
use std::sync::Once;

use futures::FutureExt;
use http::StatusCode;

use crate::handler::BoxFuture;
use crate::logger::Attr;
use crate::middleware::logger::get_logger;
use crate::middleware::request_logger::get_log_entry;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Middleware that turns handler panics into `500` responses.
///
/// The panic goes to the request's [`LogEntry`](super::LogEntry) when a
/// [`RequestLogger`](super::RequestLogger) runs further out; otherwise it is
/// logged through the context logger. Register it after `RequestLogger`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recoverer;

impl Middleware for Recoverer {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        install_panic_hook();
        let ctx = req.context().clone();

        Box::pin(async move {
            // `next.run` is called inside the guard: handlers and stages may
            // panic before they return their future.
            let mut guarded = pin!(AssertUnwindSafe(async move { next.run(req).await }).catch_unwind());
            let outcome = poll_fn(|cx| {
                let _scope = RecoveryScope::enter();
                guarded.as_mut().poll(cx)
            })
            .await;

            let payload = match outcome {
                Ok(res) => return res,
                Err(payload) => payload,
            };

            // Same poll, same thread as the panic, so the hook's capture is
            // still in the thread-local.
            let stack = take_panic_stack().unwrap_or_else(|| Backtrace::force_capture().to_string());

            match get_log_entry(&ctx) {
                Some(entry) => entry.panic(&*payload, &stack),
                None => get_logger(&ctx).error(
                    "panic",
                    &[
                        Attr::string("panic", panic_message(&*payload)),
                        Attr::string("stack", stack),
                    ],
                ),
            }

            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        })
    }
}

// ── Panic-time stack capture ──────────────────────────────────────────────────

thread_local! {
    /// Number of `Recoverer` polls active on this thread.
    static RECOVERY_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

struct RecoveryScope;

impl RecoveryScope {
    fn enter() -> Self {
        RECOVERY_DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for RecoveryScope {
    fn drop(&mut self) {
        RECOVERY_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            let recovering = RECOVERY_DEPTH.try_with(Cell::get).unwrap_or(0) > 0;
            if !recovering {
                previous(info);
                return;
            }
            let stack = match info.location() {
                Some(loc) => format!("panicked at {loc}\n{}", Backtrace::force_capture()),
                None => Backtrace::force_capture().to_string(),
            };
            let _ = PANIC_STACK.try_with(|slot| *slot.borrow_mut() = Some(stack));
        }));
    });
}

fn take_panic_stack() -> Option<String> {
    PANIC_STACK.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Renders a panic payload. `panic!` produces `&'static str` or `String`
/// payloads; anything else (from `std::panic::panic_any`) gets a placeholder.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}
