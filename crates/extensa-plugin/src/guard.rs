//! Panic boundaries around extension code.
//!
//! Nothing an extension does may unwind into the host. Every hook call goes
//! through one of these guards, which turn a panic into an [`AppError`] of
//! the given kind.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;
use tracing::error;

use extensa_core::error::{AppError, ErrorKind};
use extensa_core::result::AppResult;

/// Run a synchronous hook behind a panic boundary.
pub fn guard_sync<T>(
    key: &str,
    hook: &str,
    kind: ErrorKind,
    f: impl FnOnce() -> T,
) -> AppResult<T> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panicked(key, hook, kind, payload))
}

/// Run an asynchronous hook behind a panic boundary.
///
/// An error returned by the hook is re-kinded to `kind` unless it already
/// carries `kind`.
pub async fn guard_async<T, F>(key: &str, hook: &str, kind: ErrorKind, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(rekind(key, hook, kind, e)),
        Err(payload) => Err(panicked(key, hook, kind, payload)),
    }
}

/// Convert an error returned by extension code into `kind`.
pub fn rekind(key: &str, hook: &str, kind: ErrorKind, e: AppError) -> AppError {
    if e.kind == kind {
        e
    } else {
        AppError::new(kind, format!("Extension '{key}' {hook} failed: {}", e.message))
    }
}

fn panicked(key: &str, hook: &str, kind: ErrorKind, payload: Box<dyn Any + Send>) -> AppError {
    let message = panic_message(payload.as_ref());
    error!(extension = %key, hook = %hook, panic = %message, "Extension code panicked");
    AppError::new(kind, format!("Extension '{key}' panicked in {hook}: {message}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
