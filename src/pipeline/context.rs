//! Request-scoped correlation context.
//!
//! Fields bound here (request id, user id, method, path, client ip) are
//! merged into every event emitted within the same logical unit of work.
//! Storage is a tokio task-local, so isolation across concurrently handled
//! requests holds by construction: a context only exists inside the future
//! passed to [`scope`], and it is gone when that future completes or is
//! dropped — including on error and cancellation paths.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::future::Future;

tokio::task_local! {
    static CONTEXT: RefCell<Map<String, Value>>;
}

/// Run a future with a fresh, empty correlation context.
///
/// Calls to [`bind`], [`get`], [`clear`], and [`snapshot`] made while the
/// future is being polled operate on this context. The context is torn down
/// when the returned future finishes or is dropped.
pub fn scope<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CONTEXT.scope(RefCell::new(Map::new()), fut)
}

/// Merge the given fields into the active context.
///
/// A no-op when called outside a [`scope`] — there is nothing to bind into,
/// and binding into process-wide state would defeat the isolation contract.
pub fn bind(fields: Map<String, Value>) {
    let _ = CONTEXT.try_with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        for (name, value) in fields {
            ctx.insert(name, value);
        }
    });
}

/// Bind a single field into the active context.
pub fn bind_one(name: impl Into<String>, value: impl Into<Value>) {
    let _ = CONTEXT.try_with(|ctx| {
        ctx.borrow_mut().insert(name.into(), value.into());
    });
}

/// Get a field from the active context, or `None` when unbound or unscoped.
pub fn get(name: &str) -> Option<Value> {
    CONTEXT
        .try_with(|ctx| ctx.borrow().get(name).cloned())
        .ok()
        .flatten()
}

/// Remove all bound fields from the active context.
///
/// The scope itself takes care of this automatically; `clear` exists for
/// callers that want to drop fields mid-request.
pub fn clear() {
    let _ = CONTEXT.try_with(|ctx| ctx.borrow_mut().clear());
}

/// Copy of the current context fields; empty outside a [`scope`].
pub fn snapshot() -> Map<String, Value> {
    CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bind_and_get_inside_scope() {
        scope(async {
            bind_one("request_id", "req-abc-123");
            assert_eq!(get("request_id"), Some(json!("req-abc-123")));
            assert_eq!(get("user_id"), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_bind_outside_scope_is_noop() {
        bind_one("request_id", "leaked");
        assert_eq!(get("request_id"), None);
        assert!(snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_scope_tears_down_context() {
        scope(async {
            bind_one("request_id", "first");
        })
        .await;

        scope(async {
            // A later scope must never observe a prior scope's fields.
            assert_eq!(get("request_id"), None);
        })
        .await;
    }

    #[tokio::test]
    async fn test_clear_removes_bound_fields() {
        scope(async {
            bind_one("request_id", "req-1");
            bind_one("user_id", "user-456");
            clear();
            assert!(snapshot().is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_outer() {
        scope(async {
            bind_one("request_id", "outer");
            scope(async {
                assert_eq!(get("request_id"), None);
                bind_one("request_id", "inner");
                assert_eq!(get("request_id"), Some(json!("inner")));
            })
            .await;
            assert_eq!(get("request_id"), Some(json!("outer")));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_scopes_never_cross_contaminate() {
        let mut handles = Vec::new();
        for i in 0..32 {
            handles.push(tokio::spawn(scope(async move {
                let id = format!("req-{i}");
                bind_one("request_id", id.clone());
                // Yield a few times so tasks interleave on the workers.
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                    assert_eq!(get("request_id"), Some(json!(id.clone())));
                }
            })));
        }
        for handle in handles {
            handle.await.expect("task panicked");
        }
    }
}
