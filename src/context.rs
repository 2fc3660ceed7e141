//! The propagation context: correlation attributes visible to everything
//! running inside one request.
//!
//! The context lives in task-local storage. It is installed by the
//! [`ScopedPropagator`](crate::ScopedPropagator) around the downstream call and
//! disappears when that call returns, fails, panics or is dropped. Outside of
//! such a scope every accessor behaves as if the context were empty.
//!
//! ```rust,ignore
//! use mesh_identity::context;
//!
//! async fn call_next_service(client: &reqwest::Client) -> reqwest::Result<String> {
//!     client
//!         .get("http://front50.mesh.internal/applications")
//!         .headers(context::outbound_headers())
//!         .send()
//!         .await?
//!         .text()
//!         .await
//! }
//! ```

use {
    crate::{CorrelationAttributes, headers},
    http::{HeaderMap, HeaderName, HeaderValue},
    std::future::Future,
    tokio::task::futures::TaskLocalFuture,
};

tokio::task_local! {
    static PROPAGATION_CONTEXT: CorrelationAttributes;
}

/// Runs `fut` with `attributes` as its propagation context.
pub(crate) fn scope<F: Future>(
    attributes: CorrelationAttributes,
    fut: F,
) -> TaskLocalFuture<CorrelationAttributes, F> {
    PROPAGATION_CONTEXT.scope(attributes, fut)
}

/// Runs `f` on the current thread with `attributes` as its propagation context.
///
/// Meant for work on plain threads, outside any async runtime. The context is
/// released when `f` returns or panics. Use
/// [`ScopedPropagator::propagate_sync`](crate::ScopedPropagator::propagate_sync)
/// to also get the `identity` span and the alternate sink cleanup.
pub fn scope_sync<R>(attributes: CorrelationAttributes, f: impl FnOnce() -> R) -> R {
    PROPAGATION_CONTEXT.sync_scope(attributes, f)
}

/// Whether the caller is running inside a propagation scope.
pub fn is_active() -> bool {
    PROPAGATION_CONTEXT.try_with(|_| ()).is_ok()
}

pub fn get(key: &str) -> Option<String> {
    PROPAGATION_CONTEXT
        .try_with(|attributes| attributes.get(key).map(str::to_owned))
        .ok()
        .flatten()
}

pub fn current_user() -> Option<String> {
    get(headers::USER)
}

pub fn current_accounts() -> Option<String> {
    get(headers::ACCOUNTS)
}

pub fn current_request_id() -> Option<String> {
    get(headers::REQUEST_ID)
}

/// A copy of the whole context, empty outside a scope.
pub fn snapshot() -> CorrelationAttributes {
    PROPAGATION_CONTEXT
        .try_with(|attributes| attributes.clone())
        .unwrap_or_default()
}

/// The context as headers for an outbound call to another service.
///
/// Attributes that are not valid header values are left out.
pub fn outbound_headers() -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in snapshot() {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            tracing::debug!(key = %key, "Skipping attribute that is not a valid header");
            continue;
        };
        map.insert(name, value);
    }
    map
}

/// Carries the current context over to `fut`.
///
/// The context is captured when this function is called, so the returned
/// future can be spawned onto another task and still log with the identity
/// of the request that spawned it:
///
/// ```rust,ignore
/// tokio::spawn(context::propagate(async move {
///     tracing::info!(user = ?context::current_user(), "audit");
/// }));
/// ```
pub fn propagate<F: Future>(fut: F) -> TaskLocalFuture<CorrelationAttributes, F> {
    scope(snapshot(), fut)
}
