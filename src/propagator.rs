//! Scoped propagation of correlation attributes around the downstream call.

use {
    crate::{CorrelationAttributes, Result, context, headers},
    std::{future::Future, sync::Arc},
    tracing::{Instrument, Span, field},
};

/// A second logging context that must be emptied after every request.
///
/// Some deployments keep a legacy diagnostic context next to the task-local
/// one (for instance a thread-local map read by an older log appender). When
/// configured, it is cleared after each downstream call. Failures are
/// ignored: the sink is best effort.
pub trait AlternateContextSink: Send + Sync + 'static {
    fn clear(&self) -> Result<()>;
}

/// Installs correlation attributes for exactly one downstream call.
///
/// While the call runs, the attributes are readable through [`context`] and
/// are recorded on an `identity` span that instruments the call, so every
/// log line emitted downstream carries them. When the call finishes, in any
/// way, the context is gone and the alternate sink, if any, is cleared.
#[derive(Clone, Default)]
pub struct ScopedPropagator {
    alternate: Option<Arc<dyn AlternateContextSink>>,
}

impl ScopedPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alternate_sink(mut self, sink: Arc<dyn AlternateContextSink>) -> Self {
        self.alternate = Some(sink);
        self
    }

    /// Runs `downstream` inside the propagation scope of `attributes`.
    ///
    /// Dropping the returned future before completion (timeouts, client
    /// disconnects) releases the scope as well.
    pub async fn propagate<F: Future>(
        &self,
        attributes: CorrelationAttributes,
        downstream: F,
    ) -> F::Output {
        let span = identity_span(&attributes);
        let _release = Release(self.alternate.clone());
        context::scope(attributes, downstream).instrument(span).await
    }

    /// Same as [`propagate`](Self::propagate), for synchronous downstream work
    /// on the current thread. The scope is released on panic too.
    pub fn propagate_sync<R>(
        &self,
        attributes: CorrelationAttributes,
        downstream: impl FnOnce() -> R,
    ) -> R {
        let span = identity_span(&attributes);
        let _release = Release(self.alternate.clone());
        let _entered = span.enter();
        context::scope_sync(attributes, downstream)
    }
}

/// Clears the alternate sink when dropped.
struct Release(Option<Arc<dyn AlternateContextSink>>);

impl Drop for Release {
    fn drop(&mut self) {
        if let Some(sink) = &self.0 {
            let _ = sink.clear();
        }
    }
}

fn identity_span(attributes: &CorrelationAttributes) -> Span {
    let span = tracing::info_span!(
        "identity",
        user = field::Empty,
        accounts = field::Empty,
        user_origin = field::Empty,
        request_id = field::Empty,
        forwarded = field::Empty,
    );

    let mut forwarded = Vec::new();
    for (key, value) in attributes.iter() {
        match key {
            headers::USER => {
                span.record("user", value);
            }
            headers::ACCOUNTS => {
                span.record("accounts", value);
            }
            headers::USER_ORIGIN => {
                span.record("user_origin", value);
            }
            headers::REQUEST_ID => {
                span.record("request_id", value);
            }
            _ => forwarded.push(format!("{key}={value}")),
        }
    }
    if !forwarded.is_empty() {
        span.record("forwarded", forwarded.join(",").as_str());
    }

    span
}
