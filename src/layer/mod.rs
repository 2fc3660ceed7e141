//! The tower layer wiring resolution, augmentation and propagation together.

use {
    crate::{
        AlternateContextSink, AttributeAugmenter, Config, ExtensionSecurityContextStore,
        IdentityConfig, IdentityResolver, ResolvedIdentity, ScopedPropagator,
        SecurityContextStore,
    },
    axum::response::{IntoResponse, Response},
    http::Request,
    std::{
        future::Future,
        pin::Pin,
        sync::Arc,
        task::{Context, Poll},
    },
    tower::{Layer, Service},
};

/// Layer that establishes the identity context of every request.
///
/// For each request the layer:
/// 1. resolves the caller's [`RequestIdentity`](crate::RequestIdentity) and
///    inserts it into the request extensions;
/// 2. adds the origin tag and a fresh request id when configured;
/// 3. runs the inner service inside a propagation scope holding all of the
///    above, then releases the scope however the inner service finishes.
///
/// A client certificate that cannot be parsed short-circuits the request
/// with `400 Bad Request`; the inner service is not called.
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use mesh_identity::{Config, IdentityLayer, context};
///
/// async fn whoami() -> String {
///     context::current_user().unwrap_or_else(|| "anonymous".into())
/// }
///
/// let config = Config::default().with_extract_headers(true);
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(IdentityLayer::from_config(&config));
/// ```
#[derive(Clone)]
pub struct IdentityLayer {
    config: IdentityConfig,
    store: Arc<dyn SecurityContextStore>,
    propagator: ScopedPropagator,
}

impl IdentityLayer {
    /// Creates a layer reading principals with [`ExtensionSecurityContextStore`].
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            store: Arc::new(ExtensionSecurityContextStore),
            propagator: ScopedPropagator::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.identity)
    }

    /// Replaces the store principals are looked up in.
    pub fn with_security_context_store(mut self, store: Arc<dyn SecurityContextStore>) -> Self {
        self.store = store;
        self
    }

    /// Clears `sink` after every request in addition to the task-local context.
    pub fn with_alternate_sink(mut self, sink: Arc<dyn AlternateContextSink>) -> Self {
        self.propagator = self.propagator.with_alternate_sink(sink);
        self
    }
}

impl<S> Layer<S> for IdentityLayer {
    type Service = IdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityService {
            inner,
            resolver: Arc::new(IdentityResolver::new(&self.config, Arc::clone(&self.store))),
            augmenter: AttributeAugmenter::new(&self.config),
            propagator: self.propagator.clone(),
        }
    }
}

/// Service produced by [`IdentityLayer`].
#[derive(Clone)]
pub struct IdentityService<S> {
    inner: S,
    resolver: Arc<IdentityResolver>,
    augmenter: AttributeAugmenter,
    propagator: ScopedPropagator,
}

impl<S, B> Service<Request<B>> for IdentityService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let (mut parts, body) = req.into_parts();

        let ResolvedIdentity {
            identity,
            forwarded: mut attributes,
        } = match self.resolver.resolve(&parts) {
            Ok(resolved) => resolved,
            Err(err) => return Box::pin(async move { Ok(err.into_response()) }),
        };

        self.augmenter.augment(&parts.headers, &mut attributes);
        let attributes = attributes.with_identity(&identity);

        tracing::debug!(
            user = identity.user().unwrap_or_default(),
            attributes = attributes.len(),
            "Resolved request identity"
        );

        parts.extensions.insert(identity);
        let req = Request::from_parts(parts, body);

        let mut inner = self.inner.clone();
        let propagator = self.propagator.clone();

        Box::pin(async move {
            propagator
                .propagate(attributes, async move { inner.call(req).await })
                .await
        })
    }
}

#[cfg(test)]
mod tests;
