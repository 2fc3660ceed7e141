//! Precedence rules for resolving the identity of a request.

use {
    super::{
        ClientCertificates, RequestIdentity, SecurityContext, SecurityContextStore, UserPrincipal,
        email_identity, is_secure,
    },
    crate::{CorrelationAttributes, IdentityConfig, Result, headers},
    http::{HeaderMap, request::Parts},
    std::sync::Arc,
};

/// The outcome of resolving one request: its identity plus the trusted
/// `x-spinnaker-*` headers that should travel with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: RequestIdentity,
    pub forwarded: CorrelationAttributes,
}

/// Resolves who is making a request.
///
/// Sources are tried in order, the first one to produce a value wins for
/// each field:
///
/// 1. the principal of the session security context, or of the ambient one
///    when the session has none;
/// 2. the `x-spinnaker-user` and `x-spinnaker-accounts` headers, only when
///    `extract_headers` is enabled;
/// 3. the rfc822Name of the verified client certificates, only for the user,
///    only over a secure transport.
pub struct IdentityResolver {
    extract_headers: bool,
    store: Arc<dyn SecurityContextStore>,
}

impl IdentityResolver {
    pub fn new(config: &IdentityConfig, store: Arc<dyn SecurityContextStore>) -> Self {
        Self {
            extract_headers: config.extract_headers,
            store,
        }
    }

    /// Resolves the identity of the request described by `parts`.
    ///
    /// # Errors
    ///
    /// Only certificate parsing can fail. Security-context lookup failures
    /// are logged and treated as "no principal".
    pub fn resolve(&self, parts: &Parts) -> Result<ResolvedIdentity> {
        let mut user = None;
        let mut accounts = None;
        let mut forwarded = CorrelationAttributes::new();

        if let Some(principal) = self.principal(parts) {
            accounts = Some(principal.accounts_csv());
            user = Some(principal.username);
        }

        if self.extract_headers {
            user = user.or_else(|| header_value(&parts.headers, headers::USER));
            accounts = accounts.or_else(|| header_value(&parts.headers, headers::ACCOUNTS));
            forwarded = prefixed_headers(&parts.headers);
        }

        if user.is_none()
            && is_secure(parts)
            && let Some(certificates) = parts.extensions.get::<ClientCertificates>()
        {
            user = email_identity(certificates)?;
        }

        Ok(ResolvedIdentity {
            identity: RequestIdentity::new(user, accounts),
            forwarded,
        })
    }

    fn principal(&self, parts: &Parts) -> Option<UserPrincipal> {
        let context = match self.store.session_context(parts) {
            Ok(Some(context)) => Ok(Some(context)),
            Ok(None) => self.store.ambient_context(),
            Err(err) => Err(err),
        };

        match context {
            Ok(Some(SecurityContext::Authenticated(principal))) => Some(principal),
            Ok(Some(SecurityContext::Unrecognized)) | Ok(None) => None,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    error_code = %err.error_code(),
                    "Unable to read the security context, continuing without a principal"
                );
                None
            }
        }
    }
}

fn header_value(map: &HeaderMap, name: &str) -> Option<String> {
    map.get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Every header whose (lowercase) name starts with the reserved prefix.
fn prefixed_headers(map: &HeaderMap) -> CorrelationAttributes {
    map.iter()
        .filter(|(name, _)| name.as_str().starts_with(headers::PREFIX))
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect()
}
