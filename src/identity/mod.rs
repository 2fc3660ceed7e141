//! Identity resolution: who is making this request.
//!
//! - [`principal`] - Security-context store and principal types
//! - [`certificate`] - rfc822Name extraction from verified client certificates
//! - [`resolver`] - The precedence rules tying the sources together

pub(crate) mod certificate;
mod principal;
mod resolver;

pub use certificate::*;
pub use principal::*;
pub use resolver::*;

/// The identity resolved for one request.
///
/// Both fields are derived once by [`IdentityResolver`] and never change
/// afterwards. The identity is inserted into the request extensions, so
/// handlers can extract it:
///
/// ```rust,ignore
/// use axum::Extension;
/// use mesh_identity::RequestIdentity;
///
/// async fn handler(Extension(identity): Extension<RequestIdentity>) -> String {
///     format!("Hello, {}!", identity.user().unwrap_or("anonymous"))
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    user: Option<String>,
    accounts: Option<String>,
}

impl RequestIdentity {
    pub fn new(user: Option<String>, accounts: Option<String>) -> Self {
        Self { user, accounts }
    }

    /// An identity with neither user nor accounts.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Comma-joined accounts of the user, in the order the source listed them.
    pub fn accounts(&self) -> Option<&str> {
        self.accounts.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }
}
