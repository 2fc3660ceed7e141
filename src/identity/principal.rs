//! Principals and the security-context store they are looked up in.

use {crate::Result, http::request::Parts, std::future::Future};

tokio::task_local! {
    static AMBIENT_SECURITY_CONTEXT: SecurityContext;
}

/// An authenticated principal with the shape the mesh understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    pub username: String,
    pub allowed_accounts: Vec<String>,
}

impl UserPrincipal {
    pub fn new<I, S>(username: impl Into<String>, allowed_accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            allowed_accounts: allowed_accounts.into_iter().map(Into::into).collect(),
        }
    }

    /// The allowed accounts joined with `,`, order preserved.
    pub fn accounts_csv(&self) -> String {
        self.allowed_accounts.join(",")
    }
}

/// What a security context holds for the current request.
///
/// Authentication mechanisms that do not produce a [`UserPrincipal`] (for
/// instance an anonymous token, or a principal type from another library)
/// report `Unrecognized`; the resolver then contributes no identity from
/// this source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityContext {
    Authenticated(UserPrincipal),
    Unrecognized,
}

impl SecurityContext {
    pub fn principal(&self) -> Option<&UserPrincipal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Unrecognized => None,
        }
    }
}

/// Read-only access to the authenticated principal of a request.
///
/// `session_context` is consulted first; `ambient_context` is only asked when
/// the session has no security context at all. Errors are never fatal: the
/// resolver logs them and carries on without this source.
pub trait SecurityContextStore: Send + Sync + 'static {
    /// The security context bound to the request's session.
    fn session_context(&self, parts: &Parts) -> Result<Option<SecurityContext>>;

    /// The security context bound to the executing task, if any.
    fn ambient_context(&self) -> Result<Option<SecurityContext>> {
        Ok(None)
    }
}

/// The default store.
///
/// Reads the session context from the request extensions, where an upstream
/// authentication layer is expected to have put a [`SecurityContext`], and the
/// ambient context from the task-local installed by
/// [`with_ambient_security_context`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionSecurityContextStore;

impl SecurityContextStore for ExtensionSecurityContextStore {
    fn session_context(&self, parts: &Parts) -> Result<Option<SecurityContext>> {
        Ok(parts.extensions.get::<SecurityContext>().cloned())
    }

    fn ambient_context(&self) -> Result<Option<SecurityContext>> {
        Ok(AMBIENT_SECURITY_CONTEXT.try_with(|context| context.clone()).ok())
    }
}

/// Runs `fut` with `context` as the ambient security context of the task.
pub async fn with_ambient_security_context<F: Future>(
    context: SecurityContext,
    fut: F,
) -> F::Output {
    AMBIENT_SECURITY_CONTEXT.scope(context, fut).await
}
