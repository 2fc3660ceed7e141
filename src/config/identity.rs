use {crate::Result, serde::Deserialize};

///
/// Switches controlling how the identity layer resolves and augments the
/// request identity. They are read once when the layer is built and never
/// change for the lifetime of that layer.
///
/// ```toml
/// [identity]
/// extract_headers = true
/// extract_origin_header = true
/// force_new_request_id = false
/// ```
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub struct IdentityConfig {
    /// Trust the inbound `x-spinnaker-user` / `x-spinnaker-accounts` headers and
    /// forward every other `x-spinnaker-*` header into the logging context.
    ///
    /// The layer trusts these headers completely. Only enable this behind a
    /// gateway that strips or overwrites them on requests coming from outside
    /// the mesh.
    #[serde(default)]
    pub extract_headers: bool,

    /// Tag each request with `x-spinnaker-user-origin`, either `deck` when the
    /// `x-ratelimit-app` header says so, or `api` otherwise.
    #[serde(default)]
    pub extract_origin_header: bool,

    /// Generate a fresh `x-spinnaker-request-id` for every request, replacing
    /// any value that came in with it.
    #[serde(default)]
    pub force_new_request_id: bool,
}

impl IdentityConfig {
    /// Every combination of the three switches is valid.
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
