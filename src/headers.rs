//! Reserved header and attribute names shared by every service in the mesh.
//!
//! The same names are used for inbound headers, propagation context keys and
//! outbound headers so that identity travels unchanged from hop to hop. They
//! are a wire contract and are not configurable.
//!
//! All names are in the lowercase form in which `http::HeaderName` stores them.

/// Authenticated user identifier.
pub const USER: &str = "x-spinnaker-user";

/// Comma-joined list of accounts the user may act on.
pub const ACCOUNTS: &str = "x-spinnaker-accounts";

/// Where the request came from, either [`ORIGIN_DECK`] or [`ORIGIN_API`].
pub const USER_ORIGIN: &str = "x-spinnaker-user-origin";

/// Correlation identifier for one request across the mesh.
pub const REQUEST_ID: &str = "x-spinnaker-request-id";

/// Every inbound header starting with this prefix is forwarded when header
/// extraction is enabled.
pub const PREFIX: &str = "x-spinnaker-";

/// Inbound signal naming the calling application, used to derive the origin.
pub const ORIGIN_SIGNAL: &str = "x-ratelimit-app";

/// Origin value for requests issued by the first-party UI.
pub const ORIGIN_DECK: &str = "deck";

/// Origin value for everything else.
pub const ORIGIN_API: &str = "api";

/// Keys the layer itself writes, independent of forwarded prefix headers.
pub const RESERVED: [&str; 4] = [USER, ACCOUNTS, USER_ORIGIN, REQUEST_ID];
