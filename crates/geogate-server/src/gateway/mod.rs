//! Request gateway: error mapping and upstream forwarding.
//!
//! Local routes are matched by the axum router; every request that matches no
//! local path falls through to [`proxy::proxy_fallback`] and is forwarded to the
//! configured upstream. A local path requested with an unsupported method is
//! answered locally with 405 and never forwarded.

pub mod error;
pub mod proxy;

pub use error::GatewayError;
pub use proxy::{ReverseProxy, proxy_fallback};
