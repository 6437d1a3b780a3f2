//! Connection authentication: path classification, cookie credentials for
//! administrative clients and address lookup for cluster nodes.

pub mod authenticator;
pub mod cookie;

pub use authenticator::{constant_time_compare, Authenticator, ConnectionRequest};
pub use cookie::CookieJar;
