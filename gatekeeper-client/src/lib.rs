//! Gatekeeper Client - transport and typed API for the IAM backend
//!
//! [`HttpTransport`] owns bearer-credential injection and 401 handling, [`IamApi`]
//! exposes one typed method per backend route, and [`SessionProvider`] abstracts the
//! durable `user`/`permissions` storage both of them share with the console.

pub mod api;
pub mod iam;
pub mod mock;
pub mod navigation;
pub mod schema;
pub mod session;

pub use api::{ApiClientConfig, ApiRequest, HttpMethod, HttpTransport, Transport};
pub use iam::IamApi;
pub use navigation::{LogNavigator, Navigator, RecordingNavigator, LOGIN_ROUTE};
pub use session::{
    FileSessionStore, MemorySessionStore, SessionProvider, PERMISSIONS_KEY, SESSION_KEY,
};
