#![forbid(unsafe_code)]
//! HTTP front-end of the fault-injection proxy
//!
//! Two surfaces share one listener: the control plane under
//! `/faultline/v1/` manages rules, and everything else is the data plane -
//! the first path segment names the destination service and the rest is
//! forwarded, after the matched rule's faults have had their say on both
//! the request and the reply leg.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
