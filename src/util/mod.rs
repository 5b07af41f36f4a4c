//! Small shared helpers.
//!
//! - **Endpoint validation**: scheme and transport checks for the feed API
//!   and webhook URLs read from configuration.

mod endpoint;

pub use endpoint::{validate_endpoint, EndpointError};
