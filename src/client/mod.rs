pub mod csrf_client;

pub use csrf_client::{CsrfClientError, CsrfTokenClient};
