//! Core Components
//!
//! Transport collaborator used by the session and the resource directory.

pub mod transport;

pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport, DEFAULT_MAX_RESPONSE_SIZE,
};
