//! Protocol types, request normalisation, and the error taxonomy shared by the
//! `kms-envelope-svc` crates.

pub mod error;
pub mod protocol;
pub mod request;

pub use error::{ErrorKind, ServiceError};
pub use protocol::Operation;
