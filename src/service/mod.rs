//! Services behind the HTTP surface

pub mod file_service;
pub mod session;

pub use file_service::{FileDownload, FileService};
pub use session::SessionContext;
