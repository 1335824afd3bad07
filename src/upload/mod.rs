pub mod upload_handlers;
pub mod upload_service;

pub use upload_service::{IncomingFile, UploadPolicy, UploadService};
