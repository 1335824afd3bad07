pub mod dto;
pub mod files;
pub mod handlers;
pub mod repository;
pub mod service;

pub use files::FileBrowser;
pub use repository::AdminRepository;
pub use service::AdminService;
