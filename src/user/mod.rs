pub mod user_models;
pub mod user_repository;

pub use user_models::{NewUser, Role, User, UserResponse};
pub use user_repository::UserRepository;
