pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod pagination;
pub mod response;
pub mod routes;
pub mod settings;
pub mod state;
pub mod storage;
pub mod upload;
pub mod user;
