pub mod annotate;
pub mod auth;
pub mod config;
pub mod detection;
pub mod error;
pub mod http;
pub mod normalize;
pub mod service;
pub mod store;
pub mod summary;
pub mod yolo;
