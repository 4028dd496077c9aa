pub mod app;
pub mod boundaries;
pub mod config;
pub mod feeds;
pub mod refresh;
pub mod session;
pub mod surfaces;
