pub mod app;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fs_util;
pub mod generation;
pub mod index;
pub mod location;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod project;
pub mod trajectory;
