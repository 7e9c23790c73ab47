// src/lib.rs

pub mod api;
pub mod app_state;
pub mod chunks;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod ids;
pub mod model;
pub mod permissions;
pub mod records;
pub mod reply;
pub mod service;
pub mod status;
pub mod validation;
