pub mod action;
pub mod actions;
pub mod config;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod io;
pub mod model;
pub mod paths;
pub mod permission;
pub mod query;
pub mod record;
pub mod registry;
pub mod render;
pub mod store;
pub mod token;
pub mod views;

pub use error::{Result, UminError};
