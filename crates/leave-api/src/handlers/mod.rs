//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod employees;
pub mod health;
pub mod leave;
