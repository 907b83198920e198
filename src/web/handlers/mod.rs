//! Web handlers module
//!
//! HTTP request handlers organized by endpoint family.

pub mod badge;
pub mod health;
pub mod services;
