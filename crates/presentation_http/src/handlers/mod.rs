//! Request handlers

pub mod health;
pub mod proxy;
pub mod rules;
