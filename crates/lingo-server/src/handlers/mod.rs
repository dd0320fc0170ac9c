//! HTTP handlers

pub mod auth;
pub mod health;
pub mod tags;
pub mod translations;

pub use health::health;

use serde::Serialize;

/// `{message, data}` response body
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageOnly {
    pub message: &'static str,
}
