use std::error::Error;

pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod handler;
pub mod model;
pub mod routes;
pub mod views;

pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
