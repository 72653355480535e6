//! Infrastructure layer
pub mod db;
pub mod repository;
pub mod session;
