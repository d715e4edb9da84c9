//! The `sqlx`-backed persistence layer fronted by [`crate::repository`]:
//! connection pooling in [`connection`], error mapping in [`error`].

pub mod connection;
pub mod error;
