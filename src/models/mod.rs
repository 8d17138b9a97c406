//! Model implementations.

pub mod changepoint;
