//! Test helpers: in-memory mocks and service harness

pub mod mock_repositories;

pub use mock_repositories::*;
