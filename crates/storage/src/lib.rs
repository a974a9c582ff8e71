#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AssessmentRepository, AttemptRepository, Gateway, InMemoryGateway, StorageError,
};
