#![forbid(unsafe_code)]

pub mod json;
pub mod repository;

pub use repository::{
    InMemoryRepository, QuestionSource, Storage, StorageError, UserDirectory, UserStore,
};
