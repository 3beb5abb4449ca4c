/// Entities shared between the storage layer and the services.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
/// Storage trait and its in-process backend.
pub mod training_store;
