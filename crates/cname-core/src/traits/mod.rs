//! Trait seam between the publisher engine and the naming service.

pub mod name_service;

pub use name_service::{NameService, RecordGroup};
