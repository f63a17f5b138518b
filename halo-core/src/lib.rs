#![forbid(unsafe_code)]

pub mod error;

pub mod domain;
pub mod settings;

pub mod codec;

pub mod store {
    pub mod blobs;
    pub mod engine;
    pub mod index;
    pub mod journal;
    pub mod varint;
}

pub mod files;

pub mod local;
pub mod session;

pub mod auth;
pub mod view;

pub mod present;
pub mod upload;

// Re-exports: stable API surface
pub use domain::{Credential, FileRow, Session, StoredFile};
pub use error::{HaloError, Result, ValidationError};
pub use files::FileStore;
pub use session::{LocalSessionStore, MemorySessionStore, SessionStore};
pub use store::engine::StoreOptions;
pub use view::View;
