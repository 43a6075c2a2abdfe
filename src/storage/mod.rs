use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

pub mod http;
pub mod in_memory;

pub use http::HttpObjectStore;
pub use in_memory::MemoryObjectStore;

/// Key of the registry SQLite file inside the bucket.
pub const REGISTRY_KEY: &str = "users/users.db";

/// Key of the shared contact-submissions document.
pub const CONTACT_LOG_KEY: &str = "contacts/submissions.json";

/// A (year, semester) pair identifying one catalog document and the blob
/// namespace its files live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct Scope {
    pub year: u16,
    pub semester: u8,
}

impl Scope {
    pub fn new(year: u16, semester: u8) -> Self {
        Self { year, semester }
    }

    /// Deterministic blob key for a file in this scope.
    pub fn object_key(&self, filename: &str) -> String {
        format!("year_{}/{}sem/{}", self.year, self.semester, filename)
    }

    /// Key of the scope's catalog document.
    pub fn document_key(&self) -> String {
        self.object_key("data.json")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "year {} semester {}", self.year, self.semester)
    }
}

/// Opaque key-addressed blob store. The sole durable backing for catalog
/// documents, the registry file and uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an object, overwriting any existing value.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
