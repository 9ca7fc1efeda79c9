//! Store boundaries consumed by the reconciler, resolver and sweep.
//!
//! Both stores are read page by page; a page carries an opaque cursor that is
//! only valid for the next call of the same listing.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
    pub complete: bool,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: None,
            complete: true,
        }
    }

    pub fn more(items: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            cursor: Some(cursor.into()),
            complete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },
    #[error("store returned the cursor it was given ({cursor}); listing cannot advance")]
    CursorStalled { cursor: String },
}

impl StoreError {
    pub fn unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            message: message.into(),
        }
    }
}

pub trait KvStore {
    /// Raw document bytes, `None` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page<String>, StoreError>;
}

pub trait BlobStore {
    fn list(&self, cursor: Option<&str>, limit: usize) -> Result<Page<BlobObject>, StoreError>;

    /// Permanent delete. Deleting a key that no longer exists must succeed.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
