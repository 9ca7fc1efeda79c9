//! S3-backed implementations of the core store traits.
//!
//! The traits are synchronous; each call bridges into the async SDK with
//! `block_in_place`, so these stores must be used from a multi-threaded Tokio
//! runtime.

use std::collections::BTreeMap;
use std::future::Future;

use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use mod_index_core::store::{BlobObject, BlobStore, KvStore, Page, StoreError};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn max_keys(limit: usize) -> i32 {
    i32::try_from(limit.clamp(1, 1000)).unwrap_or(1000)
}

/// Key-value view over one bucket, optionally rooted under a key prefix.
pub struct S3KvStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3KvStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, prefix: &str) -> Self {
        Self {
            client,
            bucket,
            prefix: normalize_prefix(prefix),
        }
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn logical_key(&self, object_key: &str) -> Option<String> {
        object_key.strip_prefix(&self.prefix).map(str::to_string)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

impl KvStore for S3KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let object_key = self.object_key(key);

        block_on(async move {
            let output = match client.get_object().bucket(bucket).key(object_key).send().await {
                Ok(output) => output,
                Err(error) => {
                    if error
                        .as_service_error()
                        .is_some_and(GetObjectError::is_no_such_key)
                    {
                        return Ok(None);
                    }
                    return Err(StoreError::unavailable(
                        "kv get",
                        format!("failed to read object from s3: {error}"),
                    ));
                }
            };

            match output.body.collect().await {
                Ok(body) => Ok(Some(body.into_bytes().to_vec())),
                Err(error) => Err(StoreError::unavailable(
                    "kv get",
                    format!("failed to read object body: {error}"),
                )),
            }
        })
    }

    fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Page<String>, StoreError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let object_prefix = self.object_key(prefix);
        let continuation = cursor.map(str::to_string);

        let output = block_on(async move {
            client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(object_prefix)
                .max_keys(max_keys(limit))
                .set_continuation_token(continuation)
                .send()
                .await
                .map_err(|error| {
                    StoreError::unavailable("kv list", format!("failed to list s3 objects: {error}"))
                })
        })?;

        let items = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .filter_map(|key| self.logical_key(key))
            .collect();
        let complete = !output.is_truncated().unwrap_or(false);
        Ok(Page {
            items,
            cursor: output.next_continuation_token().map(str::to_string),
            complete,
        })
    }
}

/// Flat view over a bucket whose objects carry deletion markers in their
/// user metadata.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// `ListObjectsV2` omits user metadata, so each listed key is inspected
    /// with `HeadObject`. `None` means the object vanished after listing.
    fn head_metadata(&self, key: &str) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let object_key = key.to_string();

        block_on(async move {
            match client.head_object().bucket(bucket).key(object_key).send().await {
                Ok(output) => Ok(Some(
                    output
                        .metadata()
                        .map(|metadata| {
                            metadata
                                .iter()
                                .map(|(name, value)| (name.clone(), value.clone()))
                                .collect()
                        })
                        .unwrap_or_default(),
                )),
                Err(error) => {
                    if error
                        .as_service_error()
                        .is_some_and(HeadObjectError::is_not_found)
                    {
                        Ok(None)
                    } else {
                        Err(StoreError::unavailable(
                            "blob head",
                            format!("failed to read object metadata from s3: {error}"),
                        ))
                    }
                }
            }
        })
    }
}

impl BlobStore for S3BlobStore {
    fn list(&self, cursor: Option<&str>, limit: usize) -> Result<Page<BlobObject>, StoreError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let continuation = cursor.map(str::to_string);

        let output = block_on(async move {
            client
                .list_objects_v2()
                .bucket(bucket)
                .max_keys(max_keys(limit))
                .set_continuation_token(continuation)
                .send()
                .await
                .map_err(|error| {
                    StoreError::unavailable(
                        "blob list",
                        format!("failed to list s3 objects: {error}"),
                    )
                })
        })?;

        let mut items = Vec::with_capacity(output.contents().len());
        for key in output.contents().iter().filter_map(|object| object.key()) {
            let Some(metadata) = self.head_metadata(key)? else {
                tracing::debug!(key, "object disappeared between list and head");
                continue;
            };
            items.push(BlobObject {
                key: key.to_string(),
                metadata,
            });
        }

        Ok(Page {
            items,
            cursor: output.next_continuation_token().map(str::to_string),
            complete: !output.is_truncated().unwrap_or(false),
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let object_key = key.to_string();

        block_on(async move {
            client
                .delete_object()
                .bucket(bucket)
                .key(object_key)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    StoreError::unavailable(
                        "blob delete",
                        format!("failed to delete object from s3: {error}"),
                    )
                })
        })
    }
}
