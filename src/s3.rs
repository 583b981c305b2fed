//! Blob storage in a single S3 bucket.

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::{
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{error, info, warn};

/// Size of each part of a streamed upload. S3 requires every part but the
/// last to be at least 5 MiB.
pub const PART_SIZE: usize = 8 * 1024 * 1024;

/// Result of a streamed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub key: String,
    pub parts: usize,
    pub bytes: usize,
    pub e_tag: Option<String>,
}

/// An object body with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub e_tag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl BlobStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self::from_client(Client::new(sdk_config), bucket)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            part_size: PART_SIZE,
        }
    }

    /// Overrides the streamed-upload part size (at least one byte).
    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// Stores `value` as JSON text under `name`.
    pub async fn put_object<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)
            .with_context(|| format!("failed to serialize object '{name}'"))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(body))
            .send()
            .await
            .inspect_err(|e| {
                error!(bucket = %self.bucket, key = name, "Error writing object: {e}")
            })?;
        info!(bucket = %self.bucket, key = name, "Object written");
        Ok(())
    }

    /// Streams `reader` to `name`.
    ///
    /// Content shorter than one part (see [`BlobStore::part_size`]) is sent as
    /// a single put; anything else goes through a multipart upload, which is
    /// aborted if any part fails.
    pub async fn put_stream<R>(
        &self,
        name: &str,
        reader: R,
        content_type: Option<&str>,
    ) -> Result<UploadSummary>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut parts = match plan_upload(reader, self.part_size).await? {
            UploadPlan::Single(body) => return self.put_single(name, body, content_type).await,
            UploadPlan::Multipart(parts) => parts,
        };

        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(name)
            .set_content_type(content_type.map(str::to_owned))
            .send()
            .await
            .inspect_err(|e| {
                error!(bucket = %self.bucket, key = name, "Error starting upload: {e}")
            })?;
        let upload_id = upload
            .upload_id()
            .ok_or_else(|| anyhow!("multipart upload of '{name}' returned no upload id"))?
            .to_owned();

        match self.upload_parts(name, &upload_id, &mut parts).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(bucket = %self.bucket, key = name, "Error streaming object: {e:#}");
                if let Err(abort_error) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(name)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = name, "Failed to abort upload {upload_id}: {abort_error}");
                }
                Err(e)
            }
        }
    }

    async fn put_single(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<UploadSummary> {
        let bytes = body.len();
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .set_content_type(content_type.map(str::to_owned))
            .body(ByteStream::from(body))
            .send()
            .await
            .inspect_err(|e| {
                error!(bucket = %self.bucket, key = name, "Error writing object: {e}")
            })?;
        info!(bucket = %self.bucket, key = name, bytes, "Object streamed");
        Ok(UploadSummary {
            key: name.to_string(),
            parts: 1,
            bytes,
            e_tag: output.e_tag().map(str::to_owned),
        })
    }

    async fn upload_parts<R>(
        &self,
        name: &str,
        upload_id: &str,
        parts: &mut Parts<R>,
    ) -> Result<UploadSummary>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut completed = Vec::new();
        let mut bytes = 0;

        while let Some(chunk) = parts.next_part().await? {
            let part_number = i32::try_from(completed.len() + 1)?;
            bytes += chunk.len();
            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(name)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .with_context(|| format!("failed to upload part {part_number}"))?;
            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(output.e_tag().map(str::to_owned))
                    .build(),
            );
        }

        let parts = completed.len();
        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(name)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .context("failed to complete multipart upload")?;
        info!(bucket = %self.bucket, key = name, parts, bytes, "Object streamed");

        Ok(UploadSummary {
            key: name.to_string(),
            parts,
            bytes,
            e_tag: output.e_tag().map(str::to_owned),
        })
    }

    /// Fetches the body and metadata of `name`. A missing object is an error.
    pub async fn get_object(&self, name: &str) -> Result<StoredObject> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .inspect_err(|e| {
                error!(bucket = %self.bucket, key = name, "Error reading object: {e}")
            })?;

        let content_type = output.content_type().map(str::to_owned);
        let content_length = output.content_length();
        let e_tag = output.e_tag().map(str::to_owned);
        let last_modified = output
            .last_modified()
            .and_then(|t| Utc.timestamp_opt(t.secs(), t.subsec_nanos()).single());

        let body = output
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read body of '{name}'"))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            body,
            content_type,
            content_length,
            e_tag,
            last_modified,
        })
    }
}

/// How a streamed upload is sent, decided from its first part.
#[derive(Debug)]
pub(crate) enum UploadPlan<R> {
    /// The whole stream, shorter than one part.
    Single(Vec<u8>),
    Multipart(Parts<R>),
}

/// Reads the first part of `reader` and picks the upload shape. A stream of
/// exactly one full part still goes multipart.
pub(crate) async fn plan_upload<R>(mut reader: R, part_size: usize) -> Result<UploadPlan<R>>
where
    R: AsyncRead + Unpin,
{
    let first = read_part(&mut reader, part_size).await?;
    if first.len() < part_size {
        return Ok(UploadPlan::Single(first));
    }
    Ok(UploadPlan::Multipart(Parts {
        reader,
        part_size,
        pending: Some(first),
    }))
}

/// The parts of a multipart upload, read lazily from the stream.
#[derive(Debug)]
pub(crate) struct Parts<R> {
    reader: R,
    part_size: usize,
    pending: Option<Vec<u8>>,
}

impl<R: AsyncRead + Unpin> Parts<R> {
    /// Next non-empty part, or `None` at end of stream.
    pub(crate) async fn next_part(&mut self) -> Result<Option<Vec<u8>>> {
        let chunk = match self.pending.take() {
            Some(chunk) => chunk,
            None => read_part(&mut self.reader, self.part_size).await?,
        };
        Ok((!chunk.is_empty()).then_some(chunk))
    }
}

/// Reads up to `limit` bytes, stopping early only at end of stream.
pub(crate) async fn read_part<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(limit.min(PART_SIZE));
    (&mut *reader)
        .take(limit as u64)
        .read_to_end(&mut buffer)
        .await
        .context("failed to read upload stream")?;
    Ok(buffer)
}
