//! CV upload against the hosted blob store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::IntakeConfig;
use crate::identity::IdentityId;

pub const CV_BUCKET: &str = "cvs";

/// Blob store port. Paths are relative to the bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), BlobError>;
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("object already exists")]
    AlreadyExists,
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("only PDF files are accepted")]
    NotPdf,
    #[error("file belongs to another owner")]
    NotOwner,
    #[error("upload failed: {0}")]
    Transient(#[from] BlobError),
}

impl UploadError {
    pub fn user_message(&self) -> String {
        match self {
            UploadError::TooLarge { max_bytes } => {
                format!(
                    "O arquivo deve ter no máximo {}MB",
                    max_bytes / (1024 * 1024)
                )
            }
            UploadError::NotPdf => "Apenas arquivos PDF são aceitos".to_string(),
            UploadError::NotOwner => "Você não pode remover este arquivo".to_string(),
            UploadError::Transient(_) => "Erro ao fazer upload. Tente novamente.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCv {
    pub path: String,
    pub public_url: String,
    pub file_name: String,
}

static UPLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Enforces the single-PDF rules and names objects per owner.
pub struct CvUploader<B> {
    blobs: Arc<B>,
    max_bytes: u64,
    public_base: String,
}

impl<B> CvUploader<B>
where
    B: BlobStore + 'static,
{
    pub fn new(blobs: Arc<B>, config: &IntakeConfig) -> Self {
        Self {
            blobs,
            max_bytes: config.cv_max_bytes,
            public_base: config.storage_public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub async fn upload(
        &self,
        owner: Option<&IdentityId>,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<StoredCv, UploadError> {
        if bytes.len() as u64 > self.max_bytes {
            return Err(UploadError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }
        if !is_pdf(file_name, content_type) {
            return Err(UploadError::NotPdf);
        }

        let path = object_path(owner);
        self.blobs
            .upload(CV_BUCKET, &path, mime::APPLICATION_PDF.as_ref(), bytes)
            .await
            .map_err(|err| {
                warn!(%path, error = %err, "cv upload failed");
                UploadError::from(err)
            })?;

        info!(%path, "cv uploaded");
        Ok(StoredCv {
            public_url: format!("{}/{}/{}", self.public_base, CV_BUCKET, path),
            path,
            file_name: file_name.to_string(),
        })
    }

    /// Remove a previously uploaded CV by its public URL. URLs outside the bucket are ignored;
    /// objects outside the caller's folder are refused.
    pub async fn remove(
        &self,
        owner: Option<&IdentityId>,
        public_url: &str,
    ) -> Result<(), UploadError> {
        let Some(path) = path_from_public_url(public_url) else {
            return Ok(());
        };
        let folder = owner.map_or_else(|| "anonymous".to_string(), IdentityId::to_string);
        if !is_plain_path(&path) || !path.starts_with(&format!("{folder}/")) {
            warn!(%path, "cv removal outside caller folder refused");
            return Err(UploadError::NotOwner);
        }
        self.blobs.remove(CV_BUCKET, &[path.clone()]).await?;
        info!(%path, "cv removed");
        Ok(())
    }
}

fn is_pdf(file_name: &str, content_type: Option<&str>) -> bool {
    let declared = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse::<mime::Mime>().ok());

    match declared {
        Some(mime) => mime.essence_str() == mime::APPLICATION_PDF.essence_str(),
        None => mime_guess::from_path(file_name)
            .first()
            .map(|guess| guess.essence_str() == mime::APPLICATION_PDF.essence_str())
            .unwrap_or(false),
    }
}

fn object_path(owner: Option<&IdentityId>) -> String {
    let millis = Utc::now().timestamp_millis();
    match owner {
        Some(owner) => format!("{owner}/{millis}.pdf"),
        None => {
            let suffix = UPLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
            format!("anonymous/{millis}-{suffix:x}.pdf")
        }
    }
}

/// Object paths are plain `folder/name` segments; no traversal or empty parts.
fn is_plain_path(path: &str) -> bool {
    path.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

pub(crate) fn path_from_public_url(public_url: &str) -> Option<String> {
    let marker = format!("/{CV_BUCKET}/");
    public_url
        .split_once(&marker)
        .map(|(_, path)| path.to_string())
        .filter(|path| !path.is_empty())
}
