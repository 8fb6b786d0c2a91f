// 图片上传存储
// 上传数量、大小和类型的限制属于存储层，业务层只关心返回的访问地址

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use sha2::{Digest, Sha256};

/// 允许的图片类型及其文件扩展名
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    Rejected(String),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

impl UploadLimits {
    /// 单次请求允许的最大请求体
    pub fn max_request_bytes(&self) -> usize {
        self.max_files * self.max_file_bytes + 1024 * 1024
    }
}

fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
    let content_type = content_type?.split(';').next()?.trim();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(content_type))
        .map(|(_, ext)| *ext)
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    fn limits(&self) -> UploadLimits;

    /// 一批上传中任一文件不合规则整批拒绝
    fn check(&self, uploads: &[Upload]) -> Result<(), StorageError> {
        let limits = self.limits();
        if uploads.len() > limits.max_files {
            return Err(StorageError::Rejected(format!(
                "at most {} files may be uploaded at once",
                limits.max_files
            )));
        }
        for upload in uploads {
            let name = upload.file_name.as_deref().unwrap_or("upload");
            if extension_for(upload.content_type.as_deref()).is_none() {
                return Err(StorageError::Rejected(format!(
                    "{name}: only jpeg, png, gif and webp images are accepted"
                )));
            }
            if upload.bytes.len() > limits.max_file_bytes {
                return Err(StorageError::Rejected(format!(
                    "{name}: file exceeds {} bytes",
                    limits.max_file_bytes
                )));
            }
        }
        Ok(())
    }

    /// 保存文件并返回可长期访问的地址
    async fn store(&self, upload: &Upload) -> Result<String, StorageError>;
}

/// 本地磁盘存储，文件名取内容的 SHA-256，重复上传同一图片只保留一份
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
    limits: UploadLimits,
}

impl LocalFileStorage {
    pub fn new(root: impl AsRef<Path>, public_base_url: &str, limits: UploadLimits) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            limits,
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    fn limits(&self) -> UploadLimits {
        self.limits
    }

    async fn store(&self, upload: &Upload) -> Result<String, StorageError> {
        let ext = extension_for(upload.content_type.as_deref())
            .ok_or_else(|| StorageError::Rejected("unsupported content type".into()))?;
        let digest = Sha256::digest(&upload.bytes);
        let file_name = format!("{digest:x}.{ext}");

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), &upload.bytes).await?;

        tracing::debug!(
            file = %file_name,
            size = upload.bytes.len(),
            original = upload.file_name.as_deref().unwrap_or(""),
            "stored upload"
        );
        Ok(format!("{}/uploads/{}", self.public_base_url, file_name))
    }
}
