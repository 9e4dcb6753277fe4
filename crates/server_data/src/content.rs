use std::path::{Path, PathBuf};

use config::Config;
use error_stack::{Result, ResultExt};
use model::AccountId;
use tokio::io::AsyncWriteExt;
use url::Url;

pub const CONTENT_DIR_NAME: &str = "content";

#[derive(thiserror::Error, Debug)]
pub enum FileError {
    #[error("Creating directory failed")]
    IoDirCreate,
    #[error("Writing file failed")]
    IoFileWrite,
    #[error("Creating public URL failed")]
    PublicUrl,
}

/// Accepted images. Files are stored to `<data dir>/content/<account>/<uuid>`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
    public_url: Url,
}

impl ContentStore {
    pub fn new(data_dir: &Path, public_url: Url) -> Self {
        Self {
            dir: data_dir.join(CONTENT_DIR_NAME),
            public_url,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir(), config.data().public_content_url.clone())
    }

    /// Save content and return its public URL.
    pub async fn save(&self, id: AccountId, data: &[u8]) -> Result<Url, FileError> {
        let content_id = uuid::Uuid::new_v4().simple().to_string();
        let account_dir = self.dir.join(id.to_string());

        tokio::fs::create_dir_all(&account_dir)
            .await
            .change_context(FileError::IoDirCreate)?;

        let path = account_dir.join(&content_id);
        let mut file = tokio::fs::File::create(&path)
            .await
            .change_context(FileError::IoFileWrite)?;
        file.write_all(data)
            .await
            .change_context(FileError::IoFileWrite)?;
        file.flush().await.change_context(FileError::IoFileWrite)?;

        self.public_url(id, &content_id)
    }

    fn public_url(&self, id: AccountId, content_id: &str) -> Result<Url, FileError> {
        let base = self.public_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}/{}", base, id, content_id))
            .change_context(FileError::PublicUrl)
    }

    pub fn content_path(&self, id: AccountId, content_id: &str) -> PathBuf {
        self.dir.join(id.to_string()).join(content_id)
    }
}
