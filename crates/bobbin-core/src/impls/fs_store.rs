//! FileSystemExecutionStore - ローカルディレクトリに snapshot を保存する store
//!
//! # レイアウト
//! ```text
//! <root>/<execution_id>/<worker_id>.json        shard snapshot（上書き）
//! <root>/<execution_id>/meta/exceptions.jsonl   exception log（1 行 1 record、append のみ）
//! ```
//!
//! # 学習ポイント
//! - 一時ファイルに書いてから rename することで、snapshot の上書きを atomic にする
//! - append は `tokio::sync::Mutex` で直列化（record が途中で混ざらない）

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{ExecutionId, ExecutionState, TaskException, TaskInput, WorkerId};
use crate::ports::{ExecutionStore, StoreError};

const META_DIR: &str = "meta";
const EXCEPTIONS_FILE: &str = "exceptions.jsonl";
const SNAPSHOT_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Store rooted at a local directory.
pub struct FileSystemExecutionStore {
    root: PathBuf,
    append_lock: Mutex<()>,
}

impl FileSystemExecutionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn execution_dir(&self, execution_id: ExecutionId) -> PathBuf {
        self.root.join(execution_id.to_string())
    }

    fn snapshot_path(&self, execution_id: ExecutionId, worker_id: WorkerId) -> PathBuf {
        self.execution_dir(execution_id)
            .join(format!("{worker_id}.{SNAPSHOT_EXTENSION}"))
    }

    fn exceptions_path(&self, execution_id: ExecutionId) -> PathBuf {
        self.execution_dir(execution_id)
            .join(META_DIR)
            .join(EXCEPTIONS_FILE)
    }

    /// Worker id encoded in a snapshot file name (`<id>.json`).
    fn worker_id_of(path: &Path) -> Option<WorkerId> {
        if path.extension()? != SNAPSHOT_EXTENSION {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }

    /// Executions present under the root, most recent first.
    pub async fn list_executions(&self) -> Result<Vec<ExecutionId>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut executions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<ExecutionId>().ok()) {
                executions.push(id);
            }
        }
        executions.sort_by(|a, b| b.cmp(a));
        Ok(executions)
    }
}

#[async_trait]
impl<I: TaskInput> ExecutionStore<I> for FileSystemExecutionStore {
    async fn store_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
        state: &ExecutionState<I>,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(self.execution_dir(execution_id)).await?;

        let path = self.snapshot_path(execution_id, worker_id);
        let temp_path = path.with_extension(format!("{SNAPSHOT_EXTENSION}.{TEMP_EXTENSION}"));
        let bytes = serde_json::to_vec(state)?;

        fs::write(&temp_path, bytes).await?;
        fs::rename(&temp_path, &path).await?;
        debug!(path = %path.display(), "stored worker state");
        Ok(())
    }

    async fn load_worker_state(
        &self,
        execution_id: ExecutionId,
        worker_id: WorkerId,
    ) -> Result<ExecutionState<I>, StoreError> {
        let path = self.snapshot_path(execution_id, worker_id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    execution_id,
                    worker_id: Some(worker_id),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn list_worker_ids(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<WorkerId>, StoreError> {
        let mut entries = match fs::read_dir(self.execution_dir(execution_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    execution_id,
                    worker_id: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        // `meta/` and leftover temp files from an interrupted write are skipped.
        let mut worker_ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(worker_id) = Self::worker_id_of(&entry.path()) {
                worker_ids.push(worker_id);
            }
        }
        Ok(worker_ids)
    }

    async fn store_task_exception(
        &self,
        execution_id: ExecutionId,
        exception: &TaskException,
    ) -> Result<(), StoreError> {
        let path = self.exceptions_path(execution_id);
        let mut line = serde_json::to_vec(exception)?;
        line.push(b'\n');

        let _guard = self.append_lock.lock().await;
        if let Some(meta_dir) = path.parent() {
            fs::create_dir_all(meta_dir).await?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_task_exceptions(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<TaskException>, StoreError> {
        let path = self.exceptions_path(execution_id);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = BufReader::new(file).lines();
        let mut exceptions = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            exceptions.push(serde_json::from_str(&line)?);
        }
        Ok(exceptions)
    }
}
