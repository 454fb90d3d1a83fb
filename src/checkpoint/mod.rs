/*
 * @Description  : 训练检查点的存取。
 *                 每个检查点保存两个网络的参数与两个对抗阶段优化器的状态，
 *                 以`(模型标识, epoch)`为键，写入`{目录}/ckpt-{epoch:06}.bin`。
 *
 * 文件格式：4字节魔数 + 4字节（小端）格式版本号 + bincode编码的`Checkpoint`。
 * 写入时先写临时文件再重命名，避免中断时留下半个文件。
 */

use crate::nn::{Adam, StateDict};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};


const MAGIC: &[u8; 4] = b"AGv2";
const FORMAT_VERSION: u32 = 1;
/// 最多保留的检查点个数
pub const MAX_TO_KEEP: usize = 5;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("检查点IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("检查点编解码失败: {0}")]
    Codec(#[from] bincode::Error),
    #[error("不是检查点文件: {0}")]
    BadMagic(PathBuf),
    #[error("不支持的检查点格式版本: {0}")]
    UnsupportedVersion(u32),
    #[error("检查点属于模型`{found}`，当前模型为`{expected}`")]
    IdentityMismatch { expected: String, found: String },
}

/// 一次完整的训练快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub identity: String,
    /// 已完成的epoch（从0计）
    pub epoch: usize,
    pub generator: StateDict,
    pub discriminator: StateDict,
    pub g_optimizer: Adam,
    pub d_optimizer: Adam,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    identity: String,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, identity: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            identity: identity.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("ckpt-{epoch:06}.bin"))
    }

    /// 写入检查点并淘汰多余的旧检查点，返回写入的路径。
    /// epoch大于本次的文件来自更早的某次运行（已无法载入，否则训练会从其之后继续），一并删除。
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        if checkpoint.identity != self.identity {
            return Err(CheckpointError::IdentityMismatch {
                expected: self.identity.clone(),
                found: checkpoint.identity.clone(),
            });
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(checkpoint.epoch);
        let tmp = path.with_extension("bin.tmp");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bincode::serialize_into(&mut bytes, checkpoint)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        self.evict(checkpoint.epoch)?;
        Ok(path)
    }

    /// 按epoch从新到旧尝试，返回第一个能解码且标识一致的检查点。目录不存在时返回None
    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        for (epoch, path) in self.list()?.into_iter().rev() {
            match self.read(&path) {
                Ok(checkpoint) => return Ok(Some(checkpoint)),
                Err(e) => warn!("跳过无法使用的检查点（epoch {epoch}）{}: {e}", path.display()),
            }
        }
        Ok(None)
    }

    /// 读取并校验单个检查点文件
    pub fn read(&self, path: &Path) -> Result<Checkpoint, CheckpointError> {
        let bytes = fs::read(path)?;
        if bytes.len() < 8 || &bytes[..4] != MAGIC {
            return Err(CheckpointError::BadMagic(path.to_path_buf()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[4..8]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion(version));
        }
        let checkpoint: Checkpoint = bincode::deserialize(&bytes[8..])?;
        if checkpoint.identity != self.identity {
            return Err(CheckpointError::IdentityMismatch {
                expected: self.identity.clone(),
                found: checkpoint.identity,
            });
        }
        Ok(checkpoint)
    }

    /// 目录中的检查点文件，按epoch升序
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>, CheckpointError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let epoch = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("ckpt-"))
                .and_then(|n| n.strip_suffix(".bin"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(epoch) = epoch {
                found.push((epoch, path));
            }
        }
        found.sort();
        Ok(found)
    }

    /// 刚写入的`saved_epoch`始终保留
    fn evict(&self, saved_epoch: usize) -> Result<(), CheckpointError> {
        let (stale, kept): (Vec<_>, Vec<_>) = self.list()?.into_iter().partition(|(e, _)| *e > saved_epoch);
        for (epoch, path) in stale {
            fs::remove_file(&path)?;
            warn!("删除过期的检查点 epoch {epoch}（新于刚保存的 epoch {saved_epoch}）");
        }
        let excess = kept.len().saturating_sub(MAX_TO_KEEP);
        for (epoch, path) in kept.into_iter().filter(|(e, _)| *e != saved_epoch).take(excess) {
            fs::remove_file(&path)?;
            debug!("删除旧检查点 epoch {epoch}");
        }
        Ok(())
    }
}
