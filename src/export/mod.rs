/*
 * @Description  : 训练过程中的导出：
 *                 1. 验证集推理结果：`{样本目录}/{epoch:03}/{i:03}_a.jpg`（输入）与`{i:03}_b.jpg`（输出）；
 *                 2. 仅供推理的生成器参数：`generated.npz`（每个参数一个数组）及说明文件`generated.json`。
 */

use crate::data::DataError;
use crate::errors::TensorError;
use crate::nn::Generator;
use crate::tensor::Tensor;
use crate::vision::Vision;
use ndarray_npy::{NpzWriter, WriteNpzError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
mod tests;

pub const NPZ_FILE: &str = "generated.npz";
pub const MANIFEST_FILE: &str = "generated.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("导出IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("写入npz失败: {0}")]
    Npz(#[from] WriteNpzError),
    #[error("写入说明文件失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// 生成器导出的说明文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub identity: String,
    pub epoch: usize,
    pub img_size: [usize; 2],
    pub img_ch: usize,
    /// 参数名 -> 形状
    pub parameters: BTreeMap<String, Vec<usize>>,
}

/// 对固定的验证图像集做推理并保存结果
#[derive(Debug, Clone)]
pub struct ValidationExporter {
    files: Vec<PathBuf>,
    img_size: [usize; 2],
    sample_dir: PathBuf,
}

impl ValidationExporter {
    /// 验证图像按文件名排序；`val_dir`不存在或为空时得到一个不导出任何图像的导出器
    pub fn new(val_dir: &Path, img_size: [usize; 2], sample_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let files = if val_dir.is_dir() {
            Vision::list_images(val_dir)?
        } else {
            Vec::new()
        };
        Ok(Self {
            files,
            img_size,
            sample_dir: sample_dir.into(),
        })
    }

    pub fn num_images(&self) -> usize {
        self.files.len()
    }

    pub fn epoch_dir(&self, epoch: usize) -> PathBuf {
        self.sample_dir.join(format!("{epoch:03}"))
    }

    /// 返回写出的图像对数
    pub fn export<G: Generator>(&self, generator: &G, epoch: usize) -> Result<usize, ExportError> {
        let dir = self.epoch_dir(epoch);
        fs::create_dir_all(&dir)?;
        for (i, file) in self.files.iter().enumerate() {
            let input = Vision::load_resized(file, self.img_size)?;
            let batch = Tensor::stack(&[Tensor::from_rgb_image(&input)])?;
            let output = generator.generate(&batch)?.to_rgb_image()?;
            Vision::save(&input, &dir.join(format!("{i:03}_a.jpg")))?;
            Vision::save(&output, &dir.join(format!("{i:03}_b.jpg")))?;
        }
        Ok(self.files.len())
    }
}

/// 覆盖写出生成器的推理用参数及说明文件，返回npz路径
pub fn export_generator<G: Generator>(
    generator: &G,
    export_dir: &Path,
    identity: &str,
    epoch: usize,
    img_size: [usize; 2],
    img_ch: usize,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(export_dir)?;
    let state = generator.state_dict();

    let npz_path = export_dir.join(NPZ_FILE);
    let mut npz = NpzWriter::new(File::create(&npz_path)?);
    for (name, value) in &state {
        npz.add_array(name.as_str(), value.data())?;
    }
    npz.finish()?;

    let manifest = ExportManifest {
        identity: identity.to_string(),
        epoch,
        img_size,
        img_ch,
        parameters: state
            .iter()
            .map(|(name, value)| (name.clone(), value.shape().to_vec()))
            .collect(),
    };
    fs::write(export_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
    Ok(npz_path)
}
