//! 数据加载错误类型定义

use crate::errors::TensorError;
use std::path::PathBuf;
use thiserror::Error;

/// 数据加载相关错误
#[derive(Debug, Error)]
pub enum DataError {
    /// 目录不存在
    #[error("目录未找到: {0}")]
    DirNotFound(PathBuf),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 图像解码/编码错误
    #[error("图像读写失败（{path}）: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 数据源中没有任何图像
    #[error("目录中没有图像: {0}")]
    Empty(PathBuf),

    /// 图像数少于一个批次
    #[error("图像数不足一个批次: {dir}中只有{found}张，批大小为{batch_size}")]
    NotEnoughImages {
        dir: PathBuf,
        found: usize,
        batch_size: usize,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
