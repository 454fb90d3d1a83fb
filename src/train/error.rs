use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::data::DataError;
use crate::errors::TensorError;
use crate::export::ExportError;
use crate::nn::WeightsError;
use thiserror::Error;

/// 训练过程中的致命错误
#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Weights(#[from] WeightsError),
    #[error("每个epoch的步数为0：照片{photos}张、风格图{styles}张，批大小为{batch_size}")]
    NoSteps {
        photos: usize,
        styles: usize,
        batch_size: usize,
    },
    #[error("epoch {epoch} 第{step}步出现非有限值：{what}")]
    NonFinite { epoch: usize, step: usize, what: String },
}
