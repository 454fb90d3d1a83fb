/*
 * @Description  : 训练数据：图像批次来源与风格图的边缘平滑预处理
 */

mod error;
pub mod smooth;
mod source;

pub use error::DataError;
pub use smooth::{edge_smooth_dir, smooth_edges};
pub use source::{ImageBatch, ImageFolder, ImageSource, TensorSource};
