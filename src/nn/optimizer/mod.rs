mod adam;

pub use adam::Adam;

use super::module::Module;
use super::parameter::Gradients;
use crate::errors::TensorError;

/// 优化器核心 trait
pub trait Optimizer {
    /// 用已算好的梯度更新`module`的参数，只更新`grads`中出现的参数
    fn step(&mut self, module: &mut dyn Module, grads: &Gradients) -> Result<(), TensorError>;

    /// 清空累积状态（矩估计、时间步）
    fn reset(&mut self);

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);
}
