/*
 * @Description  : 损失函数。每个函数都是纯函数，返回标量损失值以及对其可微输入的梯度
 */

mod adversarial;
mod color;
mod perceptual;
mod variation;

pub use adversarial::{
    DiscTermWeights, DiscriminatorLoss, GanVariant, Objective, PenaltyKind, discriminator_loss,
    generator_adversarial_loss,
};
pub use color::{color_loss, rgb_to_yuv};
pub use perceptual::{content_loss, gram, style_loss};
pub use variation::total_variation_loss;

use crate::tensor::Tensor;


/// 一项损失：值及其对输入的梯度
#[derive(Debug, Clone, PartialEq)]
pub struct LossTerm {
    pub value: f32,
    pub grad: Tensor,
}

impl LossTerm {
    /// 损失与梯度同乘以权重
    pub fn weighted(self, weight: f32) -> LossTerm {
        LossTerm {
            value: self.value * weight,
            grad: self.grad * weight,
        }
    }
}
