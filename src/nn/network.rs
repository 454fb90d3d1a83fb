/*
 * @Description  : 训练器所依赖的三类网络的调用约定。
 *                 训练器只通过这些trait访问网络，网络的具体结构对其不可见。
 *
 * 反向传播采用"轨迹 + 向量-雅可比积"的形式：
 * 1. `forward_trace`做前向计算并保存反向传播所需的中间结果；
 * 2. `backward`以输出梯度为输入，返回输入梯度，并（按需）把参数梯度累加到`Gradients`中。
 */

use super::module::Module;
use super::parameter::Gradients;
use crate::errors::TensorError;
use crate::tensor::Tensor;

/// 前向轨迹，至少能给出网络的输出
pub trait NetworkTrace {
    fn output(&self) -> &Tensor;
}

impl NetworkTrace for super::layer::Trace {
    fn output(&self) -> &Tensor {
        super::layer::Trace::output(self)
    }
}

/// 生成器：照片批次 -> 同形状的风格化图像批次
pub trait Generator: Module {
    type Trace: NetworkTrace;

    fn generate(&self, photo: &Tensor) -> Result<Tensor, TensorError>;

    fn forward_trace(&self, photo: &Tensor) -> Result<Self::Trace, TensorError>;

    /// 将`grad_output`（对生成图像的梯度）反传，参数梯度累加到`grads`
    fn backward(
        &self,
        trace: &Self::Trace,
        grad_output: &Tensor,
        grads: &mut Gradients,
    ) -> Result<(), TensorError>;
}

/// 判别器的输出：真实度logit，以及辅助特征（倒数第二层激活）
#[derive(Debug, Clone)]
pub struct DiscriminatorOutput {
    pub logit: Tensor,
    pub features: Tensor,
}

/// 判别器：图像批次 -> 真实度logit
pub trait Discriminator: Module {
    /// 轨迹的输出即logit
    type Trace: NetworkTrace;

    fn discriminate(&self, image: &Tensor) -> Result<DiscriminatorOutput, TensorError>;

    fn forward_trace(&self, image: &Tensor) -> Result<Self::Trace, TensorError>;

    /// 将对logit的梯度反传，返回对输入图像的梯度。
    /// `grads`为None时不计算参数梯度（如生成器更新时，梯度只需流经判别器）。
    fn backward(
        &self,
        trace: &Self::Trace,
        grad_logit: &Tensor,
        grads: Option<&mut Gradients>,
    ) -> Result<Tensor, TensorError>;
}

/// 感知特征提取器（参数冻结）
pub trait FeatureExtractor {
    type Trace: NetworkTrace;

    fn extract(&self, image: &Tensor) -> Result<Tensor, TensorError>;

    fn extract_trace(&self, image: &Tensor) -> Result<Self::Trace, TensorError>;

    /// 对特征的梯度 -> 对输入图像的梯度
    fn backward(&self, trace: &Self::Trace, grad_features: &Tensor) -> Result<Tensor, TensorError>;
}
