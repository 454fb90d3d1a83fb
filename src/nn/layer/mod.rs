/*
 * @Description  : 网络层。每层是一个纯函数：
 *                 - `forward`：输入 -> 输出；
 *                 - `backward`：(输入, 输出梯度) -> (输入梯度, 参数梯度)。
 *                 层本身不缓存任何中间结果，前向所需的中间量由`Sequential`的`Trace`保存。
 */

mod activation;
mod conv2d;
mod resample;

pub use activation::{LeakyRelu, Relu, Tanh, VggPreprocess};
pub use conv2d::Conv2d;
pub use resample::{MaxPool2d, Upsample2x};

use super::parameter::{Gradients, Parameter};
use crate::errors::TensorError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

/// 单层反向传播的结果
#[derive(Debug, Clone)]
pub struct LayerGrads {
    /// 对该层输入的梯度
    pub input: Tensor,
    /// (参数名, 梯度)；无参数层或未请求参数梯度时为空
    pub params: Vec<(String, Tensor)>,
}

impl LayerGrads {
    pub fn input_only(input: Tensor) -> Self {
        Self {
            input,
            params: vec![],
        }
    }
}

#[enum_dispatch]
pub trait Layer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError>;

    /// `with_params`为false时只计算输入梯度
    fn backward(
        &self,
        input: &Tensor,
        grad_output: &Tensor,
        with_params: bool,
    ) -> Result<LayerGrads, TensorError>;

    fn parameters(&self) -> Vec<&Parameter> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![]
    }
}

#[enum_dispatch(Layer)]
#[derive(Debug, Clone)]
pub enum LayerKind {
    Conv2d,
    LeakyRelu,
    Relu,
    Tanh,
    VggPreprocess,
    MaxPool2d,
    Upsample2x,
}

/// 一次前向计算的轨迹：每层的输入及最终输出
#[derive(Debug, Clone)]
pub struct Trace {
    inputs: Vec<Tensor>,
    output: Tensor,
}

impl Trace {
    pub fn output(&self) -> &Tensor {
        &self.output
    }

    pub fn into_output(self) -> Tensor {
        self.output
    }

    /// 第`index`层的输入（即第`index-1`层的输出）
    pub fn layer_input(&self, index: usize) -> Option<&Tensor> {
        self.inputs.get(index)
    }
}

/// 顺序堆叠的层
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    layers: Vec<LayerKind>,
}

impl Sequential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, layer: impl Into<LayerKind>) -> Self {
        self.layers.push(layer.into());
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    pub fn forward_trace(&self, input: &Tensor) -> Result<Trace, TensorError> {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut x = input.clone();
        for layer in &self.layers {
            let y = layer.forward(&x)?;
            inputs.push(x);
            x = y;
        }
        Ok(Trace { inputs, output: x })
    }

    /// 从输出梯度反向传播到输入。传入`grads`时，参数梯度累加到其中。
    pub fn backward(
        &self,
        trace: &Trace,
        grad_output: &Tensor,
        mut grads: Option<&mut Gradients>,
    ) -> Result<Tensor, TensorError> {
        TensorError::check_same_shape("反向传播的输出梯度", trace.output.shape(), grad_output.shape())?;
        let mut grad = grad_output.clone();
        for (layer, input) in self.layers.iter().zip(&trace.inputs).rev() {
            let layer_grads = layer.backward(input, &grad, grads.is_some())?;
            if let Some(g) = grads.as_deref_mut() {
                for (name, param_grad) in &layer_grads.params {
                    g.accumulate(name, param_grad)?;
                }
            }
            grad = layer_grads.input;
        }
        Ok(grad)
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.parameters_mut())
            .collect()
    }
}
