/*
 * @Description  : 无参数的逐元素层：激活函数及VGG输入预处理
 */

use super::{Layer, LayerGrads};
use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    negative_slope: f32,
}

impl LeakyRelu {
    pub fn new(negative_slope: f32) -> Self {
        Self { negative_slope }
    }
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Layer for LeakyRelu {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let slope = self.negative_slope;
        Ok(input.map(|x| if x > 0.0 { x } else { slope * x }))
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        let slope = self.negative_slope;
        let grad = input.zip_map(grad_output, Operator::Mul, |x, g| if x > 0.0 { g } else { slope * g })?;
        Ok(LayerGrads::input_only(grad))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl Layer for Relu {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        let grad = input.zip_map(grad_output, Operator::Mul, |x, g| if x > 0.0 { g } else { 0.0 })?;
        Ok(LayerGrads::input_only(grad))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Layer for Tanh {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        Ok(input.map(f32::tanh))
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        let grad = input.zip_map(grad_output, Operator::Mul, |x, g| {
            let y = x.tanh();
            (1.0 - y * y) * g
        })?;
        Ok(LayerGrads::input_only(grad))
    }
}

/// VGG 输入预处理：[-1, 1] 的 RGB 图像 -> [0, 255] 的 BGR 图像再减去各通道均值
#[derive(Debug, Clone, Copy, Default)]
pub struct VggPreprocess;

impl VggPreprocess {
    /// B、G、R 三通道的均值
    pub const BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];
    const SCALE: f32 = 127.5;

    fn check(shape: &[usize]) -> Result<(), TensorError> {
        match shape.last() {
            Some(3) => Ok(()),
            _ => Err(TensorError::ShapeMismatch {
                context: "VGG 预处理要求最后一维为RGB三通道".to_string(),
                expected: vec![3],
                got: shape.last().map(|&c| vec![c]).unwrap_or_default(),
            }),
        }
    }
}

impl Layer for VggPreprocess {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        Self::check(input.shape())?;
        let data = input
            .to_vec()
            .chunks_exact(3)
            .flat_map(|rgb| {
                [
                    (rgb[2] + 1.0) * Self::SCALE - Self::BGR_MEAN[0],
                    (rgb[1] + 1.0) * Self::SCALE - Self::BGR_MEAN[1],
                    (rgb[0] + 1.0) * Self::SCALE - Self::BGR_MEAN[2],
                ]
            })
            .collect();
        Tensor::from_vec(data, input.shape())
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        Self::check(input.shape())?;
        TensorError::check_same_shape("VGG 预处理的输出梯度", input.shape(), grad_output.shape())?;
        let data = grad_output
            .to_vec()
            .chunks_exact(3)
            .flat_map(|bgr| [bgr[2] * Self::SCALE, bgr[1] * Self::SCALE, bgr[0] * Self::SCALE])
            .collect();
        Ok(LayerGrads::input_only(Tensor::from_vec(data, input.shape())?))
    }
}
