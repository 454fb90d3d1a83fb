/*
 * @Description  : 张量：对`ndarray`动态维数组的轻量封装。
 *                 本库中图像批次一律采用NHWC布局（[batch, 高, 宽, 通道]），像素值归一化到[-1, 1]。
 */

use ndarray::{Array, ArrayD, IxDyn};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod image;
mod ops;
mod property;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：只要通Tensor初始化的都是张量（即使标量也是张量）；
/// 而通常意义上的数字（类型为usize、i32、f64等）就只是纯数（number），在这里不被认为是张量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量，`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    /// 库内部由计算得到的数据请使用[`Tensor::from_vec`]。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        match Self::from_vec(data.to_vec(), shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{e}"),
        }
    }

    /// 由拥有所有权的数据创建张量，长度与形状不符时返回错误
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Tensor, TensorError> {
        let len = data.len();
        let data = Array::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            TensorError::DataLengthMismatch {
                len,
                shape: shape.to_vec(),
            }
        })?;
        Ok(Tensor { data })
    }

    pub fn from_array(data: ArrayD<f32>) -> Tensor {
        Tensor { data }
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Tensor {
        Self::full(1.0, shape)
    }

    pub fn full(value: f32, shape: &[usize]) -> Tensor {
        Tensor {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个随机张量，其值服从[min, max)上的均匀分布。
    /// 随机源由调用方传入，以便训练过程可通过种子复现。
    pub fn uniform<R: Rng + ?Sized>(min: f32, max: f32, shape: &[usize], rng: &mut R) -> Tensor {
        let dist = Uniform::new(min, max);
        Tensor {
            data: ArrayD::from_shape_fn(IxDyn(shape), |_| dist.sample(rng)),
        }
    }

    /// 创建一个服从正态分布的随机张量（Box-Muller变换）
    pub fn normal<R: Rng + ?Sized>(mean: f32, std_dev: f32, shape: &[usize], rng: &mut R) -> Tensor {
        let dist = Uniform::new(f32::EPSILON, 1.0);
        let data = ArrayD::from_shape_fn(IxDyn(shape), |_| {
            let u1 = dist.sample(rng);
            let u2 = dist.sample(rng);
            let r = (-2.0 * u1.ln()).sqrt();
            mean + std_dev * r * (2.0 * std::f32::consts::PI * u2).cos()
        });
        Tensor { data }
    }

    /// 沿首个维度将形状一致的张量堆叠成一个批次
    pub fn stack(tensors: &[Tensor]) -> Result<Tensor, TensorError> {
        let first = tensors.first().ok_or(TensorError::EmptyList)?;
        for t in tensors {
            TensorError::check_same_shape("堆叠张量", first.shape(), t.shape())?;
        }
        let views = tensors.iter().map(|t| t.data.view()).collect::<Vec<_>>();
        let data = ndarray::stack(ndarray::Axis(0), &views).map_err(|_| {
            TensorError::ShapeMismatch {
                context: "堆叠张量".to_string(),
                expected: first.shape().to_vec(),
                got: vec![],
            }
        })?;
        Ok(Tensor { data })
    }
}
