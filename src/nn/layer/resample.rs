/*
 * @Description  : 改变空间尺寸的无参数层（NHWC）
 *                 - MaxPool2d：2x2窗口、步长2，奇数尺寸时丢弃最后一行/列（同 VGG 的 "VALID" 池化）；
 *                 - Upsample2x：最近邻插值放大2倍。
 */

use super::{Layer, LayerGrads};
use crate::errors::TensorError;
use crate::tensor::Tensor;

fn nhwc(context: &str, shape: &[usize]) -> Result<[usize; 4], TensorError> {
    TensorError::check_dims(context, shape, 4)?;
    Ok([shape[0], shape[1], shape[2], shape[3]])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPool2d;

impl MaxPool2d {
    /// 对每个输出元素返回其在输入中取到最大值的下标
    fn argmax(input: &Tensor) -> Result<(Vec<usize>, [usize; 4]), TensorError> {
        let [n, h, w, c] = nhwc("MaxPool2d 输入 [batch, H, W, C]", input.shape())?;
        let (oh, ow) = (h / 2, w / 2);
        if oh == 0 || ow == 0 {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "MaxPool2d 输入的高与宽".to_string(),
                operator: crate::errors::ComparisonOperator::GreaterOrEqual,
                threshold: 2,
            });
        }
        let x = input.to_vec();
        let mut indices = Vec::with_capacity(n * oh * ow * c);
        for bi in 0..n {
            for oy in 0..oh {
                for ox in 0..ow {
                    for ci in 0..c {
                        let mut best = ((bi * h + 2 * oy) * w + 2 * ox) * c + ci;
                        for (dy, dx) in [(0, 1), (1, 0), (1, 1)] {
                            let idx = ((bi * h + 2 * oy + dy) * w + 2 * ox + dx) * c + ci;
                            if x[idx] > x[best] {
                                best = idx;
                            }
                        }
                        indices.push(best);
                    }
                }
            }
        }
        Ok((indices, [n, oh, ow, c]))
    }
}

impl Layer for MaxPool2d {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let (indices, shape) = Self::argmax(input)?;
        let x = input.to_vec();
        Tensor::from_vec(indices.iter().map(|&i| x[i]).collect(), &shape)
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        let (indices, shape) = Self::argmax(input)?;
        TensorError::check_same_shape("MaxPool2d 输出梯度", &shape, grad_output.shape())?;
        let mut grad = vec![0.0f32; input.size()];
        for (&i, g) in indices.iter().zip(grad_output.to_vec()) {
            grad[i] += g;
        }
        Ok(LayerGrads::input_only(Tensor::from_vec(grad, input.shape())?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Upsample2x;

impl Layer for Upsample2x {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let [n, h, w, c] = nhwc("Upsample2x 输入 [batch, H, W, C]", input.shape())?;
        let x = input.to_vec();
        let mut out = Vec::with_capacity(n * 4 * h * w * c);
        for bi in 0..n {
            for oy in 0..2 * h {
                for ox in 0..2 * w {
                    let offset = ((bi * h + oy / 2) * w + ox / 2) * c;
                    out.extend_from_slice(&x[offset..offset + c]);
                }
            }
        }
        Tensor::from_vec(out, &[n, 2 * h, 2 * w, c])
    }

    fn backward(&self, input: &Tensor, grad_output: &Tensor, _: bool) -> Result<LayerGrads, TensorError> {
        let [n, h, w, c] = nhwc("Upsample2x 输入 [batch, H, W, C]", input.shape())?;
        TensorError::check_same_shape("Upsample2x 输出梯度", &[n, 2 * h, 2 * w, c], grad_output.shape())?;
        let gy = grad_output.to_vec();
        let mut grad = vec![0.0f32; input.size()];
        for bi in 0..n {
            for oy in 0..2 * h {
                for ox in 0..2 * w {
                    let src = ((bi * 2 * h + oy) * 2 * w + ox) * c;
                    let dst = ((bi * h + oy / 2) * w + ox / 2) * c;
                    for ci in 0..c {
                        grad[dst + ci] += gy[src + ci];
                    }
                }
            }
        }
        Ok(LayerGrads::input_only(Tensor::from_vec(grad, input.shape())?))
    }
}
