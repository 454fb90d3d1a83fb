/*
 * @Description  : 2D 卷积层（NHWC 布局，"same"填充）
 *
 * - 输入: [batch, H, W, C_in]
 * - 卷积核: [kH, kW, C_in, C_out]（HWIO），偏置: [C_out]
 * - 输出: [batch, ceil(H/s), ceil(W/s), C_out]
 * - 填充规则与 TensorFlow 的 "SAME" 一致：总填充量为 max((out-1)*s + k - in, 0)，多出的一格补在下/右侧
 * - 使用 Rayon 在 batch 维度并行
 */

use super::{Layer, LayerGrads};
use crate::errors::TensorError;
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;
use rand::Rng;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct Conv2d {
    weight: Parameter,
    bias: Parameter,
    kernel_size: (usize, usize),
    stride: usize,
}

/// 一次卷积计算涉及的各项尺寸
#[derive(Debug, Clone, Copy)]
struct Geometry {
    batch: usize,
    in_h: usize,
    in_w: usize,
    in_c: usize,
    out_h: usize,
    out_w: usize,
    out_c: usize,
    pad_top: usize,
    pad_left: usize,
}

impl Geometry {
    /// 输出位置(oy, ox)在卷积核位置(ky, kx)处对应的输入坐标，落在填充区时返回None
    fn input_coord(&self, stride: usize, oy: usize, ox: usize, ky: usize, kx: usize) -> Option<(usize, usize)> {
        let iy = (oy * stride + ky).checked_sub(self.pad_top)?;
        let ix = (ox * stride + kx).checked_sub(self.pad_left)?;
        (iy < self.in_h && ix < self.in_w).then_some((iy, ix))
    }
}

fn same_padding(input: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let output = input.div_ceil(stride);
    let total = (output.saturating_sub(1) * stride + kernel).saturating_sub(input);
    (output, total / 2)
}

impl Conv2d {
    /// 以正态分布N(0, 0.02)初始化卷积核，偏置为0。`stride`须不小于1
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        rng: &mut R,
    ) -> Self {
        let weight = Tensor::normal(
            0.0,
            0.02,
            &[kernel_size, kernel_size, in_channels, out_channels],
            rng,
        );
        assert!(stride >= 1, "卷积步长须不小于1");
        Self {
            weight: Parameter::new(format!("{name}.weight"), weight),
            bias: Parameter::new(format!("{name}.bias"), Tensor::zeros(&[out_channels])),
            kernel_size: (kernel_size, kernel_size),
            stride,
        }
    }

    /// 由已有的卷积核与偏置构建（如从预训练权重文件载入）
    pub fn from_tensors(
        name: &str,
        weight: Tensor,
        bias: Tensor,
        stride: usize,
    ) -> Result<Self, TensorError> {
        TensorError::check_dims("卷积核", weight.shape(), 4)?;
        let (kh, kw, out_c) = (weight.shape()[0], weight.shape()[1], weight.shape()[3]);
        TensorError::check_same_shape("卷积偏置", &[out_c], bias.shape())?;
        if stride == 0 {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "卷积步长".to_string(),
                operator: crate::errors::ComparisonOperator::GreaterOrEqual,
                threshold: 1,
            });
        }
        Ok(Self {
            weight: Parameter::new(format!("{name}.weight"), weight),
            bias: Parameter::new(format!("{name}.bias"), bias),
            kernel_size: (kh, kw),
            stride,
        })
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    fn geometry(&self, input_shape: &[usize]) -> Result<Geometry, TensorError> {
        TensorError::check_dims("Conv2d 输入 [batch, H, W, C]", input_shape, 4)?;
        let w_shape = self.weight.value().shape();
        let (in_c, out_c) = (w_shape[2], w_shape[3]);
        if input_shape[3] != in_c {
            return Err(TensorError::ShapeMismatch {
                context: format!("{} 的输入通道数", self.weight.name()),
                expected: vec![in_c],
                got: vec![input_shape[3]],
            });
        }
        let (kh, kw) = self.kernel_size;
        let (out_h, pad_top) = same_padding(input_shape[1], kh, self.stride);
        let (out_w, pad_left) = same_padding(input_shape[2], kw, self.stride);
        Ok(Geometry {
            batch: input_shape[0],
            in_h: input_shape[1],
            in_w: input_shape[2],
            in_c,
            out_h,
            out_w,
            out_c,
            pad_top,
            pad_left,
        })
    }
}

impl Layer for Conv2d {
    fn forward(&self, input: &Tensor) -> Result<Tensor, TensorError> {
        let g = self.geometry(input.shape())?;
        let (kh, kw) = self.kernel_size;
        let stride = self.stride;
        let x = input.to_vec();
        let weight = self.weight.value().to_vec();
        let bias = self.bias.value().to_vec();
        let sample_in = g.in_h * g.in_w * g.in_c;

        let per_sample: Vec<Vec<f32>> = (0..g.batch)
            .into_par_iter()
            .map(|bi| {
                let xs = &x[bi * sample_in..(bi + 1) * sample_in];
                let mut out = vec![0.0f32; g.out_h * g.out_w * g.out_c];
                for oy in 0..g.out_h {
                    for ox in 0..g.out_w {
                        let o = &mut out[(oy * g.out_w + ox) * g.out_c..][..g.out_c];
                        o.copy_from_slice(&bias);
                        for ky in 0..kh {
                            for kx in 0..kw {
                                let Some((iy, ix)) = g.input_coord(stride, oy, ox, ky, kx) else {
                                    continue;
                                };
                                let pixel = &xs[(iy * g.in_w + ix) * g.in_c..][..g.in_c];
                                for (ci, &xv) in pixel.iter().enumerate() {
                                    let w_row = &weight[((ky * kw + kx) * g.in_c + ci) * g.out_c..][..g.out_c];
                                    for (ov, &wv) in o.iter_mut().zip(w_row) {
                                        *ov += xv * wv;
                                    }
                                }
                            }
                        }
                    }
                }
                out
            })
            .collect();

        Tensor::from_vec(per_sample.concat(), &[g.batch, g.out_h, g.out_w, g.out_c])
    }

    fn backward(
        &self,
        input: &Tensor,
        grad_output: &Tensor,
        with_params: bool,
    ) -> Result<LayerGrads, TensorError> {
        let g = self.geometry(input.shape())?;
        TensorError::check_same_shape(
            "Conv2d 输出梯度",
            &[g.batch, g.out_h, g.out_w, g.out_c],
            grad_output.shape(),
        )?;
        let (kh, kw) = self.kernel_size;
        let stride = self.stride;
        let x = input.to_vec();
        let gy = grad_output.to_vec();
        let weight = self.weight.value().to_vec();
        let sample_in = g.in_h * g.in_w * g.in_c;
        let sample_out = g.out_h * g.out_w * g.out_c;

        // 每个样本各自计算 (dx, dW, db)，最后对 dW、db 求和
        let per_sample: Vec<(Vec<f32>, Vec<f32>, Vec<f32>)> = (0..g.batch)
            .into_par_iter()
            .map(|bi| {
                let xs = &x[bi * sample_in..(bi + 1) * sample_in];
                let gys = &gy[bi * sample_out..(bi + 1) * sample_out];
                let mut dx = vec![0.0f32; sample_in];
                let (mut dw, mut db) = if with_params {
                    (vec![0.0f32; weight.len()], vec![0.0f32; g.out_c])
                } else {
                    (vec![], vec![])
                };
                for oy in 0..g.out_h {
                    for ox in 0..g.out_w {
                        let go = &gys[(oy * g.out_w + ox) * g.out_c..][..g.out_c];
                        if with_params {
                            for (b, &gv) in db.iter_mut().zip(go) {
                                *b += gv;
                            }
                        }
                        for ky in 0..kh {
                            for kx in 0..kw {
                                let Some((iy, ix)) = g.input_coord(stride, oy, ox, ky, kx) else {
                                    continue;
                                };
                                let pixel_offset = (iy * g.in_w + ix) * g.in_c;
                                for ci in 0..g.in_c {
                                    let base = ((ky * kw + kx) * g.in_c + ci) * g.out_c;
                                    let w_row = &weight[base..base + g.out_c];
                                    let acc: f32 = w_row.iter().zip(go).map(|(w, gv)| w * gv).sum();
                                    dx[pixel_offset + ci] += acc;
                                    if with_params {
                                        let xv = xs[pixel_offset + ci];
                                        for (d, &gv) in dw[base..base + g.out_c].iter_mut().zip(go) {
                                            *d += xv * gv;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                (dx, dw, db)
            })
            .collect();

        let mut grad_input = Vec::with_capacity(g.batch * sample_in);
        let mut grad_weight = vec![0.0f32; weight.len()];
        let mut grad_bias = vec![0.0f32; g.out_c];
        for (dx, dw, db) in per_sample {
            grad_input.extend(dx);
            if with_params {
                grad_weight.iter_mut().zip(dw).for_each(|(a, b)| *a += b);
                grad_bias.iter_mut().zip(db).for_each(|(a, b)| *a += b);
            }
        }

        let input_grad = Tensor::from_vec(grad_input, input.shape())?;
        if !with_params {
            return Ok(LayerGrads::input_only(input_grad));
        }
        Ok(LayerGrads {
            input: input_grad,
            params: vec![
                (
                    self.weight.name().to_string(),
                    Tensor::from_vec(grad_weight, self.weight.value().shape())?,
                ),
                (
                    self.bias.name().to_string(),
                    Tensor::from_vec(grad_bias, &[g.out_c])?,
                ),
            ],
        })
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}
