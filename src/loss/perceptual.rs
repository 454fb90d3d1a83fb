/*
 * @Description  : 感知损失：内容损失与基于Gram矩阵的风格损失（均在特征空间上计算）
 */

use super::LossTerm;
use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Array3, Axis, Ix4};

fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// mean(|fake - real|)，梯度对`fake`
fn l1(real: &Tensor, fake: &Tensor, context: &str) -> Result<LossTerm, TensorError> {
    TensorError::check_same_shape(context, real.shape(), fake.shape())?;
    let n = fake.size().max(1) as f32;
    let diff = fake.zip_map(real, Operator::Sub, |f, r| f - r)?;
    Ok(LossTerm {
        value: diff.abs().sum() / n,
        grad: diff.map(|d| sign(d) / n),
    })
}

/// 内容损失：真实照片特征与生成图特征的L1距离
pub fn content_loss(real_features: &Tensor, fake_features: &Tensor) -> Result<LossTerm, TensorError> {
    l1(real_features, fake_features, "内容损失的特征")
}

fn as_nhwc<'a>(x: &'a Tensor, context: &str) -> Result<ndarray::ArrayView4<'a, f32>, TensorError> {
    TensorError::check_dims(context, x.shape(), 4)?;
    x.view().into_dimensionality::<Ix4>().map_err(|_| TensorError::DimensionMismatch {
        context: context.to_string(),
        expected: 4,
        got: x.dimension(),
    })
}

/// 将单个样本[H, W, C]展平为[H·W, C]
fn flatten_sample(x: ndarray::ArrayView3<'_, f32>) -> ndarray::Array2<f32> {
    let (_, w, c) = x.dim();
    let rows = x.len() / c.max(1);
    ndarray::Array2::from_shape_fn((rows, c), |(i, ch)| x[[i / w, i % w, ch]])
}

/// Gram 矩阵：对每个样本计算 XᵀX / (H·W·C)，X为展平后的[H·W, C]特征。输出形状[N, C, C]
pub fn gram(features: &Tensor) -> Result<Tensor, TensorError> {
    let x = as_nhwc(features, "Gram 矩阵的输入 [batch, H, W, C]")?;
    let (n, h, w, c) = x.dim();
    let scale = (h * w * c).max(1) as f32;
    let mut out = Array3::<f32>::zeros((n, c, c));
    for (bi, sample) in x.axis_iter(Axis(0)).enumerate() {
        let flat = flatten_sample(sample);
        let g = flat.t().dot(&flat) / scale;
        out.index_axis_mut(Axis(0), bi).assign(&g);
    }
    Ok(Tensor::from_array(out.into_dyn()))
}

/// 风格损失：风格图（灰度）特征与生成图特征的Gram矩阵之间的L1距离，梯度对`fake_features`
pub fn style_loss(style_features: &Tensor, fake_features: &Tensor) -> Result<LossTerm, TensorError> {
    TensorError::check_same_shape("风格损失的特征", style_features.shape(), fake_features.shape())?;
    let gram_style = gram(style_features)?;
    let gram_fake = gram(fake_features)?;
    // 先求对 Gram(fake) 的梯度 D，再由 G = XᵀX/s 得 dX = X(D + Dᵀ)/s
    let gram_term = l1(&gram_style, &gram_fake, "Gram 矩阵")?;

    let x = as_nhwc(fake_features, "风格损失的特征")?;
    let (n, h, w, c) = x.dim();
    let scale = (h * w * c).max(1) as f32;
    let d = gram_term
        .grad
        .view()
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| TensorError::DimensionMismatch {
            context: "Gram 矩阵的梯度".to_string(),
            expected: 3,
            got: gram_term.grad.dimension(),
        })?;

    let mut grad = Vec::with_capacity(n * h * w * c);
    for (sample, d_sample) in x.axis_iter(Axis(0)).zip(d.axis_iter(Axis(0))) {
        let flat = flatten_sample(sample);
        let sym: ndarray::Array2<f32> = &d_sample + &d_sample.t();
        let dx = flat.dot(&sym) / scale;
        grad.extend(dx.iter().copied());
    }
    Ok(LossTerm {
        value: gram_term.value,
        grad: Tensor::from_vec(grad, fake_features.shape())?,
    })
}
