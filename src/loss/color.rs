//! 颜色损失：在YUV空间比较照片与生成图，亮度用L1，色度用Huber

use super::LossTerm;
use crate::errors::TensorError;
use crate::tensor::Tensor;

/// RGB -> YUV 变换矩阵（行依次为 Y、U、V）
const RGB_TO_YUV: [[f32; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [-0.14714119, -0.28886916, 0.43601035],
    [0.61497538, -0.51496512, -0.10001026],
];

/// 将[-1, 1]的RGB张量（最后一维为通道）先映射到[0, 1]再转为YUV
pub fn rgb_to_yuv(image: &Tensor) -> Result<Tensor, TensorError> {
    check_rgb(image)?;
    let data = image
        .to_vec()
        .chunks_exact(3)
        .flat_map(|rgb| {
            let unit = [(rgb[0] + 1.0) / 2.0, (rgb[1] + 1.0) / 2.0, (rgb[2] + 1.0) / 2.0];
            RGB_TO_YUV.map(|row| row[0] * unit[0] + row[1] * unit[1] + row[2] * unit[2])
        })
        .collect();
    Tensor::from_vec(data, image.shape())
}

fn check_rgb(image: &Tensor) -> Result<(), TensorError> {
    match image.shape().last() {
        Some(3) => Ok(()),
        _ => Err(TensorError::ShapeMismatch {
            context: "颜色损失要求最后一维为RGB三通道".to_string(),
            expected: vec![3],
            got: image.shape().to_vec(),
        }),
    }
}

/// Huber 损失（δ=1）及其导数
fn huber(e: f32) -> (f32, f32) {
    if e.abs() <= 1.0 {
        (0.5 * e * e, e)
    } else {
        (e.abs() - 0.5, e.signum())
    }
}

/// L1(Y) + Huber(U) + Huber(V)，各项取均值；梯度对`fake`
pub fn color_loss(real: &Tensor, fake: &Tensor) -> Result<LossTerm, TensorError> {
    TensorError::check_same_shape("颜色损失的输入", real.shape(), fake.shape())?;
    let yuv_real = rgb_to_yuv(real)?.to_vec();
    let yuv_fake = rgb_to_yuv(fake)?.to_vec();
    let pixels = (fake.size() / 3).max(1) as f32;

    let mut value = 0.0;
    let mut grad = Vec::with_capacity(fake.size());
    for (r, f) in yuv_real.chunks_exact(3).zip(yuv_fake.chunks_exact(3)) {
        let dy = f[0] - r[0];
        let (hu, du) = huber(f[1] - r[1]);
        let (hv, dv) = huber(f[2] - r[2]);
        value += dy.abs() + hu + hv;

        // 对 YUV 的梯度，经变换矩阵与 (x+1)/2 传回 RGB
        let d_yuv = [
            if dy > 0.0 { 1.0 } else if dy < 0.0 { -1.0 } else { 0.0 },
            du,
            dv,
        ];
        for ch in 0..3 {
            let g: f32 = (0..3).map(|k| RGB_TO_YUV[k][ch] * d_yuv[k]).sum();
            grad.push(0.5 * g / pixels);
        }
    }
    Ok(LossTerm {
        value: value / pixels,
        grad: Tensor::from_vec(grad, fake.shape())?,
    })
}
