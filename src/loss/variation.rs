use super::LossTerm;
use crate::errors::TensorError;
use crate::tensor::Tensor;

/// 全变分损失：l2(dh)/|dh| + l2(dw)/|dw|，其中 l2(x) = Σx²/2，dh、dw 为纵向与横向相邻像素之差。
/// 输入为[batch, H, W, C]；高（宽）为1时对应的分项为0。
pub fn total_variation_loss(image: &Tensor) -> Result<LossTerm, TensorError> {
    TensorError::check_dims("全变分损失的输入 [batch, H, W, C]", image.shape(), 4)?;
    let (n, h, w, c) = (image.shape()[0], image.shape()[1], image.shape()[2], image.shape()[3]);
    let x = image.to_vec();
    let index = |b: usize, y: usize, xx: usize, ch: usize| ((b * h + y) * w + xx) * c + ch;

    let size_dh = (n * h.saturating_sub(1) * w * c) as f32;
    let size_dw = (n * h * w.saturating_sub(1) * c) as f32;
    let mut value = 0.0;
    let mut grad = vec![0.0f32; x.len()];

    for b in 0..n {
        for y in 0..h {
            for xx in 0..w {
                for ch in 0..c {
                    let here = index(b, y, xx, ch);
                    if y + 1 < h {
                        let below = index(b, y + 1, xx, ch);
                        let d = x[here] - x[below];
                        value += 0.5 * d * d / size_dh;
                        grad[here] += d / size_dh;
                        grad[below] -= d / size_dh;
                    }
                    if xx + 1 < w {
                        let right = index(b, y, xx + 1, ch);
                        let d = x[here] - x[right];
                        value += 0.5 * d * d / size_dw;
                        grad[here] += d / size_dw;
                        grad[right] -= d / size_dw;
                    }
                }
            }
        }
    }
    Ok(LossTerm {
        value,
        grad: Tensor::from_vec(grad, image.shape())?,
    })
}
