use crate::tensor::Tensor;

mod gradients;
mod layer_conv2d;
mod optimizer;
mod zoo;

/// 以中心差分估计标量函数`f`在`x`处的梯度
fn numeric_grad<F: Fn(&Tensor) -> f32>(f: F, x: &Tensor, eps: f32) -> Tensor {
    let base = x.to_vec();
    let grad = (0..base.len())
        .map(|i| {
            let mut plus = base.clone();
            let mut minus = base.clone();
            plus[i] += eps;
            minus[i] -= eps;
            let f_plus = f(&Tensor::new(&plus, x.shape()));
            let f_minus = f(&Tensor::new(&minus, x.shape()));
            (f_plus - f_minus) / (2.0 * eps)
        })
        .collect::<Vec<_>>();
    Tensor::new(&grad, x.shape())
}
