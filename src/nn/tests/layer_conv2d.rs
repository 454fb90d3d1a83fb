/*
 * @Description  : Conv2d 层单元测试（NHWC，"same"填充）
 */

use super::numeric_grad;
use crate::nn::layer::{Conv2d, Layer};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

// batch=1, H=W=3, C_in=C_out=1, kernel=2x2, stride=1；总填充量为1，补在下/右侧
#[rustfmt::skip]
const FWD_X: &[f32] = &[
    1.0, 2.0, 3.0,
    4.0, 5.0, 6.0,
    7.0, 8.0, 9.0,
];
const FWD_KERNEL: &[f32] = &[0.1, 0.2, 0.3, 0.4];
const FWD_BIAS: &[f32] = &[0.5];
#[rustfmt::skip]
const FWD_OUTPUT: &[f32] = &[
    4.2, 5.2, 2.6,
    7.2, 8.2, 3.8,
    2.8, 3.1, 1.4,
];

fn random_conv(rng: &mut StdRng, in_c: usize, out_c: usize, k: usize, stride: usize) -> Conv2d {
    Conv2d::from_tensors(
        "test_conv",
        Tensor::uniform(-1.0, 1.0, &[k, k, in_c, out_c], rng),
        Tensor::uniform(-1.0, 1.0, &[out_c], rng),
        stride,
    )
    .unwrap()
}

#[test]
fn test_conv2d_forward_same_padding() {
    let conv = Conv2d::from_tensors(
        "conv",
        Tensor::new(FWD_KERNEL, &[2, 2, 1, 1]),
        Tensor::new(FWD_BIAS, &[1]),
        1,
    )
    .unwrap();
    let output = conv.forward(&Tensor::new(FWD_X, &[1, 3, 3, 1])).unwrap();
    assert_abs_diff_eq!(output, Tensor::new(FWD_OUTPUT, &[1, 3, 3, 1]), epsilon = 1e-5);
}

#[test]
fn test_conv2d_output_shape_with_stride() {
    let mut rng = StdRng::seed_from_u64(0);
    let conv = Conv2d::new("conv", 3, 4, 3, 2, &mut rng);
    let output = conv.forward(&Tensor::zeros(&[2, 5, 4, 3])).unwrap();
    assert_eq!(output.shape(), &[2, 3, 2, 4]);
    // 输入为0时输出等于偏置（初始为0）
    assert_abs_diff_eq!(output.max_abs(), 0.0);

    assert_eq!(conv.weight().name(), "conv.weight");
    assert_eq!(conv.bias().value().shape(), &[4]);
}

#[test]
fn test_conv2d_rejects_wrong_input() {
    let mut rng = StdRng::seed_from_u64(0);
    let conv = Conv2d::new("conv", 3, 4, 3, 1, &mut rng);
    assert!(conv.forward(&Tensor::zeros(&[1, 4, 4, 2])).is_err());
    assert!(conv.forward(&Tensor::zeros(&[4, 4, 3])).is_err());
    assert!(Conv2d::from_tensors("c", Tensor::zeros(&[3, 3, 1]), Tensor::zeros(&[1]), 1).is_err());
    assert!(Conv2d::from_tensors("c", Tensor::zeros(&[3, 3, 1, 2]), Tensor::zeros(&[3]), 1).is_err());
    assert!(Conv2d::from_tensors("c", Tensor::zeros(&[3, 3, 1, 2]), Tensor::zeros(&[2]), 0).is_err());
}

#[test]
fn test_conv2d_backward_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(42);
    for stride in [1, 2] {
        let conv = random_conv(&mut rng, 2, 3, 3, stride);
        let x = Tensor::uniform(-1.0, 1.0, &[2, 5, 4, 2], &mut rng);
        let output = conv.forward(&x).unwrap();
        // 损失 = Σ(y ⊙ r)，故输出梯度为r
        let r = Tensor::uniform(-1.0, 1.0, output.shape(), &mut rng);
        let grads = conv.backward(&x, &r, true).unwrap();

        let loss_of_x = |x: &Tensor| conv.forward(x).unwrap().dot_sum(&r).unwrap();
        assert_abs_diff_eq!(grads.input, numeric_grad(loss_of_x, &x, 1e-2), epsilon = 1e-2);

        let (weight_name, weight_grad) = &grads.params[0];
        assert_eq!(weight_name, "test_conv.weight");
        let bias = conv.bias().value().clone();
        let loss_of_w = |w: &Tensor| {
            let c = Conv2d::from_tensors("test_conv", w.clone(), bias.clone(), stride).unwrap();
            c.forward(&x).unwrap().dot_sum(&r).unwrap()
        };
        assert_abs_diff_eq!(
            *weight_grad,
            numeric_grad(loss_of_w, conv.weight().value(), 1e-2),
            epsilon = 1e-2
        );

        // 偏置梯度即各输出通道上梯度之和
        let (_, bias_grad) = &grads.params[1];
        let r_vec = r.to_vec();
        for co in 0..3 {
            let expected: f32 = r_vec.iter().skip(co).step_by(3).sum();
            assert_abs_diff_eq!(bias_grad.to_vec()[co], expected, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_conv2d_backward_without_params() {
    let mut rng = StdRng::seed_from_u64(1);
    let conv = random_conv(&mut rng, 1, 2, 3, 1);
    let x = Tensor::uniform(-1.0, 1.0, &[1, 4, 4, 1], &mut rng);
    let r = Tensor::ones(&[1, 4, 4, 2]);
    let with = conv.backward(&x, &r, true).unwrap();
    let without = conv.backward(&x, &r, false).unwrap();
    assert!(without.params.is_empty());
    assert_eq!(with.input, without.input);
    assert!(conv.backward(&x, &Tensor::ones(&[1, 4, 4, 1]), true).is_err());
}
