use crate::errors::TensorError;
use crate::nn::{Adam, Gradients, Module, Optimizer, Parameter};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

struct Single {
    w: Parameter,
}

impl Module for Single {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.w]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.w]
    }
}

fn grads_of(values: &[f32]) -> Gradients {
    let mut grads = Gradients::new();
    grads.accumulate("w", &Tensor::new(values, &[values.len()])).unwrap();
    grads
}

#[test]
fn test_adam_first_step_moves_by_learning_rate() {
    let mut module = Single {
        w: Parameter::new("w", Tensor::new(&[1.0, -1.0], &[2])),
    };
    let mut adam = Adam::for_gan(0.1);
    // 第一步时 m_hat = g，v_hat = g²，更新量约为 lr·sign(g)
    adam.step(&mut module, &grads_of(&[0.5, -2.0])).unwrap();
    assert_abs_diff_eq!(module.w.value(), &Tensor::new(&[0.9, -0.9], &[2]), epsilon = 1e-5);
    assert_eq!(adam.steps(), 1);

    // 梯度为0的步仍沿动量方向移动
    adam.step(&mut module, &grads_of(&[0.0, 0.0])).unwrap();
    assert!(module.w.value().to_vec()[0] < 0.9);
    assert_eq!(adam.steps(), 2);
}

#[test]
fn test_adam_state_roundtrip_and_reset() {
    let mut module = Single {
        w: Parameter::new("w", Tensor::new(&[1.0], &[1])),
    };
    let mut adam = Adam::for_gan(0.01);
    adam.step(&mut module, &grads_of(&[1.0])).unwrap();

    let bytes = bincode::serialize(&adam).unwrap();
    let restored: Adam = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored, adam);

    adam.set_learning_rate(0.5);
    assert_abs_diff_eq!(adam.learning_rate(), 0.5);
    adam.reset();
    assert_eq!(adam.steps(), 0);
}

#[test]
fn test_adam_rejects_unknown_or_misshaped_gradients() {
    let mut module = Single {
        w: Parameter::new("w", Tensor::new(&[1.0, 2.0], &[2])),
    };
    let mut adam = Adam::for_gan(0.1);

    let mut unknown = Gradients::new();
    unknown.accumulate("nope", &Tensor::ones(&[2])).unwrap();
    assert_eq!(
        adam.step(&mut module, &unknown).unwrap_err(),
        TensorError::MissingParameter("nope".to_string())
    );
    assert!(adam.step(&mut module, &grads_of(&[1.0, 1.0, 1.0])).is_err());
    // 失败时参数与时间步都不变
    assert_eq!(module.w.value(), &Tensor::new(&[1.0, 2.0], &[2]));
    assert_eq!(adam.steps(), 0);

    // 空梯度表：不更新任何参数
    adam.step(&mut module, &Gradients::new()).unwrap();
    assert_eq!(module.w.value(), &Tensor::new(&[1.0, 2.0], &[2]));
}
