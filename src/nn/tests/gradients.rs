use crate::nn::{Gradients, Module, Parameter, StateDict};
use crate::errors::TensorError;
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

struct TwoParams {
    a: Parameter,
    b: Parameter,
}

impl Module for TwoParams {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.a, &self.b]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.a, &mut self.b]
    }
}

fn two_params() -> TwoParams {
    TwoParams {
        a: Parameter::new("a", Tensor::new(&[1.0, 2.0], &[2])),
        b: Parameter::new("b", Tensor::new(&[3.0], &[1])),
    }
}

#[test]
fn test_gradients_accumulate_and_scale() {
    let mut grads = Gradients::new();
    assert!(grads.is_empty());
    grads.accumulate("a", &Tensor::new(&[1.0, 1.0], &[2])).unwrap();
    grads.accumulate("a", &Tensor::new(&[2.0, 0.0], &[2])).unwrap();
    assert_eq!(grads.get("a"), Some(&Tensor::new(&[3.0, 1.0], &[2])));
    assert!(grads.accumulate("a", &Tensor::ones(&[3])).is_err());

    let mut other = Gradients::new();
    other.accumulate("a", &Tensor::new(&[1.0, 1.0], &[2])).unwrap();
    other.accumulate("b", &Tensor::new(&[4.0], &[1])).unwrap();
    grads.add_scaled(&other, -1.0).unwrap();
    assert_eq!(grads.get("a"), Some(&Tensor::new(&[2.0, 0.0], &[2])));
    assert_eq!(grads.get("b"), Some(&Tensor::new(&[-4.0], &[1])));

    grads.scale(0.5);
    assert_abs_diff_eq!(grads.global_norm(), (1.0f32 + 4.0).sqrt(), epsilon = 1e-6);
    assert_eq!(grads.first_non_finite(), None);

    grads.accumulate("c", &Tensor::new(&[f32::NAN], &[1])).unwrap();
    assert_eq!(grads.first_non_finite(), Some("c"));
}

#[test]
fn test_module_state_dict() {
    let mut module = two_params();
    assert_eq!(module.num_params(), 3);

    let state = module.state_dict();
    assert_eq!(state.len(), 2);

    let mut changed = state.clone();
    changed.insert("a".to_string(), Tensor::new(&[5.0, 6.0], &[2]));
    module.load_state_dict(&changed).unwrap();
    assert_eq!(module.a.value(), &Tensor::new(&[5.0, 6.0], &[2]));

    // 缺少参数：整体拒绝，模块不变
    let mut missing = StateDict::new();
    missing.insert("a".to_string(), Tensor::new(&[0.0, 0.0], &[2]));
    assert_eq!(
        module.load_state_dict(&missing).unwrap_err(),
        TensorError::MissingParameter("b".to_string())
    );
    assert_eq!(module.a.value(), &Tensor::new(&[5.0, 6.0], &[2]));

    // 形状不符
    let mut wrong = state.clone();
    wrong.insert("b".to_string(), Tensor::zeros(&[2]));
    assert!(module.load_state_dict(&wrong).is_err());
    assert_eq!(module.b.value(), &Tensor::new(&[3.0], &[1]));
}

#[test]
fn test_parameter_set_value_checks_shape() {
    let mut p = Parameter::new("p", Tensor::zeros(&[2, 2]));
    assert!(p.set_value(Tensor::ones(&[4])).is_err());
    p.set_value(Tensor::ones(&[2, 2])).unwrap();
    assert_eq!(p.value(), &Tensor::ones(&[2, 2]));
    assert_eq!(p.size(), 4);
}
