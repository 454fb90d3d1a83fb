/*
 * @Description  : Adam优化器。矩估计以参数名为键，可随检查点一起序列化
 */

use super::Optimizer;
use crate::errors::TensorError;
use crate::nn::module::Module;
use crate::nn::parameter::Gradients;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// 一阶矩估计
    m: BTreeMap<String, Tensor>,
    /// 二阶矩估计
    v: BTreeMap<String, Tensor>,
    /// 时间步
    t: u64,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: BTreeMap::new(),
            v: BTreeMap::new(),
            t: 0,
        }
    }

    /// GAN 训练常用的参数：β1=0.5，β2=0.999
    pub fn for_gan(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.5, 0.999, 1e-8)
    }

    /// 已执行的更新次数
    pub fn steps(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, module: &mut dyn Module, grads: &Gradients) -> Result<(), TensorError> {
        // 先确认每个梯度都有对应的同形参数，避免只更新了一部分
        {
            let params = module.parameters();
            for (name, grad) in grads.iter() {
                let param = params
                    .iter()
                    .find(|p| p.name() == name.as_str())
                    .ok_or_else(|| TensorError::MissingParameter(name.clone()))?;
                TensorError::check_same_shape(name, param.value().shape(), grad.shape())?;
            }
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for param in module.parameters_mut() {
            let Some(gradient) = grads.get(param.name()) else {
                continue;
            };

            // m = β1 * m + (1 - β1) * g
            let m = self
                .m
                .entry(param.name().to_string())
                .or_insert_with(|| Tensor::zeros(gradient.shape()));
            *m *= self.beta1;
            *m += &(gradient * (1.0 - self.beta1));

            // v = β2 * v + (1 - β2) * g²
            let v = self
                .v
                .entry(param.name().to_string())
                .or_insert_with(|| Tensor::zeros(gradient.shape()));
            *v *= self.beta2;
            *v += &(gradient.square() * (1.0 - self.beta2));

            // θ = θ - α * m_hat / (√v_hat + ε)
            let m_hat = &*m / bias_correction1;
            let v_hat = &*v / bias_correction2;
            let update = &m_hat / &(v_hat.sqrt() + self.epsilon);
            *param.value_mut() -= &(update * self.learning_rate);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
