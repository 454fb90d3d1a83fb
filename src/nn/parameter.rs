/*
 * @Description  : 可训练参数与按名称索引的梯度表。
 *                 参数名在整个网络内唯一（如`generator.conv_1.weight`），
 *                 梯度、优化器矩估计、检查点均以该名称为键。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 网络的参数快照：参数名 -> 参数值
pub type StateDict = BTreeMap<String, Tensor>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: Tensor,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    /// 替换参数值，形状须与原值一致
    pub fn set_value(&mut self, value: Tensor) -> Result<(), TensorError> {
        TensorError::check_same_shape(&self.name, self.value.shape(), value.shape())?;
        self.value = value;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.value.size()
    }
}

/// 一次反向传播得到的参数梯度，按参数名索引。
/// 同名梯度多次写入时累加（如判别器对多个批次打分后的梯度）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradients {
    grads: BTreeMap<String, Tensor>,
}

impl Gradients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.grads.get(name)
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
        self.grads.iter()
    }

    /// 累加某个参数的梯度
    pub fn accumulate(&mut self, name: &str, grad: &Tensor) -> Result<(), TensorError> {
        match self.grads.get_mut(name) {
            Some(existing) => {
                if !existing.is_same_shape(grad) {
                    return Err(TensorError::OperatorError {
                        operator: Operator::Add,
                        tensor1_shape: existing.shape().to_vec(),
                        tensor2_shape: grad.shape().to_vec(),
                    });
                }
                *existing += grad;
            }
            None => {
                self.grads.insert(name.to_string(), grad.clone());
            }
        }
        Ok(())
    }

    /// self += factor * other
    pub fn add_scaled(&mut self, other: &Gradients, factor: f32) -> Result<(), TensorError> {
        for (name, grad) in &other.grads {
            self.accumulate(name, &(grad * factor))?;
        }
        Ok(())
    }

    pub fn scale(&mut self, factor: f32) {
        for grad in self.grads.values_mut() {
            *grad *= factor;
        }
    }

    /// 第一个含非有限值（NaN/Inf）的梯度名
    pub fn first_non_finite(&self) -> Option<&str> {
        self.grads
            .iter()
            .find(|(_, g)| !g.is_finite())
            .map(|(name, _)| name.as_str())
    }

    /// 所有梯度拼接后的L2范数
    pub fn global_norm(&self) -> f32 {
        self.grads.values().map(Tensor::sum_squares).sum::<f32>().sqrt()
    }
}
