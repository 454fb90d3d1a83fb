/*
 * @Description  : 梯度惩罚。在真实样本与生成样本的随机插值点 x̂ 处，
 *                 约束判别器对输入的梯度范数 ‖∇x̂ ΣD(x̂)‖ 接近（或不超过）1。
 *
 * 惩罚项对判别器参数θ的梯度需要二阶导：∂GP/∂θ = ∂/∂θ (v · g(θ))，其中 g = ∇x̂ ΣD，v = ∂GP/∂g 视为常量。
 * 由于 v · g 正是 ΣD 在 x̂ 处沿 v 的方向导数，故以中心差分计算：
 *     ∂GP/∂θ ≈ (∇θ ΣD(x̂ + h·v) - ∇θ ΣD(x̂ - h·v)) / 2h
 * 判别器对输入为仿射（线性）时结果精确。
 */

use crate::errors::TensorError;
use crate::loss::{GanVariant, PenaltyKind};
use crate::nn::{Discriminator, Gradients, NetworkTrace};
use crate::tensor::Tensor;
use rand::Rng;
use rand::distributions::{Distribution, Uniform};


/// 中心差分的步长（相对于 max|v| 归一化）
const DEFAULT_STEP: f32 = 1e-2;

#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyOutput {
    /// 惩罚值（非负）
    pub value: f32,
    /// 对判别器参数的梯度；无惩罚或惩罚为0时为空
    pub grads: Gradients,
}

impl PenaltyOutput {
    fn zero() -> Self {
        Self {
            value: 0.0,
            grads: Gradients::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GradientPenalty {
    variant: GanVariant,
    lambda: f32,
    step: f32,
}

impl GradientPenalty {
    pub fn new(variant: GanVariant, lambda: f32) -> Self {
        Self {
            variant,
            lambda,
            step: DEFAULT_STEP,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn is_active(&self) -> bool {
        self.variant.penalty() != PenaltyKind::None
    }

    /// `real`为风格图批次，`fake`为生成图批次（DRAGAN 系列不使用`fake`，而是在`real`附近扰动）
    pub fn compute<D, R>(
        &self,
        discriminator: &D,
        real: &Tensor,
        fake: &Tensor,
        rng: &mut R,
    ) -> Result<PenaltyOutput, TensorError>
    where
        D: Discriminator,
        R: Rng + ?Sized,
    {
        let kind = self.variant.penalty();
        if kind == PenaltyKind::None {
            return Ok(PenaltyOutput::zero());
        }
        TensorError::check_same_shape("梯度惩罚的真实/生成样本", real.shape(), fake.shape())?;

        let endpoint = if self.variant.perturbs_real() {
            let sigma = real.std_dev();
            let eps = Tensor::uniform(0.0, 1.0, real.shape(), rng);
            real + &(eps * (0.5 * sigma))
        } else {
            fake.clone()
        };
        let unit = Uniform::new(0.0f32, 1.0);
        let alpha: Vec<f32> = (0..real.batch_size()).map(|_| unit.sample(rng)).collect();
        let interpolated = real + &(&endpoint - real).scale_per_sample(&alpha)?;

        // g = ∂ΣD(x̂)/∂x̂
        let trace = discriminator.forward_trace(&interpolated)?;
        let ones = Tensor::ones(trace.output().shape());
        let g = discriminator.backward(&trace, &ones, None)?;
        let norms = g.per_sample_l2_norm();
        let batch = norms.len().max(1) as f32;

        // 每个样本的 φ(n) 与 dφ/dn
        let (values, slopes): (Vec<f32>, Vec<f32>) = norms
            .iter()
            .map(|&n| {
                let excess = match kind {
                    PenaltyKind::OneSided => (n - 1.0).max(0.0),
                    _ => n - 1.0,
                };
                (excess * excess, 2.0 * excess)
            })
            .unzip();
        let value = self.lambda * values.iter().sum::<f32>() / batch;

        // v = ∂GP/∂g = λ/B · φ'(n_b) · g_b / n_b
        let factors: Vec<f32> = slopes
            .iter()
            .zip(&norms)
            .map(|(&s, &n)| if n > 0.0 { self.lambda * s / (batch * n) } else { 0.0 })
            .collect();
        let v = g.scale_per_sample(&factors)?;
        let v_max = v.max_abs();
        if v_max == 0.0 {
            return Ok(PenaltyOutput { value, grads: Gradients::new() });
        }

        let h = self.step / v_max;
        let mut grads = self.param_grads(discriminator, &(&interpolated + &(&v * h)))?;
        let minus = self.param_grads(discriminator, &(&interpolated - &(&v * h)))?;
        grads.add_scaled(&minus, -1.0)?;
        grads.scale(1.0 / (2.0 * h));
        Ok(PenaltyOutput { value, grads })
    }

    /// ∇θ ΣD(x)
    fn param_grads<D: Discriminator>(&self, discriminator: &D, x: &Tensor) -> Result<Gradients, TensorError> {
        let trace = discriminator.forward_trace(x)?;
        let ones = Tensor::ones(trace.output().shape());
        let mut grads = Gradients::new();
        discriminator.backward(&trace, &ones, Some(&mut grads))?;
        Ok(grads)
    }
}
