/*
 * @Description  : 对抗损失：GAN 变体的封闭枚举及其判别器/生成器目标
 */

use super::LossTerm;
use crate::errors::TensorError;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 对抗目标的形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    CrossEntropy,
    LeastSquares,
    Wasserstein,
    Hinge,
}

/// 梯度惩罚的形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyKind {
    None,
    /// λ·mean(max(0, ‖g‖-1)²)
    OneSided,
    /// λ·mean((‖g‖-1)²)
    TwoSided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GanVariant {
    #[serde(rename = "gan")]
    Gan,
    #[serde(rename = "lsgan")]
    LsGan,
    #[serde(rename = "wgan")]
    Wgan,
    #[serde(rename = "wgan-gp")]
    WganGp,
    #[serde(rename = "wgan-lp")]
    WganLp,
    #[serde(rename = "dragan")]
    Dragan,
    #[serde(rename = "dragan-lp")]
    DraganLp,
    #[serde(rename = "hinge")]
    Hinge,
}

impl GanVariant {
    pub const ALL: [GanVariant; 8] = [
        GanVariant::Gan,
        GanVariant::LsGan,
        GanVariant::Wgan,
        GanVariant::WganGp,
        GanVariant::WganLp,
        GanVariant::Dragan,
        GanVariant::DraganLp,
        GanVariant::Hinge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GanVariant::Gan => "gan",
            GanVariant::LsGan => "lsgan",
            GanVariant::Wgan => "wgan",
            GanVariant::WganGp => "wgan-gp",
            GanVariant::WganLp => "wgan-lp",
            GanVariant::Dragan => "dragan",
            GanVariant::DraganLp => "dragan-lp",
            GanVariant::Hinge => "hinge",
        }
    }

    pub fn objective(self) -> Objective {
        match self {
            GanVariant::Gan | GanVariant::Dragan | GanVariant::DraganLp => Objective::CrossEntropy,
            GanVariant::LsGan => Objective::LeastSquares,
            GanVariant::Wgan | GanVariant::WganGp | GanVariant::WganLp => Objective::Wasserstein,
            GanVariant::Hinge => Objective::Hinge,
        }
    }

    pub fn penalty(self) -> PenaltyKind {
        match self {
            GanVariant::WganLp | GanVariant::DraganLp => PenaltyKind::OneSided,
            GanVariant::WganGp | GanVariant::Dragan => PenaltyKind::TwoSided,
            _ => PenaltyKind::None,
        }
    }

    /// DRAGAN 系列在真实样本附近扰动得到插值端点
    pub fn perturbs_real(self) -> bool {
        matches!(self, GanVariant::Dragan | GanVariant::DraganLp)
    }
}

impl fmt::Display for GanVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GanVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GanVariant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names = GanVariant::ALL.map(GanVariant::name).join(", ");
                format!("未知的GAN类型`{s}`，可选：{names}")
            })
    }
}

/// 判别器损失中四个分项的权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscTermWeights {
    pub real: f32,
    pub gray: f32,
    pub fake: f32,
    pub smooth: f32,
}

impl Default for DiscTermWeights {
    fn default() -> Self {
        Self {
            real: 1.7,
            gray: 1.7,
            fake: 1.7,
            smooth: 1.0,
        }
    }
}

impl DiscTermWeights {
    /// 按数据集名取预设权重，未知数据集使用默认值
    pub fn for_dataset(dataset: &str) -> Self {
        match dataset {
            "Hayao" => Self {
                real: 1.2,
                gray: 1.2,
                fake: 1.2,
                smooth: 0.8,
            },
            "Paprika" => Self {
                real: 1.0,
                gray: 1.0,
                fake: 1.0,
                smooth: 0.005,
            },
            _ => Self::default(),
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^x)，数值稳定形式
fn softplus(x: f32) -> f32 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// 对logit逐元素施加`f`后取均值；梯度为`df`/元素数
fn mean_term(logit: &Tensor, f: impl Fn(f32) -> f32, df: impl Fn(f32) -> f32) -> LossTerm {
    let n = logit.size().max(1) as f32;
    LossTerm {
        value: logit.map(f).sum() / n,
        grad: logit.map(|x| df(x) / n),
    }
}

/// 判别器应判为"真"的logit的损失
fn real_term(objective: Objective, logit: &Tensor) -> LossTerm {
    match objective {
        Objective::CrossEntropy => mean_term(logit, |x| softplus(-x), |x| sigmoid(x) - 1.0),
        Objective::LeastSquares => mean_term(logit, |x| (x - 1.0) * (x - 1.0), |x| 2.0 * (x - 1.0)),
        Objective::Wasserstein => mean_term(logit, |x| -x, |_| -1.0),
        Objective::Hinge => mean_term(logit, |x| (1.0 - x).max(0.0), |x| if x < 1.0 { -1.0 } else { 0.0 }),
    }
}

/// 判别器应判为"假"的logit的损失
fn fake_term(objective: Objective, logit: &Tensor) -> LossTerm {
    match objective {
        Objective::CrossEntropy => mean_term(logit, softplus, sigmoid),
        Objective::LeastSquares => mean_term(logit, |x| x * x, |x| 2.0 * x),
        Objective::Wasserstein => mean_term(logit, |x| x, |_| 1.0),
        Objective::Hinge => mean_term(logit, |x| (1.0 + x).max(0.0), |x| if x > -1.0 { 1.0 } else { 0.0 }),
    }
}

/// 判别器对抗损失（已乘分项权重），及对四组logit的梯度
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorLoss {
    pub value: f32,
    pub grad_real: Tensor,
    pub grad_gray: Tensor,
    pub grad_fake: Tensor,
    pub grad_smooth: Tensor,
}

/// `real`：风格图；`gray`：风格图的灰度版；`fake`：生成图；`smooth`：边缘模糊后的风格图。
/// 后三者都应被判为假。
pub fn discriminator_loss(
    variant: GanVariant,
    weights: &DiscTermWeights,
    real: &Tensor,
    gray: &Tensor,
    fake: &Tensor,
    smooth: &Tensor,
) -> Result<DiscriminatorLoss, TensorError> {
    for other in [gray, fake, smooth] {
        TensorError::check_same_shape("判别器各组logit", real.shape(), other.shape())?;
    }
    let objective = variant.objective();
    let real = real_term(objective, real).weighted(weights.real);
    let gray = fake_term(objective, gray).weighted(weights.gray);
    let fake = fake_term(objective, fake).weighted(weights.fake);
    let smooth = fake_term(objective, smooth).weighted(weights.smooth);
    Ok(DiscriminatorLoss {
        value: real.value + gray.value + fake.value + smooth.value,
        grad_real: real.grad,
        grad_gray: gray.grad,
        grad_fake: fake.grad,
        grad_smooth: smooth.grad,
    })
}

/// 生成器对抗损失：希望生成图被判为真
pub fn generator_adversarial_loss(variant: GanVariant, fake_logit: &Tensor) -> LossTerm {
    match variant.objective() {
        Objective::CrossEntropy => mean_term(fake_logit, |x| softplus(-x), |x| sigmoid(x) - 1.0),
        Objective::LeastSquares => mean_term(fake_logit, |x| (x - 1.0) * (x - 1.0), |x| 2.0 * (x - 1.0)),
        Objective::Wasserstein | Objective::Hinge => mean_term(fake_logit, |x| -x, |_| -1.0),
    }
}
