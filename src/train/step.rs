/*
 * @Description  : 单步训练：初始化阶段的生成器预训练、判别器更新、生成器更新。
 *                 每一步都先算出全部梯度并检查是否有限，再交给优化器，
 *                 因此出错时网络参数保持不变。
 */

use super::{Phase, TrainError, Trainer};
use crate::loss::{
    color_loss, content_loss, discriminator_loss, generator_adversarial_loss, style_loss, total_variation_loss,
};
use crate::nn::{Discriminator, FeatureExtractor, Generator, Gradients, NetworkTrace, Optimizer};
use crate::tensor::Tensor;

/// 一步训练所用的四组图像，形状均为[batch, H, W, C]
#[derive(Debug, Clone)]
pub struct StepBatch {
    pub photo: Tensor,
    pub style: Tensor,
    pub style_gray: Tensor,
    pub smooth: Tensor,
}

/// 生成器一次更新的各项损失
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorLosses {
    /// t_loss + g_adv
    pub total: f32,
    /// 加权后的对抗损失
    pub adversarial: f32,
    /// 内容、风格、颜色、全变分损失的加权和
    pub pre_model: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscriminatorLosses {
    pub total: f32,
    pub penalty: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub phase: Phase,
    pub discriminator_updated: bool,
    /// 仅初始化阶段有值
    pub init_loss: Option<f32>,
    /// 仅对抗阶段有值
    pub generator: Option<GeneratorLosses>,
    /// 本步或之前最近一次的判别器损失
    pub discriminator_loss: Option<f32>,
}

/// 当前所在的(epoch, 步)，用于报告非有限值的位置
#[derive(Debug, Clone, Copy)]
pub(super) struct StepContext {
    pub epoch: usize,
    pub step: usize,
}

impl StepContext {
    fn check_value(&self, what: &str, value: f32) -> Result<(), TrainError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(self.non_finite(format!("{what} = {value}")))
        }
    }

    fn check_grads(&self, what: &str, grads: &Gradients) -> Result<(), TrainError> {
        match grads.first_non_finite() {
            None => Ok(()),
            Some(name) => Err(self.non_finite(format!("{what}中参数`{name}`的梯度"))),
        }
    }

    fn non_finite(&self, what: String) -> TrainError {
        TrainError::NonFinite {
            epoch: self.epoch,
            step: self.step,
            what,
        }
    }
}

impl<G, D, F> Trainer<G, D, F>
where
    G: Generator,
    D: Discriminator,
    F: FeatureExtractor,
{
    /// 按epoch所在阶段执行一步训练
    pub fn train_step(&mut self, epoch: usize, step: usize, batch: &StepBatch) -> Result<StepReport, TrainError> {
        let ctx = StepContext { epoch, step };
        let phase = Phase::for_epoch(epoch, self.config.init_epoch);
        if phase == Phase::Init {
            let loss = self.init_step(ctx, &batch.photo)?;
            return Ok(StepReport {
                phase,
                discriminator_updated: false,
                init_loss: Some(loss),
                generator: None,
                discriminator_loss: self.state.last_d_loss,
            });
        }

        let discriminator_updated = self.state.cadence.should_update_discriminator();
        if discriminator_updated {
            let d = self.discriminator_step(ctx, batch)?;
            self.state.last_d_loss = Some(d.total);
        }
        let generator = self.generator_step(ctx, batch)?;
        self.state.cadence.advance();
        Ok(StepReport {
            phase,
            discriminator_updated,
            init_loss: None,
            generator: Some(generator),
            discriminator_loss: self.state.last_d_loss,
        })
    }

    /// 初始化阶段：loss = con_weight · content(F(photo), F(G(photo)))
    pub(super) fn init_step(&mut self, ctx: StepContext, photo: &Tensor) -> Result<f32, TrainError> {
        let g_trace = self.generator.forward_trace(photo)?;
        let real_features = self.features.extract(photo)?;
        let fake_trace = self.features.extract_trace(g_trace.output())?;
        let content = content_loss(&real_features, fake_trace.output())?.weighted(self.config.con_weight);
        ctx.check_value("初始化阶段的内容损失", content.value)?;

        let grad_fake = self.features.backward(&fake_trace, &content.grad)?;
        let mut grads = Gradients::new();
        self.generator.backward(&g_trace, &grad_fake, &mut grads)?;
        ctx.check_grads("生成器", &grads)?;

        self.init_optimizer.step(&mut self.generator, &grads)?;
        Ok(content.value)
    }

    /// 判别器更新：d_loss = d_adv_weight · adv(real, gray, fake, smooth) + GP
    pub(super) fn discriminator_step(
        &mut self,
        ctx: StepContext,
        batch: &StepBatch,
    ) -> Result<DiscriminatorLosses, TrainError> {
        let fake = self.generator.generate(&batch.photo)?;
        let d = &self.discriminator;
        let real_trace = d.forward_trace(&batch.style)?;
        let gray_trace = d.forward_trace(&batch.style_gray)?;
        let fake_trace = d.forward_trace(&fake)?;
        let smooth_trace = d.forward_trace(&batch.smooth)?;

        let adv = discriminator_loss(
            self.config.gan_type,
            &self.disc_weights,
            real_trace.output(),
            gray_trace.output(),
            fake_trace.output(),
            smooth_trace.output(),
        )?;
        let weight = self.config.d_adv_weight;
        let mut grads = Gradients::new();
        for (trace, grad) in [
            (&real_trace, &adv.grad_real),
            (&gray_trace, &adv.grad_gray),
            (&fake_trace, &adv.grad_fake),
            (&smooth_trace, &adv.grad_smooth),
        ] {
            d.backward(trace, &(grad * weight), Some(&mut grads))?;
        }

        let penalty = self.penalty.compute(d, &batch.style, &fake, &mut self.rng)?;
        grads.add_scaled(&penalty.grads, 1.0)?;

        let total = weight * adv.value + penalty.value;
        ctx.check_value("判别器损失", total)?;
        ctx.check_grads("判别器", &grads)?;

        self.d_optimizer.step(&mut self.discriminator, &grads)?;
        Ok(DiscriminatorLosses {
            total,
            penalty: penalty.value,
        })
    }

    /// 生成器更新：t_loss（内容、风格、颜色、全变分）+ g_adv_weight · adv(D(G(photo)))
    pub(super) fn generator_step(&mut self, ctx: StepContext, batch: &StepBatch) -> Result<GeneratorLosses, TrainError> {
        let cfg = &self.config;
        let g_trace = self.generator.forward_trace(&batch.photo)?;
        let fake = g_trace.output();

        // 对抗项：梯度只经过判别器传回生成图，不计算判别器的参数梯度
        let d_trace = self.discriminator.forward_trace(fake)?;
        let adv = generator_adversarial_loss(cfg.gan_type, d_trace.output()).weighted(cfg.g_adv_weight);
        let mut grad_fake = self.discriminator.backward(&d_trace, &adv.grad, None)?;

        // 感知项：内容与风格共用生成图的一次特征提取
        let real_features = self.features.extract(&batch.photo)?;
        let gray_features = self.features.extract(&batch.style_gray)?;
        let fake_trace = self.features.extract_trace(fake)?;
        let content = content_loss(&real_features, fake_trace.output())?.weighted(cfg.con_weight);
        let style = style_loss(&gray_features, fake_trace.output())?.weighted(cfg.sty_weight);
        grad_fake += &self.features.backward(&fake_trace, &(&content.grad + &style.grad))?;

        let color = color_loss(&batch.photo, fake)?.weighted(cfg.color_weight);
        let tv = total_variation_loss(fake)?.weighted(cfg.tv_weight);
        grad_fake += &color.grad;
        grad_fake += &tv.grad;

        let pre_model = content.value + style.value + color.value + tv.value;
        let total = pre_model + adv.value;
        ctx.check_value("生成器损失", total)?;

        let mut grads = Gradients::new();
        self.generator.backward(&g_trace, &grad_fake, &mut grads)?;
        ctx.check_grads("生成器", &grads)?;

        self.g_optimizer.step(&mut self.generator, &grads)?;
        Ok(GeneratorLosses {
            total,
            adversarial: adv.value,
            pre_model,
        })
    }
}
