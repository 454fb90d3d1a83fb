/*
 * @Description  : 训练进度：阶段划分与判别器的更新节奏
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// 训练阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// 只以内容损失预训练生成器
    Init,
    /// 生成器与判别器交替更新
    Adversarial,
}

impl Phase {
    pub fn for_epoch(epoch: usize, init_epoch: usize) -> Self {
        if epoch < init_epoch {
            Phase::Init
        } else {
            Phase::Adversarial
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Adversarial => write!(f, "adversarial"),
        }
    }
}

/// 循环计数器，取值在[1, rate]；等于`rate`的那一步更新判别器。
/// 每次进程启动（含从检查点恢复）都从`rate`开始。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCadence {
    rate: usize,
    counter: usize,
}

impl UpdateCadence {
    pub fn new(rate: usize) -> Self {
        let rate = rate.max(1);
        Self { rate, counter: rate }
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn should_update_discriminator(&self) -> bool {
        self.counter == self.rate
    }

    /// 一个对抗步结束后调用
    pub fn advance(&mut self) {
        self.counter -= 1;
        if self.counter == 0 {
            self.counter = self.rate;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingState {
    /// 下一个要训练的epoch
    pub current_epoch: usize,
    pub cadence: UpdateCadence,
    /// 最近一次判别器更新的损失，未更新过时为None
    pub last_d_loss: Option<f32>,
}

impl TrainingState {
    pub fn new(training_rate: usize) -> Self {
        Self {
            current_epoch: 0,
            cadence: UpdateCadence::new(training_rate),
            last_d_loss: None,
        }
    }
}
