/*
 * @Description  : 训练配置：超参数、损失权重与各目录路径。
 *                 可从JSON文件载入（缺省字段取默认值），使用前须经`validate`校验。
 */

use crate::loss::{DiscTermWeights, GanVariant};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(test)]
mod tests;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置项`{field}`无效：{reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("读写配置文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析配置文件失败: {0}")]
    Json(#[from] serde_json::Error),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// 风格数据集名，如 Hayao、Paprika、Shinkai
    pub dataset: String,
    pub dataset_root: PathBuf,
    pub checkpoint_root: PathBuf,
    pub sample_root: PathBuf,
    pub log_root: PathBuf,
    pub export_dir: PathBuf,

    /// 总轮数
    pub epoch: usize,
    /// 初始化（预训练生成器）阶段的轮数
    pub init_epoch: usize,
    pub batch_size: usize,
    pub save_freq: usize,

    pub init_lr: f32,
    pub g_lr: f32,
    pub d_lr: f32,

    /// 梯度惩罚系数λ
    pub ld: f32,
    pub g_adv_weight: f32,
    pub d_adv_weight: f32,
    pub con_weight: f32,
    pub sty_weight: f32,
    pub color_weight: f32,
    pub tv_weight: f32,
    /// 判别器损失各分项权重；缺省时按数据集取预设值
    pub disc_weights: Option<DiscTermWeights>,

    /// 每多少步更新一次判别器（生成器每步都更新）
    pub training_rate: usize,
    pub gan_type: GanVariant,

    /// [高, 宽]
    pub img_size: [usize; 2],
    pub img_ch: usize,
    /// 网络的基础通道数
    pub ch: usize,
    /// 随机特征提取器的通道数（未指定VGG权重时使用）
    pub feature_channels: usize,
    /// VGG19 预训练权重（npz）
    pub vgg_weights: Option<PathBuf>,

    pub seed: u64,
    /// 每隔多少步重置一次滑动平均损失并输出日志
    pub display_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset: "Hayao".to_string(),
            dataset_root: PathBuf::from("dataset"),
            checkpoint_root: PathBuf::from("checkpoint"),
            sample_root: PathBuf::from("samples"),
            log_root: PathBuf::from("logs"),
            export_dir: PathBuf::from("save_model"),
            epoch: 101,
            init_epoch: 10,
            batch_size: 12,
            save_freq: 1,
            init_lr: 2e-4,
            g_lr: 2e-5,
            d_lr: 4e-5,
            ld: 10.0,
            g_adv_weight: 300.0,
            d_adv_weight: 300.0,
            con_weight: 1.5,
            sty_weight: 2.5,
            color_weight: 10.0,
            tv_weight: 1.0,
            disc_weights: None,
            training_rate: 1,
            gan_type: GanVariant::LsGan,
            img_size: [256, 256],
            img_ch: 3,
            ch: 64,
            feature_channels: 32,
            vgg_weights: None,
            seed: 0,
            display_interval: 200,
        }
    }
}

impl TrainingConfig {
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: TrainingConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.is_empty() {
            return Err(invalid("dataset", "不能为空"));
        }
        if self.init_epoch > self.epoch {
            return Err(invalid(
                "init_epoch",
                format!("{}大于总轮数{}", self.init_epoch, self.epoch),
            ));
        }
        for (field, value) in [
            ("batch_size", self.batch_size),
            ("save_freq", self.save_freq),
            ("training_rate", self.training_rate),
            ("img_ch", self.img_ch),
            ("ch", self.ch),
            ("feature_channels", self.feature_channels),
            ("display_interval", self.display_interval),
        ] {
            if value == 0 {
                return Err(invalid(field, "须不小于1"));
            }
        }
        if self.img_size.contains(&0) {
            return Err(invalid("img_size", format!("{:?}含0", self.img_size)));
        }
        for (field, lr) in [("init_lr", self.init_lr), ("g_lr", self.g_lr), ("d_lr", self.d_lr)] {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(invalid(field, format!("学习率须为正的有限值，实际为{lr}")));
            }
        }
        for (field, weight) in [
            ("ld", self.ld),
            ("g_adv_weight", self.g_adv_weight),
            ("d_adv_weight", self.d_adv_weight),
            ("con_weight", self.con_weight),
            ("sty_weight", self.sty_weight),
            ("color_weight", self.color_weight),
            ("tv_weight", self.tv_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(field, format!("权重须为非负的有限值，实际为{weight}")));
            }
        }
        if let Some(w) = &self.disc_weights {
            if [w.real, w.gray, w.fake, w.smooth].iter().any(|x| !x.is_finite() || *x < 0.0) {
                return Err(invalid("disc_weights", format!("{w:?}含负数或非有限值")));
            }
        }
        Ok(())
    }

    /// 模型标识，决定检查点、样例图、日志所在的子目录
    pub fn model_identity(&self) -> String {
        format!(
            "AnimeGANv2_{}_{}_{}_{}_{}_{}_{}_{}",
            self.dataset,
            self.gan_type,
            self.g_adv_weight as i64,
            self.d_adv_weight as i64,
            self.con_weight as i64,
            self.sty_weight as i64,
            self.color_weight as i64,
            self.tv_weight as i64,
        )
    }

    pub fn disc_term_weights(&self) -> DiscTermWeights {
        self.disc_weights
            .unwrap_or_else(|| DiscTermWeights::for_dataset(&self.dataset))
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓数据集目录↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn photo_dir(&self) -> PathBuf {
        self.dataset_root.join("train_photo")
    }

    pub fn style_dir(&self) -> PathBuf {
        self.dataset_root.join(&self.dataset).join("style")
    }

    pub fn smooth_dir(&self) -> PathBuf {
        self.dataset_root.join(&self.dataset).join("smooth")
    }

    pub fn val_dir(&self) -> PathBuf {
        self.dataset_root.join("val")
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑数据集目录↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.checkpoint_root.join(self.model_identity())
    }

    pub fn sample_dir(&self) -> PathBuf {
        self.sample_root.join(self.model_identity())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_root.join(self.model_identity())
    }
}
