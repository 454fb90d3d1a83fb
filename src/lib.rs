//! # AnimeGAN
//!
//! 用纯rust张量实现的AnimeGANv2训练器：把照片转换为动漫风格的生成对抗网络训练。
//!
//! 训练分两个阶段：先只用内容损失预训练生成器（初始化阶段），
//! 再让生成器与判别器交替更新（对抗阶段），损失由对抗、内容、风格、颜色与全变分项组成。
//! 检查点、验证图像与推理用生成器会在每个epoch结束时写出。

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod errors;
pub mod export;
pub mod loss;
pub mod metrics;
pub mod nn;
pub mod penalty;
pub mod tensor;
pub mod train;
pub mod vision;
