/*
 * @Description  : 训练调度：按epoch切换阶段，驱动每一步的网络更新，
 *                 并在每个epoch结束时保存检查点、导出验证图像与推理用生成器。
 *
 * - 初始化阶段 [0, init_epoch)：只用内容损失预训练生成器，判别器不变；
 * - 对抗阶段 [init_epoch, epoch)：每`training_rate`步更新一次判别器，每步都更新生成器；
 * - 从检查点恢复时从`保存的epoch + 1`继续，判别器更新节奏重新计数。
 */

mod error;
mod state;
mod step;

pub use error::TrainError;
pub use state::{Phase, TrainingState, UpdateCadence};
pub use step::{DiscriminatorLosses, GeneratorLosses, StepBatch, StepReport};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::TrainingConfig;
use crate::data::{DataError, ImageFolder, ImageSource};
use crate::export::{ValidationExporter, export_generator};
use crate::loss::DiscTermWeights;
use crate::metrics::{self, NullSink, RunningMean, SummarySink};
use crate::nn::{Adam, Discriminator, FeatureExtractor, Generator};
use crate::penalty::GradientPenalty;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};


/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓数据来源↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 训练所需的三个数据源：照片、风格图（及其灰度版）、边缘平滑的风格图
pub struct DataSources {
    pub photo: Box<dyn ImageSource>,
    pub style: Box<dyn ImageSource>,
    pub smooth: Box<dyn ImageSource>,
}

impl DataSources {
    pub fn new(photo: Box<dyn ImageSource>, style: Box<dyn ImageSource>, smooth: Box<dyn ImageSource>) -> Self {
        Self { photo, style, smooth }
    }

    /// 按配置中的数据集目录打开三个图像目录
    pub fn from_config(config: &TrainingConfig) -> Result<Self, DataError> {
        let open = |dir: PathBuf, offset: u64| {
            ImageFolder::open(&dir, config.batch_size, config.img_size, config.seed.wrapping_add(offset))
        };
        Ok(Self {
            photo: Box::new(open(config.photo_dir(), 0)?),
            style: Box::new(open(config.style_dir(), 1)?),
            smooth: Box::new(open(config.smooth_dir(), 2)?),
        })
    }

    /// 每个epoch的步数：max(照片数, 风格图数) / 批大小
    pub fn steps_per_epoch(&self, batch_size: usize) -> usize {
        self.photo.num_images().max(self.style.num_images()) / batch_size.max(1)
    }

    pub fn next_batch(&mut self) -> Result<StepBatch, DataError> {
        let photo = self.photo.next_batch()?;
        let style = self.style.next_batch()?;
        let smooth = self.smooth.next_batch()?;
        Ok(StepBatch {
            photo: photo.color,
            style: style.color,
            style_gray: style.gray,
            smooth: smooth.color,
        })
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑数据来源↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 可跨线程共享的停止标志，训练在步与步之间检查它
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// 本次运行开始的epoch（从检查点恢复时为保存的epoch + 1）
    pub start_epoch: usize,
    /// 本次运行完整跑完的epoch数
    pub epochs_completed: usize,
    pub steps: usize,
    pub stopped: bool,
    pub last_report: Option<StepReport>,
}

pub struct Trainer<G, D, F> {
    config: TrainingConfig,
    generator: G,
    discriminator: D,
    features: F,
    init_optimizer: Adam,
    g_optimizer: Adam,
    d_optimizer: Adam,
    penalty: GradientPenalty,
    disc_weights: DiscTermWeights,
    state: TrainingState,
    rng: StdRng,
    checkpoints: CheckpointStore,
    summary: Box<dyn SummarySink>,
    stop: StopHandle,
}

impl<G, D, F> Trainer<G, D, F>
where
    G: Generator,
    D: Discriminator,
    F: FeatureExtractor,
{
    pub fn new(config: TrainingConfig, generator: G, discriminator: D, features: F) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            init_optimizer: Adam::for_gan(config.init_lr),
            g_optimizer: Adam::for_gan(config.g_lr),
            d_optimizer: Adam::for_gan(config.d_lr),
            penalty: GradientPenalty::new(config.gan_type, config.ld),
            disc_weights: config.disc_term_weights(),
            state: TrainingState::new(config.training_rate),
            rng: StdRng::seed_from_u64(config.seed),
            checkpoints: CheckpointStore::new(config.checkpoint_dir(), config.model_identity()),
            summary: Box::new(NullSink),
            stop: StopHandle::default(),
            config,
            generator,
            discriminator,
            features,
        })
    }

    /// 指定指标记录的去处（默认丢弃）
    pub fn with_summary(mut self, sink: Box<dyn SummarySink>) -> Self {
        self.summary = sink;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn discriminator(&self) -> &D {
        &self.discriminator
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// 当前网络与对抗阶段优化器的快照（`epoch`为已完成的epoch）
    pub fn snapshot(&self, epoch: usize) -> Checkpoint {
        Checkpoint {
            identity: self.checkpoints.identity().to_string(),
            epoch,
            generator: self.generator.state_dict(),
            discriminator: self.discriminator.state_dict(),
            g_optimizer: self.g_optimizer.clone(),
            d_optimizer: self.d_optimizer.clone(),
        }
    }

    /// 载入最新的有效检查点，成功时返回其epoch。任何失败都只记日志，并从头开始训练
    pub fn restore(&mut self) -> Option<usize> {
        let checkpoint = match self.checkpoints.load() {
            Ok(Some(c)) => c,
            Ok(None) => {
                info!(" [!] 没有可用的检查点，从头开始训练");
                return None;
            }
            Err(e) => {
                warn!(" [!] 读取检查点失败，从头开始训练: {e}");
                return None;
            }
        };
        let generator_backup = self.generator.state_dict();
        if let Err(e) = self.generator.load_state_dict(&checkpoint.generator) {
            warn!(" [!] 检查点中的生成器参数无法载入，从头开始训练: {e}");
            return None;
        }
        if let Err(e) = self.discriminator.load_state_dict(&checkpoint.discriminator) {
            warn!(" [!] 检查点中的判别器参数无法载入，从头开始训练: {e}");
            if let Err(e) = self.generator.load_state_dict(&generator_backup) {
                error!("恢复生成器原参数失败: {e}");
            }
            return None;
        }
        self.g_optimizer = checkpoint.g_optimizer;
        self.d_optimizer = checkpoint.d_optimizer;
        self.state.current_epoch = checkpoint.epoch + 1;
        info!(" [*] 载入检查点成功：epoch {}", checkpoint.epoch);
        Some(checkpoint.epoch)
    }

    fn log_banner(&self, dataset_num: usize) {
        let c = &self.config;
        info!("##### Information #####");
        info!("# gan type : {}", c.gan_type);
        info!("# dataset : {}", c.dataset);
        info!("# max dataset number : {dataset_num}");
        info!("# batch_size : {}", c.batch_size);
        info!("# epoch : {}", c.epoch);
        info!("# init_epoch : {}", c.init_epoch);
        info!("# training image size [H, W] : {:?}", c.img_size);
        info!(
            "# g_adv_weight,d_adv_weight,con_weight,sty_weight,color_weight,tv_weight : {}, {}, {}, {}, {}, {}",
            c.g_adv_weight, c.d_adv_weight, c.con_weight, c.sty_weight, c.color_weight, c.tv_weight
        );
        info!("# init_lr,g_lr,d_lr : {}, {}, {}", c.init_lr, c.g_lr, c.d_lr);
        info!("# training_rate G -- D: {} : 1", c.training_rate);
        info!("# generator parameters : {}", self.generator.num_params());
        info!("# discriminator parameters : {}", self.discriminator.num_params());
    }

    fn record(&mut self, tag: &str, value: f32, epoch: usize) {
        if let Err(e) = self.summary.add_scalar(tag, value, epoch) {
            warn!("写入指标{tag}失败: {e}");
        }
    }

    fn flush_summary(&mut self) {
        if let Err(e) = self.summary.flush() {
            warn!("写入指标失败: {e}");
        }
    }

    /// 从最新检查点（若有）继续，训练到配置的总epoch数或收到停止请求
    pub fn run(&mut self, sources: &mut DataSources) -> Result<RunSummary, TrainError> {
        let batch_size = self.config.batch_size;
        let steps_per_epoch = sources.steps_per_epoch(batch_size);
        if steps_per_epoch == 0 {
            return Err(TrainError::NoSteps {
                photos: sources.photo.num_images(),
                styles: sources.style.num_images(),
                batch_size,
            });
        }
        let dataset_num = sources.photo.num_images().max(sources.style.num_images());
        self.log_banner(dataset_num);

        self.restore();
        self.state.cadence = UpdateCadence::new(self.config.training_rate);
        let start_epoch = self.state.current_epoch;
        let exporter = match ValidationExporter::new(&self.config.val_dir(), self.config.img_size, self.config.sample_dir())
        {
            Ok(e) => Some(e),
            Err(e) => {
                error!("无法读取验证图像目录，本次不导出验证结果: {e}");
                None
            }
        };

        let mut summary = RunSummary {
            start_epoch,
            epochs_completed: 0,
            steps: 0,
            stopped: false,
            last_report: None,
        };
        let interval = self.config.display_interval.max(1);
        let mut init_mean = RunningMean::default();
        let mut g_mean = RunningMean::default();
        let mut d_mean = RunningMean::default();

        for epoch in start_epoch..self.config.epoch {
            info!("Epoch {epoch}（{}阶段），共{steps_per_epoch}步", Phase::for_epoch(epoch, self.config.init_epoch));
            for step in 0..steps_per_epoch {
                if self.stop.is_stopped() {
                    info!("收到停止请求，在 epoch {epoch} 第{step}步前停止");
                    summary.stopped = true;
                    self.flush_summary();
                    return Ok(summary);
                }
                let batch = sources.next_batch()?;
                let report = self.train_step(epoch, step, &batch)?;
                summary.steps += 1;
                summary.last_report = Some(report);

                if let Some(loss) = report.init_loss {
                    self.record(metrics::G_INIT, loss, epoch);
                    init_mean.push(loss);
                }
                if report.discriminator_updated {
                    if let Some(d) = report.discriminator_loss {
                        self.record(metrics::DISCRIMINATOR_LOSS, d, epoch);
                    }
                }
                if let Some(g) = report.generator {
                    self.record(metrics::GENERATOR_LOSS, g.total, epoch);
                    self.record(metrics::G_GAN, g.adversarial, epoch);
                    self.record(metrics::G_PRE_MODEL, g.pre_model, epoch);
                    g_mean.push(g.total);
                    if let Some(d) = report.discriminator_loss {
                        d_mean.push(d);
                    }
                }
                debug!("epoch {epoch} step {step}: {report:?}");

                if (step + 1) % interval == 0 {
                    match report.phase {
                        Phase::Init => info!("Epoch {epoch} [{}/{steps_per_epoch}] mean_v_loss: {:.6}", step + 1, init_mean.mean()),
                        Phase::Adversarial => info!(
                            "Epoch {epoch} [{}/{steps_per_epoch}] mean_d_loss: {:.6}, mean_g_loss: {:.6}",
                            step + 1,
                            d_mean.mean(),
                            g_mean.mean()
                        ),
                    }
                    init_mean.reset();
                    g_mean.reset();
                    d_mean.reset();
                }
            }
            self.state.current_epoch = epoch + 1;
            summary.epochs_completed += 1;
            self.finish_epoch(epoch, exporter.as_ref())?;
        }
        self.flush_summary();
        Ok(summary)
    }

    /// epoch结束时的检查点与导出
    fn finish_epoch(&mut self, epoch: usize, exporter: Option<&ValidationExporter>) -> Result<(), TrainError> {
        let done = epoch + 1;
        if done < self.config.init_epoch {
            return Ok(());
        }
        if done % self.config.save_freq == 0 {
            let path = self.checkpoints.save(&self.snapshot(epoch))?;
            info!(" [*] 保存检查点: {}", path.display());
        }

        if let Some(exporter) = exporter {
            match exporter.export(&self.generator, epoch) {
                Ok(n) => info!("已导出{n}张验证图像到 {}", exporter.epoch_dir(epoch).display()),
                Err(e) => error!("导出验证图像失败: {e}"),
            }
        }
        let c = &self.config;
        match export_generator(&self.generator, &c.export_dir, &c.model_identity(), epoch, c.img_size, c.img_ch) {
            Ok(path) => info!("已导出生成器: {}", path.display()),
            Err(e) => error!("导出生成器失败: {e}"),
        }
        Ok(())
    }
}
