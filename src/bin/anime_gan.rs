/*
 * @Description  : 命令行入口
 *                 - train：按配置（JSON文件与命令行覆盖项）训练；
 *                 - edge-smooth：为风格图生成边缘平滑版本。
 */

use anime_gan::config::TrainingConfig;
use anime_gan::data::edge_smooth_dir;
use anime_gan::loss::GanVariant;
use anime_gan::metrics::JsonlSummaryWriter;
use anime_gan::nn::{ConvFeatureExtractor, PatchDiscriminator, StyleGenerator};
use anime_gan::train::{DataSources, Trainer};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anime_gan", version, about = "AnimeGANv2 训练器")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 训练（若有同一模型的检查点则从其继续）
    Train(TrainArgs),
    /// 对风格图做边缘平滑，结果写入`{dataset_root}/{dataset}/smooth`
    EdgeSmooth(SmoothArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// JSON格式的配置文件，缺省时使用默认配置
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    dataset: Option<String>,
    #[arg(long)]
    dataset_root: Option<PathBuf>,
    #[arg(long)]
    epoch: Option<usize>,
    #[arg(long)]
    init_epoch: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    save_freq: Option<usize>,
    /// gan, lsgan, wgan, wgan-gp, wgan-lp, dragan, dragan-lp, hinge
    #[arg(long)]
    gan_type: Option<GanVariant>,
    #[arg(long)]
    training_rate: Option<usize>,
    /// 训练图像尺寸 [高 宽]
    #[arg(long, num_args = 2, value_names = ["H", "W"])]
    img_size: Option<Vec<usize>>,
    #[arg(long)]
    vgg_weights: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// 把最终生效的配置写到该路径
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SmoothArgs {
    #[arg(long, default_value = "Hayao")]
    dataset: String,
    #[arg(long, default_value = "dataset")]
    dataset_root: PathBuf,
    #[arg(long, default_value_t = 256)]
    img_size: usize,
}

impl TrainArgs {
    fn into_config(self) -> Result<TrainingConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load_json(path)?,
            None => TrainingConfig::default(),
        };
        if let Some(v) = self.dataset {
            config.dataset = v;
        }
        if let Some(v) = self.dataset_root {
            config.dataset_root = v;
        }
        if let Some(v) = self.epoch {
            config.epoch = v;
        }
        if let Some(v) = self.init_epoch {
            config.init_epoch = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.save_freq {
            config.save_freq = v;
        }
        if let Some(v) = self.gan_type {
            config.gan_type = v;
        }
        if let Some(v) = self.training_rate {
            config.training_rate = v;
        }
        if let Some([h, w]) = self.img_size.as_deref().and_then(|s| <[usize; 2]>::try_from(s).ok()) {
            config.img_size = [h, w];
        }
        if let Some(v) = self.vgg_weights {
            config.vgg_weights = Some(v);
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config.validate()?;
        if let Some(path) = &self.dump_config {
            config.save_json(path)?;
        }
        Ok(config)
    }
}

fn train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let config = args.into_config()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let generator = StyleGenerator::new(config.img_ch, config.ch, &mut rng);
    let discriminator = PatchDiscriminator::new(config.img_ch, config.ch, &mut rng);
    let features = match &config.vgg_weights {
        Some(path) => {
            info!("载入VGG19权重: {}", path.display());
            ConvFeatureExtractor::vgg19_from_npz(path)?
        }
        None => ConvFeatureExtractor::random(config.img_ch, config.feature_channels, &mut rng),
    };
    let mut sources = DataSources::from_config(&config)?;
    let summary = JsonlSummaryWriter::create(&config.log_dir())?;

    let mut trainer = Trainer::new(config, generator, discriminator, features)?.with_summary(Box::new(summary));
    let report = trainer.run(&mut sources)?;
    info!(
        "训练结束：从 epoch {} 开始，完成{}个epoch，共{}步{}",
        report.start_epoch,
        report.epochs_completed,
        report.steps,
        if report.stopped { "（提前停止）" } else { "" }
    );
    Ok(())
}

fn edge_smooth(args: SmoothArgs) -> Result<(), Box<dyn Error>> {
    let config = TrainingConfig {
        dataset: args.dataset,
        dataset_root: args.dataset_root,
        ..TrainingConfig::default()
    };
    let count = edge_smooth_dir(&config.style_dir(), &config.smooth_dir(), [args.img_size, args.img_size])?;
    info!("已处理{count}张图像，输出到 {}", config.smooth_dir().display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::EdgeSmooth(args) => edge_smooth(args),
    }
}
