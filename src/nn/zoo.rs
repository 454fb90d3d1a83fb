/*
 * @Description  : 网络调用约定（见`network`）的具体实现
 *                 - StyleGenerator：编码-解码结构的卷积生成器；
 *                 - PatchDiscriminator：输出逐块logit的卷积判别器；
 *                 - ConvFeatureExtractor：随机初始化的小型卷积特征提取器，或从npz载入的VGG19（截至conv4_4）。
 */

use super::layer::{Conv2d, LeakyRelu, MaxPool2d, Relu, Sequential, Tanh, Trace, Upsample2x, VggPreprocess};
use super::module::Module;
use super::network::{Discriminator, DiscriminatorOutput, FeatureExtractor, Generator};
use super::parameter::{Gradients, Parameter};
use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::ArrayD;
use ndarray_npy::{NpzReader, ReadNpzError};
use rand::Rng;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓生成器↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone)]
pub struct StyleGenerator {
    net: Sequential,
}

impl StyleGenerator {
    /// `channels`为基础通道数；输入的高、宽须为偶数
    pub fn new<R: Rng + ?Sized>(img_ch: usize, channels: usize, rng: &mut R) -> Self {
        let ch = channels.max(1);
        let net = Sequential::new()
            .push(Conv2d::new("generator.encode_0", img_ch, ch, 3, 1, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("generator.encode_1", ch, 2 * ch, 3, 2, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("generator.residual", 2 * ch, 2 * ch, 3, 1, rng))
            .push(LeakyRelu::default())
            .push(Upsample2x)
            .push(Conv2d::new("generator.decode_0", 2 * ch, ch, 3, 1, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("generator.out", ch, img_ch, 1, 1, rng))
            .push(Tanh);
        Self { net }
    }

    fn check_input(photo: &Tensor) -> Result<(), TensorError> {
        TensorError::check_dims("生成器输入 [batch, H, W, C]", photo.shape(), 4)?;
        let (h, w) = (photo.shape()[1], photo.shape()[2]);
        if h % 2 != 0 || w % 2 != 0 {
            return Err(TensorError::ShapeMismatch {
                context: "生成器输入的高、宽须为偶数".to_string(),
                expected: vec![h + h % 2, w + w % 2],
                got: vec![h, w],
            });
        }
        Ok(())
    }
}

impl Module for StyleGenerator {
    fn parameters(&self) -> Vec<&Parameter> {
        self.net.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.net.parameters_mut()
    }
}

impl Generator for StyleGenerator {
    type Trace = Trace;

    fn generate(&self, photo: &Tensor) -> Result<Tensor, TensorError> {
        Self::check_input(photo)?;
        self.net.forward(photo)
    }

    fn forward_trace(&self, photo: &Tensor) -> Result<Trace, TensorError> {
        Self::check_input(photo)?;
        self.net.forward_trace(photo)
    }

    fn backward(&self, trace: &Trace, grad_output: &Tensor, grads: &mut Gradients) -> Result<(), TensorError> {
        self.net.backward(trace, grad_output, Some(grads))?;
        Ok(())
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑生成器↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓判别器↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[derive(Debug, Clone)]
pub struct PatchDiscriminator {
    net: Sequential,
}

impl PatchDiscriminator {
    pub fn new<R: Rng + ?Sized>(img_ch: usize, channels: usize, rng: &mut R) -> Self {
        let ch = channels.max(2) / 2;
        let net = Sequential::new()
            .push(Conv2d::new("discriminator.conv_0", img_ch, ch, 3, 1, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("discriminator.conv_1", ch, 2 * ch, 3, 2, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("discriminator.conv_2", 2 * ch, 2 * ch, 3, 1, rng))
            .push(LeakyRelu::default())
            .push(Conv2d::new("discriminator.logit", 2 * ch, 1, 3, 1, rng));
        Self { net }
    }
}

impl Module for PatchDiscriminator {
    fn parameters(&self) -> Vec<&Parameter> {
        self.net.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.net.parameters_mut()
    }
}

impl Discriminator for PatchDiscriminator {
    type Trace = Trace;

    fn discriminate(&self, image: &Tensor) -> Result<DiscriminatorOutput, TensorError> {
        let trace = self.net.forward_trace(image)?;
        // 最后一层（logit卷积）的输入即辅助特征
        let features = match self.net.len().checked_sub(1).and_then(|i| trace.layer_input(i)) {
            Some(f) => f.clone(),
            None => image.clone(),
        };
        Ok(DiscriminatorOutput {
            logit: trace.into_output(),
            features,
        })
    }

    fn forward_trace(&self, image: &Tensor) -> Result<Trace, TensorError> {
        self.net.forward_trace(image)
    }

    fn backward(
        &self,
        trace: &Trace,
        grad_logit: &Tensor,
        grads: Option<&mut Gradients>,
    ) -> Result<Tensor, TensorError> {
        self.net.backward(trace, grad_logit, grads)
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑判别器↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓特征提取器↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 载入预训练权重时可能出现的错误
#[derive(Error, Debug)]
pub enum WeightsError {
    #[error("无法打开权重文件: {0}")]
    Io(#[from] std::io::Error),
    #[error("读取npz失败: {0}")]
    Npz(#[from] ReadNpzError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// VGG19 在 conv4_4 之前的卷积层，`None`表示2x2最大池化
const VGG19_UNTIL_CONV4_4: &[Option<&str>] = &[
    Some("conv1_1"),
    Some("conv1_2"),
    None,
    Some("conv2_1"),
    Some("conv2_2"),
    None,
    Some("conv3_1"),
    Some("conv3_2"),
    Some("conv3_3"),
    Some("conv3_4"),
    None,
    Some("conv4_1"),
    Some("conv4_2"),
    Some("conv4_3"),
    Some("conv4_4"),
];

/// 按名称读取数组，兼容带或不带`.npy`后缀的存储方式
fn read_npz_array(npz: &mut NpzReader<File>, name: &str) -> Result<ArrayD<f32>, ReadNpzError> {
    npz.by_name(&format!("{name}.npy")).or_else(|_| npz.by_name(name))
}

#[derive(Debug, Clone)]
pub struct ConvFeatureExtractor {
    net: Sequential,
}

impl ConvFeatureExtractor {
    /// 随机初始化的三层卷积特征提取器，最后一层不接激活
    pub fn random<R: Rng + ?Sized>(img_ch: usize, channels: usize, rng: &mut R) -> Self {
        let ch = channels.max(1);
        let net = Sequential::new()
            .push(Conv2d::new("features.conv_0", img_ch, ch, 3, 1, rng))
            .push(Relu)
            .push(Conv2d::new("features.conv_1", ch, ch, 3, 1, rng))
            .push(Relu)
            .push(MaxPool2d)
            .push(Conv2d::new("features.conv_2", ch, ch, 3, 1, rng));
        Self { net }
    }

    /// 从npz文件载入VGG19权重（截至conv4_4，且conv4_4不接激活）。
    /// 文件中每层须有`{层名}_W`（[kH, kW, C_in, C_out]）与`{层名}_b`（[C_out]）两个数组。
    pub fn vgg19_from_npz(path: &Path) -> Result<Self, WeightsError> {
        let mut npz = NpzReader::new(File::open(path)?)?;
        let mut net = Sequential::new().push(VggPreprocess);
        let last = VGG19_UNTIL_CONV4_4.len() - 1;
        for (i, layer) in VGG19_UNTIL_CONV4_4.iter().enumerate() {
            let Some(name) = layer else {
                net = net.push(MaxPool2d);
                continue;
            };
            let weight = read_npz_array(&mut npz, &format!("{name}_W"))?;
            let bias = read_npz_array(&mut npz, &format!("{name}_b"))?;
            let conv = Conv2d::from_tensors(
                &format!("vgg19.{name}"),
                Tensor::from_array(weight),
                Tensor::from_array(bias),
                1,
            )?;
            net = net.push(conv);
            if i != last {
                net = net.push(Relu);
            }
        }
        Ok(Self { net })
    }

    pub fn num_layers(&self) -> usize {
        self.net.len()
    }
}

impl FeatureExtractor for ConvFeatureExtractor {
    type Trace = Trace;

    fn extract(&self, image: &Tensor) -> Result<Tensor, TensorError> {
        self.net.forward(image)
    }

    fn extract_trace(&self, image: &Tensor) -> Result<Trace, TensorError> {
        self.net.forward_trace(image)
    }

    fn backward(&self, trace: &Trace, grad_features: &Tensor) -> Result<Tensor, TensorError> {
        self.net.backward(trace, grad_features, None)
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑特征提取器↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
