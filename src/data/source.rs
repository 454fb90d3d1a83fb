/*
 * @Description  : 训练图像的批次来源。
 *                 数据源无限循环：每遍历完一轮（epoch）就重新打乱顺序，
 *                 每个批次同时给出彩色图与其灰度版本（灰度值复制到3个通道）。
 */

use super::DataError;
use crate::errors::TensorError;
use crate::tensor::Tensor;
use crate::vision::Vision;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// 一个批次：形状均为[batch, H, W, 3]，值域[-1, 1]
#[derive(Debug, Clone)]
pub struct ImageBatch {
    pub color: Tensor,
    pub gray: Tensor,
}

pub trait ImageSource {
    fn next_batch(&mut self) -> Result<ImageBatch, DataError>;

    /// 数据源中的图像总数
    fn num_images(&self) -> usize;

    fn batch_size(&self) -> usize;
}

/// 读取一个目录下全部图像的数据源
#[derive(Debug)]
pub struct ImageFolder {
    dir: PathBuf,
    files: Vec<PathBuf>,
    order: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    img_size: [usize; 2],
    rng: StdRng,
}

impl ImageFolder {
    pub fn open(dir: &Path, batch_size: usize, img_size: [usize; 2], seed: u64) -> Result<Self, DataError> {
        let files = Vision::list_images(dir)?;
        if files.is_empty() {
            return Err(DataError::Empty(dir.to_path_buf()));
        }
        if files.len() < batch_size {
            return Err(DataError::NotEnoughImages {
                dir: dir.to_path_buf(),
                found: files.len(),
                batch_size,
            });
        }
        let mut source = Self {
            dir: dir.to_path_buf(),
            order: (0..files.len()).collect(),
            files,
            cursor: 0,
            batch_size,
            img_size,
            rng: StdRng::seed_from_u64(seed),
        };
        source.order.shuffle(&mut source.rng);
        Ok(source)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 按当前顺序取下一张图的路径，到达末尾时重新打乱
    fn next_path(&mut self) -> &Path {
        if self.cursor == self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
        }
        let index = self.order[self.cursor];
        self.cursor += 1;
        &self.files[index]
    }
}

impl ImageSource for ImageFolder {
    fn next_batch(&mut self) -> Result<ImageBatch, DataError> {
        let mut color = Vec::with_capacity(self.batch_size);
        let mut gray = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let img_size = self.img_size;
            let image = Vision::load_resized(self.next_path(), img_size)?;
            color.push(Tensor::from_rgb_image(&image));
            gray.push(Tensor::from_gray_image(&Vision::to_gray(&image)));
        }
        Ok(ImageBatch {
            color: Tensor::stack(&color)?,
            gray: Tensor::stack(&gray)?,
        })
    }

    fn num_images(&self) -> usize {
        self.files.len()
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// 内存中的数据源，按固定顺序循环给出样本（不打乱）
#[derive(Debug, Clone)]
pub struct TensorSource {
    color: Vec<Tensor>,
    gray: Vec<Tensor>,
    cursor: usize,
    batch_size: usize,
}

impl TensorSource {
    /// `color`为形状[N, H, W, 3]的批次，灰度版本与[`ImageFolder`]一样按[`Vision::luma`]计算
    pub fn new(color: &Tensor, batch_size: usize) -> Result<Self, DataError> {
        TensorError::check_dims("内存数据源 [batch, H, W, 3]", color.shape(), 4)?;
        TensorError::check_same_shape("内存数据源的通道数", &[3], &color.shape()[3..])?;
        let count = color.batch_size();
        if count == 0 || batch_size > count {
            return Err(DataError::NotEnoughImages {
                dir: PathBuf::from("<memory>"),
                found: count,
                batch_size,
            });
        }
        let mut colors = Vec::with_capacity(count);
        let mut grays = Vec::with_capacity(count);
        for i in 0..count {
            let sample = color.sample(i)?;
            let shape = sample.shape()[1..].to_vec();
            // 权重和为1，可直接作用于[-1, 1]的值
            let data = sample
                .to_vec()
                .chunks_exact(3)
                .flat_map(|px| [Vision::luma([px[0], px[1], px[2]]); 3])
                .collect();
            grays.push(Tensor::from_vec(data, &shape)?);
            colors.push(Tensor::from_vec(sample.to_vec(), &shape)?);
        }
        Ok(Self {
            color: colors,
            gray: grays,
            cursor: 0,
            batch_size,
        })
    }
}

impl ImageSource for TensorSource {
    fn next_batch(&mut self) -> Result<ImageBatch, DataError> {
        let mut color = Vec::with_capacity(self.batch_size);
        let mut gray = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            if self.cursor == self.color.len() {
                self.cursor = 0;
            }
            color.push(self.color[self.cursor].clone());
            gray.push(self.gray[self.cursor].clone());
            self.cursor += 1;
        }
        Ok(ImageBatch {
            color: Tensor::stack(&color)?,
            gray: Tensor::stack(&gray)?,
        })
    }

    fn num_images(&self) -> usize {
        self.color.len()
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}
