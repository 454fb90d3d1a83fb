/*
 * @Description  : 本模块提供图像文件的读写与简单处理。
 *                 在本模块中，不严谨地说：
 *                 1. 所谓的image/图像是指RGB格式的图像；
 *                 2. "灰度"（图）等同于英文中luma、luminance、grey、gray的概念。
 */

use crate::data::DataError;
use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

/// 识别为图像的文件扩展名（小写）
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

pub struct Vision;

impl Vision {
    /// 读取图像并缩放到`[高, 宽]`；尺寸已一致时不做缩放
    pub fn load_resized(path: &Path, size: [usize; 2]) -> Result<RgbImage, DataError> {
        let image = image::open(path)
            .map_err(|source| DataError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        Ok(Self::resize(&image, size))
    }

    pub fn resize(image: &RgbImage, size: [usize; 2]) -> RgbImage {
        let (height, width) = (size[0] as u32, size[1] as u32);
        if image.dimensions() == (width, height) {
            return image.clone();
        }
        image::imageops::resize(image, width, height, FilterType::Triangle)
    }

    /// 保存图像，按需创建父目录；格式由扩展名决定
    pub fn save(image: &RgbImage, path: &Path) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        image.save(path).map_err(|source| DataError::Image {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 亮度（Rec.601，与OpenCV一致）：Y = 0.299R + 0.587G + 0.114B
    pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

    pub fn luma(rgb: [f32; 3]) -> f32 {
        rgb.iter().zip(Self::LUMA_WEIGHTS).map(|(c, w)| c * w).sum()
    }

    pub fn to_gray(image: &RgbImage) -> GrayImage {
        GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let luma = Self::luma(image.get_pixel(x, y).0.map(f32::from));
            Luma([luma.round().clamp(0.0, 255.0) as u8])
        })
    }

    /// 列出目录下的图像文件（不递归），按文件名排序
    pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
        if !dir.is_dir() {
            return Err(DataError::DirNotFound(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
