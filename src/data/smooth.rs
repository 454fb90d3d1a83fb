/*
 * @Description  : 风格图像的边缘平滑预处理。
 *                 判别器需要一组"边缘被模糊"的风格图作为负样本，生成步骤为：
 *                 1. 对灰度图做Canny边缘检测（阈值100/200）；
 *                 2. 用5x5的方形结构元素膨胀边缘；
 *                 3. 仅在膨胀后的边缘像素处，用5x5高斯核（反射填充）替换彩色图的像素值。
 */

use super::DataError;
use crate::vision::Vision;
use image::{Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use std::path::Path;
use tracing::debug;

const KERNEL_SIZE: usize = 5;
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

/// 5x5 高斯核，sigma取OpenCV在ksize=5时的默认值 0.3·((5-1)·0.5-1)+0.8 = 1.1
fn gaussian_kernel() -> [[f32; KERNEL_SIZE]; KERNEL_SIZE] {
    let sigma = 0.3 * ((KERNEL_SIZE as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (KERNEL_SIZE / 2) as f32;
    let mut row = [0.0f32; KERNEL_SIZE];
    for (i, v) in row.iter_mut().enumerate() {
        let x = i as f32 - half;
        *v = (-(x * x) / (2.0 * sigma * sigma)).exp();
    }
    let total: f32 = row.iter().sum();
    row.iter_mut().for_each(|v| *v /= total);

    let mut kernel = [[0.0f32; KERNEL_SIZE]; KERNEL_SIZE];
    for (ky, line) in kernel.iter_mut().enumerate() {
        for (kx, v) in line.iter_mut().enumerate() {
            *v = row[ky] * row[kx];
        }
    }
    kernel
}

/// 反射填充下的坐标（不重复边界像素，如 -1 -> 1）
fn reflect(i: isize, len: usize) -> u32 {
    let last = len as isize - 1;
    let mut r = i;
    if r < 0 {
        r = -r;
    }
    if r > last {
        r = 2 * last - r;
    }
    r.clamp(0, last.max(0)) as u32
}

/// 对一张图做边缘平滑，返回新图
pub fn smooth_edges(image: &RgbImage) -> RgbImage {
    let gray = Vision::to_gray(image);
    let edges = imageproc::edges::canny(&gray, CANNY_LOW, CANNY_HIGH);
    let dilated = imageproc::morphology::dilate(&edges, Norm::LInf, (KERNEL_SIZE / 2) as u8);
    let kernel = gaussian_kernel();
    let half = (KERNEL_SIZE / 2) as isize;
    let (width, height) = image.dimensions();

    let mut output = image.clone();
    for (x, y, mask) in dilated.enumerate_pixels() {
        if mask.0[0] == 0 {
            continue;
        }
        let mut acc = [0.0f32; 3];
        for (ky, line) in kernel.iter().enumerate() {
            let sy = reflect(y as isize + ky as isize - half, height as usize);
            for (kx, &weight) in line.iter().enumerate() {
                let sx = reflect(x as isize + kx as isize - half, width as usize);
                let px = image.get_pixel(sx, sy).0;
                for c in 0..3 {
                    acc[c] += weight * px[c] as f32;
                }
            }
        }
        output.put_pixel(x, y, Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8)));
    }
    output
}

/// 将`src`目录下的每张图缩放到`img_size`后做边缘平滑，以同名文件写入`dst`。返回处理的图像数
pub fn edge_smooth_dir(src: &Path, dst: &Path, img_size: [usize; 2]) -> Result<usize, DataError> {
    let files = Vision::list_images(src)?;
    if files.is_empty() {
        return Err(DataError::Empty(src.to_path_buf()));
    }
    for file in &files {
        let image = Vision::load_resized(file, img_size)?;
        let Some(name) = file.file_name() else {
            continue;
        };
        Vision::save(&smooth_edges(&image), &dst.join(name))?;
        debug!("边缘平滑: {}", file.display());
    }
    Ok(files.len())
}
