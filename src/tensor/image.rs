use super::Tensor;
use crate::errors::TensorError;
use image::{GrayImage, Rgb, RgbImage};

/// 像素值[0,255]与张量值[-1,1]之间的换算
const HALF_RANGE: f32 = 127.5;

impl Tensor {
    /// 将RGB图像转换为形状为[H, W, 3]、值域为[-1, 1]的张量
    pub fn from_rgb_image(image: &RgbImage) -> Tensor {
        let (width, height) = image.dimensions();
        let data = image
            .as_raw()
            .iter()
            .map(|&p| p as f32 / HALF_RANGE - 1.0)
            .collect::<Vec<_>>();
        Tensor::new(&data, &[height as usize, width as usize, 3])
    }

    /// 将灰度图转换为形状为[H, W, 3]的张量（灰度值复制到3个通道），值域为[-1, 1]
    pub fn from_gray_image(image: &GrayImage) -> Tensor {
        let (width, height) = image.dimensions();
        let data = image
            .as_raw()
            .iter()
            .flat_map(|&p| [p as f32 / HALF_RANGE - 1.0; 3])
            .collect::<Vec<_>>();
        Tensor::new(&data, &[height as usize, width as usize, 3])
    }

    /// 将形状为[H, W, 3]（或[1, H, W, 3]）、值域为[-1, 1]的张量转换为RGB图像，超出值域的部分会被截断
    pub fn to_rgb_image(&self) -> Result<RgbImage, TensorError> {
        let shape = match self.shape() {
            [1, h, w, 3] | [h, w, 3] => [*h, *w],
            other => {
                return Err(TensorError::ShapeMismatch {
                    context: "张量转RGB图像".to_string(),
                    expected: vec![0, 0, 3],
                    got: other.to_vec(),
                });
            }
        };
        let (height, width) = (shape[0], shape[1]);
        let pixels = self.data.iter().copied().collect::<Vec<_>>();
        let mut image = RgbImage::new(width as u32, height as u32);
        for (i, pixel) in pixels.chunks_exact(3).enumerate() {
            let x = (i % width) as u32;
            let y = (i / width) as u32;
            let to_u8 = |v: f32| num_traits::clamp((v + 1.0) * HALF_RANGE, 0.0, 255.0).round() as u8;
            image.put_pixel(x, y, Rgb([to_u8(pixel[0]), to_u8(pixel[1]), to_u8(pixel[2])]));
        }
        Ok(image)
    }
}
