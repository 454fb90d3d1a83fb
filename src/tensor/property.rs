/*
 * @Description  : 本文件仅包含一些属性与统计方法，不会修改张量本身
 */

use super::Tensor;
use crate::errors::TensorError;
use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

impl Tensor {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓快照/view↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }
    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }
    /// 按行优先（标准布局）顺序拷贝出全部元素
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑快照/view↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 若为向量，`shape`可以是[n]、[1,n]、[n,1]；
    /// 若为图像批次，`shape`为[batch, H, W, C]。
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 张量的维（dim）数、阶（rank）数
    pub fn dimension(&self) -> usize {
        self.data.ndim()
    }

    /// 计算张量中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 首个维度的长度，即批大小；标量返回1
    pub fn batch_size(&self) -> usize {
        self.shape().first().copied().unwrap_or(1)
    }

    /// 判断两个张量的形状是否严格一致。如：形状为 [1, 4]，[1, 4]和[4]是不一致的，会返回false
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 所有元素是否均为有限值（不含NaN和±Inf）
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓统计量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的均值；空张量返回0
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            return 0.0;
        }
        self.sum() / self.size() as f32
    }

    /// 所有元素平方和
    pub fn sum_squares(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum()
    }

    /// 所有元素的（总体）方差，对应`tf.nn.moments`在全部维度上的结果
    pub fn variance(&self) -> f32 {
        let mean = self.mean();
        if self.size() == 0 {
            return 0.0;
        }
        self.data.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / self.size() as f32
    }

    pub fn std_dev(&self) -> f32 {
        self.variance().sqrt()
    }

    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, x| acc.max(x.abs()))
    }

    /// 两个同形张量的点积和（逐元素相乘再求和）
    pub fn dot_sum(&self, other: &Tensor) -> Result<f32, TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::OperatorError {
                operator: crate::errors::Operator::DotSum,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: other.shape().to_vec(),
            });
        }
        let mut value = 0.0;
        Zip::from(&self.data)
            .and(&other.data)
            .for_each(|a, b| value += a * b);
        Ok(value)
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑统计量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓按样本（首维）操作↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 取出批次中的第`index`个样本，返回的张量保留批维度（形状为[1, ...]）
    pub fn sample(&self, index: usize) -> Result<Tensor, TensorError> {
        if index >= self.batch_size() {
            return Err(TensorError::ValueMustSatisfyComparison {
                value_name: "样本索引".to_string(),
                operator: crate::errors::ComparisonOperator::LessOrEqual,
                threshold: self.batch_size().saturating_sub(1),
            });
        }
        let sample = self.data.index_axis(Axis(0), index).insert_axis(Axis(0));
        Ok(Tensor::from_array(sample.to_owned()))
    }

    /// 每个样本在除批维度外所有维度上展平后的L2范数
    pub fn per_sample_l2_norm(&self) -> Vec<f32> {
        self.data
            .axis_iter(Axis(0))
            .map(|s| s.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect()
    }

    /// 每个样本乘以各自的系数（系数个数须等于批大小）
    pub fn scale_per_sample(&self, factors: &[f32]) -> Result<Tensor, TensorError> {
        if factors.len() != self.batch_size() {
            return Err(TensorError::ShapeMismatch {
                context: "按样本缩放".to_string(),
                expected: vec![self.batch_size()],
                got: vec![factors.len()],
            });
        }
        let mut data = self.data.clone();
        for (mut s, &k) in data.axis_iter_mut(Axis(0)).zip(factors) {
            s.mapv_inplace(|x| x * k);
        }
        Ok(Tensor::from_array(data))
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑按样本（首维）操作↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
