use thiserror::Error;
mod ops;
pub use self::ops::*;

/// 张量及网络前向/反向计算中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    // 数字比较用
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: usize,
    },
    // 张量二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个张量的形状为{tensor1_shape:?}，第二个张量的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    #[error("{context}：期望形状为{expected:?}，实际为{got:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("{context}：期望{expected}维张量，实际为{got}维")]
    DimensionMismatch {
        context: String,
        expected: usize,
        got: usize,
    },
    #[error("数据长度{len}与形状{shape:?}不符")]
    DataLengthMismatch { len: usize, shape: Vec<usize> },
    #[error("参数`{0}`不存在")]
    MissingParameter(String),
    #[error("张量列表为空")]
    EmptyList,
}

impl TensorError {
    /// 校验张量维数，供各层/损失函数在入口处使用
    pub fn check_dims(context: &str, shape: &[usize], expected: usize) -> Result<(), Self> {
        if shape.len() != expected {
            return Err(Self::DimensionMismatch {
                context: context.to_string(),
                expected,
                got: shape.len(),
            });
        }
        Ok(())
    }

    /// 校验两个形状严格一致
    pub fn check_same_shape(context: &str, expected: &[usize], got: &[usize]) -> Result<(), Self> {
        if expected != got {
            return Err(Self::ShapeMismatch {
                context: context.to_string(),
                expected: expected.to_vec(),
                got: got.to_vec(),
            });
        }
        Ok(())
    }
}
