/*
 * @Description  : Module trait：拥有命名参数的网络（或网络片段）
 */

use super::parameter::{Parameter, StateDict};
use crate::errors::TensorError;

/// 模块 trait
///
/// - `forward()`/`backward()` 不在此 trait 中（各类网络签名不同，见`network`）；
/// - 参数名须在模块内唯一，优化器与检查点都以参数名为键。
pub trait Module {
    /// 获取所有可训练参数
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// 参数（标量）总个数
    fn num_params(&self) -> usize {
        self.parameters().iter().map(|p| p.size()).sum()
    }

    /// 导出参数快照
    fn state_dict(&self) -> StateDict {
        self.parameters()
            .into_iter()
            .map(|p| (p.name().to_string(), p.value().clone()))
            .collect()
    }

    /// 从快照恢复参数。先整体校验（缺失或形状不符即报错），再写入，
    /// 因此失败时模块保持原样。
    fn load_state_dict(&mut self, state: &StateDict) -> Result<(), TensorError> {
        for p in self.parameters() {
            let value = state
                .get(p.name())
                .ok_or_else(|| TensorError::MissingParameter(p.name().to_string()))?;
            TensorError::check_same_shape(p.name(), p.value().shape(), value.shape())?;
        }
        for p in self.parameters_mut() {
            if let Some(value) = state.get(p.name()) {
                p.set_value(value.clone())?;
            }
        }
        Ok(())
    }
}
