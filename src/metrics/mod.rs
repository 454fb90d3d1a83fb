/*
 * @Description  : 训练指标：按epoch记录的标量序列，以及用于日志显示的滑动平均
 */

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

/// 指标序列名
pub const G_INIT: &str = "G_init";
pub const GENERATOR_LOSS: &str = "Generator_loss";
pub const G_GAN: &str = "G_gan";
pub const G_PRE_MODEL: &str = "G_pre_model";
pub const DISCRIMINATOR_LOSS: &str = "Discriminator_loss";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub tag: String,
    pub step: usize,
    pub value: f32,
}

/// 标量指标的去处
pub trait SummarySink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 以JSON Lines格式追加写入`{目录}/scalars.jsonl`
pub struct JsonlSummaryWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSummaryWriter {
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("scalars.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读回文件中的全部记录
    pub fn read_all(path: &Path) -> io::Result<Vec<ScalarRecord>> {
        fs::read_to_string(path)?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(io::Error::from))
            .collect()
    }
}

impl SummarySink for JsonlSummaryWriter {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> io::Result<()> {
        let record = ScalarRecord {
            tag: tag.to_string(),
            step,
            value,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// 内存中的指标记录
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<ScalarRecord>,
}

impl MemorySink {
    pub fn series(&self, tag: &str) -> Vec<(usize, f32)> {
        self.records
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| (r.step, r.value))
            .collect()
    }
}

impl SummarySink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: usize) -> io::Result<()> {
        self.records.push(ScalarRecord {
            tag: tag.to_string(),
            step,
            value,
        });
        Ok(())
    }
}

/// 不记录任何内容
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SummarySink for NullSink {
    fn add_scalar(&mut self, _: &str, _: f32, _: usize) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn push(&mut self, value: f32) {
        self.sum += value as f64;
        self.count += 1;
    }

    /// 无数据时为0
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / self.count as f64) as f32
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
