//! Transformer reward model: BERT encoder with a linear head on the `[CLS]` state.

use crate::config::DevicePreference;
use crate::inference::Predictor;
use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Files that make up a reward model directory.
#[derive(Debug, Clone)]
pub struct RewardModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl RewardModelFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [&self.config, &self.tokenizer, &self.weights]
            .into_iter()
            .map(PathBuf::as_path)
    }
}

/// Picks the device for the forward pass.
///
/// `Auto` tries CUDA, then Metal, and settles on CPU. An explicit accelerator
/// that cannot be opened is an error.
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => Device::new_cuda(0).context("Failed to open CUDA device 0"),
        DevicePreference::Metal => Device::new_metal(0).context("Failed to open Metal device 0"),
        DevicePreference::Auto => {
            if let Ok(device) = Device::new_cuda(0) {
                tracing::info!("Using CUDA device for reward model");
                return Ok(device);
            }
            match Device::new_metal(0) {
                Ok(device) => {
                    tracing::info!("Using Metal device for reward model");
                    Ok(device)
                }
                Err(err) => {
                    tracing::debug!("No accelerator available ({}), using CPU", err);
                    Ok(Device::Cpu)
                }
            }
        }
    }
}

/// Fine-tuned BERT regressor that scores an activity description.
pub struct BertRegressor {
    bert: BertModel,
    head: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertRegressor {
    /// Loads config, tokenizer and safetensors weights.
    ///
    /// Weights are expected under `bert.*` for the encoder and `regressor.*`
    /// for the head.
    pub fn load(files: &RewardModelFiles, device: Device) -> Result<Self> {
        let config_text = std::fs::read_to_string(&files.config)
            .with_context(|| format!("Failed to read {}", files.config.display()))?;
        let config: BertConfig = serde_json::from_str(&config_text)
            .with_context(|| format!("Failed to parse BERT config {}", files.config.display()))?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| {
            anyhow!("Failed to load tokenizer {}: {}", files.tokenizer.display(), e)
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)
        }
        .with_context(|| format!("Failed to map weights {}", files.weights.display()))?;

        let bert = BertModel::load(vb.pp("bert"), &config).context("Failed to build BERT encoder")?;
        let head = candle_nn::linear(config.hidden_size, 1, vb.pp("regressor"))
            .context("Failed to build regression head")?;

        Ok(Self {
            bert,
            head,
            tokenizer,
            device,
        })
    }

    fn forward(&self, text: &str) -> Result<f64> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .bert
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0, ..))?;
        let output = self.head.forward(&cls)?.flatten_all()?.to_vec1::<f32>()?;

        output
            .first()
            .map(|v| f64::from(*v))
            .ok_or_else(|| anyhow!("reward head returned an empty tensor"))
    }
}

impl Predictor<str> for BertRegressor {
    type Output = f64;

    fn predict(&self, text: &str) -> Result<f64> {
        self.forward(text)
    }

    fn name(&self) -> &str {
        "bert_regressor"
    }
}
