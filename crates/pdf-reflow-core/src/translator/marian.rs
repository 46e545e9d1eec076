use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::marian::{Config as MarianConfig, MTModel};
use hf_hub::api::sync::{Api, ApiBuilder};
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use super::registry::ModelSpec;
use super::traits::{EngineInfo, EngineLoader, TranslationEngine};

const CONFIG_FILE: &str = "config.json";

/// Local paths of every artifact a Marian engine needs
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub source_tokenizer: PathBuf,
    pub target_tokenizer: PathBuf,
}

impl ModelFiles {
    /// Locate the files for `spec`, preferring `models_dir` over the hub.
    pub fn fetch(spec: &ModelSpec, config: &EngineConfig) -> Result<Self> {
        if let Some(models_dir) = &config.models_dir {
            let dir = models_dir.join(spec.model_id.replace('/', "--"));
            if dir.is_dir() {
                debug!("Using local model directory {}", dir.display());
                return Self::from_dir(spec, &dir);
            }
        }

        Self::from_hub(spec, config)
    }

    fn from_dir(spec: &ModelSpec, dir: &Path) -> Result<Self> {
        let file = |name: &str| -> Result<PathBuf> {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(not_found(spec, format!("missing {}", path.display())))
            }
        };

        Ok(Self {
            config: file(CONFIG_FILE)?,
            weights: file(&spec.weights_file)?,
            source_tokenizer: file(&spec.source_tokenizer_file)?,
            target_tokenizer: file(&spec.target_tokenizer_file)?,
        })
    }

    fn from_hub(spec: &ModelSpec, config: &EngineConfig) -> Result<Self> {
        let api = hub_api(config).map_err(|e| not_found(spec, e.to_string()))?;

        let model_repo = api.repo(Repo::with_revision(
            spec.model_id.clone(),
            RepoType::Model,
            spec.revision.clone(),
        ));
        let tokenizer_repo = api.model(spec.tokenizer_repo.clone());

        let get = |repo: &hf_hub::api::sync::ApiRepo, name: &str| -> Result<PathBuf> {
            repo.get(name)
                .map_err(|e| not_found(spec, format!("{name}: {e}")))
        };

        Ok(Self {
            config: get(&model_repo, CONFIG_FILE)?,
            weights: get(&model_repo, &spec.weights_file)?,
            source_tokenizer: get(&tokenizer_repo, &spec.source_tokenizer_file)?,
            target_tokenizer: get(&tokenizer_repo, &spec.target_tokenizer_file)?,
        })
    }
}

fn hub_api(config: &EngineConfig) -> std::result::Result<Api, hf_hub::api::sync::ApiError> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = &config.hub_cache_dir {
        builder = builder.with_cache_dir(dir.clone());
    }
    builder.build()
}

fn not_found(spec: &ModelSpec, reason: String) -> Error {
    Error::ModelNotFound {
        lang: spec.target.to_string(),
        model: spec.model_id.clone(),
        reason,
    }
}

/// MarianMT encoder-decoder running on candle with greedy decoding
pub struct MarianEngine {
    spec: ModelSpec,
    config: MarianConfig,
    // decode() mutates the KV cache, so units are serialized per engine
    model: Mutex<MTModel>,
    source_tokenizer: Tokenizer,
    target_tokenizer: Tokenizer,
    device: Device,
    max_new_tokens: usize,
}

impl MarianEngine {
    /// Load an engine from files already on disk.
    pub fn load(spec: &ModelSpec, files: &ModelFiles, engine: &EngineConfig) -> Result<Self> {
        let load_err = |reason: String| Error::EngineLoad {
            model: spec.model_id.clone(),
            reason,
        };

        let raw_config = std::fs::read(&files.config)?;
        let config: MarianConfig = serde_json::from_slice(&raw_config)
            .map_err(|e| load_err(format!("invalid {CONFIG_FILE}: {e}")))?;

        let device = if engine.use_gpu {
            Device::cuda_if_available(0).map_err(|e| load_err(e.to_string()))?
        } else {
            Device::Cpu
        };

        let vb = if files.weights.extension().is_some_and(|ext| ext == "bin") {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)
        } else {
            let data = std::fs::read(&files.weights)?;
            VarBuilder::from_buffered_safetensors(data, DType::F32, &device)
        }
        .map_err(|e| load_err(format!("weights: {e}")))?;

        let model = MTModel::new(&config, vb).map_err(|e| load_err(e.to_string()))?;

        let source_tokenizer = Tokenizer::from_file(&files.source_tokenizer)
            .map_err(|e| load_err(format!("source tokenizer: {e}")))?;
        let target_tokenizer = Tokenizer::from_file(&files.target_tokenizer)
            .map_err(|e| load_err(format!("target tokenizer: {e}")))?;

        Ok(Self {
            spec: spec.clone(),
            config,
            model: Mutex::new(model),
            source_tokenizer,
            target_tokenizer,
            device,
            max_new_tokens: engine.max_new_tokens,
        })
    }

    fn generate(&self, model: &mut MTModel, input_ids: &[u32]) -> candle_core::Result<Vec<u32>> {
        let tokens = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let encoder_xs = model.encoder().forward(&tokens, 0)?;

        let mut output = vec![self.config.decoder_start_token_id];
        for index in 0..self.max_new_tokens {
            let context_size = if index >= 1 { 1 } else { output.len() };
            let start_pos = output.len().saturating_sub(context_size);
            let input = Tensor::new(&output[start_pos..], &self.device)?.unsqueeze(0)?;

            let logits = model.decode(&input, &encoder_xs, start_pos)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let mut scores = logits.to_dtype(DType::F32)?.to_vec1::<f32>()?;

            let Some(token) = pick_next_token(&mut scores, self.config.pad_token_id) else {
                break;
            };
            output.push(token);
            if token == self.config.eos_token_id || token == self.config.forced_eos_token_id {
                break;
            }
        }

        Ok(output)
    }
}

impl TranslationEngine for MarianEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "MarianMT",
            model_id: self.spec.model_id.clone(),
            source: self.spec.source.clone(),
            target: self.spec.target.clone(),
        }
    }

    fn translate_unit(&self, text: &str) -> Result<String> {
        let encoding = self
            .source_tokenizer
            .encode(text, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        let limit = self.config.max_position_embeddings;
        let (input_ids, dropped) =
            prepare_input_ids(encoding.get_ids(), self.config.eos_token_id, limit);
        if dropped > 0 {
            warn!(
                "Unit exceeds the model limit of {} tokens, dropping the last {}",
                limit, dropped
            );
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| Error::Inference("model lock poisoned".to_string()))?;

        model.reset_kv_cache();
        let generated = self.generate(&mut model, &input_ids);
        model.reset_kv_cache();
        drop(model);

        let generated = generated.map_err(|e| Error::Inference(e.to_string()))?;
        let output_ids = strip_special_tokens(
            &generated,
            &[
                self.config.pad_token_id,
                self.config.eos_token_id,
                self.config.decoder_start_token_id,
            ],
        );

        self.target_tokenizer
            .decode(&output_ids, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }
}

/// Loads [`MarianEngine`]s from a local model directory or the hub
pub struct MarianLoader {
    config: EngineConfig,
}

impl MarianLoader {
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineLoader for MarianLoader {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranslationEngine>> {
        let started = Instant::now();
        let files = ModelFiles::fetch(spec, &self.config)?;
        let engine = MarianEngine::load(spec, &files, &self.config)?;
        info!(
            "Loaded {} on {:?} in {:.1?}",
            spec.model_id,
            engine.device,
            started.elapsed()
        );
        Ok(Arc::new(engine))
    }
}

/// Terminate `ids` with exactly one `eos`, keeping at most `max_len` tokens.
///
/// Also returns how many tokens of the body were cut off.
pub(crate) fn prepare_input_ids(ids: &[u32], eos: u32, max_len: usize) -> (Vec<u32>, usize) {
    let body = ids.strip_suffix(&[eos]).unwrap_or(ids);
    let keep = body.len().min(max_len.saturating_sub(1));

    let mut prepared = Vec::with_capacity(keep + 1);
    prepared.extend_from_slice(&body[..keep]);
    prepared.push(eos);
    (prepared, body.len() - keep)
}

/// Greedy choice over `scores`; the pad token is never emitted.
pub(crate) fn pick_next_token(scores: &mut [f32], pad: u32) -> Option<u32> {
    if let Some(score) = usize::try_from(pad).ok().and_then(|i| scores.get_mut(i)) {
        *score = f32::NEG_INFINITY;
    }

    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .and_then(|(index, _)| u32::try_from(index).ok())
}

pub(crate) fn strip_special_tokens(ids: &[u32], special: &[u32]) -> Vec<u32> {
    ids.iter().copied().filter(|id| !special.contains(id)).collect()
}
