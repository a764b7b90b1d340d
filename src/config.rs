use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which of the cumulative API surfaces this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVariant {
    /// `/predict` returns the tag only.
    Tag,
    /// `/predict` returns tag and credit score.
    Credit,
    /// Credit plus the `/reward` endpoint.
    Full,
}

impl ApiVariant {
    pub fn needs_regressor(self) -> bool {
        matches!(self, ApiVariant::Credit | ApiVariant::Full)
    }

    pub fn needs_reward_model(self) -> bool {
        matches!(self, ApiVariant::Full)
    }
}

impl FromStr for ApiVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tag" | "v1" => Ok(ApiVariant::Tag),
            "credit" | "v2" => Ok(ApiVariant::Credit),
            "full" | "v3" => Ok(ApiVariant::Full),
            other => anyhow::bail!("API_VARIANT must be one of tag, credit, full (got '{}')", other),
        }
    }
}

impl fmt::Display for ApiVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiVariant::Tag => "tag",
            ApiVariant::Credit => "credit",
            ApiVariant::Full => "full",
        };
        f.write_str(name)
    }
}

/// Where the transformer forward pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    /// CUDA, then Metal, then CPU.
    Auto,
    Cpu,
    Cuda,
    Metal,
}

impl FromStr for DevicePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            other => anyhow::bail!(
                "INFERENCE_DEVICE must be one of auto, cpu, cuda, metal (got '{}')",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub variant: ApiVariant,
    pub classifier_path: PathBuf,
    pub regressor_path: PathBuf,
    pub label_encoder_path: PathBuf,
    pub reward_model_dir: PathBuf,
    pub device: DevicePreference,
    pub max_body_bytes: usize,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 5003;
    pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model_dir = PathBuf::from(get("MODEL_DIR").unwrap_or_else(|| "models".to_string()));
        let path_or = |key: &str, default: &str| {
            get(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| model_dir.join(default))
        };

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match get("PORT") {
                Some(port) => port
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
                None => Self::DEFAULT_PORT,
            },
            variant: get("API_VARIANT")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(ApiVariant::Full),
            classifier_path: path_or("CLASSIFIER_PATH", "random_forest_model.json"),
            regressor_path: path_or("REGRESSOR_PATH", "linear_regression_model.json"),
            label_encoder_path: path_or("LABEL_ENCODER_PATH", "label_encoder.json"),
            reward_model_dir: path_or("REWARD_MODEL_DIR", "reward_model"),
            device: get("INFERENCE_DEVICE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(DevicePreference::Auto),
            max_body_bytes: match get("MAX_BODY_BYTES") {
                Some(bytes) => bytes
                    .trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))?,
                None => Self::DEFAULT_MAX_BODY_BYTES,
            },
        };

        tracing::debug!("API variant: {}", config.variant);
        tracing::debug!("Classifier artifact: {}", config.classifier_path.display());
        tracing::debug!("Label encoder artifact: {}", config.label_encoder_path.display());
        if config.variant.needs_regressor() {
            tracing::debug!("Regressor artifact: {}", config.regressor_path.display());
        }
        if config.variant.needs_reward_model() {
            tracing::debug!("Reward model directory: {}", config.reward_model_dir.display());
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
