use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::constant::{Const, DataError, Timeframe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// 最多保留的已完成笔数量，超出时丢弃最早的笔。
    #[serde(default = "default_max_strokes")]
    pub max_strokes: usize,
}

fn default_max_strokes() -> usize {
    Const::DEFAULT_MAX_STROKES
}

impl EngineConfig {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            max_strokes: Const::DEFAULT_MAX_STROKES,
        }
    }

    pub fn with_max_strokes(mut self, max_strokes: usize) -> Self {
        self.max_strokes = max_strokes;
        self
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbol.trim().is_empty() {
            return Err(DataError::InvalidConfig("symbol must not be empty".to_string()));
        }
        if self.max_strokes == 0 {
            return Err(DataError::InvalidConfig(
                "max_strokes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 从 json / yaml 文件读取配置，按扩展名识别格式。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|x| x.to_str()) {
            Some("json") => {
                let value: JsonValue = serde_json::from_str(&text)?;
                serde_json::from_value(value)?
            }
            Some("yaml") | Some("yml") => {
                let value: YamlValue = serde_yaml::from_str(&text)?;
                serde_yaml::from_value(value)?
            }
            _ => return Err(DataError::UnsupportedFormat(path.display().to_string())),
        };

        config.validate()?;
        Ok(config)
    }
}
