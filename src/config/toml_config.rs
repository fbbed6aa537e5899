use crate::domain::services::{ColumnMapping, ForecastSettings};
use crate::domain::model::Seasonality;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
    validate_unit_interval, Validate,
};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];

/// 不活躍判定的最長回溯天數 (約一百年)
pub const MAX_INACTIVE_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub forecast: ForecastSettings,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Orders table. Also the goods table unless `goods_path` is set.
    pub path: String,
    pub goods_path: Option<String>,
    pub delimiter: Option<String>,
    pub date_formats: Option<Vec<String>>,
    #[serde(default)]
    pub columns: ColumnMapping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub top_n: usize,
    pub inactive_days: i64,
    /// `YYYY-MM-DD`; defaults to the latest order in the data.
    pub as_of: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 200,
            inactive_days: 180,
            as_of: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

fn default_output_formats() -> Vec<String> {
    OUTPUT_FORMATS.iter().map(|f| f.to_string()).collect()
}

impl SalesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validate_path("source.path", &self.source.path)?;
        if let Some(goods_path) = &self.source.goods_path {
            validate_path("source.goods_path", goods_path)?;
        }
        self.delimiter()?;

        let columns = &self.source.columns;
        for (field, value) in [
            ("source.columns.order_date", &columns.order_date),
            ("source.columns.customer_id", &columns.customer_id),
            ("source.columns.amount", &columns.amount),
            ("source.columns.ship_date", &columns.ship_date),
            ("source.columns.unit_price", &columns.unit_price),
            ("source.columns.quantity", &columns.quantity),
            ("source.columns.unit_cost", &columns.unit_cost),
        ] {
            validate_non_empty_string(field, value)?;
        }

        validate_positive_number("analysis.top_n", self.analysis.top_n, 1)?;
        if !(0..=MAX_INACTIVE_DAYS).contains(&self.analysis.inactive_days) {
            return Err(EtlError::InvalidConfigValueError {
                field: "analysis.inactive_days".to_string(),
                value: self.analysis.inactive_days.to_string(),
                reason: format!("Window must be between 0 and {} days", MAX_INACTIVE_DAYS),
            });
        }
        self.as_of()?;

        validate_positive_number("forecast.steps", self.forecast.steps, 1)?;
        validate_positive_number("forecast.period", self.forecast.period, 2)?;
        for (field, value) in [
            ("forecast.alpha", self.forecast.alpha),
            ("forecast.beta", self.forecast.beta),
            ("forecast.gamma", self.forecast.gamma),
        ] {
            if let Some(value) = value {
                validate_unit_interval(field, value)?;
            }
        }

        validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        for format in &self.load.output_formats {
            validate_one_of("load.output_formats", format, &OUTPUT_FORMATS)?;
        }
        if let Some(name) = self.compression().and_then(|c| c.filename.as_deref()) {
            validate_non_empty_string("load.compression.filename", name)?;
        }

        Ok(())
    }

    /// Single-byte field separator; `\t` is accepted for TSV input.
    pub fn delimiter(&self) -> Result<u8> {
        match self.source.delimiter.as_deref() {
            None => Ok(b','),
            Some("\\t") | Some("\t") | Some("tab") => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => Err(EtlError::InvalidConfigValueError {
                field: "source.delimiter".to_string(),
                value: d.to_string(),
                reason: "Delimiter must be a single ASCII character".to_string(),
            }),
        }
    }

    pub fn date_formats(&self) -> Vec<String> {
        self.source.date_formats.clone().unwrap_or_default()
    }

    pub fn as_of(&self) -> Result<Option<NaiveDateTime>> {
        let Some(text) = self.analysis.as_of.as_deref() else {
            return Ok(None);
        };

        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(Some)
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "analysis.as_of".to_string(),
                value: text.to_string(),
                reason: "Expected a date in YYYY-MM-DD format".to_string(),
            })
    }

    pub fn wants_format(&self, format: &str) -> bool {
        self.load.output_formats.iter().any(|f| f == format)
    }

    pub fn compression(&self) -> Option<&CompressionConfig> {
        self.load.compression.as_ref().filter(|c| c.enabled)
    }

    pub fn archive_name(&self) -> Option<String> {
        self.compression().map(|c| {
            c.filename
                .clone()
                .unwrap_or_else(|| "sales_report.zip".to_string())
        })
    }

    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    pub fn seasonality_label(&self) -> &'static str {
        match self.forecast.seasonality {
            Seasonality::Additive => "additive",
            Seasonality::Multiplicative => "multiplicative",
        }
    }
}

impl Validate for SalesConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
