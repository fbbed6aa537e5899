use crate::config::toml_config::SalesConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "sales-etl")]
#[command(about = "Monthly sales, customer and margin analysis with Holt-Winters forecasting")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "sales-etl.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Override the orders table path
    #[arg(long)]
    pub input: Option<String>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the number of months to forecast
    #[arg(long)]
    pub steps: Option<usize>,

    /// Override how many top customers to report
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Override the reference date (YYYY-MM-DD) for inactivity
    #[arg(long)]
    pub as_of: Option<String>,

    /// Dry run - validate inputs without running the analysis
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&self, config: &mut SalesConfig) {
        if let Some(input) = &self.input {
            config.source.path = input.clone();
            tracing::info!("🔧 Input overridden to: {}", input);
        }
        if let Some(output) = &self.output {
            config.load.output_path = output.clone();
            tracing::info!("🔧 Output path overridden to: {}", output);
        }
        if let Some(steps) = self.steps {
            config.forecast.steps = steps;
            tracing::info!("🔧 Forecast steps overridden to: {}", steps);
        }
        if let Some(top_n) = self.top_n {
            config.analysis.top_n = top_n;
            tracing::info!("🔧 Top customers overridden to: {}", top_n);
        }
        if let Some(as_of) = &self.as_of {
            config.analysis.as_of = Some(as_of.clone());
            tracing::info!("🔧 Reference date overridden to: {}", as_of);
        }
    }

    pub fn monitor_enabled(&self, config: &SalesConfig) -> bool {
        self.monitor.unwrap_or_else(|| config.monitoring_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[pipeline]
name = "cli"
version = "1.0"

[source]
path = "orders.csv"

[load]
output_path = "./output"

[monitoring]
enabled = true
"#;

    #[test]
    fn test_overrides_replace_config_values() {
        let args = CliArgs::parse_from([
            "sales-etl",
            "--config",
            "custom.toml",
            "--steps",
            "6",
            "--top-n",
            "10",
            "--output",
            "/tmp/reports",
            "--as-of",
            "2024-01-31",
            "--monitor",
            "false",
        ]);
        let mut config = SalesConfig::from_toml_str(CONFIG).unwrap();
        args.apply_overrides(&mut config);

        assert_eq!(args.config, "custom.toml");
        assert_eq!(config.forecast.steps, 6);
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.load.output_path, "/tmp/reports");
        assert_eq!(config.analysis.as_of.as_deref(), Some("2024-01-31"));
        assert!(!args.monitor_enabled(&config));
    }

    #[test]
    fn test_defaults_keep_config() {
        let args = CliArgs::parse_from(["sales-etl"]);
        let mut config = SalesConfig::from_toml_str(CONFIG).unwrap();
        args.apply_overrides(&mut config);

        assert_eq!(args.config, "sales-etl.toml");
        assert_eq!(config.source.path, "orders.csv");
        assert!(args.monitor_enabled(&config));
        assert!(!args.dry_run);
    }
}
