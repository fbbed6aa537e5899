use clap::Parser;
use sales_etl::utils::error::ErrorSeverity;
use sales_etl::utils::{logger, validation::Validate};
use sales_etl::{CliArgs, EtlEngine, LocalStorage, SalesConfig, SalesPipeline};
use std::path::Path;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 載入 TOML 配置
    let mut config = match SalesConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs || config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting sales-etl");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No analysis will be performed");
        let ok = perform_dry_run(&config).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    let monitor_enabled = args.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".");
    let pipeline = match SalesPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Analysis completed successfully!");
            println!("✅ Analysis completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

fn display_config_summary(config: &SalesConfig) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Orders: {}", config.source.path);
    if let Some(goods_path) = &config.source.goods_path {
        println!("  Goods: {}", goods_path);
    }
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));
    println!(
        "  Top customers: {}, inactive after {} days",
        config.analysis.top_n, config.analysis.inactive_days
    );
    println!(
        "  Forecast: {} months, period {}, {}",
        config.forecast.steps,
        config.forecast.period,
        config.seasonality_label()
    );
    if let Some(archive) = config.archive_name() {
        println!("  Archive: {}", archive);
    }
}

async fn perform_dry_run(config: &SalesConfig) -> bool {
    println!("🔍 Dry Run Analysis:");

    let mut inputs = vec![config.source.path.as_str()];
    if let Some(goods_path) = &config.source.goods_path {
        inputs.push(goods_path.as_str());
    }

    let mut ok = true;
    for input in inputs {
        match tokio::fs::metadata(input).await {
            Ok(meta) => println!("  ✅ {} ({} bytes)", input, meta.len()),
            Err(e) => {
                println!("  ❌ {} ({})", input, e);
                ok = false;
            }
        }
    }

    if Path::new(config.output_path()).exists() {
        println!("  Output directory exists: {}", config.output_path());
    } else {
        println!("  Output directory will be created: {}", config.output_path());
    }

    ok
}
