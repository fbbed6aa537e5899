use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &RunMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting sales analysis");

        // Extract
        tracing::info!("📥 Loading source tables...");
        let table = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded {} orders ({} undated) and {} goods lines ({} undated)",
            table.orders.len(),
            table.order_stats.missing_dates,
            table.goods.len(),
            table.goods_stats.missing_dates
        );
        self.monitor.record_phase("Extract");

        // Transform
        tracing::info!("🔄 Aggregating and forecasting...");
        let report = self.pipeline.transform(table).await?;
        tracing::info!(
            "Computed {} months, {} top customers, {} inactive customers, {} forecast points",
            report.monthly_sales.len(),
            report.top_customers.len(),
            report.inactive_customers.len(),
            report.forecast.as_ref().map(|f| f.points.len()).unwrap_or(0)
        );
        self.monitor.record_phase("Transform");

        // Load
        tracing::info!("💾 Writing reports...");
        let output_path = self.pipeline.load(report).await?;
        self.monitor.record_phase("Load");
        self.monitor.log_summary();

        tracing::info!("Output saved to: {}", output_path);
        Ok(output_path)
    }
}
