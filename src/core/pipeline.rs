use crate::config::toml_config::SalesConfig;
use crate::core::{AnalysisReport, Pipeline, SalesTable, Storage};
use crate::domain::model::{MonthlyAggregate, OrderRecord};
use crate::domain::services::{aggregate, forecast, margin, render, selector, TableReader};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Reads the configured order table, runs the sales analysis and writes the
/// report files through `S`.
pub struct SalesPipeline<S: Storage> {
    pub(crate) storage: S,
    pub(crate) config: SalesConfig,
    reader: TableReader,
}

impl<S: Storage> SalesPipeline<S> {
    pub fn new(storage: S, config: SalesConfig) -> Result<Self> {
        let reader = TableReader::new(config.delimiter()?, config.date_formats());
        Ok(Self {
            storage,
            config,
            reader,
        })
    }

    fn output_file(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in files {
            zip.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Monthly buckets must add up to the dated order total. Summation order
/// differs between the two, so the tolerance scales with gross volume.
fn reconcile_monthly_total(
    monthly: &[MonthlyAggregate],
    orders: &[OrderRecord],
    total_sales: f64,
) -> Result<()> {
    let monthly_total: f64 = monthly.iter().map(|m| m.amount).sum();
    let gross: f64 = orders
        .iter()
        .filter(|o| o.ordered_at.is_some())
        .map(|o| o.amount.abs())
        .sum();

    if (monthly_total - total_sales).abs() > 1e-9 * gross.max(1.0) {
        return Err(EtlError::ProcessingError {
            message: format!(
                "Monthly totals ({:.2}) do not add up to order total ({:.2})",
                monthly_total, total_sales
            ),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for SalesPipeline<S> {
    async fn extract(&self) -> Result<SalesTable> {
        let columns = &self.config.source.columns;

        tracing::info!("📂 Reading orders from: {}", self.config.source.path);
        let orders_data = self.storage.read_file(&self.config.source.path).await?;
        let (orders, order_stats) = self.reader.read_orders(&orders_data, columns)?;

        // 未指定商品明細檔時，訂單表同時作為商品明細
        let (goods, goods_stats) = match &self.config.source.goods_path {
            Some(goods_path) => {
                tracing::info!("📂 Reading goods lines from: {}", goods_path);
                let goods_data = self.storage.read_file(goods_path).await?;
                self.reader.read_goods(&goods_data, columns)?
            }
            None => self.reader.read_goods(&orders_data, columns)?,
        };

        if order_stats.missing_dates > 0 {
            tracing::warn!(
                "⚠️ {} of {} orders have an unparseable date and are excluded from monthly figures",
                order_stats.missing_dates,
                order_stats.rows_read
            );
        }
        if order_stats.missing_customers > 0 {
            tracing::warn!(
                "⚠️ {} orders have no customer id and are excluded from customer rankings",
                order_stats.missing_customers
            );
        }

        Ok(SalesTable {
            orders,
            goods,
            order_stats,
            goods_stats,
        })
    }

    async fn transform(&self, table: SalesTable) -> Result<AnalysisReport> {
        let analysis = &self.config.analysis;

        let monthly_sales = aggregate::monthly_sales(&table.orders);
        let total_sales = aggregate::total_sales(&table.orders);
        reconcile_monthly_total(&monthly_sales, &table.orders, total_sales)?;

        let totals = aggregate::customer_totals(&table.orders);
        let top_customers = selector::top_customers(&totals, analysis.top_n);

        let as_of = match self.config.as_of()? {
            Some(as_of) => Some(as_of),
            None => aggregate::latest_order_at(&table.orders),
        };
        let inactive_customers = match as_of {
            Some(as_of) => selector::inactive_customers(&totals, as_of, analysis.inactive_days),
            None => {
                tracing::warn!("⚠️ No dated orders; skipping inactive customer analysis");
                Vec::new()
            }
        };

        let monthly_margin = margin::monthly_margin(&table.goods);

        let forecast = match forecast::forecast_monthly(&monthly_sales, &self.config.forecast) {
            Ok(forecast) => Some(forecast),
            Err(e) if self.config.forecast.required => return Err(e),
            Err(EtlError::InsufficientDataError { required, actual }) => {
                tracing::warn!(
                    "⚠️ Forecast skipped: {} months of history, {} needed",
                    actual,
                    required
                );
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Forecast skipped: {}", e);
                None
            }
        };

        let chart = render::chart_series(&monthly_sales, forecast.as_ref());

        Ok(AnalysisReport {
            as_of,
            order_stats: table.order_stats,
            goods_stats: table.goods_stats,
            total_sales,
            monthly_sales,
            monthly_margin,
            top_customers,
            inactive_customers,
            forecast,
            chart,
        })
    }

    async fn load(&self, report: AnalysisReport) -> Result<String> {
        let mut files = Vec::new();
        if self.config.wants_format("csv") {
            files.extend(render::csv_tables(&report)?);
        }
        if self.config.wants_format("json") {
            let json_data = serde_json::to_string_pretty(&report)?;
            files.push(("report.json".to_string(), json_data.into_bytes()));
        }

        if let Some(archive_name) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = Self::bundle(&files)?;
            let archive_path = self.output_file(&archive_name);
            self.storage.write_file(&archive_path, &zip_data).await?;
            tracing::info!("📦 Report archive saved: {}", archive_path);
            return Ok(archive_path);
        }

        for (name, data) in &files {
            self.storage.write_file(&self.output_file(name), data).await?;
            tracing::debug!("Wrote {}", name);
        }
        tracing::info!(
            "📁 {} report files saved to: {}",
            files.len(),
            self.config.output_path()
        );
        Ok(self.config.output_path().to_string())
    }
}
