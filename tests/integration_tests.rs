use anyhow::Result;
use sales_etl::core::Pipeline;
use sales_etl::{EtlEngine, LocalStorage, SalesConfig, SalesPipeline};
use std::fmt::Write as _;
use tempfile::TempDir;

// 三年的訂單，每月各客戶一筆，十二月旺季
fn write_orders(dir: &std::path::Path) -> Result<String> {
    let season = [
        0.8, 0.85, 0.95, 1.0, 1.05, 1.1, 1.0, 0.95, 1.0, 1.1, 1.3, 1.5,
    ];
    let mut csv = String::from("OrderDate,CustomerID,TotalAmount,ShipTime,UnitPrice,Qty,UnitCost\n");

    for month in 0..36usize {
        let year = 2021 + (month / 12) as i32;
        let m = month % 12 + 1;
        for customer in 0..5usize {
            // 客戶 C4 在最後一年沒有訂單
            if customer == 4 && month >= 24 {
                continue;
            }
            let amount = (100.0 + 2.0 * month as f64) * season[month % 12] * (customer + 1) as f64;
            writeln!(
                csv,
                "{}-{:02}-{:02} 10:00:00,C{},{:.2},{}-{:02}-{:02},{:.2},2,{:.2}",
                year,
                m,
                customer + 3,
                customer,
                amount,
                year,
                m,
                customer + 5,
                amount / 2.0,
                amount * 0.3
            )?;
        }
    }
    writeln!(csv, "n/a,C9,999.00,,10,1,5")?;

    let path = dir.join("orders.csv");
    std::fs::write(&path, csv)?;
    Ok(path.to_string_lossy().into_owned())
}

fn config_for(input: &str, output: &str, extra: &str) -> Result<SalesConfig> {
    let toml_content = format!(
        r#"
[pipeline]
name = "integration"
version = "1.0"

[source]
path = "{}"

[source.columns]
order_date = "OrderDate"
customer_id = "CustomerID"
amount = "TotalAmount"
ship_date = "ShipTime"
unit_price = "UnitPrice"
quantity = "Qty"
unit_cost = "UnitCost"

[analysis]
top_n = 3
inactive_days = 180

[forecast]
steps = 6
alpha = 0.3
beta = 0.1
gamma = 0.3

[load]
output_path = "{}"
{}
"#,
        input.replace('\\', "/"),
        output.replace('\\', "/"),
        extra
    );
    Ok(SalesConfig::from_toml_str(&toml_content)?)
}

#[tokio::test]
async fn test_end_to_end_writes_all_reports() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_orders(temp_dir.path())?;
    let output_dir = temp_dir.path().join("reports");
    let output = output_dir.to_string_lossy().into_owned();

    let config = config_for(&input, &output, "")?;
    let pipeline = SalesPipeline::new(LocalStorage::new("."), config)?;
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let result = engine.run().await?;
    assert_eq!(result, output);
    assert!(engine.monitor().phases().is_empty());

    for name in [
        "monthly_sales.csv",
        "monthly_margin.csv",
        "top_customers.csv",
        "inactive_customers.csv",
        "forecast.csv",
        "chart_series.csv",
        "report.json",
    ] {
        assert!(output_dir.join(name).exists(), "missing {name}");
    }

    let forecast = std::fs::read_to_string(output_dir.join("forecast.csv"))?;
    let lines: Vec<&str> = forecast.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[1].starts_with("2024-01,"));

    let top = std::fs::read_to_string(output_dir.join("top_customers.csv"))?;
    let top_ids: Vec<&str> = top
        .lines()
        .skip(1)
        .map(|l| l.split(',').nth(1).unwrap_or_default())
        .collect();
    assert_eq!(top_ids, vec!["C3", "C4", "C2"]);

    Ok(())
}

#[tokio::test]
async fn test_report_properties() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_orders(temp_dir.path())?;
    let output = temp_dir.path().join("out").to_string_lossy().into_owned();

    let config = config_for(&input, &output, "")?;
    let pipeline = SalesPipeline::new(LocalStorage::new("."), config)?;

    let table = pipeline.extract().await?;
    assert_eq!(table.order_stats.rows_read, 36 * 5 - 12 + 1);
    assert_eq!(table.order_stats.missing_dates, 1);

    let dated_total: f64 = table
        .orders
        .iter()
        .filter(|o| o.ordered_at.is_some())
        .map(|o| o.amount)
        .sum();
    let report = pipeline.transform(table).await?;

    // 月彙總合計等於所有有效訂單金額
    let monthly_total: f64 = report.monthly_sales.iter().map(|m| m.amount).sum();
    assert!((monthly_total - dated_total).abs() < 1e-6);
    assert_eq!(report.monthly_sales.len(), 36);

    assert!(report.top_customers.len() <= 3);
    assert!(report
        .top_customers
        .windows(2)
        .all(|w| w[0].total_amount >= w[1].total_amount));

    for month in &report.monthly_margin {
        let expected = (month.sales - month.cost) / month.sales * 100.0;
        assert!((month.margin_percent.unwrap() - expected).abs() < 1e-9);
    }

    let forecast = report.forecast.as_ref().expect("36 months is enough history");
    assert_eq!(forecast.points.len(), 6);
    assert_eq!(report.chart.len(), 36 + 6);

    let inactive: Vec<&str> = report
        .inactive_customers
        .iter()
        .map(|c| c.customer_id.as_str())
        .collect();
    assert_eq!(inactive, vec!["C9", "C4"]);

    Ok(())
}

#[tokio::test]
async fn test_zip_bundle_and_json_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = write_orders(temp_dir.path())?;
    let output = temp_dir.path().join("bundle").to_string_lossy().into_owned();

    let extra = "output_formats = [\"json\"]\n\n[load.compression]\nenabled = true\n";
    let config = config_for(&input, &output, extra)?;
    let pipeline = SalesPipeline::new(LocalStorage::new("."), config)?;
    let result = EtlEngine::new(pipeline).run().await?;

    assert!(result.ends_with("sales_report.zip"));
    let zip_data = std::fs::read(&result)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    assert_eq!(archive.len(), 1);

    let mut json = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("report.json")?, &mut json)?;
    let report: serde_json::Value = serde_json::from_str(&json)?;
    assert_eq!(report["monthly_sales"][0]["period"], "2021-01");
    assert_eq!(report["forecast"]["points"].as_array().map(Vec::len), Some(6));

    Ok(())
}

#[tokio::test]
async fn test_missing_column_fails_extract() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("orders.csv");
    std::fs::write(&path, "Date,Customer,Total\n2024-01-01,A,1\n")?;
    let output = temp_dir.path().join("out").to_string_lossy().into_owned();

    let config = config_for(&path.to_string_lossy(), &output, "")?;
    let pipeline = SalesPipeline::new(LocalStorage::new("."), config)?;
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(
        err,
        sales_etl::EtlError::MissingColumnError { ref column, .. } if column == "OrderDate"
    ));
    Ok(())
}
