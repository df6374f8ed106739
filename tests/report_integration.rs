mod support;

use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use networth::clock::{Clock, FixedClock};
use networth::config::DisplayConfig;
use networth::format::Formatter;
use networth::inventory::Inventory;
use networth::models::Category;
use networth::providers::{BalanceQuery, ProviderSet};
use networth::report::{aggregate, render_json, render_text, GroupBy, ReportOptions};
use networth::valuation::{ValuationRun, Valuator};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use support::{MockBalanceSource, MockPriceSource};

const INVENTORY: &str = r#"
[bitcoin]
category = "cryptocurrency"
group = "crypto"
sources = { cold = 0.5, gemini = { exchange = "gemini" } }

[checking]
category = "constant"
group = "liquid"
sources = { bank = 10000 }

[house]
category = { name = "constant", price = 150000 }
group = "real-estate"
sources = { deed = 1 }

[dust]
category = "constant"
group = "misc"
sources = { jar = 3.5 }

[bullion.gold]
quantity = [1, 0.5]
"#;

fn clock() -> FixedClock {
    FixedClock::at(Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap())
}

async fn valued_run(inventory: &str) -> Result<ValuationRun> {
    let providers = ProviderSet::new()
        .with_price_source(
            Category::CryptoCurrency,
            Arc::new(MockPriceSource::new().with_price("bitcoin", dec!(50000))),
        )
        .with_price_source(
            Category::Metal,
            Arc::new(MockPriceSource::new().with_price("gold", dec!(2000))),
        )
        .with_balance_source(Arc::new(
            MockBalanceSource::new("gemini").with_balance(BalanceQuery::account("BTC"), dec!(0.2)),
        ));
    let valuator = Valuator::new(providers);
    let inventory = Inventory::from_toml_str(inventory)?;
    Ok(valuator.value_all(inventory.into_assets()).await)
}

#[tokio::test]
async fn holdings_of_one_identifier_merge_into_one_row() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let report = aggregate(&run, &ReportOptions::default(), &clock());

    let crypto = report
        .sections
        .iter()
        .find(|s| s.name == "crypto")
        .expect("crypto section");
    assert_eq!(crypto.rows.len(), 1);
    let bitcoin = &crypto.rows[0];
    assert_eq!(bitcoin.constituents.len(), 2);
    assert_eq!(bitcoin.quantity, dec!(0.7));
    assert_eq!(bitcoin.price, dec!(50000));
    assert_eq!(bitcoin.value, dec!(35000));
    assert_eq!(crypto.subtotal, dec!(35000));

    // 35000 + 10000 + 150000 + 3.5 + 3000
    assert_eq!(report.total, dec!(198003.5));
    assert_eq!(report.generated_at, clock().now());
    Ok(())
}

#[tokio::test]
async fn allocations_sum_to_one_hundred() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let report = aggregate(&run, &ReportOptions::default(), &clock());

    let sum: Decimal = report.sections.iter().map(|s| s.allocation).sum();
    assert!((sum - dec!(100)).abs() < dec!(0.000001), "sum was {sum}");

    let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["bullion", "crypto", "liquid", "misc", "real-estate"]);
    Ok(())
}

#[tokio::test]
async fn zero_total_reports_zero_percent() -> Result<()> {
    let run = valued_run(
        r#"
[checking]
category = "constant"
group = "liquid"
sources = { bank = 0 }
"#,
    )
    .await?;
    let report = aggregate(&run, &ReportOptions::default(), &clock());

    assert_eq!(report.total, Decimal::ZERO);
    assert_eq!(report.sections[0].rows[0].allocation, Decimal::ZERO);
    let text = render_text(&report, &Formatter::new(DisplayConfig::default()), false)?;
    assert!(text.contains("0.00%"));
    Ok(())
}

#[tokio::test]
async fn min_balance_hides_rows_and_empty_sections() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let options = ReportOptions {
        min_balance: dec!(100),
        ..Default::default()
    };
    let report = aggregate(&run, &options, &clock());

    assert!(report.sections.iter().all(|s| s.name != "misc"));
    // Hidden rows still count toward net worth.
    assert_eq!(report.total, dec!(198003.5));
    Ok(())
}

#[tokio::test]
async fn category_grouping_reorganizes_sections() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let options = ReportOptions {
        group_by: GroupBy::Category,
        ..Default::default()
    };
    let report = aggregate(&run, &options, &clock());

    let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["bullion", "crypto", "fiat"]);
    let fiat = &report.sections[2];
    // Ascending by value.
    let rows: Vec<&str> = fiat.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(rows, vec!["dust", "checking", "house"]);
    Ok(())
}

#[tokio::test]
async fn text_report_ends_with_networth_line() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let report = aggregate(&run, &ReportOptions::default(), &clock());
    let text = render_text(&report, &Formatter::new(DisplayConfig::default()), false)?;

    let lines: Vec<&str> = text.lines().collect();
    let divider = lines
        .iter()
        .position(|l| l.starts_with("===="))
        .expect("divider");
    assert!(lines[divider + 1].starts_with("Networth (USD)"));
    assert!(lines[divider + 1].ends_with("$198,003.50"));
    assert!(!text.contains("Warnings"));
    Ok(())
}

#[tokio::test]
async fn json_report_is_machine_readable() -> Result<()> {
    let run = valued_run(INVENTORY).await?;
    let report = aggregate(&run, &ReportOptions::default(), &clock());
    let json: serde_json::Value = serde_json::from_str(&render_json(&report)?)?;

    assert_eq!(json["total"], "198003.5");
    assert_eq!(json["generated_at"], "2026-10-01T12:00:00Z");
    assert_eq!(json["sections"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn btc_wallet_and_exchange_literal_make_one_row() -> Result<()> {
    const WALLET: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    let prices = Arc::new(MockPriceSource::new().with_price("BTC", dec!(50000)));
    let blockstream = Arc::new(
        MockBalanceSource::new("blockstream").with_balance(BalanceQuery::native(WALLET), dec!(0.2)),
    );
    let providers = ProviderSet::new()
        .with_price_source(Category::CryptoCurrency, prices.clone())
        .with_balance_source(blockstream.clone());
    let valuator = Valuator::new(providers);
    let inventory = Inventory::from_toml_str(&format!(
        r#"
[BTC]
category = "cryptocurrency"
group = "crypto"
sources = {{ wallet = "{WALLET}", exchange = 0.5 }}
"#
    ))?;

    let run = valuator.value_all(inventory.into_assets()).await;
    let report = aggregate(&run, &ReportOptions::default(), &clock());

    assert_eq!(report.sections.len(), 1);
    let row = &report.sections[0].rows[0];
    assert_eq!(row.name, "BTC");
    assert_eq!(row.quantity, dec!(0.7));
    assert_eq!(row.price, dec!(50000));
    assert_eq!(row.value, dec!(35000));
    assert_eq!(row.allocation, dec!(100));
    assert_eq!(report.total, dec!(35000));
    assert_eq!(blockstream.calls(), 1);
    assert_eq!(prices.calls(), 1);
    assert!(prices.requests()[0].contains("BTC"));
    Ok(())
}
