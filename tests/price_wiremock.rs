use std::collections::BTreeSet;

use anyhow::Result;
use networth::providers::{
    CoinGeckoPriceSource, MetalsLivePriceSource, PriceSource, TwelveDataPriceSource,
};
use rust_decimal_macros::dec;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn coingecko_prices_the_whole_batch_in_one_request() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoPriceSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin,ethereum,usd-coin"))
        .and(query_param("vs_currencies", "usd"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"bitcoin": {"usd": 50000}, "ethereum": {"usd": 3000.25}, "usd-coin": {"usd": 1}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let prices = provider
        .fetch_prices(&ids(&["bitcoin", "ethereum", "usd-coin"]))
        .await?;

    assert_eq!(prices.len(), 3);
    assert_eq!(prices["bitcoin"], dec!(50000));
    assert_eq!(prices["ethereum"], dec!(3000.25));
    Ok(())
}

#[tokio::test]
async fn coingecko_empty_batch_makes_no_request() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoPriceSource::new().with_base_url(server.uri());

    let prices = provider.fetch_prices(&BTreeSet::new()).await?;
    assert!(prices.is_empty());

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty(), "expected no HTTP requests");
    Ok(())
}

#[tokio::test]
async fn coingecko_rate_limit_is_an_error() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CoinGeckoPriceSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let err = provider
        .fetch_prices(&ids(&["bitcoin"]))
        .await
        .expect_err("429 should fail");
    assert!(err.to_string().contains("429"));
    Ok(())
}

#[tokio::test]
async fn twelve_data_maps_tickers_back_to_identifiers() -> Result<()> {
    let server = MockServer::start().await;
    let provider = TwelveDataPriceSource::new("test-key").with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/price"))
        .and(query_param("symbol", "AAPL,VTI"))
        .and(query_param("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"AAPL": {"price": "190.12000"}, "VTI": {"price": "250.5"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let prices = provider.fetch_prices(&ids(&["AAPL", "vti"])).await?;

    assert_eq!(prices["AAPL"], dec!(190.12));
    assert_eq!(prices["vti"], dec!(250.5));
    Ok(())
}

#[tokio::test]
async fn twelve_data_single_symbol_shape() -> Result<()> {
    let server = MockServer::start().await;
    let provider = TwelveDataPriceSource::new("test-key").with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/price"))
        .and(query_param("symbol", "AAPL"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"price": "190.12"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let prices = provider.fetch_prices(&ids(&["AAPL"])).await?;
    assert_eq!(prices.len(), 1);
    assert_eq!(prices["AAPL"], dec!(190.12));
    Ok(())
}

#[tokio::test]
async fn twelve_data_skips_unknown_symbols_in_a_batch() -> Result<()> {
    let server = MockServer::start().await;
    let provider = TwelveDataPriceSource::new("test-key").with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/price"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "AAPL": {"price": "190.12"},
                "ZZZZ": {"code": 400, "message": "symbol not found", "status": "error"}
            }"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let prices = provider.fetch_prices(&ids(&["AAPL", "ZZZZ"])).await?;
    assert_eq!(prices.len(), 1);
    assert!(!prices.contains_key("ZZZZ"));
    Ok(())
}

#[tokio::test]
async fn twelve_data_top_level_error_fails_the_batch() -> Result<()> {
    let server = MockServer::start().await;
    let provider = TwelveDataPriceSource::new("bad-key").with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/price"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"code": 401, "message": "invalid api key", "status": "error"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = provider
        .fetch_prices(&ids(&["AAPL", "VTI"]))
        .await
        .expect_err("top-level error");
    assert!(err.to_string().contains("invalid api key"));
    Ok(())
}

#[tokio::test]
async fn metals_spot_list_is_merged() -> Result<()> {
    let server = MockServer::start().await;
    let provider = MetalsLivePriceSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v1/spot"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"[{"gold": 1931.2}, {"silver": 23.1}, {"platinum": 915}, {"timestamp": "soon"}]"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let prices = provider.fetch_prices(&ids(&["gold", "silver", "palladium"])).await?;

    assert_eq!(prices.len(), 2);
    assert_eq!(prices["gold"], dec!(1931.2));
    assert_eq!(prices["silver"], dec!(23.1));
    Ok(())
}
