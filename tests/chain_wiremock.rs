use std::time::Duration;

use anyhow::Result;
use networth::providers::{
    BalanceQuery, BalanceSource, BlockstreamBalanceSource, CryptoOrgBalanceSource,
    EtherscanBalanceSource, RateGate,
};
use rust_decimal_macros::dec;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

fn etherscan(server: &MockServer) -> EtherscanBalanceSource {
    EtherscanBalanceSource::new("test-key")
        .with_base_url(server.uri())
        .with_gate(RateGate::unlimited())
}

#[tokio::test]
async fn etherscan_native_balance_is_scaled_from_wei() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("module", "account"))
        .and(query_param("action", "balance"))
        .and(query_param("address", ADDRESS))
        .and(query_param("tag", "latest"))
        .and(query_param("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "1", "message": "OK", "result": "1500000000000000000"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let balance = etherscan(&server)
        .fetch_balance(&BalanceQuery::native(ADDRESS))
        .await?;
    assert_eq!(balance, dec!(1.5));
    Ok(())
}

#[tokio::test]
async fn etherscan_token_balance_uses_contract_decimals() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("action", "tokenbalance"))
        .and(query_param("contractaddress", USDC))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "1", "message": "OK", "result": "2500123456"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let balance = etherscan(&server)
        .fetch_balance(&BalanceQuery::token(ADDRESS, USDC, 6))
        .await?;
    assert_eq!(balance, dec!(2500.123456));
    Ok(())
}

#[tokio::test]
async fn etherscan_status_zero_is_an_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "0", "message": "NOTOK", "result": "Invalid API Key"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = etherscan(&server)
        .fetch_balance(&BalanceQuery::native(ADDRESS))
        .await
        .expect_err("NOTOK");
    assert!(err.to_string().contains("Invalid API Key"));
    Ok(())
}

#[tokio::test]
async fn etherscan_requests_are_spaced_by_the_gate() -> Result<()> {
    let server = MockServer::start().await;
    let provider = EtherscanBalanceSource::new("test-key")
        .with_base_url(server.uri())
        .with_gate(RateGate::new(Duration::from_millis(100)));

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "1", "message": "OK", "result": "0"}"#,
            "application/json",
        ))
        .expect(3)
        .mount(&server)
        .await;

    let started = tokio::time::Instant::now();
    for _ in 0..3 {
        provider.fetch_balance(&BalanceQuery::native(ADDRESS)).await?;
    }
    assert!(started.elapsed() >= Duration::from_millis(200));
    Ok(())
}

#[tokio::test]
async fn blockstream_subtracts_spent_outputs() -> Result<()> {
    let server = MockServer::start().await;
    let provider = BlockstreamBalanceSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/api/address/bc1qtest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "address": "bc1qtest",
                "chain_stats": {"funded_txo_count": 3, "funded_txo_sum": 150000000,
                                "spent_txo_count": 1, "spent_txo_sum": 25000000, "tx_count": 4},
                "mempool_stats": {"funded_txo_count": 0, "funded_txo_sum": 0,
                                  "spent_txo_count": 0, "spent_txo_sum": 0, "tx_count": 0}
            }"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let balance = provider
        .fetch_balance(&BalanceQuery::native("bc1qtest"))
        .await?;
    assert_eq!(balance, dec!(1.25));
    Ok(())
}

#[tokio::test]
async fn blockstream_rejects_token_queries() {
    let provider = BlockstreamBalanceSource::new().with_base_url("http://127.0.0.1:9");
    let result = provider
        .fetch_balance(&BalanceQuery::token("bc1qtest", USDC, 6))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn crypto_org_sums_total_balance_in_cro() -> Result<()> {
    let server = MockServer::start().await;
    let provider = CryptoOrgBalanceSource::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/cro1test"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"result": {"address": "cro1test", "totalBalance": [
                {"denom": "basecro", "amount": "150000000000"},
                {"denom": "basecro", "amount": "50000000"}
            ]}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let balance = provider
        .fetch_balance(&BalanceQuery::native("cro1test"))
        .await?;
    assert_eq!(balance, dec!(1500.5));
    Ok(())
}
