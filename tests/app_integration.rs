use std::fs;
use stockval::AppCommand;
use stockval::cli::membership::MembershipCommand;
use stockval::core::membership::{ConstituentRecord, IndexCode};
use stockval::core::service::PeBasis;
use tempfile::TempDir;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_alpha_vantage(
        mock_server: &MockServer,
        function: &str,
        mock_response: &str,
        expected_calls: u64,
    ) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .expect(expected_calls)
            .mount(mock_server)
            .await;
    }

    pub fn annual_earnings(eps: &[f64]) -> String {
        let entries: Vec<String> = eps
            .iter()
            .enumerate()
            .map(|(i, value)| {
                format!(
                    r#"{{"fiscalDateEnding": "{}-12-31", "reportedEPS": "{}"}}"#,
                    2024 - i,
                    value
                )
            })
            .collect();
        format!(
            r#"{{"symbol": "ACME", "annualEarnings": [{}]}}"#,
            entries.join(",")
        )
    }

    pub fn annual_income(net_income: &[f64]) -> String {
        let entries: Vec<String> = net_income
            .iter()
            .enumerate()
            .map(|(i, value)| {
                format!(
                    r#"{{"fiscalDateEnding": "{}-12-31", "reportedCurrency": "USD", "netIncome": "{}"}}"#,
                    2024 - i,
                    value
                )
            })
            .collect();
        format!(
            r#"{{"symbol": "ACME", "annualReports": [{}]}}"#,
            entries.join(",")
        )
    }

    pub const BALANCE_SHEET: &str = r#"{
        "symbol": "ACME",
        "annualReports": [{
            "fiscalDateEnding": "2024-12-31",
            "reportedCurrency": "USD",
            "totalAssets": "100000000000",
            "totalLiabilities": "50000000000",
            "totalCurrentAssets": "40000000000",
            "goodwill": "5000000000",
            "intangibleAssets": "None"
        }]
    }"#;
}

fn write_config(dir: &TempDir, base_url: &str) -> String {
    let config_path = dir.path().join("config.yaml");
    let config_content = format!(
        r#"
        providers:
          alpha_vantage:
            base_url: {base_url}
            api_key: "demo"
          yahoo:
            base_url: {base_url}
          exchange_rate:
            base_url: {base_url}
        data_path: "{}"
        request_timeout_secs: 5
    "#,
        dir.path().join("data").display()
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");
    config_path.to_string_lossy().to_string()
}

#[test_log::test(tokio::test)]
async fn test_full_report_flow_with_mock() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_alpha_vantage(
        &mock_server,
        "EARNINGS",
        &test_utils::annual_earnings(&[6.0, 5.5, 5.0, 4.5, 4.0, 3.5, 3.0, 2.5]),
        1,
    )
    .await;
    test_utils::mount_alpha_vantage(
        &mock_server,
        "INCOME_STATEMENT",
        &test_utils::annual_income(&[1.0e9, 9.0e8, 8.0e8, 1.0e9, 1.1e9, 1.2e9, 1.0e9]),
        1,
    )
    .await;
    test_utils::mount_alpha_vantage(&mock_server, "BALANCE_SHEET", test_utils::BALANCE_SHEET, 1)
        .await;
    test_utils::mount_alpha_vantage(
        &mock_server,
        "OVERVIEW",
        r#"{"Symbol": "ACME", "Currency": "USD", "MarketCapitalization": "20000000000"}"#,
        1,
    )
    .await;
    test_utils::mount_alpha_vantage(
        &mock_server,
        "GLOBAL_QUOTE",
        r#"{"Global Quote": {"01. symbol": "ACME", "05. price": "90.00"}}"#,
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());
    info!(%config_path, "Running report against mock providers");

    let result = stockval::run_command(
        AppCommand::Report {
            tickers: vec!["acme".to_string()],
        },
        Some(&config_path),
    )
    .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
    assert!(dir.path().join("data").join("cache").exists());
}

#[test_log::test(tokio::test)]
async fn test_pe_with_supplied_market_value_skips_quote() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_alpha_vantage(
        &mock_server,
        "INCOME_STATEMENT",
        &test_utils::annual_income(&[1.0e9; 7]),
        1,
    )
    .await;
    test_utils::mount_alpha_vantage(&mock_server, "OVERVIEW", "{}", 0).await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = stockval::run_command(
        AppCommand::Pe {
            tickers: vec!["ACME".to_string()],
            basis: PeBasis::NetIncome,
            market_value: Some(2.0e10),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Pe command failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_assets_without_market_cap_fails() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_alpha_vantage(&mock_server, "OVERVIEW", r#"{"Note": "rate limited"}"#, 1)
        .await;
    test_utils::mount_alpha_vantage(&mock_server, "BALANCE_SHEET", test_utils::BALANCE_SHEET, 0)
        .await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, &mock_server.uri());

    let result = stockval::run_command(
        AppCommand::Assets {
            ticker: "ACME".to_string(),
            market_cap: None,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("No balance sheet or market cap available for ACME")
    );
}

#[test_log::test(tokio::test)]
async fn test_membership_add_flow() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(&dir, "http://127.0.0.1:9");

    let result = stockval::run_command(
        AppCommand::Membership(MembershipCommand::Add(ConstituentRecord {
            ticker: "acme".to_string(),
            index_code: IndexCode::Sp500,
            added_date: chrono::NaiveDate::from_ymd_opt(2010, 6, 1),
            removed_date: None,
            company_name: Some("Acme Corp".to_string()),
            reason: None,
        })),
        Some(&config_path),
    )
    .await;
    assert!(
        result.is_ok(),
        "Membership command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");

    let result = stockval::run_command(
        AppCommand::Report {
            tickers: vec!["ACME".to_string()],
        },
        Some(missing.to_str().unwrap()),
    )
    .await;
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file")
    );
}

#[test_log::test(tokio::test)]
#[ignore = "hits the public exchange rate service"]
async fn test_real_exchange_rate_api() {
    use stockval::core::currency::ExchangeRateSource;
    use stockval::providers::exchange_rate::OpenErApiSource;
    use stockval::providers::util::{USER_AGENT, build_client};

    let client = build_client(USER_AGENT, std::time::Duration::from_secs(30)).unwrap();
    let source = OpenErApiSource::new("https://open.er-api.com", client);

    let rates = source.fetch_usd_rates().await.expect("rate request failed");
    info!(count = rates.len(), "Received exchange rates");
    assert_eq!(rates.get("USD"), Some(&1.0));
    assert!(rates.get("EUR").is_some_and(|r| *r > 0.0));
}
