use crate::aggregator::{ReportOutcome, TokenAggregator};
use crate::chain::ChainReader;
use crate::query::formatters::{OutputFormat, format_details, format_report};
use crate::repository::QueryService;
use alloy_primitives::Address;
use anyhow::Result;
use std::str::FromStr;

pub fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address.trim())
        .map_err(|_| anyhow::anyhow!("Invalid address format: {}", address))
}

/// Forgiving report: failures print as an empty result
pub async fn cmd_token_report<C: ChainReader>(
    aggregator: &TokenAggregator<C>,
    token: &str,
    format: &OutputFormat,
) -> Result<()> {
    let token = parse_address(token)?;
    let outcome = aggregator.fetch_token_report(token).await;
    println!("{}", format_report(&outcome, format));

    Ok(())
}

/// Typed report: failures surface as errors
pub async fn cmd_token_report_strict<C: ChainReader>(
    aggregator: &TokenAggregator<C>,
    token: &str,
    format: &OutputFormat,
) -> Result<()> {
    let token = parse_address(token)?;
    let report = aggregator.aggregate(token).await?;
    if report.is_partial() {
        tracing::warn!(
            "{} holder(s) could not be classified and are reported as UNKNOWN",
            report.failed_holders.len()
        );
    }

    let outcome = ReportOutcome::Report(Box::new(report));
    println!("{}", format_report(&outcome, format));

    Ok(())
}

pub async fn cmd_token_details(
    service: &QueryService,
    token_name: &str,
    format: &OutputFormat,
) -> Result<()> {
    let details = service.fetch_token_details(token_name).await?;
    println!("{}", format_details(&details, format));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let parsed = parse_address(" 0x1111111111111111111111111111111111111111 ").unwrap();
        assert_eq!(parsed, Address::repeat_byte(0x11));
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("token").is_err());
    }
}
