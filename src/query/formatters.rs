use crate::aggregator::{ReportOutcome, TokenBalance, TokenReport, ValueLink};
use crate::repository::TokenDetails;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_report(outcome: &ReportOutcome, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => match outcome.report() {
            Some(report) => format_report_table(report),
            None => "No token data.".to_string(),
        },
        OutputFormat::Csv => match outcome.report() {
            Some(report) => format_balances_csv(&report.balances),
            None => format_balances_csv(&[]),
        },
    }
}

fn format_report_table(report: &TokenReport) -> String {
    let mut summary = new_table(vec!["Metric", "Value"]);
    summary.add_row(vec![Cell::new("Token"), Cell::new(&report.content)]);
    summary.add_row(vec![
        Cell::new("Address"),
        Cell::new(format!("{:#}", report.token_address)),
    ]);
    summary.add_row(vec![
        Cell::new("Creator"),
        Cell::new(
            report
                .creator_address
                .map_or("N/A".to_string(), |a| format!("{a:#}")),
        ),
    ]);
    summary.add_row(vec![
        Cell::new("Reserve (WETH)"),
        Cell::new(report.reserve0),
    ]);
    summary.add_row(vec![
        Cell::new("Reserve (token)"),
        Cell::new(report.reserve1),
    ]);
    summary.add_row(vec![
        Cell::new("Price (WETH)"),
        Cell::new(format_opt(report.current_price)),
    ]);
    if report.is_partial() {
        summary.add_row(vec![
            Cell::new("Unclassified holders"),
            Cell::new(report.failed_holders.len()),
        ]);
    }

    let mut sections = vec![summary.to_string(), format_balances_table(&report.balances)];
    if !report.valuelinks.is_empty() {
        sections.push(format_value_links_table(&report.valuelinks));
    }
    sections.join("\n")
}

fn format_balances_table(balances: &[TokenBalance]) -> String {
    if balances.is_empty() {
        return "No holders found.".to_string();
    }

    let mut table = new_table(vec!["Rank", "Owner", "Balance", "Type", "Label"]);
    for (i, balance) in balances.iter().enumerate() {
        let label = match (&balance.nickname, &balance.additional_token_name) {
            (Some(nickname), _) => nickname.clone(),
            (None, Some(paired)) => format!("paired with {paired}"),
            (None, None) => String::new(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{:#}", balance.owner_address)),
            Cell::new(balance.balance),
            Cell::new(balance.kind.as_str()),
            Cell::new(label),
        ]);
    }

    table.to_string()
}

fn format_value_links_table(links: &[ValueLink]) -> String {
    let mut table = new_table(vec![
        "Pair", "Token0", "Token1", "Reserve0", "Reserve1", "Price0", "Price1", "TVL",
    ]);
    for link in links {
        table.add_row(vec![
            Cell::new(format!("{:#}", link.pair_address)),
            Cell::new(&link.token0_content),
            Cell::new(&link.token1_content),
            Cell::new(link.reserve0),
            Cell::new(link.reserve1),
            Cell::new(format_opt(link.current_price_token0)),
            Cell::new(format_opt(link.current_price_token1)),
            Cell::new(format_opt(link.tvl)),
        ]);
    }

    table.to_string()
}

fn format_balances_csv(balances: &[TokenBalance]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "rank",
        "owner_address",
        "balance",
        "type",
        "nickname",
        "additional_token_name",
        "additional_token_address",
    ]);

    for (i, balance) in balances.iter().enumerate() {
        let _ = wtr.write_record([
            &(i + 1).to_string(),
            &format!("{:?}", balance.owner_address),
            &balance.balance.to_string(),
            balance.kind.as_str(),
            balance.nickname.as_deref().unwrap_or(""),
            balance.additional_token_name.as_deref().unwrap_or(""),
            &balance
                .additional_token_address
                .map(|a| format!("{a:?}"))
                .unwrap_or_default(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_details(details: &TokenDetails, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_details_table(details),
        OutputFormat::Json => {
            serde_json::to_string_pretty(details).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Csv => format_details_csv(details),
    }
}

fn format_details_table(details: &TokenDetails) -> String {
    let token = &details.token;
    let mut summary = new_table(vec!["Metric", "Value"]);
    summary.add_row(vec![Cell::new("Name"), Cell::new(&token.name)]);
    summary.add_row(vec![
        Cell::new("Symbol"),
        Cell::new(token.symbol.as_deref().unwrap_or("N/A")),
    ]);
    summary.add_row(vec![Cell::new("Address"), Cell::new(&token.address)]);
    summary.add_row(vec![
        Cell::new("Pair"),
        Cell::new(token.pair_address.as_deref().unwrap_or("N/A")),
    ]);
    summary.add_row(vec![
        Cell::new("Price"),
        Cell::new(format_opt(token.current_price)),
    ]);
    summary.add_row(vec![
        Cell::new("Creator"),
        Cell::new(token.creator_address.as_deref().unwrap_or("N/A")),
    ]);

    let mut sections = vec![summary.to_string()];

    if details.balances.is_empty() {
        sections.push("No balances found.".to_string());
    } else {
        let mut table = new_table(vec!["Owner", "Balance"]);
        for balance in &details.balances {
            table.add_row(vec![
                Cell::new(&balance.owner_address),
                Cell::new(format_opt(balance.balance)),
            ]);
        }
        sections.push(table.to_string());
    }

    if details.pairs.is_empty() {
        sections.push("No pairs found.".to_string());
    } else {
        let mut table = new_table(vec!["Pair", "Token0", "Token1", "Reserve0", "Reserve1"]);
        for pair in &details.pairs {
            table.add_row(vec![
                Cell::new(&pair.pair_address),
                Cell::new(pair.token0.as_deref().unwrap_or(&pair.token0_address)),
                Cell::new(pair.token1.as_deref().unwrap_or(&pair.token1_address)),
                Cell::new(format_opt(pair.reserve_token0)),
                Cell::new(format_opt(pair.reserve_token1)),
            ]);
        }
        sections.push(table.to_string());
    }

    if !details.liquidity_providers.is_empty() {
        let mut table = new_table(vec![
            "Pair",
            "Provider",
            "LP Tokens",
            "Token0 Added",
            "Token1 Added",
        ]);
        for provider in &details.liquidity_providers {
            table.add_row(vec![
                Cell::new(&provider.pair_address),
                Cell::new(&provider.owner_address),
                Cell::new(format_opt(provider.liquidity_tokens)),
                Cell::new(format_opt(provider.token0_added)),
                Cell::new(format_opt(provider.token1_added)),
            ]);
        }
        sections.push(table.to_string());
    }

    sections.join("\n")
}

/// One CSV block per section, separated by a blank line
fn format_details_csv(details: &TokenDetails) -> String {
    let mut balances = Writer::from_writer(vec![]);
    let _ = balances.write_record(["owner_address", "balance"]);
    for balance in &details.balances {
        let _ = balances.write_record([
            balance.owner_address.as_str(),
            &format_opt_csv(balance.balance),
        ]);
    }

    let mut pairs = Writer::from_writer(vec![]);
    let _ = pairs.write_record([
        "pairAddress",
        "token0Address",
        "token1Address",
        "reserveToken0",
        "reserveToken1",
        "token0",
        "token1",
    ]);
    for pair in &details.pairs {
        let _ = pairs.write_record([
            pair.pair_address.as_str(),
            &pair.token0_address,
            &pair.token1_address,
            &format_opt_csv(pair.reserve_token0),
            &format_opt_csv(pair.reserve_token1),
            pair.token0.as_deref().unwrap_or(""),
            pair.token1.as_deref().unwrap_or(""),
        ]);
    }

    let mut providers = Writer::from_writer(vec![]);
    let _ = providers.write_record([
        "pair_address",
        "owner_address",
        "liquidity_tokens",
        "token0_added",
        "token1_added",
    ]);
    for provider in &details.liquidity_providers {
        let _ = providers.write_record([
            provider.pair_address.as_str(),
            &provider.owner_address,
            &format_opt_csv(provider.liquidity_tokens),
            &format_opt_csv(provider.token0_added),
            &format_opt_csv(provider.token1_added),
        ]);
    }

    [balances, pairs, providers]
        .into_iter()
        .map(|wtr| String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn format_opt(value: Option<f64>) -> String {
    value.map_or("N/A".to_string(), |v| v.to_string())
}

fn format_opt_csv(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
