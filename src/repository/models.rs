use rusqlite::Row;
use rusqlite::types::{Type, ValueRef};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub address: String,
    pub name: String,
    pub symbol: Option<String>,
    #[serde(rename = "pairAddress")]
    pub pair_address: Option<String>,
    pub reserve0: Option<f64>,
    pub reserve1: Option<f64>,
    pub current_price: Option<f64>,
    pub creator_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub token_address: String,
    pub owner_address: String,
    pub balance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pair {
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "token0Address")]
    pub token0_address: String,
    #[serde(rename = "token1Address")]
    pub token1_address: String,
    #[serde(rename = "reserveToken0")]
    pub reserve_token0: Option<f64>,
    #[serde(rename = "reserveToken1")]
    pub reserve_token1: Option<f64>,
    /// Token names
    pub token0: Option<String>,
    pub token1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityProvider {
    pub pair_address: String,
    pub owner_address: String,
    pub liquidity_tokens: Option<f64>,
    pub token0_added: Option<f64>,
    pub token1_added: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenDetails {
    pub token: Token,
    pub balances: Vec<TokenBalance>,
    pub pairs: Vec<Pair>,
    #[serde(rename = "liquidityProviders")]
    pub liquidity_providers: Vec<LiquidityProvider>,
}

/// Read a numeric column that the snapshot may store as INTEGER, REAL or TEXT
pub(crate) fn numeric(row: &Row, idx: usize) -> rusqlite::Result<Option<f64>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(value) => Ok(Some(value as f64)),
        ValueRef::Real(value) => Ok(Some(value)),
        ValueRef::Text(raw) => {
            let text = std::str::from_utf8(raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })?;
            text.trim().parse::<f64>().map(Some).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        }
        ValueRef::Blob(_) => {
            Err(rusqlite::Error::InvalidColumnType(idx, "numeric".to_string(), Type::Blob))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_numeric_accepts_every_storage_class() {
        let conn = Connection::open_in_memory().unwrap();
        let values: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) = conn
            .query_row("SELECT 3, 2.5, ' 1e3 ', NULL", [], |row| {
                Ok((
                    numeric(row, 0)?,
                    numeric(row, 1)?,
                    numeric(row, 2)?,
                    numeric(row, 3)?,
                ))
            })
            .unwrap();

        assert_eq!(values, (Some(3.0), Some(2.5), Some(1000.0), None));
    }

    #[test]
    fn test_numeric_rejects_garbage_text() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'lots'", [], |row| numeric(row, 0));
        assert!(result.is_err());
    }
}
