use super::models::{TokenBalance, numeric};
use rusqlite::{Connection, params};

pub struct BalanceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BalanceRepository<'a> {
    const SELECT_BY_TOKEN: &'static str =
        "SELECT token_address, owner_address, balance FROM token_balances WHERE token_address = ?1";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Every balance row recorded for `token_address`, in storage order
    pub fn for_token(&self, token_address: &str) -> rusqlite::Result<Vec<TokenBalance>> {
        let mut stmt = self.conn.prepare(Self::SELECT_BY_TOKEN)?;
        let balances = stmt
            .query_map(params![token_address], |row| {
                Ok(TokenBalance {
                    token_address: row.get(0)?,
                    owner_address: row.get(1)?,
                    balance: numeric(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(balances)
    }
}
