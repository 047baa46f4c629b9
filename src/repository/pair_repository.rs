use super::models::{LiquidityProvider, Pair, numeric};
use rusqlite::{Row, params};

pub struct PairRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> PairRepository<'a> {
    const SELECT_BY_TOKEN: &'static str = "SELECT pairAddress, token0Address, token1Address,
            reserveToken0, reserveToken1, token0, token1
         FROM pairs WHERE token0Address = ?1 OR token1Address = ?1";

    const SELECT_PROVIDERS: &'static str = "SELECT pair_address, owner_address,
            liquidity_tokens, token0_added, token1_added
         FROM liquidity_providers WHERE pair_address = ?1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Pairs with `token_address` on either side
    pub fn for_token(&self, token_address: &str) -> rusqlite::Result<Vec<Pair>> {
        let mut stmt = self.conn.prepare(Self::SELECT_BY_TOKEN)?;
        let pairs = stmt
            .query_map(params![token_address], Self::row_to_pair)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pairs)
    }

    pub fn liquidity_providers(
        &self,
        pair_address: &str,
    ) -> rusqlite::Result<Vec<LiquidityProvider>> {
        let mut stmt = self.conn.prepare_cached(Self::SELECT_PROVIDERS)?;
        let providers = stmt
            .query_map(params![pair_address], |row| {
                Ok(LiquidityProvider {
                    pair_address: row.get(0)?,
                    owner_address: row.get(1)?,
                    liquidity_tokens: numeric(row, 2)?,
                    token0_added: numeric(row, 3)?,
                    token1_added: numeric(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(providers)
    }

    fn row_to_pair(row: &Row) -> rusqlite::Result<Pair> {
        Ok(Pair {
            pair_address: row.get(0)?,
            token0_address: row.get(1)?,
            token1_address: row.get(2)?,
            reserve_token0: numeric(row, 3)?,
            reserve_token1: numeric(row, 4)?,
            token0: row.get(5)?,
            token1: row.get(6)?,
        })
    }
}
