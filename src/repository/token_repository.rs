use super::models::{Token, numeric};
use rusqlite::{OptionalExtension, Row, params};

pub struct TokenRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> TokenRepository<'a> {
    const SELECT_BY_NAME: &'static str = "SELECT address, name, symbol, pairAddress,
            reserve0, reserve1, current_price, creator_address
         FROM tokens WHERE name = ?1 LIMIT 1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn find_by_name(&self, name: &str) -> rusqlite::Result<Option<Token>> {
        self.conn
            .query_row(Self::SELECT_BY_NAME, params![name], Self::row_to_token)
            .optional()
    }

    fn row_to_token(row: &Row) -> rusqlite::Result<Token> {
        Ok(Token {
            address: row.get(0)?,
            name: row.get(1)?,
            symbol: row.get(2)?,
            pair_address: row.get(3)?,
            reserve0: numeric(row, 4)?,
            reserve1: numeric(row, 5)?,
            current_price: numeric(row, 6)?,
            creator_address: row.get(7)?,
        })
    }
}
