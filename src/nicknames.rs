use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;
use tracing::{info, warn};

/// Optional human-readable names for wallet holders, loaded from a
/// headerless `address,nickname` CSV.
#[derive(Debug, Clone, Default)]
pub struct NicknameBook {
    entries: HashMap<Address, String>,
}

impl NicknameBook {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_path(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open nickname file {path}"))?;
        let book = Self::from_reader(file)?;
        info!("Loaded {} nicknames from {}", book.len(), path);
        Ok(book)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut entries = HashMap::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record
                .with_context(|| format!("Invalid nickname row {}", line + 1))?;
            let (Some(address), Some(nickname)) = (record.get(0), record.get(1)) else {
                warn!("Skipping nickname row {}: expected address,nickname", line + 1);
                continue;
            };

            match Address::from_str(address) {
                Ok(address) if !nickname.is_empty() => {
                    entries.insert(address, nickname.to_string());
                }
                Ok(_) => warn!("Skipping nickname row {}: empty nickname", line + 1),
                Err(_) => warn!(
                    "Skipping nickname row {}: bad address {}",
                    line + 1,
                    address
                ),
            }
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, address: &Address) -> Option<&str> {
        self.entries.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader() {
        let csv = "# treasury wallets\n\
                   0x1111111111111111111111111111111111111111, treasury\n\
                   0x2222222222222222222222222222222222222222,deployer\n";

        let book = NicknameBook::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.lookup(&Address::repeat_byte(0x11)), Some("treasury"));
        assert_eq!(book.lookup(&Address::repeat_byte(0x22)), Some("deployer"));
        assert_eq!(book.lookup(&Address::repeat_byte(0x33)), None);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let csv = "not-an-address,whale\n\
                   0x1111111111111111111111111111111111111111,\n\
                   0x2222222222222222222222222222222222222222\n";

        let book = NicknameBook::from_reader(csv.as_bytes()).unwrap();
        assert!(book.is_empty());
    }
}
