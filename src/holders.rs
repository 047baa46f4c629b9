use crate::abi::decode_transfer_event;
use alloy::rpc::types::Log;
use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolder {
    pub address: Address,
    pub balance: U256,
}

/// Decode raw `Transfer` logs, skipping (and logging) the ones that do not decode
pub fn decode_transfers(logs: &[Log]) -> Vec<TransferRecord> {
    logs.iter()
        .filter_map(|log| match decode_transfer_event(log) {
            Ok(event) => Some(TransferRecord {
                from: event.from,
                to: event.to,
                value: event.value,
            }),
            Err(e) => {
                warn!(
                    "Failed to decode transfer event in tx {:?}: {}",
                    log.transaction_hash, e
                );
                None
            }
        })
        .collect()
}

/// Replay transfers in order and return every address left with a non-zero
/// balance, largest first. The zero address is the mint source and burn sink,
/// so it never counts as a holder.
pub fn balances_from_transfers(transfers: &[TransferRecord]) -> Vec<TokenHolder> {
    let mut balances: HashMap<Address, U256> = HashMap::new();

    for transfer in transfers {
        if transfer.from != Address::ZERO {
            let from_balance = balances.entry(transfer.from).or_insert(U256::ZERO);
            *from_balance = from_balance.saturating_sub(transfer.value);
        }

        if transfer.to != Address::ZERO {
            let to_balance = balances.entry(transfer.to).or_insert(U256::ZERO);
            *to_balance = to_balance.saturating_add(transfer.value);
        }
    }

    let mut holders: Vec<TokenHolder> = balances
        .into_iter()
        .filter(|(_, balance)| *balance > U256::ZERO)
        .map(|(address, balance)| TokenHolder { address, balance })
        .collect();

    holders.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.address.cmp(&b.address)));
    debug!("Replayed {} transfers into {} holders", transfers.len(), holders.len());

    holders
}
