use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    function name() external view returns (string);

    function getPair(address tokenA, address tokenB) external view returns (address pair);

    function token0() external view returns (address);
    function token1() external view returns (address);
    function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
}

pub fn decode_transfer_event(log: &Log) -> anyhow::Result<Transfer> {
    let log_data = log.data();
    let decoded = Transfer::decode_raw_log(log.topics(), &log_data.data)?;
    Ok(decoded)
}
