//! Scripted JSON-RPC node served over plain HTTP on a local port.

use crate::config::RpcConfig;
use crate::rpc::RpcClient;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// `Err((code, message))` becomes a JSON-RPC error response
pub type Reply = Result<Value, (i64, String)>;

type Handler = dyn Fn(&str, &Value) -> Reply + Send + Sync;
type RequestLog = Arc<Mutex<Vec<(String, Value)>>>;

pub struct TestNode {
    pub url: String,
    requests: RequestLog,
}

impl TestNode {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests: RequestLog = Arc::default();
        let handler: Arc<Handler> = Arc::new(handler);

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, handler, log).await;
                });
            }
        });

        Self { url, requests }
    }

    pub fn client(&self, max_retries: usize) -> RpcClient {
        RpcClient::new(&RpcConfig {
            json_rpc_urls: vec![self.url.clone()],
            network: None,
            log_batch_size: 10,
            request_timeout: Duration::from_secs(5),
            max_retries,
            nicknames_path: None,
        })
        .unwrap()
    }

    /// Params of every request received for `method`, in arrival order
    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}

pub fn quantity(value: u64) -> Value {
    json!(format!("{value:#x}"))
}

pub fn parse_quantity(value: &Value) -> Option<u64> {
    let hex = value.as_str()?.strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

/// Selector of an `eth_call`, as `0x`-prefixed hex
pub fn call_selector(params: &Value) -> String {
    let call = &params[0];
    let input = call
        .get("input")
        .or_else(|| call.get("data"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    input.chars().take(10).collect()
}

async fn serve(
    mut stream: TcpStream,
    handler: Arc<Handler>,
    log: RequestLog,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let body = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buf.len() >= body_start + length {
            break buf[body_start..body_start + length].to_vec();
        }
    };

    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let response = match request {
        Value::Array(batch) => Value::Array(
            batch
                .iter()
                .map(|req| answer(req, handler.as_ref(), &log))
                .collect(),
        ),
        single => answer(&single, handler.as_ref(), &log),
    };

    let payload = response.to_string();
    let reply = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

fn answer(request: &Value, handler: &Handler, log: &RequestLog) -> Value {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    log.lock().unwrap().push((method.clone(), params.clone()));

    let reply = match method.as_str() {
        "eth_chainId" => Ok(quantity(1)),
        _ => handler(&method, &params),
    };

    match reply {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": code, "message": message },
        }),
    }
}

/// Every request is refused the way throttled public endpoints do it
pub fn rate_limited(_method: &str, _params: &Value) -> Reply {
    Err((-32005, "daily request limit exceeded".to_string()))
}

/// Every request fails like an `eth_call` into a reverting contract
pub fn reverting(_method: &str, _params: &Value) -> Reply {
    Err((3, "execution reverted".to_string()))
}
