//! JSON-RPC request and response types

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Serialize)]
pub struct CommitmentConfig<'a> {
    pub commitment: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionConfig<'a> {
    pub encoding: &'static str,
    pub skip_preflight: bool,
    pub preflight_commitment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,
}

#[derive(Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockhashValue {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}
