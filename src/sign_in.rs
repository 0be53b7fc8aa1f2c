//! Sign-In With Solana: inputs, message text, and the structured result

use chrono::{SecondsFormat, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::error::SignerError;
use crate::sdk_adapter::{Pubkey, Signature};
use crate::standard::types::WalletAccount;

const HEADER_SUFFIX: &str = " wants you to sign in with your Solana account:";
const NONCE_LENGTH: usize = 16;
const RESOURCES_LABEL: &str = "Resources:";
const FIELD_LABELS: [&str; 8] = [
    "URI",
    "Version",
    "Chain ID",
    "Nonce",
    "Issued At",
    "Expiration Time",
    "Not Before",
    "Request ID",
];

/// Sign-in request. Every field is optional; wallets with native sign-in fill
/// in what is missing themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

/// Random alphanumeric nonce for replay protection
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SignInInput {
    /// Complete the input for local message synthesis: sets the address and
    /// generates a nonce and issue time when absent.
    ///
    /// A domain is required since nothing else can supply one here.
    pub fn complete_for(mut self, address: &Pubkey) -> Result<Self, SignerError> {
        if self.domain.as_deref().map_or(true, str::is_empty) {
            return Err(SignerError::ConfigError(
                "Sign-in requires a domain".to_string(),
            ));
        }
        self.address = Some(address.to_string());
        self.nonce.get_or_insert_with(generate_nonce);
        self.issued_at.get_or_insert_with(now_rfc3339);
        Ok(self)
    }

    /// The Sign-In With Solana message text for this input
    pub fn to_message_text(&self) -> String {
        let mut message = format!(
            "{}{HEADER_SUFFIX}\n{}",
            self.domain.as_deref().unwrap_or_default(),
            self.address.as_deref().unwrap_or_default()
        );
        if let Some(statement) = &self.statement {
            message.push_str("\n\n");
            message.push_str(statement);
        }

        let mut fields = Vec::new();
        let labelled = [
            ("URI", &self.uri),
            ("Version", &self.version),
            ("Chain ID", &self.chain_id),
            ("Nonce", &self.nonce),
            ("Issued At", &self.issued_at),
            ("Expiration Time", &self.expiration_time),
            ("Not Before", &self.not_before),
            ("Request ID", &self.request_id),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                fields.push(format!("{label}: {value}"));
            }
        }
        if let Some(resources) = &self.resources {
            fields.push(RESOURCES_LABEL.to_string());
            fields.extend(resources.iter().map(|r| format!("- {r}")));
        }

        if !fields.is_empty() {
            message.push_str("\n\n");
            message.push_str(&fields.join("\n"));
        }
        message
    }

    /// Recover the fields of a Sign-In With Solana message text
    ///
    /// Blocks are separated by a blank line: header, optional statement,
    /// optional labelled fields. A lone block after the header is read as
    /// fields only when its first line carries a known label.
    pub fn parse_message_text(text: &str) -> Result<Self, SignerError> {
        let mut blocks = text.split("\n\n");
        let mut header = blocks.next().unwrap_or_default().lines();
        let domain = header
            .next()
            .and_then(|line| line.strip_suffix(HEADER_SUFFIX))
            .ok_or_else(|| {
                SignerError::MalformedWalletResponse("Not a sign-in message".to_string())
            })?;
        let address = header.next().unwrap_or_default();

        let mut input = SignInInput {
            domain: Some(domain.to_string()),
            address: Some(address.to_string()),
            ..SignInInput::default()
        };

        let mut rest: Vec<&str> = blocks.collect();
        let has_fields =
            rest.len() > 1 || rest.first().is_some_and(|block| starts_with_field(block));
        let fields = if has_fields { rest.pop() } else { None };
        if !rest.is_empty() {
            input.statement = Some(rest.join("\n\n"));
        }
        if let Some(fields) = fields {
            input.read_fields(fields);
        }
        Ok(input)
    }

    fn read_fields(&mut self, block: &str) {
        let mut in_resources = false;
        for line in block.lines() {
            if in_resources {
                if let Some(resource) = line.strip_prefix("- ") {
                    self.resources
                        .get_or_insert_with(Vec::new)
                        .push(resource.to_string());
                    continue;
                }
                in_resources = false;
            }
            if line == RESOURCES_LABEL {
                in_resources = true;
                continue;
            }
            let Some((label, value)) = line.split_once(": ") else {
                continue;
            };
            let value = Some(value.to_string());
            match label {
                "URI" => self.uri = value,
                "Version" => self.version = value,
                "Chain ID" => self.chain_id = value,
                "Nonce" => self.nonce = value,
                "Issued At" => self.issued_at = value,
                "Expiration Time" => self.expiration_time = value,
                "Not Before" => self.not_before = value,
                "Request ID" => self.request_id = value,
                _ => {}
            }
        }
    }
}

fn starts_with_field(block: &str) -> bool {
    let first = block.lines().next().unwrap_or_default();
    first == RESOURCES_LABEL
        || first
            .split_once(": ")
            .is_some_and(|(label, _)| FIELD_LABELS.contains(&label))
}

/// Result of a successful sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutput {
    pub account: WalletAccount,
    pub signature: Signature,
    pub signed_message: Vec<u8>,
    pub domain: Option<String>,
    pub nonce: Option<String>,
    pub issued_at: Option<String>,
    pub expiration_time: Option<String>,
    pub not_before: Option<String>,
}

impl SignInOutput {
    /// Assemble the result, reading domain, nonce and freshness fields back
    /// out of the signed message
    pub fn from_signed(account: WalletAccount, signed_message: Vec<u8>, signature: Signature) -> Self {
        let parsed = std::str::from_utf8(&signed_message)
            .ok()
            .and_then(|text| SignInInput::parse_message_text(text).ok())
            .unwrap_or_default();
        Self {
            account,
            signature,
            signed_message,
            domain: parsed.domain,
            nonce: parsed.nonce,
            issued_at: parsed.issued_at,
            expiration_time: parsed.expiration_time,
            not_before: parsed.not_before,
        }
    }

    /// Check the signature against the account's public key
    pub fn verify(&self) -> bool {
        crate::standard::account_pubkey(&self.account)
            .map(|pubkey| self.signature.verify(pubkey.as_ref(), &self.signed_message))
            .unwrap_or(false)
    }
}
