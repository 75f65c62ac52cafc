//! Parsing of Azure Storage connection strings
//! (`DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...`).

use anyhow::{bail, Result};

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Account details extracted from a storage connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureConnection {
    pub account: String,
    pub access_key: Option<String>,
    pub sas_token: Option<String>,
    /// Explicit blob endpoint; `None` means the public cloud default.
    pub blob_endpoint: Option<String>,
    /// `UseDevelopmentStorage=true` (Azurite).
    pub use_emulator: bool,
}

// Keys must not end up in logs.
impl std::fmt::Debug for AzureConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConnection")
            .field("account", &self.account)
            .field("access_key", &self.access_key.as_ref().map(|_| "***"))
            .field("sas_token", &self.sas_token.as_ref().map(|_| "***"))
            .field("blob_endpoint", &self.blob_endpoint)
            .field("use_emulator", &self.use_emulator)
            .finish()
    }
}

impl AzureConnection {
    pub fn parse(connection_string: &str) -> Result<Self> {
        let mut account = None;
        let mut access_key = None;
        let mut sas_token = None;
        let mut blob_endpoint = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut use_emulator = false;

        for part in connection_string.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            // Values (base64 keys, SAS tokens) may themselves contain '='
            let Some((key, value)) = part.split_once('=') else {
                bail!("Malformed connection string segment '{}'", key_only(part));
            };
            match key.trim() {
                "AccountName" => account = Some(value.to_string()),
                "AccountKey" => access_key = Some(value.to_string()),
                "SharedAccessSignature" => sas_token = Some(value.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "DefaultEndpointsProtocol" => protocol = Some(value.to_string()),
                "EndpointSuffix" => suffix = Some(value.to_string()),
                "UseDevelopmentStorage" => use_emulator = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if use_emulator {
            return Ok(Self {
                account: account.unwrap_or_else(|| "devstoreaccount1".to_string()),
                access_key,
                sas_token,
                blob_endpoint,
                use_emulator,
            });
        }

        let Some(account) = account else {
            bail!("Connection string is missing 'AccountName'");
        };
        if access_key.is_none() && sas_token.is_none() {
            bail!("Connection string requires 'AccountKey' or 'SharedAccessSignature'");
        }

        let blob_endpoint = blob_endpoint.or_else(|| match (protocol, suffix) {
            (None, None) => None,
            (protocol, suffix) => {
                let suffix = suffix.unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string());
                let protocol = protocol.unwrap_or_else(|| "https".to_string());
                if suffix == DEFAULT_ENDPOINT_SUFFIX && protocol == "https" {
                    None
                } else {
                    Some(format!("{}://{}.blob.{}", protocol, account, suffix))
                }
            }
        });

        Ok(Self {
            account,
            access_key,
            sas_token,
            blob_endpoint,
            use_emulator,
        })
    }
}

fn key_only(part: &str) -> &str {
    part.split('=').next().unwrap_or(part)
}
