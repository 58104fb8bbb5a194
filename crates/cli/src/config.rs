//! Operator identity configuration.
//!
//! The workflow signs as one operator account. Its id and private key come
//! from the environment, with a `.env` file in the working directory as the
//! fallback for local runs.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tokenflow_ledger::Operator;
use tokenflow_types::{AccountId, PrivateKey};

/// Environment variable naming the operator account, as `shard.realm.num`.
pub const OPERATOR_ID_VAR: &str = "TOKENFLOW_OPERATOR_ID";
/// Environment variable carrying the operator's ED25519 private key as hex.
pub const OPERATOR_KEY_VAR: &str = "TOKENFLOW_OPERATOR_KEY";

const ENV_FILE: &str = ".env";

/// Resolve the operator identity.
///
/// Resolution order, per variable:
/// - `TOKENFLOW_OPERATOR_ID` / `TOKENFLOW_OPERATOR_KEY` in the environment
/// - the same names in a `.env` file in the working directory
pub fn load_operator() -> Result<Operator> {
    operator_from(|name| env::var(name).ok(), Path::new(ENV_FILE))
}

fn operator_from(var: impl Fn(&str) -> Option<String>, env_file: &Path) -> Result<Operator> {
    let file_vars = fs::read_to_string(env_file).ok().map(|content| parse_env_file(&content));
    let lookup = |name: &str| {
        var(name).or_else(|| file_vars.as_ref().and_then(|vars| vars.get(name).cloned()))
    };

    let account = lookup(OPERATOR_ID_VAR).ok_or_else(|| {
        anyhow!("{} is not set and {} provides no value", OPERATOR_ID_VAR, ENV_FILE)
    })?;
    let key = lookup(OPERATOR_KEY_VAR).ok_or_else(|| {
        anyhow!("{} is not set and {} provides no value", OPERATOR_KEY_VAR, ENV_FILE)
    })?;

    let account_id: AccountId = account
        .trim()
        .parse()
        .with_context(|| format!("invalid {} '{}'", OPERATOR_ID_VAR, account.trim()))?;
    let key =
        PrivateKey::from_hex(&key).with_context(|| format!("invalid {}", OPERATOR_KEY_VAR))?;
    Ok(Operator::new(account_id, key))
}

/// Minimal `.env` parser: `KEY=VALUE` lines, `#` comments, optional quotes,
/// optional `export` prefix. Adequate for local runs; not a full dotenv
/// implementation.
fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let name = name.strip_prefix("export ").unwrap_or(name).trim();
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.insert(name.to_string(), value.to_string());
    }
    vars
}
