//! Branch-scoped object-storage credentials.
//!
//! Each deployable branch maps to an explicit [`EnvVarNames`] record (derived from the
//! templates in [`EnvNaming`]) and [`load_credentials`] turns that record plus an
//! [`Environment`] snapshot into a validated [`Credentials`] bundle. Nothing here reads
//! the live process environment.

use std::fmt;
use tracing::{info, warn};

use crate::config::{EnvNaming, NameCase, BRANCH_PLACEHOLDER};
use crate::environment::Environment;
use crate::error::CredentialError;

const HIDDEN: &str = "<hidden>";
const NOT_SET: &str = "Not set";

/// The four environment variable names a branch reads its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarNames {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
}

impl EnvVarNames {
    pub fn for_branch(branch: &str, naming: &EnvNaming) -> Self {
        let token = match naming.case {
            NameCase::Upper => branch.to_uppercase(),
            NameCase::Verbatim => branch.to_string(),
        };
        let name = |template: &str| template.replace(BRANCH_PLACEHOLDER, &token);
        Self {
            bucket: name(&naming.bucket),
            access_key_id: name(&naming.access_key_id),
            secret_access_key: name(&naming.secret_access_key),
            endpoint: name(&naming.endpoint),
        }
    }
}

/// A complete credential bundle. Only constructed when all four values are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
}

impl Credentials {
    /// Full `oss://bucket/destination` URL for an upload.
    pub fn object_url(&self, destination: &str) -> String {
        format!(
            "oss://{}/{}",
            self.bucket,
            destination.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bucket", &self.bucket)
            .field("access_key_id", &HIDDEN)
            .field("secret_access_key", &HIDDEN)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Presence of each variable as it is safe to print: bucket and endpoint verbatim,
/// key material only as `<hidden>` / `Not set`.
pub fn describe_presence(names: &EnvVarNames, env: &Environment) -> Vec<(String, String)> {
    let shown = |name: &str| env.get(name).unwrap_or(NOT_SET).to_string();
    let hidden = |name: &str| {
        if env.get(name).is_some() {
            HIDDEN.to_string()
        } else {
            NOT_SET.to_string()
        }
    };
    vec![
        (names.bucket.clone(), shown(&names.bucket)),
        (names.access_key_id.clone(), hidden(&names.access_key_id)),
        (names.secret_access_key.clone(), hidden(&names.secret_access_key)),
        (names.endpoint.clone(), shown(&names.endpoint)),
    ]
}

/// Reads and validates the credential bundle for `branch`.
///
/// Same branch, naming and snapshot always yield the same result. Every unset
/// variable is reported in the error, not just the first.
pub fn load_credentials(
    branch: &str,
    naming: &EnvNaming,
    env: &Environment,
) -> Result<Credentials, CredentialError> {
    let names = EnvVarNames::for_branch(branch, naming);

    info!(branch, "Environment variables:");
    for (name, value) in describe_presence(&names, env) {
        info!(variable = %name, value = %value, "  credential variable");
    }

    let lookup = |name: &String, missing: &mut Vec<String>| -> String {
        match env.get(name) {
            Some(v) => v.to_string(),
            None => {
                missing.push(name.clone());
                String::new()
            }
        }
    };

    let mut missing = Vec::new();
    let bucket = lookup(&names.bucket, &mut missing);
    let access_key_id = lookup(&names.access_key_id, &mut missing);
    let secret_access_key = lookup(&names.secret_access_key, &mut missing);
    let endpoint = lookup(&names.endpoint, &mut missing);

    if !missing.is_empty() {
        warn!(branch, missing = ?missing, "Missing required environment variables");
        return Err(CredentialError::Missing {
            branch: branch.to_string(),
            variables: missing,
        });
    }

    Ok(Credentials {
        bucket,
        access_key_id,
        secret_access_key,
        endpoint,
    })
}
