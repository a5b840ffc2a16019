use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Only access tokens are accepted here. Any other `token_use` fails to decode,
/// so refresh or id tokens never verify.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
}

/// Bearer claims issued by the identity provider. Expiry, issuer and audience
/// are checked by the decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: u64,
    pub iss: String,
    pub aud: String,
    pub token_use: TokenUse,
}
