//! Caller identity decoded from a bearer token.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::roles::{Role, RoleRank, highest_role};
use crate::token::{TokenError, extract_bearer_token};

/// Read-only view over a decoded token payload.
///
/// Only `user_id`, `roles` and `claims.{shop,organization}` are interpreted;
/// every other payload key is kept verbatim in [`Identity::payload`].
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    token: String,
    payload: Map<String, Value>,
    user_id: Option<String>,
    roles: Vec<Role>,
    shops: Vec<String>,
    organizations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizedClaims {
    #[serde(default, deserialize_with = "null_as_default")]
    user_id: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    roles: Vec<Role>,

    #[serde(default, deserialize_with = "null_as_default")]
    claims: CustomClaims,
}

#[derive(Debug, Default, Deserialize)]
struct CustomClaims {
    #[serde(default, deserialize_with = "null_as_default")]
    shop: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    organization: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn decode_segment(segment: &str, what: &str) -> Result<Map<String, Value>, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::invalid(format!("{what} is not base64url: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| TokenError::invalid(format!("{what} is not a JSON object: {e}")))
}

/// The `kid` of a JWT header, naming the key the token claims to be signed with.
pub fn token_key_id(token: &str) -> Result<Option<String>, TokenError> {
    let header = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| TokenError::invalid("missing header segment"))?;

    Ok(match decode_segment(header, "header")?.remove("kid") {
        Some(Value::String(kid)) => Some(kid),
        _ => None,
    })
}

impl Identity {
    /// Decode the payload segment of a JWT without verifying its signature.
    pub fn decode(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();

        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::invalid("expected three dot-separated segments"));
        };

        let payload = decode_segment(payload, "payload")?;

        let recognized = RecognizedClaims::deserialize(Value::Object(payload.clone()))
            .map_err(|e| TokenError::invalid(format!("unexpected claim shape: {e}")))?;

        Ok(Self {
            token,
            payload,
            user_id: recognized.user_id,
            roles: recognized.roles,
            shops: recognized.claims.shop,
            organizations: recognized.claims.organization,
        })
    }

    /// Extract the bearer token from an `Authorization` header and decode it.
    pub fn from_authorization(header: Option<&str>) -> Result<Self, TokenError> {
        Self::decode(extract_bearer_token(header)?)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
    }

    pub fn is_system_admin(&self) -> bool {
        self.has_role(Role::SYSADMIN.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::ADMIN.as_str())
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(Role::STAFF.as_str())
    }

    pub fn highest_role(&self) -> RoleRank {
        highest_role(&self.roles)
    }

    /// Shop ids the caller has access to (`claims.shop`).
    pub fn shops(&self) -> &[String] {
        &self.shops
    }

    /// Organization ids the caller has access to (`claims.organization`).
    pub fn organizations(&self) -> &[String] {
        &self.organizations
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The original encoded token.
    pub fn token(&self) -> &str {
        &self.token
    }
}
