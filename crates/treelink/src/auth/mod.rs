//! Auth-intent translation.
//!
//! An auth descriptor is a JSON value written by the application to the
//! reserved identity-control path: null to sign out, or an object with a
//! `type` tag selecting the authentication flow. Translation is pure and
//! synchronous: it maps the descriptor onto an [`InvocationDescriptor`]
//! naming the remote operation and its positional arguments; the caller
//! performs the actual invocation.

use serde_json::{json, Map, Value};
use thiserror::Error;

// ── Descriptors ───────────────────────────────────────────────────────────

/// Remote auth operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Unauthenticate,
    AuthenticateWithPassword,
    /// Composite: create the account, then authenticate with the same
    /// credentials. Implementors must sequence the two steps and skip
    /// authentication when creation fails.
    CreateAndAuthenticateWithPassword,
    AuthenticateWithToken,
    AuthenticateAnonymously,
    AuthenticateWithOAuthPopup,
    AuthenticateWithOAuthToken,
}

/// The remote-store invocation a descriptor translates to.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationDescriptor {
    pub method: AuthMethod,
    pub args: Vec<Value>,
}

/// A parsed auth descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthIntent {
    Password {
        email: String,
        password: String,
        create: bool,
    },
    Token {
        token: String,
    },
    Anonymous,
    OauthPopup {
        provider: String,
    },
    /// `token` is either a plain token string or a structured credential
    /// object, passed through verbatim.
    OauthToken {
        provider: String,
        token: Value,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("auth descriptor field '{0}' is missing or invalid")]
    MissingField(&'static str),
    #[error("unknown auth type '{0}'")]
    UnknownAuthType(String),
}

// ── Translation ───────────────────────────────────────────────────────────

/// Translate an auth descriptor into the invocation to perform.
///
/// Null signs out; everything else must parse as an [`AuthIntent`].
pub fn translate(descriptor: &Value) -> Result<InvocationDescriptor, AuthError> {
    match parse_intent(descriptor)? {
        None => Ok(InvocationDescriptor {
            method: AuthMethod::Unauthenticate,
            args: Vec::new(),
        }),
        Some(intent) => Ok(intent.into_invocation()),
    }
}

/// Parse a descriptor into a tagged intent. `Ok(None)` means sign out.
pub fn parse_intent(descriptor: &Value) -> Result<Option<AuthIntent>, AuthError> {
    let map = match descriptor {
        Value::Null => return Ok(None),
        Value::Object(map) => map,
        other => return Err(AuthError::UnknownAuthType(other.to_string())),
    };
    let tag = map
        .get("type")
        .and_then(Value::as_str)
        .ok_or(AuthError::MissingField("type"))?;
    let intent = match tag.to_ascii_lowercase().as_str() {
        "password" => AuthIntent::Password {
            email: required_string(map, "email")?,
            password: required_string(map, "password")?,
            create: optional_bool(map, "create")?,
        },
        "token" => AuthIntent::Token {
            token: required_string(map, "token")?,
        },
        "anonymously" => AuthIntent::Anonymous,
        "oauth_popup" => AuthIntent::OauthPopup {
            provider: required_string(map, "provider")?,
        },
        "oauth_token" => AuthIntent::OauthToken {
            provider: required_string(map, "provider")?,
            token: credential(map, "token")?,
        },
        other => return Err(AuthError::UnknownAuthType(other.to_owned())),
    };
    Ok(Some(intent))
}

impl AuthIntent {
    /// Map the intent onto its remote invocation shape.
    pub fn into_invocation(self) -> InvocationDescriptor {
        match self {
            AuthIntent::Password {
                email,
                password,
                create,
            } => InvocationDescriptor {
                method: if create {
                    AuthMethod::CreateAndAuthenticateWithPassword
                } else {
                    AuthMethod::AuthenticateWithPassword
                },
                args: vec![json!({"email": email, "password": password})],
            },
            AuthIntent::Token { token } => InvocationDescriptor {
                method: AuthMethod::AuthenticateWithToken,
                args: vec![Value::String(token)],
            },
            AuthIntent::Anonymous => InvocationDescriptor {
                method: AuthMethod::AuthenticateAnonymously,
                args: Vec::new(),
            },
            AuthIntent::OauthPopup { provider } => InvocationDescriptor {
                method: AuthMethod::AuthenticateWithOAuthPopup,
                args: vec![Value::String(provider)],
            },
            AuthIntent::OauthToken { provider, token } => InvocationDescriptor {
                method: AuthMethod::AuthenticateWithOAuthToken,
                args: vec![Value::String(provider), token],
            },
        }
    }
}

fn required_string(map: &Map<String, Value>, field: &'static str) -> Result<String, AuthError> {
    match map.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(AuthError::MissingField(field)),
    }
}

fn optional_bool(map: &Map<String, Value>, field: &'static str) -> Result<bool, AuthError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(AuthError::MissingField(field)),
    }
}

/// A token string or a structured credential object.
fn credential(map: &Map<String, Value>, field: &'static str) -> Result<Value, AuthError> {
    match map.get(field) {
        Some(v @ Value::String(s)) if !s.is_empty() => Ok(v.clone()),
        Some(v @ Value::Object(_)) => Ok(v.clone()),
        _ => Err(AuthError::MissingField(field)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
