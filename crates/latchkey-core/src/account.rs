//! Accounts: sign-in/sign-up requests, input sanitizing and the
//! credential-validator seam the gate delegates to.

use std::sync::Arc;

use latchkey_crypto::{
    evaluate_password_strength, generate_id, hash_password_with, verify_password,
    PasswordHashParams, SecretText,
};
use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::store::{keys, load_json, save_json, SecureStore};

const MIN_SIGN_IN_PASSWORD: usize = 6;
const MIN_SIGN_UP_PASSWORD: usize = 8;
const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;

const DEMO_VIP_EMAIL: &str = "vip@example.com";
const DEMO_VIP_PASSWORD: &str = "vip123";

const INVALID_CREDENTIALS: &str = "Invalid credentials";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_vip: bool,
    pub created_at_ms: u64,
}

/// Sign-in form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: SecretText,
    #[serde(default)]
    pub remember_me: bool,
}

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: SecretText,
    pub confirm_password: SecretText,
    #[serde(default)]
    pub accept_terms: bool,
}

// ---------------------------------------------------------------------------
// Sanitizing and validation
// ---------------------------------------------------------------------------

/// Lowercase and trim an email address.
#[must_use]
pub fn sanitize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Strip markup-ish fragments from free text: angle brackets, the
/// `javascript:` scheme and inline `on…=` handlers (ASCII case-insensitive).
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    let no_brackets: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .collect();
    let no_scheme = strip_matches(&no_brackets, |s| {
        s.get(.."javascript:".len())
            .filter(|head| head.eq_ignore_ascii_case("javascript:"))
            .map(str::len)
    });
    strip_matches(&no_scheme, event_handler_len)
}

/// Length of an `on\w+=` match at the start of `s`.
fn event_handler_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if !bytes.get(..2)?.eq_ignore_ascii_case(b"on") {
        return None;
    }
    let word = bytes
        .get(2..)?
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    if word == 0 {
        return None;
    }
    let eq_at = word.checked_add(2)?;
    (bytes.get(eq_at) == Some(&b'=')).then_some(eq_at.checked_add(1)?)
}

/// Remove every non-overlapping match found by `match_len`, left to right.
fn strip_matches(input: &str, match_len: impl Fn(&str) -> Option<usize>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while !rest.is_empty() {
        if let Some(len) = match_len(rest).filter(|&n| n > 0) {
            rest = rest.get(len..).unwrap_or_default();
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Minimal structural email check: `local@domain.tld`, no whitespace.
#[must_use]
pub fn validate_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Validate and sanitize a sign-in form. Returns the sanitized email.
///
/// # Errors
///
/// [`GateError::Validation`] for a malformed email or a short password.
pub fn validate_sign_in(request: &SignInRequest) -> Result<String, GateError> {
    let email = sanitize_email(&request.email);
    if !validate_email(&email) {
        return Err(GateError::Validation("Invalid email address".into()));
    }
    if request.password.expose().chars().count() < MIN_SIGN_IN_PASSWORD {
        return Err(GateError::Validation(format!(
            "Password must be at least {MIN_SIGN_IN_PASSWORD} characters"
        )));
    }
    Ok(email)
}

/// Validate and sanitize a sign-up form. Returns `(name, email)`.
///
/// # Errors
///
/// [`GateError::Validation`] naming the first failing rule.
pub fn validate_sign_up(request: &SignUpRequest) -> Result<(String, String), GateError> {
    let name = sanitize_input(&request.name);
    let name_len = name.chars().count();
    if name_len < NAME_MIN {
        return Err(GateError::Validation(format!(
            "Name must be at least {NAME_MIN} characters"
        )));
    }
    if name_len > NAME_MAX {
        return Err(GateError::Validation(format!(
            "Name must be less than {NAME_MAX} characters"
        )));
    }

    let email = sanitize_email(&request.email);
    if !validate_email(&email) {
        return Err(GateError::Validation("Invalid email address".into()));
    }

    let password = request.password.expose();
    if password.chars().count() < MIN_SIGN_UP_PASSWORD {
        return Err(GateError::Validation(format!(
            "Password must be at least {MIN_SIGN_UP_PASSWORD} characters"
        )));
    }
    let strength = evaluate_password_strength(password);
    if !strength.is_valid {
        return Err(GateError::Validation(format!(
            "Password is too weak: {}",
            strength.feedback.join(", ")
        )));
    }
    if password != request.confirm_password.expose() {
        return Err(GateError::Validation("Passwords don't match".into()));
    }
    if !request.accept_terms {
        return Err(GateError::Validation(
            "You must accept the terms and conditions".into(),
        ));
    }
    Ok((name, email))
}

// ---------------------------------------------------------------------------
// Validator seam
// ---------------------------------------------------------------------------

/// External credential check. Requests reach the validator already
/// sanitized and format-checked.
pub trait CredentialValidator: Send + Sync {
    /// Check sign-in credentials.
    ///
    /// # Errors
    ///
    /// [`GateError::AuthFailure`] when the credentials are refused.
    fn validate(&self, request: &SignInRequest, now_ms: u64) -> Result<Account, GateError>;

    /// Create an account.
    ///
    /// # Errors
    ///
    /// [`GateError::Validation`] when the validator does not support
    /// registration or the account already exists.
    fn register(&self, _request: &SignUpRequest, _now_ms: u64) -> Result<Account, GateError> {
        Err(GateError::Validation(
            "registration is not supported".into(),
        ))
    }
}

/// Demo validator: `vip@example.com` / `vip123` signs in as a VIP, any
/// other well-formed credentials sign in as a regular user.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoCredentialValidator;

impl CredentialValidator for DemoCredentialValidator {
    fn validate(&self, request: &SignInRequest, now_ms: u64) -> Result<Account, GateError> {
        let email = sanitize_email(&request.email);
        if email == DEMO_VIP_EMAIL && request.password.expose() == DEMO_VIP_PASSWORD {
            return Ok(Account {
                id: "vip-user-1".into(),
                name: "VIP User".into(),
                email,
                is_vip: true,
                created_at_ms: now_ms,
            });
        }
        if email.is_empty() || request.password.is_empty() {
            return Err(GateError::AuthFailure(INVALID_CREDENTIALS.into()));
        }
        let name = email.split('@').next().unwrap_or_default().to_owned();
        Ok(Account {
            id: format!("user-{now_ms}"),
            name,
            email,
            is_vip: false,
            created_at_ms: now_ms,
        })
    }

    fn register(&self, request: &SignUpRequest, now_ms: u64) -> Result<Account, GateError> {
        let (name, email) = validate_sign_up(request)?;
        Ok(Account {
            id: format!("user-{now_ms}"),
            name,
            email,
            is_vip: false,
            created_at_ms: now_ms,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAccount {
    account: Account,
    password_hash: String,
}

/// Accounts registered on this device, stored under `accounts` with
/// Argon2id password hashes.
#[derive(Clone)]
pub struct LocalAccountValidator {
    store: Arc<dyn SecureStore>,
    params: PasswordHashParams,
}

impl std::fmt::Debug for LocalAccountValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAccountValidator")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl LocalAccountValidator {
    #[must_use]
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self::with_params(store, PasswordHashParams::default())
    }

    /// Use explicit Argon2id costs (tests use tiny ones).
    #[must_use]
    pub fn with_params(store: Arc<dyn SecureStore>, params: PasswordHashParams) -> Self {
        Self { store, params }
    }

    fn load(&self) -> Result<Vec<StoredAccount>, GateError> {
        Ok(load_json(self.store.as_ref(), keys::ACCOUNTS)?.unwrap_or_default())
    }
}

impl CredentialValidator for LocalAccountValidator {
    fn validate(&self, request: &SignInRequest, _now_ms: u64) -> Result<Account, GateError> {
        let email = sanitize_email(&request.email);
        let accounts = self.load()?;
        let Some(stored) = accounts.iter().find(|a| a.account.email == email) else {
            return Err(GateError::AuthFailure(INVALID_CREDENTIALS.into()));
        };
        if verify_password(request.password.expose(), &stored.password_hash)? {
            Ok(stored.account.clone())
        } else {
            Err(GateError::AuthFailure(INVALID_CREDENTIALS.into()))
        }
    }

    fn register(&self, request: &SignUpRequest, now_ms: u64) -> Result<Account, GateError> {
        let (name, email) = validate_sign_up(request)?;
        let mut accounts = self.load()?;
        if accounts.iter().any(|a| a.account.email == email) {
            return Err(GateError::Validation(
                "An account with this email already exists".into(),
            ));
        }
        let password_hash = hash_password_with(request.password.expose(), &self.params)?;
        let account = Account {
            id: generate_id(),
            name,
            email,
            is_vip: false,
            created_at_ms: now_ms,
        };
        accounts.push(StoredAccount {
            account: account.clone(),
            password_hash,
        });
        save_json(self.store.as_ref(), keys::ACCOUNTS, &accounts)?;
        tracing::info!(account_id = %account.id, "local account registered");
        Ok(account)
    }
}
