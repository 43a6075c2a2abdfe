use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One username/password pair per year. The password is held only as a
/// sha256 digest, hashed once at config load.
#[derive(Debug, Clone)]
pub struct AdminCredential {
    pub username: String,
    pub password_digest: String,
}

pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Proof that the caller logged in as the administrator of one year.
/// Handlers receive this explicitly instead of reading ambient session
/// state.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub year: u16,
}

/// In-process table of bearer tokens minted at login. A token grants the
/// single shared "admin for this year" capability; there is no finer
/// permission granularity and no expiry beyond logout or process restart.
#[derive(Clone, Default)]
pub struct SessionStore {
    tokens: Arc<Mutex<HashMap<String, u16>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the credential pair for the given year and mints a token on
    /// success.
    pub fn login(
        &self,
        admins: &HashMap<u16, AdminCredential>,
        year: u16,
        username: &str,
        password: &str,
    ) -> Option<String> {
        let cred = admins.get(&year)?;
        if cred.username != username || cred.password_digest != password_digest(password) {
            return None;
        }
        let token = Uuid::new_v4().to_string();
        self.tokens.lock().unwrap().insert(token.clone(), year);
        Some(token)
    }

    /// Resolves a bearer token into an authorization context. Unknown and
    /// absent tokens are indistinguishable to the caller.
    pub fn authorize(&self, token: Option<&str>) -> Option<AuthContext> {
        let token = token?;
        let tokens = self.tokens.lock().unwrap();
        tokens.get(token).map(|&year| AuthContext { year })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.tokens.lock().unwrap().remove(token).is_some()
    }
}
