use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use secrecy::SecretString;

use super::{Error, Result};

/// A credential whose remaining quota is at or below this many calls is considered exhausted
/// until its reset time passes.
pub const REMAINING_FLOOR: i64 = 100;

// -------------------------------------------------------------------------------------------------
// TokenPool
// -------------------------------------------------------------------------------------------------
/// A round-robin pool of personal access tokens with per-credential rate-limit bookkeeping.
///
/// The pool owns all mutable credential state. Selection skips credentials known to be
/// exhausted; when every credential is exhausted, `checkout` reports how long to wait until the
/// earliest quota reset instead of blocking itself.
pub struct TokenPool {
    state: Mutex<PoolState>,
}

struct PoolState {
    tokens: Vec<TokenState>,
    cursor: usize,
}

struct TokenState {
    secret: SecretString,
    remaining: Option<i64>,
    reset_epoch: Option<i64>,
}

impl TokenState {
    fn new(secret: SecretString) -> Self {
        TokenState {
            secret,
            remaining: None,
            reset_epoch: None,
        }
    }

    fn usable_at(&self, now: i64) -> bool {
        match (self.remaining, self.reset_epoch) {
            (Some(remaining), Some(reset)) => remaining > REMAINING_FLOOR || now >= reset,
            // No quota observation yet, or no known reset time: assume usable.
            _ => true,
        }
    }
}

/// The result of asking the pool for a credential.
pub enum Checkout {
    /// A usable credential.
    Ready(Lease),

    /// Every credential is exhausted; retry after this duration (bounded by the earliest known
    /// quota reset).
    Wait(Duration),
}

/// A checked-out credential: the pool index it came from plus a copy of the secret.
pub struct Lease {
    index: usize,
    secret: SecretString,
}

impl Lease {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

impl TokenPool {
    /// Create a pool over the given tokens, in selection order.
    pub fn new(tokens: Vec<SecretString>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::PoolExhausted);
        }
        let tokens = tokens.into_iter().map(TokenState::new).collect();
        Ok(TokenPool {
            state: Mutex::new(PoolState { tokens, cursor: 0 }),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select the next usable credential in round-robin order.
    pub fn checkout(&self) -> Checkout {
        let mut state = self.lock();
        let now = Utc::now().timestamp();
        let count = state.tokens.len();

        for offset in 0..count {
            let index = (state.cursor + offset) % count;
            if state.tokens[index].usable_at(now) {
                state.cursor = (index + 1) % count;
                return Checkout::Ready(Lease {
                    index,
                    secret: state.tokens[index].secret.clone(),
                });
            }
        }

        let earliest_reset = state.tokens.iter().filter_map(|t| t.reset_epoch).min();
        // One extra second of slack so the retry lands after the server-side reset.
        let wait_secs = earliest_reset.map(|r| (r - now).max(0)).unwrap_or(0) + 1;
        Checkout::Wait(Duration::from_secs(wait_secs as u64))
    }

    /// Record quota headers observed on a successful response.
    pub fn record_usage(&self, index: usize, remaining: i64, reset_epoch: i64) {
        let mut state = self.lock();
        if let Some(token) = state.tokens.get_mut(index) {
            token.remaining = Some(remaining);
            token.reset_epoch = Some(reset_epoch);
        }
    }

    /// Record that a credential was rejected for rate-limiting.
    ///
    /// When the server did not report a reset time, the credential is benched for a minute.
    pub fn record_exhausted(&self, index: usize, reset_epoch: Option<i64>) {
        let mut state = self.lock();
        if let Some(token) = state.tokens.get_mut(index) {
            token.remaining = Some(0);
            token.reset_epoch = Some(reset_epoch.unwrap_or_else(|| Utc::now().timestamp() + 60));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("token pool mutex should not be poisoned")
    }
}
