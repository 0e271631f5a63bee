//! In-memory challenge store.
//!
//! Each identifier owns a slot guarded by its own mutex, so every operation
//! on one identifier is serialized while different identifiers proceed in
//! parallel. A slot is unlinked from the key map only by the task holding
//! its lock, and only once it is empty. Tasks that were queued on an
//! unlinked slot notice on acquisition and retry against the live one.
//!
//! The key map sits behind a synchronous lock that is never held across an
//! await. Once an operation holds its slot it runs to completion without
//! yielding, so dropping the future can only happen before anything changed.

use chrono::TimeDelta;
use otpgate_common::constants::{CHALLENGE_TTL_SECS, MAX_VERIFY_ATTEMPTS};
use otpgate_common::{ChallengeStats, OtpError, VerifyResponse};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ChallengeRecord, CodeGenerator};
use crate::clock::Clock;
use crate::identifier::fingerprint;

type Slot = Arc<Mutex<Option<ChallengeRecord>>>;

/// Longest accepted challenge TTL (one day)
const MAX_TTL_SECS: u64 = 86_400;

/// Store configuration
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Challenge validity in seconds
    pub ttl_secs: u64,
    /// Wrong codes allowed before lockout
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: CHALLENGE_TTL_SECS,
            max_attempts: MAX_VERIFY_ATTEMPTS,
        }
    }
}

/// A freshly installed challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    /// Code to deliver to the identifier
    pub code: String,
    pub expires_in_seconds: u64,
}

/// Result of a verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// No challenge exists for the identifier
    NotFound,
    /// The challenge outlived its TTL and was removed
    Expired,
    /// The attempt budget is spent and the challenge was removed
    Locked,
    /// Wrong code; the challenge stays live
    Mismatch { attempts_remaining: u32 },
    /// Correct code; the challenge was consumed
    Success { identifier: String },
}

impl VerifyOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Locked => "locked",
            Self::Mismatch { .. } => "mismatch",
            Self::Success { .. } => "success",
        }
    }
}

impl From<VerifyOutcome> for VerifyResponse {
    fn from(outcome: VerifyOutcome) -> Self {
        use otpgate_common::FailureReason;

        match outcome {
            VerifyOutcome::NotFound => Self::rejected(FailureReason::NotFound),
            VerifyOutcome::Expired => Self::rejected(FailureReason::Expired),
            VerifyOutcome::Locked => Self::rejected(FailureReason::Locked),
            VerifyOutcome::Mismatch { attempts_remaining } => Self::mismatch(attempts_remaining),
            VerifyOutcome::Success { identifier } => Self::verified(identifier),
        }
    }
}

/// A slot whose lock is held and which is still linked under its key
struct Locked {
    slot: Slot,
    guard: OwnedMutexGuard<Option<ChallengeRecord>>,
}

#[derive(Default)]
struct StoreStats {
    issued: AtomicU64,
    verified: AtomicU64,
    mismatched: AtomicU64,
    expired: AtomicU64,
    locked: AtomicU64,
    evicted: AtomicU64,
}

/// Keyed store of live challenges
pub struct ChallengeStore {
    slots: RwLock<HashMap<String, Slot>>,
    config: StoreConfig,
    ttl: TimeDelta,
    generator: CodeGenerator,
    clock: Arc<dyn Clock>,
    stats: StoreStats,
}

impl ChallengeStore {
    pub fn new(
        config: StoreConfig,
        generator: CodeGenerator,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OtpError> {
        if config.max_attempts == 0 {
            return Err(OtpError::Config("max_attempts must be at least 1".into()));
        }
        let ttl = (1..=MAX_TTL_SECS)
            .contains(&config.ttl_secs)
            .then(|| TimeDelta::try_seconds(config.ttl_secs as i64))
            .flatten()
            .ok_or_else(|| {
                OtpError::Config(format!(
                    "ttl_secs must be between 1 and {}, got {}",
                    MAX_TTL_SECS, config.ttl_secs
                ))
            })?;

        Ok(Self {
            slots: RwLock::new(HashMap::new()),
            config,
            ttl,
            generator,
            clock,
            stats: StoreStats::default(),
        })
    }

    /// Issue a challenge, replacing any existing one for `identifier`
    pub async fn issue(&self, identifier: &str) -> Result<IssuedChallenge, OtpError> {
        self.install(identifier, "issue").await
    }

    /// Replace the challenge for `identifier` with a fresh one.
    ///
    /// The old code stops being verifiable in the same step the new one
    /// becomes live.
    pub async fn resend(&self, identifier: &str) -> Result<IssuedChallenge, OtpError> {
        self.install(identifier, "resend").await
    }

    async fn install(&self, identifier: &str, op: &'static str) -> Result<IssuedChallenge, OtpError> {
        let code = self.generator.generate()?;

        let mut locked = self.lock_or_create(identifier).await;
        let issued_at = self.clock.now();
        let superseded = locked
            .guard
            .replace(ChallengeRecord {
                identifier: identifier.to_string(),
                code: code.clone(),
                issued_at,
                expires_at: issued_at + self.ttl,
                attempts: 0,
            })
            .is_some();
        self.release(identifier, locked);

        self.stats.issued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            op = op,
            identifier = %fingerprint(identifier),
            superseded = superseded,
            ttl_secs = self.config.ttl_secs,
            "Challenge installed"
        );

        Ok(IssuedChallenge {
            code,
            expires_in_seconds: self.config.ttl_secs,
        })
    }

    /// Check `submitted` against the live challenge for `identifier`.
    ///
    /// Checks run in a fixed order: existence, expiry, lockout, code. The
    /// whole check-and-update happens under the identifier's lock.
    pub async fn verify(&self, identifier: &str, submitted: &str) -> VerifyOutcome {
        let Some(mut locked) = self.lock_existing(identifier).await else {
            return self.record_outcome(identifier, VerifyOutcome::NotFound);
        };

        let now = self.clock.now();
        let max = self.config.max_attempts;

        // Taken out of the slot; only a surviving mismatch puts it back
        let outcome = match locked.guard.take() {
            None => VerifyOutcome::NotFound,
            Some(record) if record.is_expired(now) => VerifyOutcome::Expired,
            Some(record) if record.attempts >= max => VerifyOutcome::Locked,
            Some(record) if codes_match(&record.code, submitted) => VerifyOutcome::Success {
                identifier: record.identifier,
            },
            Some(mut record) => {
                record.attempts += 1;
                if record.attempts >= max {
                    VerifyOutcome::Locked
                } else {
                    let attempts_remaining = max - record.attempts;
                    *locked.guard = Some(record);
                    VerifyOutcome::Mismatch { attempts_remaining }
                }
            }
        };
        self.release(identifier, locked);

        self.record_outcome(identifier, outcome)
    }

    /// Remove every expired challenge, returning how many were removed
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let candidates: Vec<(String, Slot)> = self
            .map()
            .iter()
            .map(|(identifier, slot)| (identifier.clone(), slot.clone()))
            .collect();

        let mut evicted = 0;
        for (identifier, slot) in candidates {
            let Some(mut locked) = self.lock_validated(&identifier, slot).await else {
                continue;
            };

            if matches!(&*locked.guard, Some(record) if record.is_expired(now)) {
                *locked.guard = None;
                evicted += 1;
                self.stats.evicted.fetch_add(1, Ordering::Relaxed);
            }
            self.release(&identifier, locked);
        }

        evicted
    }

    /// Number of identifiers holding a slot.
    ///
    /// Advisory: a slot created by an in-flight `issue` is counted before its
    /// challenge is installed.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Get statistics snapshot
    pub fn stats(&self) -> ChallengeStats {
        ChallengeStats {
            live: self.len(),
            issued: self.stats.issued.load(Ordering::Relaxed),
            verified: self.stats.verified.load(Ordering::Relaxed),
            mismatched: self.stats.mismatched.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
            locked: self.stats.locked.load(Ordering::Relaxed),
            evicted: self.stats.evicted.load(Ordering::Relaxed),
        }
    }

    fn record_outcome(&self, identifier: &str, outcome: VerifyOutcome) -> VerifyOutcome {
        let counter = match outcome {
            VerifyOutcome::NotFound => None,
            VerifyOutcome::Expired => Some(&self.stats.expired),
            VerifyOutcome::Locked => Some(&self.stats.locked),
            VerifyOutcome::Mismatch { .. } => Some(&self.stats.mismatched),
            VerifyOutcome::Success { .. } => Some(&self.stats.verified),
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        match &outcome {
            VerifyOutcome::Locked => tracing::warn!(
                identifier = %fingerprint(identifier),
                "Challenge locked out after failed attempts"
            ),
            VerifyOutcome::Success { .. } => tracing::info!(
                identifier = %fingerprint(identifier),
                "Challenge verified"
            ),
            other => tracing::debug!(
                identifier = %fingerprint(identifier),
                outcome = other.label(),
                "Challenge verification rejected"
            ),
        }

        outcome
    }

    /// Lock the slot for `identifier`, creating it if absent
    async fn lock_or_create(&self, identifier: &str) -> Locked {
        loop {
            let slot = self.linked_or_insert(identifier);

            if let Some(locked) = self.lock_validated(identifier, slot).await {
                return locked;
            }
        }
    }

    /// Lock the slot for `identifier` if one exists
    async fn lock_existing(&self, identifier: &str) -> Option<Locked> {
        loop {
            let slot = self.linked(identifier)?;

            if let Some(locked) = self.lock_validated(identifier, slot).await {
                return Some(locked);
            }
        }
    }

    /// Acquire `slot` and confirm it is still the one linked under `identifier`.
    ///
    /// The slot lock is the last await of every operation.
    async fn lock_validated(&self, identifier: &str, slot: Slot) -> Option<Locked> {
        let guard = slot.clone().lock_owned().await;
        let linked = self
            .map()
            .get(identifier)
            .is_some_and(|current| Arc::ptr_eq(current, &slot));

        linked.then(|| Locked { slot, guard })
    }

    /// Release a held slot, unlinking it first if it is empty
    fn release(&self, identifier: &str, locked: Locked) {
        if locked.guard.is_none() {
            let mut slots = self.map_mut();
            if slots
                .get(identifier)
                .is_some_and(|current| Arc::ptr_eq(current, &locked.slot))
            {
                slots.remove(identifier);
            }
        }
    }

    fn linked(&self, identifier: &str) -> Option<Slot> {
        self.map().get(identifier).cloned()
    }

    fn linked_or_insert(&self, identifier: &str) -> Slot {
        if let Some(slot) = self.linked(identifier) {
            return slot;
        }
        self.map_mut()
            .entry(identifier.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    // No map critical section can panic midway, so poisoning is ignored
    fn map(&self) -> RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn map_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Verbatim comparison that does not short-circuit on the first differing byte
fn codes_match(expected: &str, submitted: &str) -> bool {
    let (expected, submitted) = (expected.as_bytes(), submitted.as_bytes());
    if expected.len() != submitted.len() {
        return false;
    }

    expected
        .iter()
        .zip(submitted)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
