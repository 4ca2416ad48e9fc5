use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::services::providers::GenerationPurpose;

/// A provider API key, optionally dedicated to one purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub purpose: Option<GenerationPurpose>,
}

/// How shared (non-dedicated) keys are ordered between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySelectionPolicy {
    #[default]
    RoundRobin,
    LeastRecentlyFailed,
}

#[derive(Debug, Default)]
struct KeyState {
    cursor: usize,
    failures: HashMap<String, Instant>,
}

/// Key rotation state owned by one provider client
#[derive(Debug)]
pub struct KeyRing {
    keys: Vec<ApiKey>,
    policy: KeySelectionPolicy,
    cooldown: Duration,
    state: Mutex<KeyState>,
}

impl KeyRing {
    pub fn new(keys: Vec<ApiKey>, policy: KeySelectionPolicy, cooldown: Duration) -> Self {
        let keys = keys
            .into_iter()
            .filter(|k| !k.secret.trim().is_empty())
            .collect();
        Self {
            keys,
            policy,
            cooldown,
            state: Mutex::new(KeyState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, KeyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keys to try for `purpose`, in order: keys dedicated to the purpose,
    /// then shared keys per the policy, with keys still cooling down last
    pub fn candidates(&self, purpose: GenerationPurpose) -> Vec<ApiKey> {
        let mut state = self.lock();
        let now = Instant::now();

        let dedicated: Vec<&ApiKey> = self
            .keys
            .iter()
            .filter(|k| k.purpose == Some(purpose))
            .collect();
        let mut shared: Vec<&ApiKey> = self
            .keys
            .iter()
            .filter(|k| k.purpose != Some(purpose))
            .collect();

        match self.policy {
            KeySelectionPolicy::RoundRobin => {
                if !shared.is_empty() {
                    let start = state.cursor % shared.len();
                    shared.rotate_left(start);
                    state.cursor = state.cursor.wrapping_add(1);
                }
            }
            KeySelectionPolicy::LeastRecentlyFailed => {
                // never-failed keys keep config order, then oldest failure first
                shared.sort_by_key(|k| state.failures.get(&k.name).copied());
            }
        }

        let cooling = |k: &ApiKey| {
            state
                .failures
                .get(&k.name)
                .map(|at| now.duration_since(*at) < self.cooldown)
                .unwrap_or(false)
        };

        let (ready, cooling_down): (Vec<&ApiKey>, Vec<&ApiKey>) = dedicated
            .into_iter()
            .chain(shared)
            .partition(|k| !cooling(*k));

        ready.into_iter().chain(cooling_down).cloned().collect()
    }

    pub fn report_failure(&self, name: &str) {
        tracing::warn!("API key {} failed, cooling down for {:?}", name, self.cooldown);
        self.lock().failures.insert(name.to_string(), Instant::now());
    }

    pub fn report_success(&self, name: &str) {
        self.lock().failures.remove(name);
    }
}
