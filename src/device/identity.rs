// PageTurn - Cross-Device Reading Client
// Copyright (C) 2026 PageTurn contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Device identity management
//!
//! Every installation carries a stable, opaque device id used to scope
//! library fetches and progress updates, plus a user-editable label so people
//! can tell "the phone on the nightstand" from "the study laptop" when two
//! devices report different reading positions.
//!
//! The id is generated once (`device_<millis>_<random suffix>`) and persisted
//! with unbounded lifetime. If persistence is unavailable the id silently
//! degrades to session-only: progress sync keeps working for the current
//! process and a fresh id is minted on the next launch. `device_id()` never
//! fails.
//!
//! On first generation a labeling pass is scheduled after a short delay as a
//! detached (but abortable) task, so interactive hosts can let the user
//! confirm or override the heuristic default without blocking startup.

use crate::error::Result;
use crate::storage::{settings, Database};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Settings key for the immutable device identifier
const DEVICE_ID_KEY: &str = "device_id";

/// Settings key for the user-editable device label
const DEVICE_LABEL_KEY: &str = "device_label";

/// Delay before the first-run labeling prompt fires
const LABEL_PROMPT_DELAY: Duration = Duration::from_millis(500);

/// Length of the random id suffix
const ID_SUFFIX_LEN: usize = 9;

/// A device's stable identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Opaque, immutable identifier
    pub id: String,
    /// Human-readable, user-editable label
    pub label: String,
}

/// Hook for interactive hosts to confirm or override the suggested label.
///
/// Returning `None` (or a blank string) keeps the suggestion. Headless hosts
/// use [`NoPrompt`].
pub trait LabelPrompt: Send + Sync {
    fn prompt(&self, suggested: &str) -> Option<String>;
}

/// Prompt that always keeps the suggested label
pub struct NoPrompt;

impl LabelPrompt for NoPrompt {
    fn prompt(&self, _suggested: &str) -> Option<String> {
        None
    }
}

/// Issues and persists the per-device identity
pub struct DeviceManager {
    db: Database,
    prompt: Arc<dyn LabelPrompt>,
    /// Identity for this process when persistence is unavailable, and a
    /// fast path once the id has been resolved either way
    session_id: Mutex<Option<String>>,
    /// Pending first-run labeling task, retained so it can be observed or
    /// aborted instead of leaking
    label_task: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceManager {
    /// Create a manager that never prompts (headless default)
    pub fn new(db: Database) -> Self {
        Self::with_prompt(db, Arc::new(NoPrompt))
    }

    /// Create a manager with an interactive labeling hook
    pub fn with_prompt(db: Database, prompt: Arc<dyn LabelPrompt>) -> Self {
        Self {
            db,
            prompt,
            session_id: Mutex::new(None),
            label_task: Mutex::new(None),
        }
    }

    /// Get the stable device id, generating and persisting one on first call.
    ///
    /// Idempotent. Infallible by design: when the settings store cannot be
    /// written the freshly minted id is kept for the session only and the
    /// failure is logged, because an unsynced read is better than a crashed
    /// reader.
    pub async fn device_id(&self) -> String {
        let mut session = self.session_id.lock().await;
        if let Some(id) = session.as_ref() {
            return id.clone();
        }

        match settings::get(self.db.pool(), DEVICE_ID_KEY).await {
            Ok(Some(id)) => {
                *session = Some(id.clone());
                return id;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "device id lookup failed, generating session-only id");
            }
        }

        let id = generate_device_id();
        info!(device_id = %id, "generated new device id");

        match settings::set(self.db.pool(), DEVICE_ID_KEY, &id).await {
            Ok(()) => self.schedule_label_prompt().await,
            Err(e) => {
                warn!(error = %e, "device id persistence unavailable, keeping session-only id");
            }
        }

        *session = Some(id.clone());
        id
    }

    /// Get the device label, falling back to the platform heuristic default
    pub async fn label(&self) -> String {
        match settings::get(self.db.pool(), DEVICE_LABEL_KEY).await {
            Ok(Some(label)) => label,
            Ok(None) => default_label().to_string(),
            Err(e) => {
                warn!(error = %e, "device label lookup failed, using default");
                default_label().to_string()
            }
        }
    }

    /// Persist a user-chosen label
    ///
    /// # Errors
    /// Rejects blank labels; reports storage failures.
    pub async fn set_label(&self, label: &str) -> Result<()> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(crate::error::PageTurnError::invalid_input(
                "device label must not be blank",
            ));
        }

        settings::set(self.db.pool(), DEVICE_LABEL_KEY, trimmed).await?;
        info!(label = trimmed, "device label updated");
        Ok(())
    }

    /// Full identity snapshot (for request scoping and diagnostics)
    pub async fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            id: self.device_id().await,
            label: self.label().await,
        }
    }

    /// Schedule the first-run labeling pass.
    ///
    /// Runs after a short delay so it never blocks the call that generated
    /// the id. The handle is retained: hosts shutting down early can abort
    /// it, tests can await it.
    async fn schedule_label_prompt(&self) {
        let db = self.db.clone();
        let prompt = Arc::clone(&self.prompt);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(LABEL_PROMPT_DELAY).await;

            let suggested = default_label();
            let chosen = prompt
                .prompt(suggested)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| suggested.to_string());

            if let Err(e) = settings::set(db.pool(), DEVICE_LABEL_KEY, &chosen).await {
                warn!(error = %e, "first-run label could not be persisted");
            } else {
                debug!(label = %chosen, "first-run label persisted");
            }
        });

        *self.label_task.lock().await = Some(handle);
    }

    /// Take the pending labeling task, if any.
    ///
    /// Callers can await it (tests, orderly shutdown) or abort it. Returns
    /// `None` when no first-run labeling is pending.
    pub async fn take_label_task(&self) -> Option<JoinHandle<()>> {
        self.label_task.lock().await.take()
    }

    /// Abort the pending labeling task, if any
    pub async fn abort_label_task(&self) {
        if let Some(handle) = self.label_task.lock().await.take() {
            handle.abort();
        }
    }
}

/// Generate a fresh device id: `device_<millis>_<random suffix>`
fn generate_device_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| {
            let c = rng.gen_range(0..36u32);
            char::from_digit(c, 36).unwrap_or('0')
        })
        .collect();

    format!("device_{}_{}", millis, suffix)
}

/// Heuristic default label from the compile target
fn default_label() -> &'static str {
    #[cfg(any(target_os = "android", target_os = "ios"))]
    {
        "My Phone"
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    {
        "My Computer"
    }
}
