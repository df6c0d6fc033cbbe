use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::classifier::{ClassificationResult, ClassifierFacade};
use crate::normalizer::EmailNormalizer;
use crate::source::{EmailSource, RawEmail};
use crate::store::{AlertRecord, EmailRecord, EmailStore};

/// An alert is raised only above this probability; the boundary is exclusive.
pub const ALERT_THRESHOLD: f64 = 0.7;

/// How long `stop()` waits for the background task before detaching.
const STOP_JOIN_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
    StoppingRequested,
}

/// One stateful background task that pulls batches of raw messages,
/// normalizes and classifies each, persists the result, and raises alerts.
///
/// At most one task runs per instance: `start` while running is a logged
/// no-op. Cancellation is cooperative; the task checks the continue flag at
/// iteration boundaries, so an in-flight message is allowed to finish.
pub struct Monitor {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
}

struct Shared {
    classifier: Arc<ClassifierFacade>,
    store: Arc<dyn EmailStore>,
    state: Mutex<MonitorState>,
    keep_running: AtomicBool,
    wake: Notify,
}

impl Monitor {
    pub fn new(
        classifier: Arc<ClassifierFacade>,
        store: Arc<dyn EmailStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                classifier,
                store,
                state: Mutex::new(MonitorState::Idle),
                keep_running: AtomicBool::new(false),
                wake: Notify::new(),
            }),
            handle: Mutex::new(None),
            poll_interval,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.shared
            .state
            .lock()
            .map(|s| *s)
            .unwrap_or(MonitorState::Idle)
    }

    pub fn start(&self, user_id: &str, source: Box<dyn EmailSource>) {
        {
            let Ok(mut state) = self.shared.state.lock() else {
                log::error!("monitor state lock poisoned, refusing to start");
                return;
            };
            if *state != MonitorState::Idle {
                log::warn!("monitoring already active, ignoring start request");
                return;
            }
            *state = MonitorState::Running;
            // Flag updates stay under the state lock so a concurrent stop()
            // cannot interleave between the transition and the store.
            self.shared.keep_running.store(true, Ordering::SeqCst);
        }

        let shared = Arc::clone(&self.shared);
        let user = user_id.to_string();
        let interval = self.poll_interval;
        let handle = tokio::spawn(run_loop(shared, user, source, interval));
        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        log::info!("started email monitoring for user {user_id}");
    }

    /// Requests shutdown and waits up to the join window for the task to
    /// observe the flag. Best effort: returns either way.
    pub async fn stop(&self) {
        {
            let Ok(mut state) = self.shared.state.lock() else {
                return;
            };
            if *state != MonitorState::Running {
                log::debug!("stop requested while monitor is not running");
                return;
            }
            *state = MonitorState::StoppingRequested;
            self.shared.keep_running.store(false, Ordering::SeqCst);
        }
        self.shared.wake.notify_one();

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            match tokio::time::timeout(STOP_JOIN_WINDOW, handle).await {
                Ok(_) => log::info!("email monitoring stopped"),
                Err(_) => log::warn!(
                    "monitor task did not exit within {STOP_JOIN_WINDOW:?}, detaching"
                ),
            }
        }
    }
}

/// Alert rule: phishing verdict with probability strictly above the
/// threshold. Exactly 0.7 does not alert.
pub fn should_alert(verdict: &ClassificationResult) -> bool {
    verdict.is_phishing && verdict.probability > ALERT_THRESHOLD
}

async fn run_loop(
    shared: Arc<Shared>,
    user_id: String,
    mut source: Box<dyn EmailSource>,
    interval: Duration,
) {
    let normalizer = EmailNormalizer::new();

    while shared.keep_running.load(Ordering::SeqCst) {
        if let Err(e) = process_batch(&shared, &normalizer, &user_id, source.as_mut()) {
            // One bad iteration must not kill monitoring.
            log::error!("error in email monitoring: {e:#}");
        }

        if !shared.keep_running.load(Ordering::SeqCst) {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shared.wake.notified() => {}
        }
    }

    if let Ok(mut state) = shared.state.lock() {
        *state = MonitorState::Idle;
    }
}

fn process_batch(
    shared: &Shared,
    normalizer: &EmailNormalizer,
    user_id: &str,
    source: &mut dyn EmailSource,
) -> anyhow::Result<()> {
    let batch = source.fetch_next_batch().context("fetching next batch")?;
    for raw in batch {
        if !shared.keep_running.load(Ordering::SeqCst) {
            break;
        }
        process_message(shared, normalizer, user_id, &raw);
    }
    Ok(())
}

fn process_message(shared: &Shared, normalizer: &EmailNormalizer, user_id: &str, raw: &RawEmail) {
    let (subject, body) = normalizer.normalize(&raw.data);
    let verdict = shared.classifier.classify(&subject, &body);
    let record = EmailRecord::new(user_id, subject, body, verdict, raw.source_tag);

    let email_id = match shared.store.save_email(&record) {
        Ok(id) => id,
        Err(e) => {
            log::error!("failed to persist email record: {e}");
            return;
        }
    };

    if should_alert(&verdict) {
        let alert = AlertRecord::for_email(email_id, &record);
        match shared.store.save_alert(&alert) {
            Ok(_) => log::warn!(
                "phishing alert: {:?} (probability {:.2})",
                record.subject,
                verdict.probability
            ),
            Err(e) => log::error!("failed to persist alert record: {e}"),
        }
    }
}
