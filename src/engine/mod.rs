//! The reactive core: applies inbound events to the registries, asks the
//! scheduler what is due and hands notifications to the mail dispatcher.
//!
//! Everything runs on one logical thread; each event is processed to
//! completion before the next one is looked at, so the registries need no
//! locking.

use chrono::Utc;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::dispatch::{MailDispatch, render};
use crate::events::{self, AlertEvent, AssetEvent, AssetOperation, Event};
use crate::registry::{
    AlertKey, AlertRecord, AlertRegistry, AlertState, AlertUpdate, AssetDirectory, AssetRecord,
    Severity, UpsertOutcome,
};
use crate::scheduler::{self, Channel};
use crate::storage;

/// What the run loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct Engine<D: MailDispatch> {
    alerts: AlertRegistry,
    assets: AssetDirectory,
    dispatch: D,
    alerts_path: Option<PathBuf>,
    assets_path: Option<PathBuf>,
}

impl<D: MailDispatch> Engine<D> {
    /// Build an engine, loading both registries from their state files.
    /// A missing or unreadable snapshot means starting empty; it is never
    /// fatal.
    pub fn new(
        dispatch: D,
        sms_gateway: Option<String>,
        alerts_path: Option<PathBuf>,
        assets_path: Option<PathBuf>,
    ) -> Self {
        let alerts = match &alerts_path {
            None => {
                warn!("alerts state file not configured, alert state will not survive restarts");
                AlertRegistry::new()
            }
            Some(path) => match storage::load_json::<Vec<AlertRecord>>(path) {
                Ok(Some(records)) => {
                    let registry = AlertRegistry::from_records(records);
                    info!(count = registry.len(), "loaded alert state");
                    registry
                }
                Ok(None) => {
                    info!(path = %path.display(), "no alert state file yet, starting empty");
                    AlertRegistry::new()
                }
                Err(e) => {
                    warn!("cannot load alert state, starting empty: {e:#}");
                    AlertRegistry::new()
                }
            },
        };

        let assets = match &assets_path {
            None => {
                warn!("assets state file not configured, asset state will not survive restarts");
                AssetDirectory::new(sms_gateway)
            }
            Some(path) => match storage::load_json::<Vec<AssetRecord>>(path) {
                Ok(Some(records)) => {
                    let directory = AssetDirectory::from_records(records, sms_gateway);
                    info!(count = directory.len(), "loaded asset state");
                    directory
                }
                Ok(None) => {
                    info!(path = %path.display(), "no asset state file yet, starting empty");
                    AssetDirectory::new(sms_gateway)
                }
                Err(e) => {
                    warn!("cannot load asset state, starting empty: {e:#}");
                    AssetDirectory::new(sms_gateway)
                }
            },
        };

        Self {
            alerts,
            assets,
            dispatch,
            alerts_path,
            assets_path,
        }
    }

    /// Process one inbound event to completion, snapshotting whichever
    /// registry it mutated.
    pub fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::Alert(alert) => {
                self.on_alert(alert);
                self.save_alerts();
            }
            Event::Asset(asset) => {
                self.on_asset(asset);
                self.save_assets();
            }
            Event::CheckNow => {
                self.check_all();
                // successful notifications moved counters
                self.save_alerts();
            }
            Event::Terminate => {
                info!("terminate command received");
                return Flow::Shutdown;
            }
        }
        Flow::Continue
    }

    /// Drain an NDJSON event stream, one line at a time, in arrival order,
    /// then take the final snapshots. Malformed lines are logged and
    /// dropped; a read error ends the stream early but the shutdown save
    /// still runs.
    pub fn run<R: BufRead>(&mut self, reader: R) {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("event stream read failed, stopping: {e:#}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let event = match events::decode(&line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("dropping malformed event: {e:#}");
                    continue;
                }
            };
            if self.handle_event(event) == Flow::Shutdown {
                break;
            }
        }
        self.shutdown();
    }

    /// Re-evaluate every tracked alert against the current directory.
    pub fn check_all(&mut self) {
        let now = Utc::now().timestamp();
        for key in self.alerts.keys() {
            self.notify(&key, now, false);
        }
    }

    /// Final snapshots; called once when the run loop ends.
    pub fn shutdown(&mut self) {
        self.save_alerts();
        self.save_assets();
        info!(
            alerts = self.alerts.len(),
            assets = self.assets.len(),
            "engine state saved on shutdown"
        );
    }

    pub fn alerts(&self) -> &AlertRegistry {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertRegistry {
        &mut self.alerts
    }

    pub fn assets(&self) -> &AssetDirectory {
        &self.assets
    }

    fn on_alert(&mut self, event: AlertEvent) {
        let now = Utc::now().timestamp();
        let source_time = if event.time <= 0 { now } else { event.time };
        let key = AlertKey::new(&event.rule, &event.asset);
        let wants_email = event.wants_email();
        let wants_sms = event.wants_sms();

        let update = AlertUpdate {
            state: AlertState::from(event.state),
            severity: Severity::from(event.severity),
            description: event.description,
            source_time,
            wants_email,
            wants_sms,
        };

        let outcome = self.alerts.upsert(&event.rule, &event.asset, update, now);
        debug!(rule = %key.rule, asset = %key.asset, ?outcome, "alert event applied");

        // An insert or a semantic change must go out on this trigger even
        // when the timestamps land in the same second as the previous
        // notification; the outcome carries that, the clock cannot.
        match outcome {
            UpsertOutcome::Dropped | UpsertOutcome::Ignored => {}
            UpsertOutcome::Inserted | UpsertOutcome::Changed => self.notify(&key, now, true),
            UpsertOutcome::Refreshed => self.notify(&key, now, false),
        }
    }

    fn on_asset(&mut self, event: AssetEvent) {
        match event.operation {
            AssetOperation::Create | AssetOperation::Update => {
                self.assets.upsert(
                    &event.name,
                    event.priority,
                    event.contact_name,
                    event.contact_email,
                    event.contact_phone,
                );
                debug!(asset = %event.name, "asset stored");
            }
            AssetOperation::Inventory => {
                self.assets.partial_update(
                    &event.name,
                    event.contact_name,
                    event.contact_email,
                    event.contact_phone,
                );
            }
            AssetOperation::Delete => {
                self.assets.remove(&event.name);
                debug!(asset = %event.name, "asset removed");
            }
            AssetOperation::Unknown(operation) => {
                warn!(asset = %event.name, operation = %operation, "unsupported asset operation, ignored");
            }
        }
    }

    /// Evaluate one alert and push whatever is due through the dispatcher.
    /// Counters move only when the dispatcher reports success, so a failed
    /// attempt is retried on the next trigger.
    fn notify(&mut self, key: &AlertKey, now: i64, semantic_change: bool) {
        let Some(record) = self.alerts.get_by_key(key) else {
            return;
        };
        let Some(asset) = self.assets.get(&key.asset) else {
            // Legal transient state: the asset event may simply not have
            // arrived yet.
            debug!(rule = %key.rule, asset = %key.asset, "asset not known yet, notification deferred");
            return;
        };

        let subject = render::subject(record, asset);
        let body = render::body(record, asset);
        let due: Vec<_> = scheduler::evaluate(record, asset, now, semantic_change)
            .into_iter()
            .filter(|decision| decision.send)
            .collect();

        for decision in due {
            match self.dispatch.send(&decision.to, &subject, &body) {
                Ok(()) => {
                    info!(rule = %key.rule, asset = %key.asset, to = %decision.to, "notification sent");
                    if let Some(record) = self.alerts.record_mut(key) {
                        match decision.channel {
                            Channel::Email => record.last_email_notification = now,
                            Channel::Sms => record.last_sms_notification = now,
                        }
                    }
                }
                Err(e) => {
                    error!(rule = %key.rule, asset = %key.asset, to = %decision.to, "notification failed: {e:#}");
                }
            }
        }
    }

    fn save_alerts(&self) {
        let Some(path) = &self.alerts_path else {
            return;
        };
        if let Err(e) = storage::save_json(path, &self.alerts.snapshot()) {
            error!("cannot save alert state: {e:#}");
        }
    }

    fn save_assets(&self) {
        let Some(path) = &self.assets_path else {
            return;
        };
        if let Err(e) = storage::save_json(path, &self.assets.snapshot()) {
            error!("cannot save asset state: {e:#}");
        }
    }
}
