use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Lifecycle state of an alert.
///
/// Upstream rule engines use a small set of well-known labels plus whatever
/// new vocabulary they grow over time, so this is deliberately not a closed
/// enum: anything unrecognized lands in `Other` and is treated as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertState {
    Resolved,
    AckPause,
    AckIgnore,
    AckSilence,
    Other(String),
}

impl AlertState {
    pub fn as_str(&self) -> &str {
        match self {
            AlertState::Resolved => "RESOLVED",
            AlertState::AckPause => "ACK-PAUSE",
            AlertState::AckIgnore => "ACK-IGNORE",
            AlertState::AckSilence => "ACK-SILENCE",
            AlertState::Other(label) => label,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AlertState::Resolved)
    }

    /// Acknowledged states never get periodic reminders, no matter how much
    /// time has passed since the last notification.
    pub fn is_acknowledged(&self) -> bool {
        matches!(
            self,
            AlertState::AckPause | AlertState::AckIgnore | AlertState::AckSilence
        )
    }
}

impl From<String> for AlertState {
    fn from(label: String) -> Self {
        match label.as_str() {
            "RESOLVED" => AlertState::Resolved,
            "ACK-PAUSE" => AlertState::AckPause,
            "ACK-IGNORE" => AlertState::AckIgnore,
            "ACK-SILENCE" => AlertState::AckSilence,
            _ => AlertState::Other(label),
        }
    }
}

impl From<AlertState> for String {
    fn from(state: AlertState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Unknown labels are kept verbatim; they have no entry in
/// the scheduling table and so never produce periodic reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    Warning,
    Info,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Other(label) => label,
        }
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match label.as_str() {
            "CRITICAL" => Severity::Critical,
            "WARNING" => Severity::Warning,
            "INFO" => Severity::Info,
            _ => Severity::Other(label),
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key: rule name is normalized to lowercase, asset identifiers
/// are case-sensitive and stored exactly as delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub rule: String,
    pub asset: String,
}

impl AlertKey {
    pub fn new(rule: &str, asset: &str) -> Self {
        Self {
            rule: rule.to_lowercase(),
            asset: asset.to_string(),
        }
    }
}

/// One tracked alert for a `(rule, asset)` pair.
///
/// `last_update` is engine wall-clock time of the last *semantic* change
/// (state, severity or description); re-asserting identical content does
/// not touch it. The notification counters default to 0, meaning "never".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub rule: String,
    pub asset: String,
    pub state: AlertState,
    pub severity: Severity,
    pub description: String,
    pub source_time: i64,
    pub last_update: i64,
    #[serde(default)]
    pub last_email_notification: i64,
    #[serde(default)]
    pub last_sms_notification: i64,
    pub wants_email: bool,
    pub wants_sms: bool,
}

impl AlertRecord {
    pub fn key(&self) -> AlertKey {
        AlertKey::new(&self.rule, &self.asset)
    }
}

/// Incoming alert content, already decoded from the wire.
#[derive(Debug, Clone)]
pub struct AlertUpdate {
    pub state: AlertState,
    pub severity: Severity,
    pub description: String,
    pub source_time: i64,
    pub wants_email: bool,
    pub wants_sms: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of this key; a fresh record was inserted.
    Inserted,
    /// State, severity or description changed; `last_update` was bumped.
    Changed,
    /// Identical content re-asserted; only the wants flags were refreshed.
    Refreshed,
    /// The event no longer requests email or SMS; the record was removed.
    Dropped,
    /// Unknown key and no email/SMS action requested; nothing stored.
    Ignored,
}

/// All alerts the engine is currently interested in, keyed by
/// `(lowercased rule, asset)`.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    records: HashMap<AlertKey, AlertRecord>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the registry from a persisted snapshot. Rule names are
    /// re-normalized so a hand-edited state file cannot smuggle in a
    /// mixed-case key.
    pub fn from_records(records: Vec<AlertRecord>) -> Self {
        let mut registry = Self::new();
        for mut record in records {
            record.rule = record.rule.to_lowercase();
            registry.records.insert(record.key(), record);
        }
        registry
    }

    /// Apply one decoded alert event. `now` is the engine wall clock used
    /// for `last_update` bookkeeping.
    pub fn upsert(&mut self, rule: &str, asset: &str, update: AlertUpdate, now: i64) -> UpsertOutcome {
        let key = AlertKey::new(rule, asset);

        if !update.wants_email && !update.wants_sms {
            // No actionable channel: prune any existing record, never insert.
            return if self.records.remove(&key).is_some() {
                debug!(rule = %key.rule, asset = %key.asset, "alert no longer requests email/sms, dropped");
                UpsertOutcome::Dropped
            } else {
                UpsertOutcome::Ignored
            };
        }

        match self.records.get_mut(&key) {
            None => {
                self.records.insert(
                    key.clone(),
                    AlertRecord {
                        rule: key.rule,
                        asset: key.asset,
                        state: update.state,
                        severity: update.severity,
                        description: update.description,
                        source_time: update.source_time,
                        last_update: now,
                        last_email_notification: 0,
                        last_sms_notification: 0,
                        wants_email: update.wants_email,
                        wants_sms: update.wants_sms,
                    },
                );
                UpsertOutcome::Inserted
            }
            Some(record) => {
                // Wants flags are re-derived from every event, semantic
                // change or not.
                record.wants_email = update.wants_email;
                record.wants_sms = update.wants_sms;

                if record.state != update.state
                    || record.severity != update.severity
                    || record.description != update.description
                {
                    record.state = update.state;
                    record.severity = update.severity;
                    record.description = update.description;
                    record.source_time = update.source_time;
                    record.last_update = now;
                    UpsertOutcome::Changed
                } else {
                    UpsertOutcome::Refreshed
                }
            }
        }
    }

    pub fn get(&self, rule: &str, asset: &str) -> Option<&AlertRecord> {
        self.records.get(&AlertKey::new(rule, asset))
    }

    pub fn get_by_key(&self, key: &AlertKey) -> Option<&AlertRecord> {
        self.records.get(key)
    }

    pub fn record_mut(&mut self, key: &AlertKey) -> Option<&mut AlertRecord> {
        self.records.get_mut(key)
    }

    pub fn remove(&mut self, rule: &str, asset: &str) -> Option<AlertRecord> {
        self.records.remove(&AlertKey::new(rule, asset))
    }

    pub fn keys(&self) -> Vec<AlertKey> {
        self.records.keys().cloned().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &AlertRecord> {
        self.records.values()
    }

    /// Snapshot for persistence, ordered by key so saved files diff cleanly.
    pub fn snapshot(&self) -> Vec<AlertRecord> {
        let mut records: Vec<AlertRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| (&a.rule, &a.asset).cmp(&(&b.rule, &b.asset)));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(state: &str, severity: &str, description: &str) -> AlertUpdate {
        AlertUpdate {
            state: AlertState::from(state.to_string()),
            severity: Severity::from(severity.to_string()),
            description: description.to_string(),
            source_time: 1_000,
            wants_email: true,
            wants_sms: false,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = AlertRegistry::new();
        let outcome = registry.upsert("Rule@X", "UPS-9", update("ACTIVE", "CRITICAL", "d"), 100);
        assert_eq!(outcome, UpsertOutcome::Inserted);

        // rule is stored lowercase; asset case is preserved and significant
        let record = registry.get("rule@x", "UPS-9").unwrap();
        assert_eq!(record.rule, "rule@x");
        assert_eq!(record.asset, "UPS-9");
        assert_eq!(record.last_update, 100);
        assert_eq!(record.last_email_notification, 0);
        assert!(registry.get("rule@x", "ups-9").is_none());
    }

    #[test]
    fn test_key_uniqueness_across_rule_case() {
        let mut registry = AlertRegistry::new();
        registry.upsert("Rule", "A", update("ACTIVE", "WARNING", "d"), 100);
        registry.upsert("RULE", "A", update("ACTIVE", "WARNING", "d"), 200);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reassertion_keeps_last_update() {
        let mut registry = AlertRegistry::new();
        registry.upsert("r", "A", update("ACTIVE", "CRITICAL", "d"), 100);

        let outcome = registry.upsert("r", "A", update("ACTIVE", "CRITICAL", "d"), 500);
        assert_eq!(outcome, UpsertOutcome::Refreshed);
        assert_eq!(registry.get("r", "A").unwrap().last_update, 100);
    }

    #[test]
    fn test_semantic_change_bumps_last_update() {
        let mut registry = AlertRegistry::new();
        registry.upsert("r", "A", update("ACTIVE", "CRITICAL", "d"), 100);

        let outcome = registry.upsert("r", "A", update("RESOLVED", "CRITICAL", "d"), 500);
        assert_eq!(outcome, UpsertOutcome::Changed);
        let record = registry.get("r", "A").unwrap();
        assert_eq!(record.last_update, 500);
        assert!(record.state.is_resolved());
    }

    #[test]
    fn test_disinterest_prunes_record() {
        let mut registry = AlertRegistry::new();
        registry.upsert("r", "A", update("ACTIVE", "CRITICAL", "d"), 100);

        let mut uninterested = update("ACTIVE", "CRITICAL", "d");
        uninterested.wants_email = false;
        uninterested.wants_sms = false;
        assert_eq!(registry.upsert("r", "A", uninterested.clone(), 200), UpsertOutcome::Dropped);
        assert!(registry.is_empty());

        // and it never creates one either
        assert_eq!(registry.upsert("r", "A", uninterested, 300), UpsertOutcome::Ignored);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_wants_flags_refreshed_without_semantic_change() {
        let mut registry = AlertRegistry::new();
        registry.upsert("r", "A", update("ACTIVE", "CRITICAL", "d"), 100);

        let mut sms_too = update("ACTIVE", "CRITICAL", "d");
        sms_too.wants_sms = true;
        assert_eq!(registry.upsert("r", "A", sms_too, 200), UpsertOutcome::Refreshed);

        let record = registry.get("r", "A").unwrap();
        assert!(record.wants_sms);
        assert_eq!(record.last_update, 100);
    }

    #[test]
    fn test_state_label_round_trip() {
        for label in ["RESOLVED", "ACK-PAUSE", "ACK-IGNORE", "ACK-SILENCE", "ACK-WIP"] {
            let state = AlertState::from(label.to_string());
            assert_eq!(state.as_str(), label);
        }
        assert!(AlertState::from("ACK-WIP".to_string()) == AlertState::Other("ACK-WIP".to_string()));
        assert!(!AlertState::Other("ACK-WIP".to_string()).is_acknowledged());
    }

    #[test]
    fn test_snapshot_round_trip_preserves_zero_counters() {
        let mut registry = AlertRegistry::new();
        registry.upsert("r", "A", update("ACTIVE", "INFO", "d"), 100);
        registry.upsert("s", "B", update("ACTIVE", "WARNING", ""), 200);

        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        let restored = AlertRegistry::from_records(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.snapshot(), registry.snapshot());
        assert_eq!(restored.get("r", "A").unwrap().last_email_notification, 0);
        assert_eq!(restored.get("s", "B").unwrap().description, "");
    }
}
