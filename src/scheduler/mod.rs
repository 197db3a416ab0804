//! Notification-timing policy.
//!
//! Pure decision logic: nothing here touches the registries, the clock or
//! the mail dispatcher. The engine feeds in a record, its asset and the
//! current time, and gets back one decision per wanted channel.

use tracing::warn;

use crate::registry::{AlertRecord, AssetRecord, Severity};

/// Upstream alert sources re-assert active alerts roughly every 5 minutes;
/// shaving a minute off every interval keeps a reminder from slipping past
/// its window by a few seconds.
const REASSERT_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

/// Outcome of evaluating one channel of one alert.
#[derive(Debug, Clone)]
pub struct Decision {
    pub channel: Channel,
    /// Destination address (asset email or synthesized sms address).
    pub to: String,
    pub send: bool,
}

/// Minimum seconds between periodic reminders for a given severity and
/// asset priority. `None` is a policy gap: log it and never remind.
pub fn notification_interval(severity: &Severity, priority: u8) -> Option<i64> {
    let base = match (severity, priority) {
        (Severity::Critical, 1) => 5 * 60,
        (Severity::Critical, 2..=5) => 15 * 60,
        (Severity::Warning, 1) => 60 * 60,
        (Severity::Warning, 2..=5) => 4 * 60 * 60,
        (Severity::Info, 1) => 8 * 60 * 60,
        (Severity::Info, 2..=5) => 24 * 60 * 60,
        _ => return None,
    };
    Some(base - REASSERT_MARGIN_SECS)
}

/// Decide whether one channel of `record` is due, given the time of that
/// channel's last successful notification.
pub fn should_notify(record: &AlertRecord, priority: u8, last_notification: i64, now: i64) -> bool {
    if record.last_update > last_notification {
        // A semantic change happened after the last notification went out.
        // This fires even for transitions into RESOLVED or an ACK state.
        return true;
    }
    if record.state.is_resolved() {
        // No periodic reminders for resolved alerts.
        return false;
    }
    if record.state.is_acknowledged() {
        // Acknowledged alerts are silenced no matter how long ago the last
        // notification was.
        return false;
    }
    match notification_interval(&record.severity, priority) {
        Some(interval) => now - last_notification > interval,
        None => {
            warn!(
                rule = %record.rule,
                asset = %record.asset,
                severity = %record.severity,
                priority,
                "no notification interval defined, periodic reminders disabled"
            );
            false
        }
    }
}

/// Evaluate every channel the record wants against the asset's contact
/// data. `semantic_change` marks a trigger that just inserted or changed the
/// record; it forces a send so that a change landing in the same second as
/// the previous notification is not swallowed by the timestamp comparison.
/// A channel with no destination address never sends, forced or not.
pub fn evaluate(
    record: &AlertRecord,
    asset: &AssetRecord,
    now: i64,
    semantic_change: bool,
) -> Vec<Decision> {
    let mut decisions = Vec::new();
    if record.wants_email {
        decisions.push(decide(record, asset, Channel::Email, now, semantic_change));
    }
    if record.wants_sms {
        decisions.push(decide(record, asset, Channel::Sms, now, semantic_change));
    }
    decisions
}

fn decide(
    record: &AlertRecord,
    asset: &AssetRecord,
    channel: Channel,
    now: i64,
    semantic_change: bool,
) -> Decision {
    let (to, last_notification) = match channel {
        Channel::Email => (asset.email.clone(), record.last_email_notification),
        Channel::Sms => (asset.sms_email.clone(), record.last_sms_notification),
    };
    let send = !to.is_empty()
        && (semantic_change || should_notify(record, asset.priority, last_notification, now));
    Decision { channel, to, send }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AlertState;

    fn record(state: &str, severity: &str) -> AlertRecord {
        AlertRecord {
            rule: "r".to_string(),
            asset: "A".to_string(),
            state: AlertState::from(state.to_string()),
            severity: Severity::from(severity.to_string()),
            description: "d".to_string(),
            source_time: 1_000,
            last_update: 1_000,
            last_email_notification: 0,
            last_sms_notification: 0,
            wants_email: true,
            wants_sms: false,
        }
    }

    fn asset(priority: u8) -> AssetRecord {
        AssetRecord {
            name: "A".to_string(),
            priority,
            contact_name: String::new(),
            email: "a@x.com".to_string(),
            phone: String::new(),
            sms_email: String::new(),
        }
    }

    #[test]
    fn test_interval_table() {
        assert_eq!(notification_interval(&Severity::Critical, 1), Some(240));
        assert_eq!(notification_interval(&Severity::Critical, 5), Some(840));
        assert_eq!(notification_interval(&Severity::Warning, 1), Some(3540));
        assert_eq!(notification_interval(&Severity::Warning, 3), Some(14340));
        assert_eq!(notification_interval(&Severity::Info, 1), Some(28740));
        assert_eq!(notification_interval(&Severity::Info, 2), Some(86340));
    }

    #[test]
    fn test_interval_policy_gaps() {
        assert_eq!(notification_interval(&Severity::Critical, 0), None);
        assert_eq!(notification_interval(&Severity::Critical, 6), None);
        assert_eq!(notification_interval(&Severity::Other("DEBUG".to_string()), 1), None);
    }

    #[test]
    fn test_semantic_change_always_notifies() {
        let mut rec = record("ACK-SILENCE", "CRITICAL");
        rec.last_update = 2_000;
        // even a transition into a suppressed state fires once
        assert!(should_notify(&rec, 1, 1_500, 2_001));
    }

    #[test]
    fn test_periodic_reminder_due() {
        let rec = record("ACTIVE", "CRITICAL");
        // CRITICAL/P1 effective interval is 240s
        assert!(!should_notify(&rec, 1, 1_000, 1_240));
        assert!(should_notify(&rec, 1, 1_000, 1_241));
    }

    #[test]
    fn test_resolved_never_reminds() {
        let rec = record("RESOLVED", "CRITICAL");
        assert!(!should_notify(&rec, 1, 1_000, 1_000_000));
    }

    #[test]
    fn test_acknowledged_never_reminds() {
        for state in ["ACK-PAUSE", "ACK-IGNORE", "ACK-SILENCE"] {
            let rec = record(state, "CRITICAL");
            assert!(!should_notify(&rec, 1, 1_000, 1_000_000), "state {state}");
        }
    }

    #[test]
    fn test_unrecognized_state_is_eligible() {
        let rec = record("ACK-WIP", "CRITICAL");
        assert!(should_notify(&rec, 1, 1_000, 2_000));
    }

    #[test]
    fn test_policy_gap_never_reminds() {
        let rec = record("ACTIVE", "DEBUG");
        assert!(!should_notify(&rec, 1, 1_000, i64::MAX / 2));
    }

    #[test]
    fn test_evaluate_skips_empty_destination() {
        let mut rec = record("ACTIVE", "CRITICAL");
        rec.wants_sms = true;
        let asset = asset(1); // has email, no sms_email

        let decisions = evaluate(&rec, &asset, 2_000, false);
        assert_eq!(decisions.len(), 2);
        let email = decisions.iter().find(|d| d.channel == Channel::Email).unwrap();
        let sms = decisions.iter().find(|d| d.channel == Channel::Sms).unwrap();
        assert!(email.send);
        assert_eq!(email.to, "a@x.com");
        assert!(!sms.send);
    }

    #[test]
    fn test_evaluate_honors_wants_flags() {
        let rec = record("ACTIVE", "CRITICAL"); // email only
        let decisions = evaluate(&rec, &asset(1), 2_000, false);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].channel, Channel::Email);
    }

    #[test]
    fn test_change_marker_overrides_colliding_timestamps() {
        // change and previous notification in the same epoch second: the
        // strict timestamp test alone would stay quiet
        let mut rec = record("ACK-SILENCE", "CRITICAL");
        rec.last_update = 2_000;
        rec.last_email_notification = 2_000;

        let forced = evaluate(&rec, &asset(1), 2_000, true);
        assert!(forced[0].send);

        let unforced = evaluate(&rec, &asset(1), 2_000, false);
        assert!(!unforced[0].send);
    }

    #[test]
    fn test_change_marker_never_beats_empty_destination() {
        let mut rec = record("ACTIVE", "CRITICAL");
        rec.wants_email = false;
        rec.wants_sms = true;
        let asset = asset(1); // no sms_email

        let decisions = evaluate(&rec, &asset, 2_000, true);
        assert_eq!(decisions.len(), 1);
        assert!(!decisions[0].send);
    }
}
