use chrono::{DateTime, Utc};

use crate::registry::{AlertRecord, AssetRecord};

/// Subject line for one notification attempt.
pub fn subject(alert: &AlertRecord, asset: &AssetRecord) -> String {
    format!(
        "{} alert on {}: {} is {}",
        alert.severity, asset.name, alert.rule, alert.state
    )
}

/// Plain-text body for one notification attempt.
pub fn body(alert: &AlertRecord, asset: &AssetRecord) -> String {
    let mut lines = vec![
        format!("Alert:       {}", alert.rule),
        format!("Asset:       {} (priority {})", asset.name, asset.priority),
        format!("State:       {}", alert.state),
        format!("Severity:    {}", alert.severity),
        format!("Description: {}", alert.description),
        format!("Observed at: {}", format_time(alert.source_time)),
    ];
    if !asset.contact_name.is_empty() {
        lines.push(format!("Contact:     {}", asset.contact_name));
    }
    lines.join("\n")
}

fn format_time(epoch_secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch_secs, 0) {
        Some(time) => time.to_rfc3339(),
        None => epoch_secs.to_string(),
    }
}
