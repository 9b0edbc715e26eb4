use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{ComplianceFlags, SuppressionReason};
use crate::outreach::inbound::InboundType;

/// Apply an inbound event to the compliance flags.
///
/// Automated events only ever set do-not-contact flags; nothing here clears
/// them. A `Manual` or `Blocklist` reason stays on record. A reply only stamps
/// `last_inbound_at`, auto-replies change nothing.
pub fn apply_suppression(flags: &ComplianceFlags, kind: InboundType, now: DateTime<Utc>) -> ComplianceFlags {
    let mut next = flags.clone();
    match kind {
        InboundType::Unsubscribe => {
            next.do_not_contact_email = true;
            next.suppression_reason = automated_reason(flags.suppression_reason, SuppressionReason::Unsubscribed);
        }
        InboundType::Bounce => {
            next.do_not_contact_email = true;
            next.suppression_reason = automated_reason(flags.suppression_reason, SuppressionReason::Bounced);
        }
        InboundType::Complaint => {
            next.do_not_contact_email = true;
            next.do_not_contact_phone = true;
            next.suppression_reason = automated_reason(flags.suppression_reason, SuppressionReason::Complaint);
        }
        InboundType::Reply => {
            next.last_inbound_at = Some(now);
        }
        InboundType::AutoReply => {}
    }
    next
}

fn automated_reason(current: Option<SuppressionReason>, reason: SuppressionReason) -> Option<SuppressionReason> {
    match current {
        Some(SuppressionReason::Manual | SuppressionReason::Blocklist) => current,
        _ => Some(reason),
    }
}

/// Suppression set by an operator or an imported blocklist. Blocks both channels.
pub fn apply_manual_suppression(flags: &ComplianceFlags, reason: SuppressionReason) -> ComplianceFlags {
    let mut next = flags.clone();
    next.do_not_contact_email = true;
    next.do_not_contact_phone = true;
    next.suppression_reason = Some(reason);
    next
}

/// Explicit manual action, the only path that resets do-not-contact flags.
pub fn clear_suppression(flags: &ComplianceFlags, actor: &str) -> ComplianceFlags {
    info!(actor, previous_reason = ?flags.suppression_reason, "Suppression cleared manually");
    ComplianceFlags {
        do_not_contact_email: false,
        do_not_contact_phone: false,
        suppression_reason: None,
        ..flags.clone()
    }
}
