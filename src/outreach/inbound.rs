use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Payload handed over by the mail-receiving side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    pub subject: String,
    pub body_text: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundType {
    Bounce,
    Complaint,
    Unsubscribe,
    AutoReply,
    Reply,
}

impl InboundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InboundType::Bounce => "bounce",
            InboundType::Complaint => "complaint",
            InboundType::Unsubscribe => "unsubscribe",
            InboundType::AutoReply => "auto_reply",
            InboundType::Reply => "reply",
        }
    }
}

impl fmt::Display for InboundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundClassification {
    pub kind: InboundType,
    pub confidence: f64,
    pub reason: String,
}

static BOUNCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"mailer-daemon|postmaster@|delivery status notification|undeliverable|undelivered mail|delivery has failed|mail delivery failed|returned mail|address not found|user unknown|unzustellbar|nicht zugestellt")
        .expect("valid bounce pattern")
});

static COMPLAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bspam\b|\babuse\b|complaint|beschwerde|belästigung|harassment|anzeige erstatten|abmahnung")
        .expect("valid complaint pattern")
});

static UNSUBSCRIBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"unsubscribe|opt[- ]?out|remove me|abmelden|abbestellen|austragen|keine (weiteren )?(e-?mails|nachrichten|werbung)|nicht mehr kontaktieren")
        .expect("valid unsubscribe pattern")
});

static AUTO_REPLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"out of (the )?office|automatic reply|auto-?reply|autoreply|abwesenheitsnotiz|abwesend|automatische antwort|nicht im büro|im urlaub|on vacation")
        .expect("valid auto-reply pattern")
});

/// Classify an inbound message. Patterns are checked in priority order against
/// the lowercased subject, body and sender: bounce, complaint, unsubscribe,
/// auto-reply. Anything else is a reply.
pub fn classify_inbound(message: &InboundMessage) -> InboundClassification {
    let text = format!("{} {} {}", message.subject, message.body_text, message.from_email).to_lowercase();

    let rules: [(&Lazy<Regex>, InboundType, f64); 4] = [
        (&BOUNCE_RE, InboundType::Bounce, 0.95),
        (&COMPLAINT_RE, InboundType::Complaint, 0.85),
        (&UNSUBSCRIBE_RE, InboundType::Unsubscribe, 0.90),
        (&AUTO_REPLY_RE, InboundType::AutoReply, 0.80),
    ];

    for (pattern, kind, confidence) in rules {
        if let Some(found) = pattern.find(&text) {
            debug!(kind = %kind, pattern = found.as_str(), "Inbound message classified");
            return InboundClassification {
                kind,
                confidence,
                reason: format!("matched {} pattern '{}'", kind, found.as_str()),
            };
        }
    }

    InboundClassification {
        kind: InboundType::Reply,
        confidence: 0.70,
        reason: "no bounce, complaint, unsubscribe or auto-reply pattern matched".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str, body: &str, from: &str) -> InboundMessage {
        InboundMessage {
            subject: subject.to_string(),
            body_text: body.to_string(),
            from_email: from.to_string(),
        }
    }

    #[test]
    fn test_unsubscribe() {
        let result = classify_inbound(&message("Re: Kooperation", "Please unsubscribe me from this list.", "max@example.de"));
        assert_eq!(result.kind, InboundType::Unsubscribe);
        assert_eq!(result.confidence, 0.90);
    }

    #[test]
    fn test_bounce_wins_over_unsubscribe() {
        let result = classify_inbound(&message(
            "Undelivered",
            "This message was returned. Click here to unsubscribe.",
            "MAILER-DAEMON@mx.example.de",
        ));
        assert_eq!(result.kind, InboundType::Bounce);
        assert_eq!(result.confidence, 0.95);
        assert!(result.reason.contains("mailer-daemon"));
    }

    #[test]
    fn test_complaint_checked_before_unsubscribe() {
        let result = classify_inbound(&message("Spam", "Das ist Spam, bitte abmelden!", "a@b.de"));
        assert_eq!(result.kind, InboundType::Complaint);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_auto_reply_and_default_reply() {
        let auto = classify_inbound(&message("Automatische Antwort: Ihre Anfrage", "Ich bin bis Montag nicht im Büro.", "x@y.de"));
        assert_eq!(auto.kind, InboundType::AutoReply);
        assert_eq!(auto.confidence, 0.80);

        let reply = classify_inbound(&message("Re: Angebot", "Gerne, rufen Sie mich an.", "x@y.de"));
        assert_eq!(reply.kind, InboundType::Reply);
        assert_eq!(reply.confidence, 0.70);
    }

    #[test]
    fn test_empty_message_is_reply() {
        assert_eq!(classify_inbound(&InboundMessage::default()).kind, InboundType::Reply);
    }
}
