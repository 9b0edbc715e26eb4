//! Outreach: campaign segmentation, send timing, inbound classification and
//! the suppression state machine that feeds back into segmentation.

pub mod inbound;
pub mod model;
pub mod scheduler;
pub mod segment;
pub mod suppression;

pub use inbound::{classify_inbound, InboundClassification, InboundMessage, InboundType};
pub use model::{
    DeliveryStatus, Direction, OutreachEvent, OutreachEventKind, OutreachEventLog, OutreachMessage, OutreachThread,
    SequenceStep,
};
pub use scheduler::{next_send_at, render_template, should_send_now, should_stop, QuietHours, StopReason, ThreadSendGate};
pub use segment::{select_segment, SegmentFilter};
pub use suppression::{apply_manual_suppression, apply_suppression, clear_suppression};
