pub mod directory_use_case;
pub mod inbound_use_case;
pub mod outreach_use_case;
pub mod ports;
