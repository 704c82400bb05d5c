//! Pulse delivery to the remote collector.
//!
//! - `deliverer`: single-flight state machine owning the pulse queue
//! - `payload`: wire format of one pulse
//! - `transport`: the HTTP exchange, behind [`PulseTransport`]
//! - `status`: values reported to the status display

mod deliverer;
mod error;
mod payload;
mod status;
mod transport;

pub use deliverer::{
    Deliverer, DeliveryJob, DeliverySession, DeliveryState, FlushDecision, Settlement,
};
pub use error::DeliveryError;
pub use payload::{format_coded_at, PulsePayload, XpEntry};
pub use status::{LogStatusObserver, StatusObserver, StatusReport, STATUS_PREFIX};
pub use transport::{HttpTransport, PulseTransport, ACCEPTED_STATUS, API_TOKEN_HEADER};
