//! Boundary primitives the vault consumes but does not own: a clock and an
//! outbound transfer/invoke channel.

pub mod clock;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use transport::{NullTransport, OutboundCall, RecordingTransport, Transport};
