//! Application orchestration layer
//!
//! Wires the domain logic to the platform capabilities: the supervised
//! input listener, the window controller, the monitor cache and the
//! tiling session that ties them together.

pub mod controller;
pub mod placement;
pub mod state;
pub mod supervisor;
pub mod telemetry;
pub mod topology;

pub use controller::{Tiler, TilingFailure, TilingOutcome, TilingSession};
pub use placement::{ControllerError, ExclusionPolicy, Ineligible, WindowController};
pub use state::ListenerState;
pub use supervisor::{InputSupervisor, ListenerHandler, SupervisorError};
pub use telemetry::{
    ChannelPreview, ChannelTelemetry, PreviewSink, TelemetryError, TelemetrySink, TilingEvent, TracingTelemetry,
};
pub use topology::MonitorTopology;
