pub mod acquisition;
pub mod beacon;
pub mod connectivity;
pub mod display;
pub mod telemetry;

pub use acquisition::{AcquisitionLoop, Cycle};
pub use beacon::{Advertiser, BeaconBroadcaster};
pub use connectivity::{Connectivity, Link};
pub use display::{DisplayPresenter, Field, TextDisplay};
pub use telemetry::{Publisher, TelemetryPublisher, TelemetryError};
