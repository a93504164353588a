// Adapters layer: concrete fetch strategies behind the `FetchStrategy` port.

pub mod live;
pub mod replay;
pub mod tracking;

pub use live::LiveFetchStrategy;
pub use replay::ReplayFetchStrategy;
pub use tracking::TrackingFetchStrategy;
