//! Kinema player core.
//!
//! Turns elapsed time into frame numbers for a decoded vector animation: the
//! [`PlaybackScheduler`] handles direction modes, segments and loop policy, the
//! [`TweenEngine`] overlays host-driven interpolation, and the [`ObserverBus`] fans
//! notifications out to listeners the host owns. Rasterization and file parsing stay
//! outside, behind the [`Rasterizer`] and [`AnimationDecoder`] contracts.

pub mod animation;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod events;
pub mod observer;
pub mod player;
pub mod renderer;
pub mod scheduler;
pub mod state;
pub mod tween;

// Re-exports for hosts and controllers
pub use animation::{Animation, AnimationDecoder, AnimationLibrary, Marker, MetadataDecoder};
pub use config::{FrameBounds, Mode, PlaybackConfig};
pub use easing::Easing;
pub use engine::PlaybackEngine;
pub use error::{PlayerError, Result};
pub use events::PlayerEvent;
pub use observer::{ListenerFault, ObserverBus, ObserverSink, SubscriptionId};
pub use player::{Player, TickOutput};
pub use renderer::{NullRasterizer, Rasterizer, Viewport};
pub use scheduler::{FrameResult, PlaybackScheduler};
pub use state::{PlaybackState, Status};
pub use tween::{TweenDestination, TweenEngine, TweenStep, TweenTarget};
