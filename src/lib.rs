#![forbid(unsafe_code)]

pub mod behaviors;
pub mod config;
pub mod dom;
pub mod ease;
pub mod engine;
pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod options;
pub mod random;
pub mod registry;
pub mod scroll;
pub mod services;
pub mod threshold;
pub mod timeline;
pub mod tween;
pub mod vectors;

pub use behaviors::{
    MaskReveal, ParallaxReveal, ProgressIndicator, ScaleGrow, ScrollAnimation, StackingCards,
    Target, TextExplosion, WordBurst,
};
pub use config::EngineConfig;
pub use dom::{Document, NodeId, PageSpec, SharedDocument, Style, StyleProps};
pub use ease::Ease;
pub use engine::Engine;
pub use error::{ScrollFxError, ScrollFxResult};
pub use handle::Disposable;
pub use lifecycle::LifecycleState;
pub use options::{OptionValue, Options};
pub use random::{RandomSource, SequenceRandom, SplitMix64};
pub use registry::{AnimationDescriptor, BoundInstance, Discriminant, Registry, lookup};
pub use scroll::{BoundaryEvent, ScrollTracker, SimulatedScroll};
pub use services::{Services, Simulation};
pub use timeline::{Phase, PhaseTimeline};
pub use tween::{ImmediateTweener, ManualTimers, Timers, TweenSpec, Tweener};
pub use vectors::{ExplosionVector, VectorParams, compute_vectors};
