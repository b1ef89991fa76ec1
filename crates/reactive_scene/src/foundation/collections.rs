//! Handle types for the arenas used across the crate
//!
//! Every long-lived object that other objects refer to (nodes, effects,
//! frame callbacks, physics registrations) lives in a [`SlotMap`] and is
//! addressed by one of the typed keys below. Keys stay valid identities
//! after removal, so a stale key simply fails to resolve.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Scene graph node handle
    pub struct NodeId;

    /// Reactive effect handle
    pub struct EffectId;

    /// Frame clock subscription handle
    pub struct FrameKey;

    /// Physics bridge registration handle (mirrors, controllers, static colliders)
    pub struct BridgeKey;
}
