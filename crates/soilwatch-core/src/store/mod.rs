// ── Reactive state store ──
//
// Single owner of everything presentation reads, with push-based change
// notification.

mod state_store;

pub use state_store::StateStore;
