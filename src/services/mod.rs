//! Services coordinating domain ports.

pub mod lifecycle_reconciler;
pub mod reconciler_daemon;
pub mod reconciler_supervisor;

pub use lifecycle_reconciler::{LifecycleReconciler, PassOutcome, PassReport};
pub use reconciler_daemon::{
    DaemonConfig, ReconcilerDaemon, ReconcilerEvent, ReconcilerHandle, ReconcilerStatus,
};
pub use reconciler_supervisor::ReconcilerSupervisor;
