//! The attendance recording engine: pure functions over [`AttendanceRecord`]s.
//!
//! Nothing in here touches storage; [`crate::service::AttendanceService`]
//! loads a partition, runs retention, resolves today's row, applies the
//! action and hands the result back to the [`crate::storage::Store`].
//!
//! [`AttendanceRecord`]: crate::model::attendance::AttendanceRecord

pub mod action;
pub mod audit;
pub mod clock;
pub mod geofence;
pub mod resolver;
pub mod retention;
