//! Per-path integrator state.

use bitflags::bitflags;

bitflags! {
    /// Path flags set by the integrator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PathFlags: u32 {
        /// A specular chain toward the light passed seeding and depth checks.
        const MNEE_VALID = 1 << 0;
        /// The specular chain produced a contribution.
        const MNEE_SUCCESS = 1 << 1;
    }
}

/// Bounce counters and flags of the path being traced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathState {
    /// Total bounces so far.
    pub bounce: u32,
    /// Diffuse bounces so far.
    pub diffuse_bounce: u32,
    /// Transmission bounces so far.
    pub transmission_bounce: u32,
    /// Path flags.
    pub flags: PathFlags,
}
