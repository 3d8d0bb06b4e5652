//! Optional Tracy instrumentation for the step pipeline

#[cfg(not(feature = "tracy"))]
#[macro_export]
macro_rules! profile_zone {
    ($name:expr) => {};
}

#[cfg(feature = "tracy")]
#[macro_export]
macro_rules! profile_zone {
    ($name:expr) => {
        let _tracy_zone = tracy_client::span!($name);
    };
}

/// Mark the end of one simulated step
#[cfg(feature = "tracy")]
pub fn mark_step() {
    tracy_client::frame_mark();
}

#[cfg(not(feature = "tracy"))]
pub fn mark_step() {
    // No-op
}
