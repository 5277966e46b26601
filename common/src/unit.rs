//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing the moment something stops being valid.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing the moment something starts being valid.
#[derive(Clone, Copy, Debug)]
pub struct Activation;
