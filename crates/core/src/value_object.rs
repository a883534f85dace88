//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. In this
/// system the validated expense fields (title, description, amount, rejection
/// reason) are value objects: once constructed they are known to satisfy their
/// bounds, so holders never re-check them.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
