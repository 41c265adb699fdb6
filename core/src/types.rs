//! Shared primitive types used across the entire pipeline.

/// A patient identifier. Compared as an exact string in every join.
pub type PatientId = String;

/// An ordinal score in `[1, score_bins]`.
pub type Score = u32;
