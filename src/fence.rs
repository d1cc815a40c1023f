// src/fence.rs
use crate::types::QueryDescriptor;

/// Time fence applied to a backend query.
///
/// Each bound constrains one end of a record's observation interval:
/// `first_*` limit when the record was first seen, `last_*` when it was
/// last seen. `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fence {
    pub first_after: Option<i64>,
    pub first_before: Option<i64>,
    pub last_after: Option<i64>,
    pub last_before: Option<i64>,
}

impl Fence {
    /// Translate user bounds into a fence.
    ///
    /// With `complete` the record's whole interval must lie inside
    /// `[after, before]`; without it the interval only has to overlap.
    pub fn from_bounds(after: Option<i64>, before: Option<i64>, complete: bool) -> Self {
        let mut fence = Fence::default();

        if let Some(after) = after {
            if complete {
                // must begin at or after the fence start
                fence.first_after = Some(after);
            } else {
                // must end at or after the fence start
                fence.last_after = Some(after);
            }
        }

        if let Some(before) = before {
            if complete {
                // must end at or before the fence end
                fence.last_before = Some(before);
            } else {
                // must begin at or before the fence end
                fence.first_before = Some(before);
            }
        }

        fence
    }

    pub fn for_query(qd: &QueryDescriptor) -> Self {
        Self::from_bounds(qd.after, qd.before, qd.complete)
    }

    pub fn is_empty(&self) -> bool {
        *self == Fence::default()
    }
}
