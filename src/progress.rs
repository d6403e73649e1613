//! Weighted completion percentage over the phase tree.

use crate::models::{Phase, PhaseStatus};

/// Compute overall progress as an integer percent in `[0, 100]`.
///
/// Every top-level phase weighs 1. A phase with subphases spreads its
/// weight evenly across them and its own status is ignored, so a parent
/// completion event never double-counts work already credited to its
/// subphases. Pure function of the tree; callers recompute after every
/// status mutation instead of patching incrementally.
pub fn compute_progress(phases: &[Phase]) -> u8 {
    let mut total_weight = 0.0_f64;
    let mut completed_weight = 0.0_f64;

    for phase in phases {
        total_weight += 1.0;
        if phase.subphases.is_empty() {
            if phase.status == PhaseStatus::Completed {
                completed_weight += 1.0;
            }
        } else {
            let per_subphase = 1.0 / phase.subphases.len() as f64;
            for subphase in &phase.subphases {
                if subphase.status == PhaseStatus::Completed {
                    completed_weight += per_subphase;
                }
            }
        }
    }

    if total_weight == 0.0 {
        return 0;
    }

    (100.0 * completed_weight / total_weight).round() as u8
}
