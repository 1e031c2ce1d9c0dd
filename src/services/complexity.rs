use crate::models::order::ComplexityModifiers;

pub const COMPLEX_THRESHOLD: u8 = 7;
pub const MEDIUM_THRESHOLD: u8 = 4;

/// Complexity bucket used for optimizer grouping and the morning-only
/// rule for demanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityTier {
    Complex,
    Medium,
    Simple,
}

pub fn tier(score: u8) -> ComplexityTier {
    if score >= COMPLEX_THRESHOLD {
        ComplexityTier::Complex
    } else if score >= MEDIUM_THRESHOLD {
        ComplexityTier::Medium
    } else {
        ComplexityTier::Simple
    }
}

/// Scores how demanding a framing order is on a 0-10 scale.
///
/// Base score comes from the duration tier, each fabrication modifier adds
/// its weight, and the result is scaled by the priority multiplier before
/// clamping. Deterministic and total: every input yields a score in [0, 10].
pub fn score(estimated_hours: f64, modifiers: &ComplexityModifiers, priority_multiplier: i64) -> u8 {
    let mut score: i64 = if estimated_hours <= 2.0 {
        1
    } else if estimated_hours <= 6.0 {
        3
    } else {
        5
    };

    if modifiers.custom_molding {
        score += 2;
    }
    if modifiers.multiple_openings {
        score += 1;
    }
    if modifiers.special_glass {
        score += 1;
    }
    if modifiers.oversized {
        score += 2;
    }
    if modifiers.artwork_prep {
        score += 1;
    }

    score *= priority_multiplier.max(1);

    score.clamp(0, 10) as u8
}
