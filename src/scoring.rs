use crate::room::Player;

pub const BASE_POINTS: u32 = 1;
pub const DOUBLE_MULTIPLIER: u32 = 2;
pub const STREAK_THRESHOLD: u32 = 3;
pub const STREAK_BONUS: u32 = 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub points: u32,
    pub streak_bonus: u32,
}

/// Settles the submitter's side of a resolved vote.
///
/// An armed double is spent either way; only an accepted word pays it out.
pub fn settle(submitter: &mut Player, accepted: bool) -> Award {
    let doubled = std::mem::take(&mut submitter.double_active);
    if !accepted {
        submitter.streak = 0;
        return Award::default();
    }

    let points = if doubled {
        BASE_POINTS * DOUBLE_MULTIPLIER
    } else {
        BASE_POINTS
    };
    submitter.score += points;
    submitter.streak += 1;

    let streak_bonus = if submitter.streak % STREAK_THRESHOLD == 0 {
        STREAK_BONUS
    } else {
        0
    };
    submitter.score += streak_bonus;

    Award {
        points,
        streak_bonus,
    }
}
