use crate::consts::{MAX_RAW_SCORE, SCORE_SCALE};
use crate::error::{GfResult, GroupForgeError};
use serde::{Deserialize, Serialize};

/// Stable identifier of a participant. Ids are dense indices into the
/// roster (participant `i` lives at position `i`).
pub type ParticipantId = u32;

/// Index of a group (`0..group_count`).
pub type GroupId = u16;

/// A score in fixed-point representation (raw score times SCORE_SCALE).
pub type ScaledScore = i64;

/// Exact cost accumulator. Wide enough that a whole roster's deviation
/// sum never saturates.
pub type CostPoints = i128;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub score: ScaledScore,
    pub advantaged: bool,
}

impl Participant {
    /// Builds a participant from a raw (floating-point) score. The
    /// advantage flag arrives pre-parsed from the ingestion layer.
    pub fn from_raw(id: ParticipantId, raw_score: f64, advantaged: bool) -> GfResult<Self> {
        if !raw_score.is_finite() || raw_score.abs() > MAX_RAW_SCORE {
            return Err(GroupForgeError::Input(format!(
                "participant {id}: score {raw_score} is not a usable finite value"
            )));
        }
        Ok(Self {
            id,
            score: (raw_score * SCORE_SCALE as f64).round() as ScaledScore,
            advantaged,
        })
    }

    pub fn raw_score(&self) -> f64 {
        self.score as f64 / SCORE_SCALE as f64
    }
}

/// Validated, immutable participant list with cached aggregates.
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
    grand_total: ScaledScore,
    advantaged_count: usize,
}

impl Roster {
    pub fn new(participants: Vec<Participant>) -> GfResult<Self> {
        if participants.is_empty() {
            return Err(GroupForgeError::Input(
                "participant list is empty".to_string(),
            ));
        }
        for (i, p) in participants.iter().enumerate() {
            if p.id as usize != i {
                return Err(GroupForgeError::Input(format!(
                    "participant id {} found at position {}; ids must be dense indices",
                    p.id, i
                )));
            }
        }

        let grand_total = participants.iter().map(|p| p.score).sum();
        let advantaged_count = participants.iter().filter(|p| p.advantaged).count();

        Ok(Self {
            participants,
            grand_total,
            advantaged_count,
        })
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    #[inline]
    pub fn get(&self, id: ParticipantId) -> &Participant {
        &self.participants[id as usize]
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn grand_total(&self) -> ScaledScore {
        self.grand_total
    }

    pub fn advantaged_count(&self) -> usize {
        self.advantaged_count
    }

    /// Grand mean in raw score units.
    pub fn mean_score(&self) -> f64 {
        self.grand_total as f64 / (self.len() as f64 * SCORE_SCALE as f64)
    }
}
