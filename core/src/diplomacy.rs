//! Alliance wars and peace treaties.

use crate::{
    config::GameConfig,
    types::{AllianceId, Credits, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarStatus {
    Active,
    Concluded,
}

impl WarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active    => "active",
            Self::Concluded => "concluded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active"    => Some(Self::Active),
            "concluded" => Some(Self::Concluded),
            _           => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct War {
    pub id:              i64,
    pub aggressor_id:    AllianceId,
    pub defender_id:     AllianceId,
    pub goal_score:      i64,
    pub aggressor_score: i64,
    pub defender_score:  i64,
    pub status:          WarStatus,
    pub winner_id:       Option<AllianceId>,
    pub declared_at:     Timestamp,
    pub ended_at:        Option<Timestamp>,
}

impl War {
    /// Credit `points` to `alliance_id`'s side. Returns true when this
    /// award reaches the goal and concludes the war.
    pub fn award(&mut self, alliance_id: AllianceId, points: i64, now: Timestamp) -> bool {
        if self.status != WarStatus::Active || points <= 0 {
            return false;
        }
        let score = if alliance_id == self.aggressor_id {
            &mut self.aggressor_score
        } else if alliance_id == self.defender_id {
            &mut self.defender_score
        } else {
            return false;
        };
        *score += points;
        if *score >= self.goal_score {
            self.status = WarStatus::Concluded;
            self.winner_id = Some(alliance_id);
            self.ended_at = Some(now);
            return true;
        }
        false
    }

    /// End without a winner (peace was signed).
    pub fn end_in_peace(&mut self, now: Timestamp) {
        self.status = WarStatus::Concluded;
        self.winner_id = None;
        self.ended_at = Some(now);
    }
}

/// Points a battle victory is worth to the winner's side.
pub fn war_points(credits_stolen: Credits, config: &GameConfig) -> i64 {
    let per_point = config.diplomacy.war_credits_per_point.max(1);
    config.diplomacy.war_points_per_victory + credits_stolen.max(0) / per_point
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatyStatus {
    Proposed,
    Active,
    Cancelled,
}

impl TreatyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed  => "proposed",
            Self::Active    => "active",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proposed"  => Some(Self::Proposed),
            "active"    => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            _           => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treaty {
    pub id:          i64,
    pub proposer_id: AllianceId,
    pub target_id:   AllianceId,
    pub status:      TreatyStatus,
    pub proposed_at: Timestamp,
    pub expires_at:  Option<Timestamp>,
}

impl Treaty {
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == TreatyStatus::Active && self.expires_at.is_some_and(|t| t > now)
    }

    pub fn involves(&self, alliance_id: AllianceId) -> bool {
        self.proposer_id == alliance_id || self.target_id == alliance_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn war(goal: i64) -> War {
        War {
            id: 1,
            aggressor_id: 10,
            defender_id: 20,
            goal_score: goal,
            aggressor_score: 0,
            defender_score: 0,
            status: WarStatus::Active,
            winner_id: None,
            declared_at: 0,
            ended_at: None,
        }
    }

    #[test]
    fn reaching_goal_concludes_with_winner() {
        let mut w = war(25);
        assert!(!w.award(20, 10, 5));
        assert!(!w.award(20, 10, 6));
        assert!(w.award(20, 10, 7));
        assert_eq!(w.winner_id, Some(20));
        assert_eq!(w.ended_at, Some(7));
        assert!(!w.award(10, 100, 8));
        assert_eq!(w.aggressor_score, 0);
    }

    #[test]
    fn plunder_adds_war_points() {
        let config = GameConfig::default();
        assert_eq!(war_points(0, &config), 10);
        assert_eq!(war_points(250_000, &config), 12);
    }

    #[test]
    fn treaty_expires() {
        let t = Treaty {
            id: 1,
            proposer_id: 1,
            target_id: 2,
            status: TreatyStatus::Active,
            proposed_at: 0,
            expires_at: Some(100),
        };
        assert!(t.is_active_at(99));
        assert!(!t.is_active_at(100));
    }
}
