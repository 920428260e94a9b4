//! Build/activate/toggle lifecycle shared by facilities and projects.
//!
//!   building ──(timer)──▶ inactive ◀──(toggle, one turn)──▶ active
//!       │
//!    capture / suspend
//!       ▼
//!   suspended ──(resume)──▶ building
//!
//! RULE: A toggle is never instantaneous. `request_toggle` records a
//! pending change; the cleanup phase of the turn it was requested in
//! resolves it, so the old status holds for that entire turn.

use crate::{
    error::{SimError, SimResult},
    state::Stockpile,
    types::{NationId, Resource},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Building,
    Active,
    Inactive,
    Suspended,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Building => "building",
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Suspended => "suspended",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToggle {
    pub target: Status,
    pub turns: u32,
}

/// What a cleanup tick did to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Completed,
    Toggled(Status),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub status: Status,
    pub owner: NationId,
    pub turns_remaining: u32,
    pub hp: f64,
    pub max_hp: f64,
    pub pending: Option<PendingToggle>,
}

impl Lifecycle {
    pub fn building(owner: impl Into<NationId>, turns: u32, max_hp: f64) -> Self {
        Self {
            status: Status::Building,
            owner: owner.into(),
            turns_remaining: turns,
            hp: max_hp,
            max_hp,
            pending: None,
        }
    }

    /// A finished, running record. Used for starting positions.
    pub fn active(owner: impl Into<NationId>, max_hp: f64) -> Self {
        Self {
            status: Status::Active,
            turns_remaining: 0,
            ..Self::building(owner, 0, max_hp)
        }
    }

    pub fn is_operational(&self) -> bool {
        self.status == Status::Active && self.hp > 0.0
    }

    pub fn is_owned_by(&self, nation: &str) -> bool {
        self.owner == nation
    }

    fn reject(&self, id: &str, action: &'static str) -> SimError {
        SimError::InvalidTransition {
            id: id.to_string(),
            status: self.status.to_string(),
            action,
        }
    }

    pub fn request_toggle(&mut self, id: &str, target: Status) -> SimResult<()> {
        if !matches!(target, Status::Active | Status::Inactive) {
            return Err(self.reject(id, "toggle"));
        }
        if !matches!(self.status, Status::Active | Status::Inactive) {
            return Err(self.reject(id, "toggle"));
        }
        if target == Status::Active && self.hp <= 0.0 {
            return Err(self.reject(id, "activate a destroyed"));
        }
        self.pending = if target == self.status {
            None
        } else {
            Some(PendingToggle { target, turns: 1 })
        };
        Ok(())
    }

    pub fn suspend(&mut self, id: &str) -> SimResult<()> {
        if self.status != Status::Building {
            return Err(self.reject(id, "suspend"));
        }
        self.status = Status::Suspended;
        Ok(())
    }

    pub fn resume(&mut self, id: &str) -> SimResult<()> {
        if self.status != Status::Suspended {
            return Err(self.reject(id, "resume"));
        }
        self.status = Status::Building;
        Ok(())
    }

    /// Zero hit points. A running or idle record is forced inactive;
    /// construction sites keep their status.
    pub fn pillage(&mut self) {
        self.hp = 0.0;
        self.pending = None;
        if self.status == Status::Active {
            self.status = Status::Inactive;
        }
    }

    pub fn repair(&mut self, id: &str, stockpile: &mut Stockpile, production_cost: f64) -> SimResult<()> {
        if self.hp >= self.max_hp {
            return Err(self.reject(id, "repair an undamaged"));
        }
        stockpile.try_spend(Resource::Production, production_cost)?;
        self.hp = self.max_hp;
        Ok(())
    }

    pub fn capture(&mut self, new_owner: impl Into<NationId>) {
        self.owner = new_owner.into();
        self.pending = None;
        if self.status == Status::Building {
            self.status = Status::Suspended;
        }
    }

    /// Cleanup tick. Suspended records do not advance.
    pub fn advance(&mut self) -> Option<Transition> {
        match self.status {
            Status::Building => {
                self.turns_remaining = self.turns_remaining.saturating_sub(1);
                if self.turns_remaining == 0 {
                    self.status = Status::Inactive;
                    return Some(Transition::Completed);
                }
                None
            }
            Status::Suspended => None,
            Status::Active | Status::Inactive => {
                let pending = self.pending.as_mut()?;
                pending.turns = pending.turns.saturating_sub(1);
                if pending.turns > 0 {
                    return None;
                }
                let target = pending.target;
                self.pending = None;
                self.status = target;
                Some(Transition::Toggled(target))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_completes_inactive_then_toggles_a_turn_later() {
        let mut life = Lifecycle::building("n", 2, 50.0);
        assert_eq!(life.advance(), None);
        assert_eq!(life.advance(), Some(Transition::Completed));
        assert_eq!(life.status, Status::Inactive);

        life.request_toggle("x", Status::Active).unwrap();
        assert_eq!(life.status, Status::Inactive);
        assert_eq!(life.advance(), Some(Transition::Toggled(Status::Active)));
        assert!(life.is_operational());
    }

    #[test]
    fn suspended_build_does_not_count_down() {
        let mut life = Lifecycle::building("n", 3, 50.0);
        life.capture("m");
        assert_eq!(life.status, Status::Suspended);
        for _ in 0..5 {
            assert_eq!(life.advance(), None);
        }
        assert_eq!(life.turns_remaining, 3);
        life.resume("x").unwrap();
        assert_eq!(life.status, Status::Building);
    }

    #[test]
    fn pillaged_record_cannot_be_activated_until_repaired() {
        let mut life = Lifecycle::active("n", 40.0);
        life.pillage();
        assert_eq!(life.status, Status::Inactive);
        assert!(life.request_toggle("x", Status::Active).is_err());

        let mut stock = Stockpile::default();
        stock.set(Resource::Production, 5.0);
        assert!(life.repair("x", &mut stock, 10.0).is_err());
        assert_eq!(life.hp, 0.0);
        stock.set(Resource::Production, 10.0);
        life.repair("x", &mut stock, 10.0).unwrap();
        assert_eq!(life.hp, 40.0);
        assert!(life.request_toggle("x", Status::Active).is_ok());
    }
}
