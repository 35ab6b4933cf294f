//! Players, roles and allegiances

use crate::core::PlayerId;
use crate::{GameError, Result};
use serde::{Deserialize, Serialize};

/// Secret role dealt to each player at game start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Safety,
    Accelerationist,
    Agi,
}

impl Role {
    /// Team a role belongs to
    pub fn allegiance(self) -> Allegiance {
        match self {
            Role::Safety => Allegiance::Safety,
            Role::Accelerationist | Role::Agi => Allegiance::Acceleration,
        }
    }

    pub fn is_acceleration(self) -> bool {
        self.allegiance() == Allegiance::Acceleration
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Safety => write!(f, "Safety"),
            Role::Accelerationist => write!(f, "Accelerationist"),
            Role::Agi => write!(f, "AGI"),
        }
    }
}

/// Coarse team membership, the only thing allegiance-viewing powers reveal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allegiance {
    Safety,
    Acceleration,
}

impl std::fmt::Display for Allegiance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allegiance::Safety => write!(f, "Safety"),
            Allegiance::Acceleration => write!(f, "Acceleration"),
        }
    }
}

/// A seat at the table
///
/// Role and allegiance are private so the two can never disagree; use
/// [`Player::new`] to build one and the accessors to read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    role: Role,
    allegiance: Allegiance,
    pub alive: bool,
    /// Engineer term limit: the most recent publishing engineer sits out one nomination
    pub was_last_engineer: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, role: Role) -> Self {
        Player {
            id: id.into(),
            role,
            allegiance: role.allegiance(),
            alive: true,
            was_last_engineer: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn allegiance(&self) -> Allegiance {
        self.allegiance
    }

    /// Whether the stored allegiance still matches the role
    pub fn allegiance_matches_role(&self) -> bool {
        self.allegiance == self.role.allegiance()
    }

    /// Engineers must be alive and must not have published last round
    pub fn is_eligible_engineer(&self) -> bool {
        self.alive && !self.was_last_engineer
    }

    /// Replace the true role with the public default (used by per-player views)
    pub(crate) fn conceal(&mut self) {
        self.role = Role::Safety;
        self.allegiance = Allegiance::Safety;
    }
}

/// Number of each role dealt for a given table size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDistribution {
    pub safety: usize,
    pub accelerationist: usize,
    pub agi: usize,
}

impl RoleDistribution {
    pub fn total(&self) -> usize {
        self.safety + self.accelerationist + self.agi
    }

    /// Flatten into a role list (unshuffled)
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Vec::with_capacity(self.total());
        roles.extend(std::iter::repeat(Role::Safety).take(self.safety));
        roles.extend(std::iter::repeat(Role::Accelerationist).take(self.accelerationist));
        roles.extend(std::iter::repeat(Role::Agi).take(self.agi));
        roles
    }
}

/// Role table for 5-10 players: always one AGI, Accelerationists scale 1-3
pub fn get_role_distribution(player_count: usize) -> Result<RoleDistribution> {
    let (safety, accelerationist) = match player_count {
        5 => (3, 1),
        6 => (4, 1),
        7 => (4, 2),
        8 => (5, 2),
        9 => (5, 3),
        10 => (6, 3),
        n => {
            return Err(GameError::Config(format!(
                "Invalid player count: {n} (must be 5-10)"
            )))
        }
    };
    Ok(RoleDistribution {
        safety,
        accelerationist,
        agi: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allegiance_follows_role() {
        assert_eq!(Player::new("a", Role::Safety).allegiance(), Allegiance::Safety);
        assert_eq!(
            Player::new("b", Role::Accelerationist).allegiance(),
            Allegiance::Acceleration
        );
        assert_eq!(Player::new("c", Role::Agi).allegiance(), Allegiance::Acceleration);
    }

    #[test]
    fn test_role_distribution_table() {
        for n in 5..=10 {
            let dist = get_role_distribution(n).unwrap();
            assert_eq!(dist.agi, 1, "exactly one AGI for {n} players");
            assert_eq!(dist.total(), n);
            assert_eq!(dist.roles().len(), n);
        }
        assert_eq!(get_role_distribution(5).unwrap().accelerationist, 1);
        assert_eq!(get_role_distribution(7).unwrap().accelerationist, 2);
        assert_eq!(get_role_distribution(10).unwrap().accelerationist, 3);
    }

    #[test]
    fn test_role_distribution_rejects_bad_counts() {
        assert!(matches!(get_role_distribution(4), Err(GameError::Config(_))));
        assert!(matches!(get_role_distribution(11), Err(GameError::Config(_))));
    }

    #[test]
    fn test_conceal() {
        let mut p = Player::new("x", Role::Agi);
        p.conceal();
        assert_eq!(p.role(), Role::Safety);
        assert_eq!(p.allegiance(), Allegiance::Safety);
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::Agi).unwrap(), "\"agi\"");
        assert_eq!(
            serde_json::to_string(&Role::Accelerationist).unwrap(),
            "\"accelerationist\""
        );
    }
}
