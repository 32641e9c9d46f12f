// Pitch layout: 15 zones as thirds (defence, midfield, attack) x lanes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Horizontal band of the pitch, from the team's own goal outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Third {
    Def,
    Mid,
    Att,
}

impl Third {
    pub const ALL: [Third; 3] = [Third::Def, Third::Mid, Third::Att];

    /// The opponent's third that faces this one.
    pub fn facing(&self) -> Third {
        match self {
            Third::Def => Third::Att,
            Third::Mid => Third::Mid,
            Third::Att => Third::Def,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Third::Def => "def",
            Third::Mid => "mid",
            Third::Att => "att",
        }
    }
}

/// Vertical channel, seen from the team's own goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lane {
    LeftWide,
    LeftHalf,
    Central,
    RightHalf,
    RightWide,
}

impl Lane {
    pub const ALL: [Lane; 5] = [
        Lane::LeftWide,
        Lane::LeftHalf,
        Lane::Central,
        Lane::RightHalf,
        Lane::RightWide,
    ];

    /// The same channel seen from the other end of the pitch.
    pub fn mirrored(&self) -> Lane {
        match self {
            Lane::LeftWide => Lane::RightWide,
            Lane::LeftHalf => Lane::RightHalf,
            Lane::Central => Lane::Central,
            Lane::RightHalf => Lane::LeftHalf,
            Lane::RightWide => Lane::LeftWide,
        }
    }
}

/// One of the 15 pitch zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoneId {
    DefLeftWide,
    DefLeftHalf,
    DefCentral,
    DefRightHalf,
    DefRightWide,
    MidLeftWide,
    MidLeftHalf,
    MidCentral,
    MidRightHalf,
    MidRightWide,
    AttLeftWide,
    AttLeftHalf,
    AttCentral,
    AttRightHalf,
    AttRightWide,
}

impl ZoneId {
    pub const ALL: [ZoneId; 15] = [
        ZoneId::DefLeftWide,
        ZoneId::DefLeftHalf,
        ZoneId::DefCentral,
        ZoneId::DefRightHalf,
        ZoneId::DefRightWide,
        ZoneId::MidLeftWide,
        ZoneId::MidLeftHalf,
        ZoneId::MidCentral,
        ZoneId::MidRightHalf,
        ZoneId::MidRightWide,
        ZoneId::AttLeftWide,
        ZoneId::AttLeftHalf,
        ZoneId::AttCentral,
        ZoneId::AttRightHalf,
        ZoneId::AttRightWide,
    ];

    pub fn new(third: Third, lane: Lane) -> ZoneId {
        ZoneId::ALL[third as usize * 5 + lane as usize]
    }

    fn index(&self) -> usize {
        *self as usize
    }

    pub fn third(&self) -> Third {
        Third::ALL[self.index() / 5]
    }

    pub fn lane(&self) -> Lane {
        Lane::ALL[self.index() % 5]
    }

    /// The opponent zone this zone contests: our attack meets their defence
    /// on the mirrored lane, midfields meet each other, our defence meets
    /// their attack.
    pub fn opponent(&self) -> ZoneId {
        ZoneId::new(self.third().facing(), self.lane().mirrored())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneId::DefLeftWide => "defLeftWide",
            ZoneId::DefLeftHalf => "defLeftHalf",
            ZoneId::DefCentral => "defCentral",
            ZoneId::DefRightHalf => "defRightHalf",
            ZoneId::DefRightWide => "defRightWide",
            ZoneId::MidLeftWide => "midLeftWide",
            ZoneId::MidLeftHalf => "midLeftHalf",
            ZoneId::MidCentral => "midCentral",
            ZoneId::MidRightHalf => "midRightHalf",
            ZoneId::MidRightWide => "midRightWide",
            ZoneId::AttLeftWide => "attLeftWide",
            ZoneId::AttLeftHalf => "attLeftHalf",
            ZoneId::AttCentral => "attCentral",
            ZoneId::AttRightHalf => "attRightHalf",
            ZoneId::AttRightWide => "attRightWide",
        }
    }

    pub fn from_name(s: &str) -> Option<ZoneId> {
        ZoneId::ALL.into_iter().find(|z| z.as_str() == s)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
