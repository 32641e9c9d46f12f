// Zone configuration: role weights, stat selections, scalers and blend table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::layout::{Third, ZoneId};
use crate::squad::roles::Role;
use crate::stats::StatSelection;

/// Stats read from the team's own totals and from the opponent-faced totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideSelection {
    pub team: StatSelection,
    pub against: StatSelection,
}

/// Static definition of one pitch zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub label: String,
    /// Share of the zone each role contributes.
    pub positions: BTreeMap<Role, f64>,
    #[serde(default)]
    pub pros: SideSelection,
    #[serde(default)]
    pub cons: SideSelection,
}

pub type ZoneConfigMap = BTreeMap<ZoneId, ZoneConfig>;

/// Per zone, per stat label: multiplier applied before summing (default 1.0).
pub type ZoneScalers = BTreeMap<ZoneId, BTreeMap<String, f64>>;

// ---------------------------------------------------------------------------
// Blend and fallback settings
// ---------------------------------------------------------------------------

/// Component weights for one third of the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blend {
    pub team: f64,
    pub against: f64,
    pub players: f64,
}

impl Blend {
    pub const fn new(team: f64, against: f64, players: f64) -> Self {
        Blend {
            team,
            against,
            players,
        }
    }

    pub fn sum(&self) -> f64 {
        self.team + self.against + self.players
    }
}

/// One blend row per third of the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendTable {
    pub def: Blend,
    pub mid: Blend,
    pub att: Blend,
}

impl Default for BlendTable {
    fn default() -> Self {
        BlendTable {
            def: Blend::new(0.25, 0.50, 0.25),
            mid: Blend::new(0.35, 0.35, 0.30),
            att: Blend::new(0.45, 0.25, 0.30),
        }
    }
}

impl BlendTable {
    pub fn get(&self, third: Third) -> Blend {
        match third {
            Third::Def => self.def,
            Third::Mid => self.mid,
            Third::Att => self.att,
        }
    }
}

/// Side-specific roles fall back to the general role, and neighbouring
/// central midfield roles cover for each other.
pub fn default_position_fallbacks() -> BTreeMap<Role, Role> {
    BTreeMap::from([
        (Role::LCB, Role::CB),
        (Role::RCB, Role::CB),
        (Role::LWB, Role::LB),
        (Role::RWB, Role::RB),
        (Role::W, Role::AM),
        (Role::DM, Role::CM),
        (Role::CM, Role::DM),
        (Role::AM, Role::CM),
    ])
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    pub blend: BlendTable,
    /// Multiplier applied per fallback hop.
    pub fallback_penalty: f64,
    pub max_fallback_depth: usize,
    pub position_fallbacks: BTreeMap<Role, Role>,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        ZoneSettings {
            blend: BlendTable::default(),
            fallback_penalty: 0.8,
            max_fallback_depth: 10,
            position_fallbacks: default_position_fallbacks(),
        }
    }
}

impl ZoneSettings {
    pub fn blend_for(&self, third: Third) -> Blend {
        self.blend.get(third)
    }

    /// Weight of `role` within a zone's position map, walking the fallback
    /// chain when the role is not listed. Each hop multiplies by the
    /// penalty; a cycle or exhausted chain gives 0.
    pub fn position_weight(&self, role: Role, positions: &BTreeMap<Role, f64>) -> f64 {
        let mut current = role;
        let mut factor = 1.0;
        let mut visited = Vec::new();
        for _ in 0..=self.max_fallback_depth {
            if let Some(&w) = positions.get(&current) {
                return w * factor;
            }
            if visited.contains(&current) {
                break;
            }
            visited.push(current);
            match self.position_fallbacks.get(&current) {
                Some(&next) => {
                    current = next;
                    factor *= self.fallback_penalty;
                }
                None => break,
            }
        }
        0.0
    }
}

// ---------------------------------------------------------------------------
// Default zone table
// ---------------------------------------------------------------------------

type Group = (&'static str, &'static [&'static str]);

struct ZoneDef {
    zone: ZoneId,
    label: &'static str,
    positions: &'static [(Role, f64)],
    pros_team: &'static [Group],
    cons_team: &'static [Group],
    pros_against: &'static [Group],
    cons_against: &'static [Group],
}

const DEF_WIDE_PROS: &[Group] = &[
    ("defense", &["Tackles_Def 3rd", "Tackles_TklW", "Int"]),
    ("passing", &["Total_Cmp%", "PrgP"]),
];
const DEF_HALF_PROS: &[Group] = &[
    ("defense", &["Blocks_Blocks", "Int"]),
    ("passing", &["PrgP"]),
    ("possession", &["Touches_Def 3rd"]),
];
const DEF_CONS: &[Group] = &[("defense", &["Err"]), ("misc", &["Performance_OG"])];
const DEF_WIDE_AGAINST_CONS: &[Group] = &[
    ("passing_types", &["Pass Types_Crs"]),
    ("passing", &["PPA"]),
];
const DEF_HALF_AGAINST_CONS: &[Group] = &[
    ("possession", &["Touches_Att 3rd"]),
    ("passing", &["PPA"]),
];
const DEF_AGAINST_PROS: &[Group] = &[("misc", &["Performance_Off"])];

const MID_WIDE_PROS: &[Group] = &[
    ("passing", &["PrgP", "KP"]),
    ("possession", &["Carries_PrgC"]),
    ("goal_shot_creation", &["SCA_SCA"]),
];
const MID_HALF_PROS: &[Group] = &[
    ("passing", &["PrgP"]),
    ("possession", &["Touches_Mid 3rd"]),
    ("defense", &["Int"]),
];
const MID_CONS: &[Group] = &[("possession", &["Carries_Dis", "Carries_Mis"])];
const MID_AGAINST_PROS: &[Group] = &[("possession", &["Carries_Dis"])];
const MID_AGAINST_CONS: &[Group] = &[
    ("passing", &["PrgP"]),
    ("possession", &["Carries_PrgC"]),
];

const ATT_WIDE_PROS: &[Group] = &[
    ("shooting", &["Expected_xG"]),
    ("goal_shot_creation", &["SCA_SCA"]),
    ("passing", &["PPA"]),
];
const ATT_HALF_PROS: &[Group] = &[
    ("shooting", &["Expected_npxG"]),
    ("goal_shot_creation", &["GCA_GCA"]),
    ("passing", &["PrgP"]),
];
const ATT_CONS: &[Group] = &[("misc", &["Performance_Off"])];
const ATT_AGAINST_PROS: &[Group] = &[("defense", &["Err"])];
const ATT_AGAINST_CONS: &[Group] = &[
    ("defense", &["Blocks_Sh"]),
    ("keeper", &["Performance_Saves"]),
];

const DEFAULT_ZONES: &[ZoneDef] = &[
    ZoneDef {
        zone: ZoneId::DefLeftWide,
        label: "Defensive Left Wing",
        positions: &[(Role::LB, 0.6), (Role::LWB, 0.3), (Role::FB, 0.3), (Role::LW, 0.1)],
        pros_team: DEF_WIDE_PROS,
        cons_team: DEF_CONS,
        pros_against: DEF_AGAINST_PROS,
        cons_against: DEF_WIDE_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::DefLeftHalf,
        label: "Defensive Left Channel",
        positions: &[(Role::LB, 0.4), (Role::CB, 0.3), (Role::DM, 0.3)],
        pros_team: DEF_HALF_PROS,
        cons_team: DEF_CONS,
        pros_against: DEF_AGAINST_PROS,
        cons_against: DEF_HALF_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::DefCentral,
        label: "Defensive Central Area",
        positions: &[(Role::CB, 0.5), (Role::DM, 0.3), (Role::GK, 0.2)],
        pros_team: &[
            ("defense", &["Tkl+Int"]),
            ("keeper", &["Performance_Save%"]),
            ("keeper_adv", &["Expected_PSxG+/-"]),
        ],
        cons_team: &[("defense", &["Err"]), ("keeper", &["Performance_GA"])],
        pros_against: DEF_AGAINST_PROS,
        cons_against: &[
            ("shooting", &["Standard_SoT", "Expected_xG"]),
            ("possession", &["Touches_Att Pen"]),
        ],
    },
    ZoneDef {
        zone: ZoneId::DefRightHalf,
        label: "Defensive Right Channel",
        positions: &[(Role::RB, 0.4), (Role::CB, 0.3), (Role::DM, 0.3)],
        pros_team: DEF_HALF_PROS,
        cons_team: DEF_CONS,
        pros_against: DEF_AGAINST_PROS,
        cons_against: DEF_HALF_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::DefRightWide,
        label: "Defensive Right Wing",
        positions: &[(Role::RB, 0.6), (Role::RWB, 0.3), (Role::FB, 0.3), (Role::RW, 0.1)],
        pros_team: DEF_WIDE_PROS,
        cons_team: DEF_CONS,
        pros_against: DEF_AGAINST_PROS,
        cons_against: DEF_WIDE_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::MidLeftWide,
        label: "Middle Third Left Wing",
        positions: &[(Role::LW, 0.7), (Role::LWB, 0.3), (Role::W, 0.2)],
        pros_team: MID_WIDE_PROS,
        cons_team: MID_CONS,
        pros_against: MID_AGAINST_PROS,
        cons_against: MID_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::MidLeftHalf,
        label: "Middle Third Left Channel",
        positions: &[(Role::CM, 0.5), (Role::DM, 0.3), (Role::LB, 0.2)],
        pros_team: MID_HALF_PROS,
        cons_team: MID_CONS,
        pros_against: MID_AGAINST_PROS,
        cons_against: MID_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::MidCentral,
        label: "Middle Third Central Area",
        positions: &[(Role::CM, 0.4), (Role::DM, 0.4), (Role::AM, 0.2)],
        pros_team: &[
            ("passing", &["PrgP", "KP"]),
            ("possession", &["Touches_Mid 3rd"]),
            ("defense", &["Int"]),
        ],
        cons_team: MID_CONS,
        pros_against: MID_AGAINST_PROS,
        cons_against: MID_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::MidRightHalf,
        label: "Middle Third Right Channel",
        positions: &[(Role::CM, 0.5), (Role::DM, 0.3), (Role::RB, 0.2)],
        pros_team: MID_HALF_PROS,
        cons_team: MID_CONS,
        pros_against: MID_AGAINST_PROS,
        cons_against: MID_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::MidRightWide,
        label: "Middle Third Right Wing",
        positions: &[(Role::RW, 0.7), (Role::RWB, 0.3), (Role::W, 0.2)],
        pros_team: MID_WIDE_PROS,
        cons_team: MID_CONS,
        pros_against: MID_AGAINST_PROS,
        cons_against: MID_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::AttLeftWide,
        label: "Attacking Left Wing",
        positions: &[(Role::LW, 0.6), (Role::AM, 0.2), (Role::CF, 0.2)],
        pros_team: ATT_WIDE_PROS,
        cons_team: ATT_CONS,
        pros_against: ATT_AGAINST_PROS,
        cons_against: ATT_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::AttLeftHalf,
        label: "Attacking Left Channel",
        positions: &[(Role::AM, 0.4), (Role::LW, 0.3), (Role::CF, 0.3)],
        pros_team: ATT_HALF_PROS,
        cons_team: ATT_CONS,
        pros_against: ATT_AGAINST_PROS,
        cons_against: ATT_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::AttCentral,
        label: "Attacking Central Area",
        positions: &[(Role::AM, 0.3), (Role::CF, 0.7)],
        pros_team: &[
            ("shooting", &["Expected_xG", "Expected_npxG"]),
            ("goal_shot_creation", &["SCA_SCA", "GCA_GCA"]),
            ("passing", &["PPA", "PrgP"]),
        ],
        cons_team: ATT_CONS,
        pros_against: ATT_AGAINST_PROS,
        cons_against: ATT_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::AttRightHalf,
        label: "Attacking Right Channel",
        positions: &[(Role::AM, 0.4), (Role::RW, 0.3), (Role::CF, 0.3)],
        pros_team: ATT_HALF_PROS,
        cons_team: ATT_CONS,
        pros_against: ATT_AGAINST_PROS,
        cons_against: ATT_AGAINST_CONS,
    },
    ZoneDef {
        zone: ZoneId::AttRightWide,
        label: "Attacking Right Wing",
        positions: &[(Role::RW, 0.6), (Role::AM, 0.2), (Role::CF, 0.2)],
        pros_team: ATT_WIDE_PROS,
        cons_team: ATT_CONS,
        pros_against: ATT_AGAINST_PROS,
        cons_against: ATT_AGAINST_CONS,
    },
];

fn groups(entries: &[Group]) -> StatSelection {
    entries
        .iter()
        .map(|(group, labels)| {
            (
                (*group).to_string(),
                labels.iter().map(|l| (*l).to_string()).collect(),
            )
        })
        .collect()
}

/// The built-in configuration for all 15 zones.
pub fn default_zone_config() -> ZoneConfigMap {
    DEFAULT_ZONES
        .iter()
        .map(|def| {
            let config = ZoneConfig {
                label: def.label.to_string(),
                positions: def.positions.iter().copied().collect(),
                pros: SideSelection {
                    team: groups(def.pros_team),
                    against: groups(def.pros_against),
                },
                cons: SideSelection {
                    team: groups(def.cons_team),
                    against: groups(def.cons_against),
                },
            };
            (def.zone, config)
        })
        .collect()
}
