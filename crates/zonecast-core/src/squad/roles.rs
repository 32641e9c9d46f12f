// Tactical roles and resolution of free-text position descriptions into them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::player::PlayerRecord;

// ---------------------------------------------------------------------------
// Role enums
// ---------------------------------------------------------------------------

/// The canonical role set every scoring table is keyed by.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseRole {
    GK,
    CB,
    FB,
    DM,
    CM,
    AM,
    W,
    CF,
}

impl BaseRole {
    pub const ALL: [BaseRole; 8] = [
        BaseRole::GK,
        BaseRole::CB,
        BaseRole::FB,
        BaseRole::DM,
        BaseRole::CM,
        BaseRole::AM,
        BaseRole::W,
        BaseRole::CF,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseRole::GK => "GK",
            BaseRole::CB => "CB",
            BaseRole::FB => "FB",
            BaseRole::DM => "DM",
            BaseRole::CM => "CM",
            BaseRole::AM => "AM",
            BaseRole::W => "W",
            BaseRole::CF => "CF",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            BaseRole::GK => Role::GK,
            BaseRole::CB => Role::CB,
            BaseRole::FB => Role::FB,
            BaseRole::DM => Role::DM,
            BaseRole::CM => Role::CM,
            BaseRole::AM => Role::AM,
            BaseRole::W => Role::W,
            BaseRole::CF => Role::CF,
        }
    }

    /// Which line of a formation this role plays in.
    pub fn line(&self) -> Line {
        match self {
            BaseRole::GK => Line::Goalkeeper,
            BaseRole::CB | BaseRole::FB => Line::Defence,
            BaseRole::DM | BaseRole::CM | BaseRole::AM => Line::Midfield,
            BaseRole::W | BaseRole::CF => Line::Attack,
        }
    }
}

impl fmt::Display for BaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's tactical role, including side-specific variants.
///
/// Each role collapses onto exactly one [`BaseRole`] via [`Role::base`].
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    GK,
    LCB,
    CB,
    RCB,
    LB,
    FB,
    RB,
    LWB,
    RWB,
    DM,
    CM,
    AM,
    LW,
    W,
    RW,
    CF,
}

impl Role {
    pub const ALL: [Role; 16] = [
        Role::GK,
        Role::LCB,
        Role::CB,
        Role::RCB,
        Role::LB,
        Role::FB,
        Role::RB,
        Role::LWB,
        Role::RWB,
        Role::DM,
        Role::CM,
        Role::AM,
        Role::LW,
        Role::W,
        Role::RW,
        Role::CF,
    ];

    /// Parse a role tag. Accepts the common aliases `CDM`, `CAM`, `ST`,
    /// `LM`, `RM` and `WM`.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" => Some(Role::GK),
            "LCB" => Some(Role::LCB),
            "CB" => Some(Role::CB),
            "RCB" => Some(Role::RCB),
            "LB" => Some(Role::LB),
            "FB" => Some(Role::FB),
            "RB" => Some(Role::RB),
            "LWB" => Some(Role::LWB),
            "RWB" => Some(Role::RWB),
            "DM" | "CDM" => Some(Role::DM),
            "CM" => Some(Role::CM),
            "AM" | "CAM" => Some(Role::AM),
            "LW" | "LM" => Some(Role::LW),
            "W" | "WM" => Some(Role::W),
            "RW" | "RM" => Some(Role::RW),
            "CF" | "ST" => Some(Role::CF),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::GK => "GK",
            Role::LCB => "LCB",
            Role::CB => "CB",
            Role::RCB => "RCB",
            Role::LB => "LB",
            Role::FB => "FB",
            Role::RB => "RB",
            Role::LWB => "LWB",
            Role::RWB => "RWB",
            Role::DM => "DM",
            Role::CM => "CM",
            Role::AM => "AM",
            Role::LW => "LW",
            Role::W => "W",
            Role::RW => "RW",
            Role::CF => "CF",
        }
    }

    pub fn base(&self) -> BaseRole {
        match self {
            Role::GK => BaseRole::GK,
            Role::LCB | Role::CB | Role::RCB => BaseRole::CB,
            Role::LB | Role::FB | Role::RB | Role::LWB | Role::RWB => BaseRole::FB,
            Role::DM => BaseRole::DM,
            Role::CM => BaseRole::CM,
            Role::AM => BaseRole::AM,
            Role::LW | Role::W | Role::RW => BaseRole::W,
            Role::CF => BaseRole::CF,
        }
    }

    pub fn line(&self) -> Line {
        self.base().line()
    }

    /// Apply a side qualifier. Only full-backs, wingers and attacking
    /// midfielders take a side; other roles are returned unchanged.
    pub fn with_side(self, side: Side) -> Role {
        match (self, side) {
            (Role::FB, Side::Left) => Role::LB,
            (Role::FB, Side::Right) => Role::RB,
            (Role::W | Role::AM, Side::Left) => Role::LW,
            (Role::W | Role::AM, Side::Right) => Role::RW,
            (role, _) => role,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side qualifier carried in a position description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn from_qualifier(s: &str) -> Option<Self> {
        if s.starts_with("RIGHT") || s == "R" {
            Some(Side::Right)
        } else if s.starts_with("LEFT") || s == "L" {
            Some(Side::Left)
        } else {
            None
        }
    }
}

/// Formation line a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Line {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defence,
    #[serde(rename = "MID")]
    Midfield,
    #[serde(rename = "FWD")]
    Attack,
}

impl Line {
    pub fn as_str(&self) -> &'static str {
        match self {
            Line::Goalkeeper => "GK",
            Line::Defence => "DEF",
            Line::Midfield => "MID",
            Line::Attack => "FWD",
        }
    }
}

/// Coarse position group from the short position field (`"DF"`, `"MF,FW"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionGroup {
    GK,
    DF,
    MF,
    FW,
}

impl PositionGroup {
    /// Group from the first listed position of a position string. Detailed
    /// tags (`"RB"`, `"CM"`, `"ST"`) map onto their group.
    pub fn from_position(position: &str) -> Option<Self> {
        let first = position.split(',').next()?.trim().to_uppercase();
        match first.as_str() {
            "GK" => Some(PositionGroup::GK),
            "DF" => Some(PositionGroup::DF),
            "MF" => Some(PositionGroup::MF),
            "FW" | "ST" | "CF" | "LW" | "RW" => Some(PositionGroup::FW),
            p if p.ends_with('M') => Some(PositionGroup::MF),
            p if p.starts_with('C') || p.ends_with('B') => Some(PositionGroup::DF),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionGroup::GK => "GK",
            PositionGroup::DF => "DF",
            PositionGroup::MF => "MF",
            PositionGroup::FW => "FW",
        }
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde helper for `Option<Role>` fields: `None` is written as `"NA"`.
pub mod tag_or_na {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Role;

    pub const UNRESOLVED: &str = "NA";

    pub fn serialize<S: Serializer>(role: &Option<Role>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(role.map_or(UNRESOLVED, |r| r.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Role>, D::Error> {
        let tag: Option<String> = Option::deserialize(d)?;
        Ok(tag.as_deref().and_then(Role::from_tag))
    }
}

// ---------------------------------------------------------------------------
// Position text normalization
// ---------------------------------------------------------------------------

/// Normalize a position description for lookup: strip bullet and invisible
/// characters, tighten spaces around commas, replace remaining whitespace
/// runs with `-`, uppercase.
pub fn normalize_position_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{25AA}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' | '\u{00A0}'))
        .collect();
    stripped
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join("-"))
        .collect::<Vec<_>>()
        .join(",")
        .to_uppercase()
}

/// The canonical tokens recognised when splitting a description on `-`.
fn canonical_token(token: &str) -> Option<Role> {
    match token {
        "GK" => Some(Role::GK),
        "CB" => Some(Role::CB),
        "FB" => Some(Role::FB),
        "DM" => Some(Role::DM),
        "CM" => Some(Role::CM),
        "AM" => Some(Role::AM),
        "W" => Some(Role::W),
        "CF" => Some(Role::CF),
        _ => None,
    }
}

fn first_canonical(text: &str) -> Option<Role> {
    text.split(['-', ','])
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .find_map(canonical_token)
}

/// Last-resort mapping from the coarse position field.
fn coarse_fallback(position: &str) -> Option<Role> {
    match normalize_position_text(position).as_str() {
        "GK" => Some(Role::GK),
        "DF" => Some(Role::CB),
        "MF" => Some(Role::CM),
        "FW,MF" | "MF,FW" => Some(Role::AM),
        "FW" => Some(Role::CF),
        _ => None,
    }
}

/// Compound role descriptions as they appear inside parentheses.
const DEFAULT_COMPOUND_ROLES: &[(&str, Role)] = &[
    ("CB-FB,RIGHT", Role::RB),
    ("CB-FB,LEFT", Role::LB),
    ("AM", Role::AM),
    ("CM-DM-WM", Role::CM),
    ("CB", Role::CB),
    ("CB,LEFT", Role::LCB),
    ("CB,RIGHT", Role::RCB),
    ("DM,RIGHT", Role::RWB),
    ("DM,LEFT", Role::LWB),
    ("CM-DM", Role::DM),
    ("AM-CM-WM", Role::AM),
    ("FB", Role::FB),
    ("AM-CM-DM-WM", Role::CM),
    ("AM-WM", Role::W),
    ("CB-CM-DM", Role::CB),
    ("WM", Role::W),
    ("AM-CM", Role::AM),
    ("AM-CM-DM", Role::CM),
    ("AM,RIGHT", Role::RW),
    ("AM,LEFT", Role::LW),
    ("AM-WM,RIGHT", Role::RW),
    ("AM-WM,LEFT", Role::LW),
    ("WM-AM,RIGHT", Role::RW),
    ("WM-AM,LEFT", Role::LW),
    ("GK", Role::GK),
    ("FW-MF", Role::W),
    ("DF-MF", Role::DM),
    ("DM-FB-WM,RIGHT", Role::RWB),
    ("DM-FB-WM,LEFT", Role::LWB),
];

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves free-text position descriptions into roles.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    compound: HashMap<String, Role>,
}

impl Default for RoleResolver {
    fn default() -> Self {
        let compound = DEFAULT_COMPOUND_ROLES
            .iter()
            .map(|(key, role)| ((*key).to_string(), *role))
            .collect();
        RoleResolver { compound }
    }
}

impl RoleResolver {
    /// Default compound table extended (and overridden) by `overrides`.
    /// Override keys are normalized the same way position text is.
    pub fn with_overrides<'a, I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Role)>,
    {
        let mut resolver = RoleResolver::default();
        for (key, role) in overrides {
            resolver
                .compound
                .insert(normalize_position_text(key), *role);
        }
        resolver
    }

    /// Resolve a player's role, or `None` when nothing matches.
    ///
    /// Order: compound lookup of the parenthesised part (whole, then the
    /// part before the comma, refined by a LEFT/RIGHT qualifier), canonical
    /// tokens inside the parentheses, canonical tokens of the main text,
    /// then the coarse position field.
    pub fn resolve(&self, position_text: &str, position: &str) -> Option<Role> {
        let text = normalize_position_text(position_text);

        if let Some((main, inner)) = split_parenthesised(&text) {
            if let Some(role) = self.lookup_compound(inner) {
                return Some(role);
            }
            let role_part = inner.split(',').next().unwrap_or(inner);
            if let Some(role) = first_canonical(role_part) {
                return Some(role);
            }
            if let Some(role) = first_canonical(main) {
                return Some(role);
            }
        } else if let Some(role) = self.compound.get(text.as_str()) {
            return Some(*role);
        } else if let Some(role) = first_canonical(&text) {
            return Some(role);
        }

        coarse_fallback(position)
    }

    fn lookup_compound(&self, inner: &str) -> Option<Role> {
        if let Some(role) = self.compound.get(inner) {
            return Some(*role);
        }
        let (role_part, qualifier) = match inner.split_once(',') {
            Some((role_part, qualifier)) => (role_part, Some(qualifier)),
            None => (inner, None),
        };
        let role = *self.compound.get(role_part)?;
        match qualifier.and_then(Side::from_qualifier) {
            Some(side) => Some(role.with_side(side)),
            None => Some(role),
        }
    }

    /// Resolve every player's role in place. Returns how many players were
    /// left unresolved.
    pub fn resolve_players(&self, players: &mut [PlayerRecord]) -> usize {
        let mut unresolved = 0;
        for player in players.iter_mut() {
            player.role = self.resolve(&player.position_text, &player.position);
            match player.role {
                Some(role) => {
                    debug!(player = %player.name, role = %role, "resolved role");
                }
                None => {
                    unresolved += 1;
                    warn!(
                        player = %player.name,
                        position = %player.position,
                        position_text = %player.position_text,
                        "could not resolve role, player excluded from role-based scoring"
                    );
                }
            }
        }
        unresolved
    }
}

/// Split `MAIN-(INNER)` into `("MAIN-", "INNER")`.
fn split_parenthesised(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let close = open + text[open..].find(')')?;
    Some((&text[..open], &text[open + 1..close]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn resolve(text: &str, position: &str) -> Option<Role> {
        RoleResolver::default().resolve(text, position)
    }

    #[test]
    fn normalizes_bullets_commas_and_spaces() {
        assert_eq!(
            normalize_position_text("Position: DF (CB , right) \u{25AA} Footed: Left"),
            "POSITION:-DF-(CB,RIGHT)-FOOTED:-LEFT"
        );
        assert_eq!(normalize_position_text("DM\u{200B}, left"), "DM,LEFT");
        assert_eq!(normalize_position_text("wing\u{00A0}back"), "WINGBACK");
    }

    #[test]
    fn compound_lookup_of_full_parenthesised_text() {
        assert_eq!(resolve("Position: DF (CB-FB, right)", "DF"), Some(Role::RB));
        assert_eq!(resolve("Position: DF (CB, left)", "DF"), Some(Role::LCB));
        assert_eq!(resolve("Position: DF (CB, right)", "DF"), Some(Role::RCB));
        assert_eq!(resolve("Position: MF (DM, left)", "MF"), Some(Role::LWB));
        assert_eq!(resolve("Position: MF (CM-DM)", "MF"), Some(Role::DM));
    }

    #[test]
    fn side_qualifier_refines_fullbacks_and_wingers() {
        assert_eq!(resolve("Position: DF (FB, left)", "DF"), Some(Role::LB));
        assert_eq!(resolve("Position: DF (FB, right)", "DF"), Some(Role::RB));
        assert_eq!(resolve("Position: FW (WM, right)", "FW"), Some(Role::RW));
        assert_eq!(resolve("Position: MF (AM-CM-WM, left)", "MF"), Some(Role::LW));
    }

    #[test]
    fn side_qualifier_does_not_touch_central_roles() {
        assert_eq!(resolve("Position: MF (CM-DM, right)", "MF"), Some(Role::DM));
        assert_eq!(resolve("Position: GK (GK, left)", "GK"), Some(Role::GK));
    }

    #[test]
    fn canonical_tokens_inside_parentheses() {
        assert_eq!(resolve("Position: FW (CF-W)", "FW"), Some(Role::CF));
        assert_eq!(resolve("Position: MF (XX-CM)", "MF"), Some(Role::CM));
    }

    #[test]
    fn canonical_tokens_in_main_text() {
        assert_eq!(resolve("CB-DM", "DF"), Some(Role::CB));
        // the coarse field alone would give CM
        assert_eq!(resolve("Position: AM (unknown)", "MF"), Some(Role::AM));
    }

    #[test]
    fn compound_prefix_takes_the_side_qualifier() {
        // no full-key entry for these; the part before the comma matches
        assert_eq!(resolve("Position: MF (AM-CM-WM, right)", "MF"), Some(Role::RW));
        assert_eq!(resolve("Position: FW (WM, left)", "FW"), Some(Role::LW));
        assert_eq!(resolve("Position: MF (CM-DM, left)", "MF"), Some(Role::DM));
    }

    #[test]
    fn coarse_fallback_when_text_has_no_role() {
        assert_eq!(resolve("", "GK"), Some(Role::GK));
        assert_eq!(resolve("Position: DF", "DF"), Some(Role::CB));
        assert_eq!(resolve("", "MF"), Some(Role::CM));
        assert_eq!(resolve("", "FW,MF"), Some(Role::AM));
        assert_eq!(resolve("", "MF, FW"), Some(Role::AM));
        assert_eq!(resolve("", "FW"), Some(Role::CF));
        // text after the parentheses is never read
        assert_eq!(resolve("Striker (unknown) CF", "MF"), Some(Role::CM));
    }

    #[test]
    fn unresolvable_is_none() {
        assert_eq!(resolve("Footed: Right", "DF,FW"), None);
        assert_eq!(resolve("", ""), None);
    }

    #[test]
    fn every_role_collapses_to_a_canonical_base() {
        for role in Role::ALL {
            assert!(BaseRole::ALL.contains(&role.base()));
        }
        assert_eq!(Role::LCB.base(), BaseRole::CB);
        assert_eq!(Role::RWB.base(), BaseRole::FB);
        assert_eq!(Role::LW.base(), BaseRole::W);
    }

    #[test]
    fn overrides_extend_and_replace_compound_table() {
        let mut overrides = BTreeMap::new();
        overrides.insert("cb, right".to_string(), Role::CB);
        overrides.insert("SW".to_string(), Role::CB);
        let resolver = RoleResolver::with_overrides(&overrides);
        assert_eq!(resolver.resolve("Position: DF (CB, right)", "DF"), Some(Role::CB));
        assert_eq!(resolver.resolve("Position: DF (SW)", "DF"), Some(Role::CB));
    }

    #[test]
    fn role_tags_and_aliases() {
        for role in Role::ALL {
            assert_eq!(Role::from_tag(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_tag("cdm"), Some(Role::DM));
        assert_eq!(Role::from_tag("ST"), Some(Role::CF));
        assert_eq!(Role::from_tag("NA"), None);
    }

    #[test]
    fn position_group_from_first_listed_position() {
        assert_eq!(PositionGroup::from_position("MF,FW"), Some(PositionGroup::MF));
        assert_eq!(PositionGroup::from_position("gk"), Some(PositionGroup::GK));
        assert_eq!(PositionGroup::from_position("RWB"), Some(PositionGroup::DF));
        assert_eq!(PositionGroup::from_position("CDM"), Some(PositionGroup::MF));
        assert_eq!(PositionGroup::from_position("ST"), Some(PositionGroup::FW));
        assert_eq!(PositionGroup::from_position("XX"), None);
    }

    #[test]
    fn base_role_lines() {
        assert_eq!(BaseRole::GK.line(), Line::Goalkeeper);
        assert_eq!(BaseRole::FB.line(), Line::Defence);
        assert_eq!(BaseRole::AM.line(), Line::Midfield);
        assert_eq!(BaseRole::W.line(), Line::Attack);
    }
}
