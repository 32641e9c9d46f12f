// CSV export of scored players.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use zonecast_core::squad::player::PlayerRecord;

#[derive(Debug, Serialize)]
struct PlayerRow<'a> {
    name: &'a str,
    team: &'a str,
    league: &'a str,
    season: &'a str,
    role: &'static str,
    base_role: &'static str,
    minutes: f64,
    performance: Option<f64>,
    rating: Option<f64>,
    m_raw: Option<f64>,
    m: Option<f64>,
}

impl<'a> From<&'a PlayerRecord> for PlayerRow<'a> {
    fn from(p: &'a PlayerRecord) -> Self {
        PlayerRow {
            name: &p.name,
            team: &p.team,
            league: &p.league,
            season: &p.season,
            role: p.role_tag(),
            base_role: p.base_role().map_or("NA", |b| b.as_str()),
            minutes: p.minutes(),
            performance: p.ranking.as_ref().map(|r| r.performance),
            rating: p.rating,
            m_raw: p.mental.as_ref().map(|m| m.m_raw),
            m: p.mental.as_ref().map(|m| m.m),
        }
    }
}

/// Write one CSV row per player (with header). Returns the row count.
pub fn write_players<W: Write>(writer: W, players: &[PlayerRecord]) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for player in players {
        wtr.serialize(PlayerRow::from(player))?;
    }
    wtr.flush()?;
    Ok(players.len())
}

pub fn export_players(path: &Path, players: &[PlayerRecord]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_players(file, players).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonecast_core::squad::player::{MentalScore, Ranking};
    use zonecast_core::squad::roles::Role;

    #[test]
    fn rows_carry_scores_and_blanks() {
        let mut scored = PlayerRecord::new("Ana Ruiz", "Rovers", "L1", "2024", "DF")
            .with_role(Role::RCB)
            .with_stat("standard", "Playing Time_Min", 1620.0);
        scored.ranking = Some(Ranking {
            performance: 0.75,
            breakdown: Default::default(),
        });
        scored.rating = Some(81.5);
        scored.mental = Some(MentalScore {
            m_raw: -1.25,
            m: 62.5,
            breakdown: Default::default(),
        });
        let unscored = PlayerRecord::new("Mystery", "Rovers", "L1", "2024", "DF,FW");

        let mut buf = Vec::new();
        let rows = write_players(&mut buf, &[scored, unscored]).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "name,team,league,season,role,base_role,minutes,performance,rating,m_raw,m"
        );
        assert_eq!(lines[1], "Ana Ruiz,Rovers,L1,2024,RCB,CB,1620.0,0.75,81.5,-1.25,62.5");
        assert_eq!(lines[2], "Mystery,Rovers,L1,2024,NA,NA,0.0,,,,");
    }

    #[test]
    fn export_writes_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("players.csv");
        let player = PlayerRecord::new("A", "T", "L", "S", "GK").with_role(Role::GK);
        assert_eq!(export_players(&path, &[player]).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("A,T,L,S,GK,GK,"));
    }
}
