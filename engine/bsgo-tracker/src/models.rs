use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Level ranges (inclusive) used for the distribution chart
pub const LEVEL_RANGES: [(u32, u32); 7] =
    [(0, 15), (16, 25), (26, 45), (46, 80), (81, 139), (140, 200), (201, 255)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Colonial,
    Cylon,
    Other,
}

impl Faction {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Colonial" => Faction::Colonial,
            "Cylon" => Faction::Cylon,
            _ => Faction::Other,
        }
    }
}

/// One online player row from the stats page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub faction: Faction,
    pub player_id: String,
    pub name: String,
    pub level: u32,
}

/// Stats fetched for one destination in one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub players: Vec<PlayerRecord>,
}

/// Player counts for one level range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelBucket {
    pub low: u32,
    pub high: u32,
    pub colonial: usize,
    pub cylon: usize,
}

impl LevelBucket {
    pub fn label(&self) -> String {
        format!("{}-{}", self.low, self.high)
    }
}

impl StatsSnapshot {
    pub fn new(players: Vec<PlayerRecord>) -> Self {
        Self { fetched_at: Utc::now(), players }
    }

    pub fn faction_count(&self, faction: Faction) -> usize {
        self.players.iter().filter(|p| p.faction == faction).count()
    }

    pub fn colonial_count(&self) -> usize {
        self.faction_count(Faction::Colonial)
    }

    pub fn cylon_count(&self) -> usize {
        self.faction_count(Faction::Cylon)
    }

    pub fn total_count(&self) -> usize {
        self.players.len()
    }

    /// Colonial/Cylon counts per entry of [`LEVEL_RANGES`]
    pub fn level_distribution(&self) -> Vec<LevelBucket> {
        LEVEL_RANGES
            .iter()
            .map(|&(low, high)| {
                let in_range = |faction: Faction| {
                    self.players
                        .iter()
                        .filter(|p| p.faction == faction && (low..=high).contains(&p.level))
                        .count()
                };
                LevelBucket { low, high, colonial: in_range(Faction::Colonial), cylon: in_range(Faction::Cylon) }
            })
            .collect()
    }

    /// The sample recorded in faction history for this snapshot
    pub fn faction_sample(&self) -> FactionSample {
        FactionSample {
            timestamp: self.fetched_at,
            colonial: self.colonial_count() as u32,
            cylon: self.cylon_count() as u32,
        }
    }
}

/// Online players per faction at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSample {
    pub timestamp: DateTime<Utc>,
    pub colonial: u32,
    pub cylon: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(faction: Faction, level: u32) -> PlayerRecord {
        PlayerRecord { faction, player_id: "1".to_string(), name: "Starbuck".to_string(), level }
    }

    #[test]
    fn test_faction_counts() {
        let snapshot = StatsSnapshot::new(vec![
            player(Faction::Colonial, 10),
            player(Faction::Colonial, 90),
            player(Faction::Cylon, 200),
            player(Faction::Other, 5),
        ]);

        assert_eq!(snapshot.colonial_count(), 2);
        assert_eq!(snapshot.cylon_count(), 1);
        assert_eq!(snapshot.total_count(), 4);

        let sample = snapshot.faction_sample();
        assert_eq!((sample.colonial, sample.cylon), (2, 1));
    }

    #[test]
    fn test_level_distribution_bounds_are_inclusive() {
        let snapshot = StatsSnapshot::new(vec![
            player(Faction::Colonial, 15),
            player(Faction::Colonial, 16),
            player(Faction::Cylon, 255),
            player(Faction::Cylon, 300),
        ]);

        let buckets = snapshot.level_distribution();
        assert_eq!(buckets.len(), LEVEL_RANGES.len());
        assert_eq!(buckets[0].label(), "0-15");
        assert_eq!(buckets[0].colonial, 1);
        assert_eq!(buckets[1].colonial, 1);
        assert_eq!(buckets[6].cylon, 1);
    }

    #[test]
    fn test_faction_from_label() {
        assert_eq!(Faction::from_label("Colonial"), Faction::Colonial);
        assert_eq!(Faction::from_label(" Cylon "), Faction::Cylon);
        assert_eq!(Faction::from_label("Pirate"), Faction::Other);
    }
}
