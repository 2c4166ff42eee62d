use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::probability::ProbabilityTable;

/// How long an untouched breakable stays on the field.
pub const DEFAULT_BREAKABLE_LIFETIME: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakableTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

pub const SPAWN_TABLE: ProbabilityTable<'static, BreakableTier> = ProbabilityTable::new(&[
    (BreakableTier::Common, 0.70),
    (BreakableTier::Rare, 0.20),
    (BreakableTier::Epic, 0.07),
    (BreakableTier::Legendary, 0.03),
]);

impl BreakableTier {
    pub fn label(self) -> &'static str {
        match self {
            BreakableTier::Common => "Zwykły",
            BreakableTier::Rare => "Rzadki",
            BreakableTier::Epic => "Epicki",
            BreakableTier::Legendary => "Legendarny",
        }
    }

    pub fn value(self) -> u64 {
        match self {
            BreakableTier::Common => 1,
            BreakableTier::Rare => 5,
            BreakableTier::Epic => 20,
            BreakableTier::Legendary => 100,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            BreakableTier::Common => "#8bc34a",
            BreakableTier::Rare => "#2196f3",
            BreakableTier::Epic => "#9c27b0",
            BreakableTier::Legendary => "#ff9800",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakableId(u64);

impl fmt::Display for BreakableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Breakable {
    pub id: BreakableId,
    pub tier: BreakableTier,
    pub value: u64,
    pub spawned_at: Instant,
    pub expires_at: Instant,
}

impl Breakable {
    pub fn label(&self) -> &'static str {
        self.tier.label()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// The set of breakables currently on screen. Removal is the only way out,
/// which is what makes destruction happen at most once per entity.
#[derive(Debug)]
pub struct BreakableField {
    live: BTreeMap<BreakableId, Breakable>,
    next_id: u64,
    lifetime: Duration,
}

impl BreakableField {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            live: BTreeMap::new(),
            next_id: 1,
            lifetime,
        }
    }

    pub fn spawn(&mut self, tier: BreakableTier, now: Instant) -> Breakable {
        let id = BreakableId(self.next_id);
        self.next_id += 1;

        let breakable = Breakable {
            id,
            tier,
            value: tier.value(),
            spawned_at: now,
            expires_at: now + self.lifetime,
        };
        self.live.insert(id, breakable.clone());
        breakable
    }

    pub fn spawn_random<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) -> Breakable {
        let tier = *SPAWN_TABLE.sample(rng);
        self.spawn(tier, now)
    }

    /// Takes the breakable off the field; `None` if it was already destroyed
    /// or expired.
    pub fn remove(&mut self, id: BreakableId) -> Option<Breakable> {
        self.live.remove(&id)
    }

    /// Silently drops everything past its lifetime.
    pub fn expire(&mut self, now: Instant) -> Vec<Breakable> {
        let expired: Vec<BreakableId> = self
            .live
            .values()
            .filter(|breakable| breakable.is_expired(now))
            .map(|breakable| breakable.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.live.remove(&id))
            .collect()
    }

    /// Any live breakable, no targeting.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<BreakableId> {
        if self.live.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.live.len());
        self.live.keys().nth(index).copied()
    }

    pub fn get(&self, id: BreakableId) -> Option<&Breakable> {
        self.live.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakable> {
        self.live.values()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl Default for BreakableField {
    fn default() -> Self {
        Self::new(DEFAULT_BREAKABLE_LIFETIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_spawn_weights_cover_whole_unit_interval() {
        assert!((SPAWN_TABLE.total_weight() - 1.0).abs() < 1e-9);
        assert_eq!(*SPAWN_TABLE.resolve(0.0), BreakableTier::Common);
        assert_eq!(*SPAWN_TABLE.resolve(0.7), BreakableTier::Common);
        assert_eq!(*SPAWN_TABLE.resolve(0.75), BreakableTier::Rare);
        assert_eq!(*SPAWN_TABLE.resolve(0.95), BreakableTier::Epic);
        assert_eq!(*SPAWN_TABLE.resolve(0.98), BreakableTier::Legendary);
        // Float rounding leaves the sum a hair under 1.0; fallback covers it.
        assert_eq!(*SPAWN_TABLE.resolve(0.999_999_999_999_999_9), BreakableTier::Legendary);
    }

    #[test]
    fn test_spawned_breakable_carries_tier_value() {
        let mut field = BreakableField::default();
        let now = Instant::now();
        let legendary = field.spawn(BreakableTier::Legendary, now);
        assert_eq!(legendary.value, 100);
        assert_eq!(legendary.label(), "Legendarny");
        assert_eq!(legendary.expires_at, now + DEFAULT_BREAKABLE_LIFETIME);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut field = BreakableField::default();
        let now = Instant::now();
        let first = field.spawn(BreakableTier::Common, now);
        field.remove(first.id);
        let second = field.spawn(BreakableTier::Common, now);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_remove_happens_once() {
        let mut field = BreakableField::default();
        let breakable = field.spawn(BreakableTier::Rare, Instant::now());
        assert!(field.remove(breakable.id).is_some());
        assert!(field.remove(breakable.id).is_none());
    }

    #[test]
    fn test_expire_drops_only_stale_breakables() {
        let mut field = BreakableField::new(Duration::from_secs(30));
        let start = Instant::now();
        let old = field.spawn(BreakableTier::Common, start);
        let fresh = field.spawn(BreakableTier::Epic, start + Duration::from_secs(20));

        assert!(field.expire(start + Duration::from_secs(29)).is_empty());

        let expired = field.expire(start + Duration::from_secs(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, old.id);
        assert!(field.get(fresh.id).is_some());
        assert!(field.get(old.id).is_none());
    }

    #[test]
    fn test_pick_random_on_empty_field() {
        let field = BreakableField::default();
        let mut rng = StepRng::new(0, 1);
        assert!(field.pick_random(&mut rng).is_none());
    }

    #[test]
    fn test_pick_random_returns_live_id() {
        let mut field = BreakableField::default();
        let now = Instant::now();
        let ids: Vec<_> = (0..4)
            .map(|_| field.spawn(BreakableTier::Common, now).id)
            .collect();
        let mut rng = StepRng::new(0, 0x1234_5678_9abc);
        for _ in 0..10 {
            let picked = field.pick_random(&mut rng).unwrap();
            assert!(ids.contains(&picked));
        }
    }
}
