//! Name ledger, name tags and greetings
//!
//! Every body that dies leaves its username in a 50-slot ring. Newly spawned
//! free particles may borrow one of those names as a tag; when such a
//! particle later bonds to a living body it greets the newcomer with how long
//! ago its name was last seen.

use bloom_core::time::Millis;
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

pub const NAME_LEDGER_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub name: String,
    pub timestamp: Millis,
}

/// Ring of past session names; the oldest entry is overwritten when full.
#[derive(Debug, Clone)]
pub struct NameLedger {
    slots: Vec<Option<LedgerEntry>>,
    write_index: usize,
}

impl NameLedger {
    pub fn new() -> Self {
        Self::with_capacity(NAME_LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            write_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn record(&mut self, name: impl Into<String>, now: Millis) {
        self.slots[self.write_index] = Some(LedgerEntry {
            name: name.into(),
            timestamp: now,
        });
        self.write_index = (self.write_index + 1) % self.slots.len();
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.slots.iter().flatten()
    }

    /// First slot holding `name`, in slot order.
    pub fn find(&self, name: &str) -> Option<&LedgerEntry> {
        self.iter().find(|e| e.name == name)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.write_index = 0;
    }

    /// Try to hand a ledger name to a freshly spawned particle.
    ///
    /// The chance grows with the ledger: `min(1, chance_per_name * len)`.
    /// Names already worn by another particle are skipped; when none are left
    /// nothing is assigned.
    pub fn draw_tag<R: Rng + ?Sized>(
        &self,
        tags: &mut NameTags,
        chance_per_name: f32,
        rng: &mut R,
    ) -> Option<NameTag> {
        let available: Vec<&LedgerEntry> = self
            .iter()
            .filter(|e| !tags.is_active(&e.name))
            .collect();
        if available.is_empty() {
            return None;
        }

        let chance = (chance_per_name * self.len() as f32).min(1.0);
        if rng.gen::<f32>() >= chance {
            return None;
        }

        let entry = available.choose(rng)?;
        if !tags.reserve(&entry.name) {
            return None;
        }
        Some(NameTag {
            name: entry.name.clone(),
            since: entry.timestamp,
        })
    }
}

impl Default for NameLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// A ledger name worn by a particle.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTag {
    pub name: String,
    /// When the name's owner left.
    pub since: Millis,
}

/// Names currently worn by particles. A name is worn by at most one particle.
#[derive(Debug, Clone, Default)]
pub struct NameTags {
    active: HashSet<String>,
}

impl NameTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the name is already worn.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.active.contains(name) {
            return false;
        }
        self.active.insert(name.to_owned())
    }

    pub fn release(&mut self, name: &str) -> bool {
        self.active.remove(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

/// Whole minutes since `then`, never less than one.
pub fn minutes_ago(then: Millis, now: Millis) -> u64 {
    let minutes = ((now - then) / 60_000.0).ceil();
    if minutes < 1.0 {
        1
    } else {
        minutes as u64
    }
}

pub const USER_GREETINGS: [&str; 10] = [
    "Hey there!",
    "Hi!",
    "Great to see you!",
    "Yo!",
    "Welcome back!",
    "Hello!",
    "Nice to meet you!",
    "Howdy!",
    "Hey, buddy!",
    "Hi, friend!",
];

pub const NODE_GREETINGS: [&str; 10] = [
    "Hey, I'm still here!",
    "Long time no see!",
    "Been waiting here.",
    "Good to see you!",
    "Hello there!",
    "Glad you found me!",
    "Yo, I was chilling here!",
    "Nice, you came back!",
    "Hey, what's up?",
    "Hi, I've been around!",
];

/// Exchange between the current body and a tagged particle that just bonded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Greeting {
    pub name: String,
    pub minutes_ago: u64,
    pub user_line: String,
    pub node_line: String,
}

impl Greeting {
    pub fn compose<R: Rng + ?Sized>(name: &str, minutes_ago: u64, rng: &mut R) -> Self {
        let user = USER_GREETINGS.choose(rng).copied().unwrap_or("Hi!");
        let node = NODE_GREETINGS.choose(rng).copied().unwrap_or("Hello there!");
        Self {
            name: name.to_owned(),
            minutes_ago,
            user_line: user.to_owned(),
            node_line: format!("{node} I was here {minutes_ago} minute(s) ago."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechBubble {
    pub position: Vec2,
    pub text: String,
    pub expires_at: Millis,
}

/// Pending speech bubbles, dropped once expired.
#[derive(Debug, Clone, Default)]
pub struct SpeechBubbles {
    bubbles: Vec<SpeechBubble>,
}

impl SpeechBubbles {
    pub fn push(&mut self, position: Vec2, text: impl Into<String>, expires_at: Millis) {
        self.bubbles.push(SpeechBubble {
            position,
            text: text.into(),
            expires_at,
        });
    }

    pub fn prune(&mut self, now: Millis) {
        self.bubbles.retain(|b| b.expires_at > now);
    }

    pub fn clear(&mut self) {
        self.bubbles.clear();
    }

    pub fn as_slice(&self) -> &[SpeechBubble] {
        &self.bubbles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_core::math::sim_rng;

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut ledger = NameLedger::with_capacity(3);
        ledger.record("a", 1.0);
        ledger.record("b", 2.0);
        ledger.record("c", 3.0);
        ledger.record("d", 4.0);

        assert_eq!(ledger.len(), 3);
        assert!(ledger.find("a").is_none());
        assert_eq!(ledger.find("d").map(|e| e.timestamp), Some(4.0));
    }

    #[test]
    fn test_default_capacity() {
        let mut ledger = NameLedger::new();
        for i in 0..(NAME_LEDGER_CAPACITY + 10) {
            ledger.record(format!("name{i}"), i as f64);
        }
        assert_eq!(ledger.len(), NAME_LEDGER_CAPACITY);
        assert!(ledger.find("name9").is_none());
        assert!(ledger.find("name10").is_some());
    }

    #[test]
    fn test_draw_tag_skips_worn_names() {
        let mut rng = sim_rng(Some(1));
        let mut ledger = NameLedger::new();
        ledger.record("Solo", 0.0);
        let mut tags = NameTags::new();

        // Chance 1.0: the only name must be drawn.
        let tag = ledger.draw_tag(&mut tags, 1.0, &mut rng).unwrap();
        assert_eq!(tag.name, "Solo");
        assert!(tags.is_active("Solo"));

        // Worn: nothing left.
        assert!(ledger.draw_tag(&mut tags, 1.0, &mut rng).is_none());

        // Released: available again.
        assert!(tags.release("Solo"));
        assert!(ledger.draw_tag(&mut tags, 1.0, &mut rng).is_some());
    }

    #[test]
    fn test_draw_tag_from_empty_ledger() {
        let mut rng = sim_rng(Some(2));
        let ledger = NameLedger::new();
        let mut tags = NameTags::new();
        assert!(ledger.draw_tag(&mut tags, 1.0, &mut rng).is_none());
        assert!(tags.is_empty());
    }

    #[test]
    fn test_zero_chance_never_assigns() {
        let mut rng = sim_rng(Some(3));
        let mut ledger = NameLedger::new();
        ledger.record("Nobody", 0.0);
        let mut tags = NameTags::new();
        for _ in 0..100 {
            assert!(ledger.draw_tag(&mut tags, 0.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_reserve_is_exclusive() {
        let mut tags = NameTags::new();
        assert!(tags.reserve("x"));
        assert!(!tags.reserve("x"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_minutes_ago_rounds_up() {
        assert_eq!(minutes_ago(0.0, 0.0), 1);
        assert_eq!(minutes_ago(0.0, 30_000.0), 1);
        assert_eq!(minutes_ago(0.0, 60_001.0), 2);
        assert_eq!(minutes_ago(0.0, 180_000.0), 3);
    }

    #[test]
    fn test_greeting_lines() {
        let mut rng = sim_rng(Some(4));
        let greeting = Greeting::compose("NeonRider42", 3, &mut rng);
        assert!(USER_GREETINGS.contains(&greeting.user_line.as_str()));
        assert!(greeting.node_line.ends_with("I was here 3 minute(s) ago."));
    }

    #[test]
    fn test_bubbles_expire() {
        let mut bubbles = SpeechBubbles::default();
        bubbles.push(Vec2::ZERO, "hi", 4_000.0);
        bubbles.prune(3_999.0);
        assert_eq!(bubbles.as_slice().len(), 1);
        bubbles.prune(4_000.0);
        assert!(bubbles.as_slice().is_empty());
    }
}
