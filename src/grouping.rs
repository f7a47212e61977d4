use std::collections::{HashMap, HashSet};

/// Bucket label for clicks that carry no campaign name.
pub const NO_CAMPAIGN: &str = "(no campaign)";
/// Bucket label for any other missing dimension value.
pub const NONE: &str = "(none)";

/// Percentage of `numerator` over `denominator`, rounded half away from zero.
/// A zero (or negative) denominator yields 0.
pub fn rate(numerator: i64, denominator: i64) -> i64 {
    if denominator <= 0 {
        return 0;
    }
    let rounded = (numerator.abs() * 200 + denominator) / (denominator * 2);
    if numerator < 0 {
        -rounded
    } else {
        rounded
    }
}

/// Maps a missing or empty value to `sentinel`. Other values are kept as-is,
/// so `"Launch"` and `"Launch "` stay distinct keys.
pub fn key_or_sentinel(value: Option<&str>, sentinel: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => sentinel.to_string(),
    }
}

/// String-keyed map that iterates in first-insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn entry_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.to_string(), default()));
                let position = self.entries.len() - 1;
                self.index.insert(key.to_string(), position);
                position
            }
        };
        &mut self.entries[position].1
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let position = self.index.remove(key)?;
        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Default> OrderedMap<V> {
    pub fn entry_or_default(&mut self, key: &str) -> &mut V {
        self.entry_or_insert_with(key, V::default)
    }
}

/// Per-key counts in first-seen order.
pub type Counts = OrderedMap<i64>;

/// Running totals for one group key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    pub total: i64,
    pub unique_users: HashSet<String>,
    pub per_sub_key: Counts,
}

impl GroupAccumulator {
    pub fn unique_count(&self) -> i64 {
        self.unique_users.len() as i64
    }

    pub fn top_sub_key(&self) -> Option<&str> {
        top_by_count(&self.per_sub_key)
    }
}

pub type Groups = OrderedMap<GroupAccumulator>;

/// Groups `records` by `key_of`, counting rows, distinct users and
/// per-sub-key hits. Groups keep first-occurrence order.
pub fn group_by<T, K, U, S>(records: &[T], key_of: K, user_of: U, sub_key_of: S) -> Groups
where
    K: Fn(&T) -> String,
    U: Fn(&T) -> Option<&str>,
    S: Fn(&T) -> Option<&str>,
{
    let mut groups = Groups::new();

    for record in records {
        let entry = groups.entry_or_default(&key_of(record));
        entry.total += 1;
        if let Some(user) = user_of(record) {
            entry.unique_users.insert(user.to_string());
        }
        if let Some(sub_key) = sub_key_of(record) {
            *entry.per_sub_key.entry_or_default(sub_key) += 1;
        }
    }

    groups
}

/// Key with the highest count. Ties go to the key seen first.
pub fn top_by_count(counts: &Counts) -> Option<&str> {
    let mut best: Option<(&str, i64)> = None;
    for (key, &count) in counts.iter() {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(key, _)| key)
}
