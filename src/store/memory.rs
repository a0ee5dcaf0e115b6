//! In-memory backend
//!
//! Keyspace of expiring values behind a single command lock. Expired keys
//! read as absent immediately and are physically dropped on the next write
//! to the key or by the periodic sweeper ([`spawn_sweeper_task`]).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::command::{Command, KeyTtl, Reply};
use super::error::{StoreError, StoreResult};
use super::geo::{haversine_km, GeoHit, GeoPoint};
use super::scripts::ScriptContext;
use super::Backend;

// =============================================================================
// Keyspace
// =============================================================================

#[derive(Debug, Clone)]
enum Value {
    Blob(String),
    Set(HashSet<String>),
    Sorted(HashMap<String, f64>),
    List(VecDeque<String>),
    Geo(HashMap<String, GeoPoint>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Self::Blob(_) => false,
            Self::Set(s) => s.is_empty(),
            Self::Sorted(z) => z.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Geo(g) => g.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// Resolve list-style `start..=stop` indexes (negative counts from the end).
fn normalize_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[derive(Debug, Default)]
struct Keyspace {
    slots: HashMap<String, Slot>,
}

impl Keyspace {
    fn live(&self, key: &str, now: Instant) -> Option<&Slot> {
        self.slots.get(key).filter(|slot| !slot.is_expired(now))
    }

    fn evict_if_expired(&mut self, key: &str, now: Instant) {
        if self.slots.get(key).is_some_and(|slot| slot.is_expired(now)) {
            self.slots.remove(key);
        }
    }

    fn live_mut(&mut self, key: &str, now: Instant) -> Option<&mut Slot> {
        self.evict_if_expired(key, now);
        self.slots.get_mut(key)
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self.slots.get(key).is_some_and(|slot| slot.value.is_empty()) {
            self.slots.remove(key);
        }
    }

    fn ttl(&self, key: &str, now: Instant) -> KeyTtl {
        match self.live(key, now) {
            None => KeyTtl::Missing,
            Some(Slot {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Slot {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Remaining(at.saturating_duration_since(now)),
        }
    }

    // -------------------------------------------------------------------------
    // Typed read access
    // -------------------------------------------------------------------------

    fn blob(&self, key: &str, now: Instant) -> StoreResult<Option<&str>> {
        match self.live(key, now).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Value::Blob(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(wrong_type(key, "blob")),
        }
    }

    fn set(&self, key: &str, now: Instant) -> StoreResult<Option<&HashSet<String>>> {
        match self.live(key, now).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Value::Set(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key, "set")),
        }
    }

    fn sorted(&self, key: &str, now: Instant) -> StoreResult<Option<&HashMap<String, f64>>> {
        match self.live(key, now).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Value::Sorted(z)) => Ok(Some(z)),
            Some(_) => Err(wrong_type(key, "sorted set")),
        }
    }

    fn list(&self, key: &str, now: Instant) -> StoreResult<Option<&VecDeque<String>>> {
        match self.live(key, now).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Value::List(l)) => Ok(Some(l)),
            Some(_) => Err(wrong_type(key, "list")),
        }
    }

    fn geo(&self, key: &str, now: Instant) -> StoreResult<Option<&HashMap<String, GeoPoint>>> {
        match self.live(key, now).map(|slot| &slot.value) {
            None => Ok(None),
            Some(Value::Geo(g)) => Ok(Some(g)),
            Some(_) => Err(wrong_type(key, "geo index")),
        }
    }

    // -------------------------------------------------------------------------
    // Typed write access (creates the key when absent)
    // -------------------------------------------------------------------------

    fn entry(&mut self, key: &str, now: Instant, empty: fn() -> Value) -> &mut Value {
        self.evict_if_expired(key, now);
        &mut self
            .slots
            .entry(key.to_string())
            .or_insert_with(|| Slot::new(empty()))
            .value
    }

    fn set_mut(&mut self, key: &str, now: Instant) -> StoreResult<&mut HashSet<String>> {
        match self.entry(key, now, || Value::Set(HashSet::new())) {
            Value::Set(s) => Ok(s),
            _ => Err(wrong_type(key, "set")),
        }
    }

    fn sorted_mut(&mut self, key: &str, now: Instant) -> StoreResult<&mut HashMap<String, f64>> {
        match self.entry(key, now, || Value::Sorted(HashMap::new())) {
            Value::Sorted(z) => Ok(z),
            _ => Err(wrong_type(key, "sorted set")),
        }
    }

    fn list_mut(&mut self, key: &str, now: Instant) -> StoreResult<&mut VecDeque<String>> {
        match self.entry(key, now, || Value::List(VecDeque::new())) {
            Value::List(l) => Ok(l),
            _ => Err(wrong_type(key, "list")),
        }
    }

    fn geo_mut(&mut self, key: &str, now: Instant) -> StoreResult<&mut HashMap<String, GeoPoint>> {
        match self.entry(key, now, || Value::Geo(HashMap::new())) {
            Value::Geo(g) => Ok(g),
            _ => Err(wrong_type(key, "geo index")),
        }
    }

    // -------------------------------------------------------------------------
    // Command execution
    // -------------------------------------------------------------------------

    fn read(&self, command: &Command, now: Instant) -> StoreResult<Reply> {
        match command {
            Command::Get { key } => Ok(self
                .blob(key, now)?
                .map_or(Reply::Nil, |s| Reply::Bulk(s.to_string()))),

            Command::MGet { keys } => Ok(Reply::Array(
                keys.iter()
                    .map(|key| match self.live(key, now).map(|slot| &slot.value) {
                        Some(Value::Blob(s)) => Reply::Bulk(s.clone()),
                        _ => Reply::Nil,
                    })
                    .collect(),
            )),

            Command::Ttl { key } => Ok(Reply::Ttl(self.ttl(key, now))),

            Command::GeoSearch {
                key,
                center,
                radius_km,
                count,
            } => {
                let Some(points) = self.geo(key, now)? else {
                    return Ok(Reply::Geo(Vec::new()));
                };
                let mut hits: Vec<GeoHit> = points
                    .iter()
                    .filter_map(|(member, point)| {
                        let distance_km = haversine_km(*center, *point);
                        (distance_km <= *radius_km).then(|| GeoHit {
                            member: member.clone(),
                            distance_km,
                            point: *point,
                        })
                    })
                    .collect();
                hits.sort_by(|a, b| {
                    a.distance_km
                        .total_cmp(&b.distance_km)
                        .then_with(|| a.member.cmp(&b.member))
                });
                if let Some(count) = count {
                    hits.truncate(*count);
                }
                Ok(Reply::Geo(hits))
            }

            Command::SCard { key } => Ok(Reply::Int(
                self.set(key, now)?.map_or(0, |s| s.len() as i64),
            )),

            Command::SIsMember { key, member } => Ok(Reply::Int(i64::from(
                self.set(key, now)?.is_some_and(|s| s.contains(member)),
            ))),

            Command::SMembers { key } => {
                let mut members: Vec<String> = self
                    .set(key, now)?
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                members.sort();
                Ok(Reply::Array(members.into_iter().map(Reply::Bulk).collect()))
            }

            Command::ZRangeByScore {
                key,
                min,
                max,
                limit,
            } => {
                let mut entries: Vec<(&String, f64)> = self
                    .sorted(key, now)?
                    .map(|z| {
                        z.iter()
                            .filter(|(_, score)| **score >= *min && **score <= *max)
                            .map(|(member, score)| (member, *score))
                            .collect()
                    })
                    .unwrap_or_default();
                entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
                if let Some(limit) = limit {
                    entries.truncate(*limit);
                }
                Ok(Reply::Array(
                    entries
                        .into_iter()
                        .map(|(member, _)| Reply::Bulk(member.clone()))
                        .collect(),
                ))
            }

            Command::LRange { key, start, stop } => {
                let Some(list) = self.list(key, now)? else {
                    return Ok(Reply::Array(Vec::new()));
                };
                let items = match normalize_range(list.len(), *start, *stop) {
                    Some((from, to)) => list
                        .range(from..=to)
                        .cloned()
                        .map(Reply::Bulk)
                        .collect(),
                    None => Vec::new(),
                };
                Ok(Reply::Array(items))
            }

            other => Err(StoreError::NotAllowed(other.name())),
        }
    }

    fn apply(&mut self, command: &Command, now: Instant) -> StoreResult<Reply> {
        if !command.is_write() {
            return self.read(command, now);
        }

        match command {
            Command::Set { key, value, ttl } => {
                self.slots.insert(
                    key.clone(),
                    Slot {
                        value: Value::Blob(value.clone()),
                        expires_at: ttl.map(|ttl| now + ttl),
                    },
                );
                Ok(Reply::Ok)
            }

            Command::Expire { key, ttl } => match self.live_mut(key, now) {
                Some(slot) => {
                    slot.expires_at = Some(now + *ttl);
                    Ok(Reply::Int(1))
                }
                None => Ok(Reply::Int(0)),
            },

            Command::RequireExists { key } => {
                if self.live(key, now).is_some() {
                    Ok(Reply::Ok)
                } else {
                    Err(StoreError::KeyMissing(key.clone()))
                }
            }

            Command::GeoAdd { key, member, point } => {
                let added = self.geo_mut(key, now)?.insert(member.clone(), *point).is_none();
                Ok(Reply::Int(i64::from(added)))
            }

            Command::GeoRemove { key, members } => {
                let removed = if self.geo(key, now)?.is_some() {
                    let points = self.geo_mut(key, now)?;
                    members.iter().filter(|m| points.remove(*m).is_some()).count()
                } else {
                    0
                };
                self.drop_if_empty(key);
                Ok(Reply::Int(removed as i64))
            }

            Command::SAdd { key, member } => {
                let added = self.set_mut(key, now)?.insert(member.clone());
                Ok(Reply::Int(i64::from(added)))
            }

            Command::SRem { key, members } => {
                let removed = if self.set(key, now)?.is_some() {
                    let set = self.set_mut(key, now)?;
                    members.iter().filter(|m| set.remove(*m)).count()
                } else {
                    0
                };
                self.drop_if_empty(key);
                Ok(Reply::Int(removed as i64))
            }

            Command::ZAdd { key, member, score } => {
                let added = self.sorted_mut(key, now)?.insert(member.clone(), *score).is_none();
                Ok(Reply::Int(i64::from(added)))
            }

            Command::ZRem { key, members } => {
                let removed = if self.sorted(key, now)?.is_some() {
                    let sorted = self.sorted_mut(key, now)?;
                    members.iter().filter(|m| sorted.remove(*m).is_some()).count()
                } else {
                    0
                };
                self.drop_if_empty(key);
                Ok(Reply::Int(removed as i64))
            }

            Command::RPush { key, value } => {
                let list = self.list_mut(key, now)?;
                list.push_back(value.clone());
                Ok(Reply::Int(list.len() as i64))
            }

            Command::LTrim { key, start, stop } => {
                if self.list(key, now)?.is_none() {
                    return Ok(Reply::Ok);
                }
                let list = self.list_mut(key, now)?;
                match normalize_range(list.len(), *start, *stop) {
                    Some((from, to)) => {
                        list.truncate(to + 1);
                        list.drain(..from);
                    }
                    None => list.clear(),
                }
                self.drop_if_empty(key);
                Ok(Reply::Ok)
            }

            Command::Eval(script) => script.run(&mut ScriptFrame {
                keyspace: self,
                now,
            }),

            other => Err(StoreError::NotAllowed(other.name())),
        }
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now));
        before - self.slots.len()
    }
}

/// Keyspace view handed to a running script.
struct ScriptFrame<'a> {
    keyspace: &'a mut Keyspace,
    now: Instant,
}

impl ScriptContext for ScriptFrame<'_> {
    fn call(&mut self, command: Command) -> StoreResult<Reply> {
        if matches!(command, Command::Eval(_)) {
            return Err(StoreError::NotAllowed("EVAL inside a script"));
        }
        self.keyspace.apply(&command, self.now)
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Backend statistics
#[derive(Debug, Clone, Default)]
pub struct BackendStats {
    pub keys: usize,
    pub commands: u64,
    pub batches: u64,
    pub batches_failed: u64,
    pub expired_purged: u64,
}

/// In-process implementation of the keyed store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    keyspace: RwLock<Keyspace>,
    commands: AtomicU64,
    batches: AtomicU64,
    batches_failed: AtomicU64,
    expired_purged: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically drop every expired key.
    pub async fn purge_expired(&self) -> usize {
        let removed = self.keyspace.write().await.purge_expired(Instant::now());
        self.expired_purged.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            debug!(count = removed, "Purged expired keys");
        }
        removed
    }

    /// Get backend statistics
    pub async fn stats(&self) -> BackendStats {
        BackendStats {
            keys: self.keyspace.read().await.slots.len(),
            commands: self.commands.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            expired_purged: self.expired_purged.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn query(&self, command: Command) -> StoreResult<Reply> {
        self.commands.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        if command.is_write() {
            self.keyspace.write().await.apply(&command, now)
        } else {
            self.keyspace.read().await.read(&command, now)
        }
    }

    async fn exec(&self, batch: Vec<Command>) -> StoreResult<Vec<Reply>> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.commands.fetch_add(batch.len() as u64, Ordering::Relaxed);

        let now = Instant::now();
        let mut keyspace = self.keyspace.write().await;

        // Undo log: prior state of every key the batch can touch
        let touched: HashSet<&str> = batch.iter().flat_map(Command::keys).collect();
        let undo: Vec<(String, Option<Slot>)> = touched
            .into_iter()
            .map(|key| (key.to_string(), keyspace.slots.get(key).cloned()))
            .collect();

        let mut replies = Vec::with_capacity(batch.len());
        for command in &batch {
            match keyspace.apply(command, now) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    for (key, prior) in undo {
                        match prior {
                            Some(slot) => keyspace.slots.insert(key, slot),
                            None => keyspace.slots.remove(&key),
                        };
                    }
                    self.batches_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(command = command.name(), error = %e, "Batch rejected, nothing applied");
                    return Err(e);
                }
            }
        }

        Ok(replies)
    }
}

/// Spawn a background task to periodically drop expired keys
pub fn spawn_sweeper_task(backend: Arc<MemoryBackend>, interval: Duration) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Store sweeper started");

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = backend.purge_expired().await;
            let stats = backend.stats().await;
            debug!(removed = removed, keys = stats.keys, "Store sweep completed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::scripts::{Script, JOIN_MISSING};

    fn set(key: &str, value: &str, ttl: Option<Duration>) -> Command {
        Command::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }

    #[tokio::test]
    async fn test_get_set() {
        let store = MemoryBackend::new();
        assert_eq!(store.query(Command::Get { key: "k".into() }).await.unwrap(), Reply::Nil);

        store.query(set("k", "v", None)).await.unwrap();
        assert_eq!(
            store.query(Command::Get { key: "k".into() }).await.unwrap(),
            Reply::Bulk("v".into())
        );
        assert_eq!(
            store.query(Command::Ttl { key: "k".into() }).await.unwrap(),
            Reply::Ttl(KeyTtl::Persistent)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let store = MemoryBackend::new();
        store.query(set("k", "v", Some(Duration::from_secs(10)))).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(
            store.query(Command::Ttl { key: "k".into() }).await.unwrap(),
            Reply::Ttl(KeyTtl::Remaining(Duration::from_secs(6)))
        );

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.query(Command::Get { key: "k".into() }).await.unwrap(), Reply::Nil);
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.stats().await.keys, 0);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryBackend::new();
        store.query(set("k", "v", None)).await.unwrap();
        let err = store
            .query(Command::SAdd {
                key: "k".into(),
                member: "m".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WrongType { .. }));
    }

    #[tokio::test]
    async fn test_geo_search_orders_by_distance() {
        let store = MemoryBackend::new();
        for (member, lat) in [("far", 0.004), ("near", 0.001), ("out", 0.5)] {
            store
                .query(Command::GeoAdd {
                    key: "geo".into(),
                    member: member.into(),
                    point: GeoPoint::new(lat, 0.0),
                })
                .await
                .unwrap();
        }

        let reply = store
            .query(Command::GeoSearch {
                key: "geo".into(),
                center: GeoPoint::new(0.0, 0.0),
                radius_km: 1.0,
                count: None,
            })
            .await
            .unwrap();
        let Reply::Geo(hits) = reply else {
            panic!("expected geo reply");
        };
        let members: Vec<&str> = hits.iter().map(|h| h.member.as_str()).collect();
        assert_eq!(members, vec!["near", "far"]);
        assert!(hits[0].distance_km < hits[1].distance_km);
    }

    #[tokio::test]
    async fn test_list_trim_keeps_tail() {
        let store = MemoryBackend::new();
        for i in 0..5 {
            store
                .query(Command::RPush {
                    key: "l".into(),
                    value: i.to_string(),
                })
                .await
                .unwrap();
        }
        store
            .query(Command::LTrim {
                key: "l".into(),
                start: -3,
                stop: -1,
            })
            .await
            .unwrap();

        let reply = store
            .query(Command::LRange {
                key: "l".into(),
                start: 0,
                stop: -1,
            })
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Bulk("2".into()),
                Reply::Bulk("3".into()),
                Reply::Bulk("4".into())
            ])
        );
    }

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize_range(5, 0, -1), Some((0, 4)));
        assert_eq!(normalize_range(5, -2, -1), Some((3, 4)));
        assert_eq!(normalize_range(5, -100, -1), Some((0, 4)));
        assert_eq!(normalize_range(5, 3, 100), Some((3, 4)));
        assert_eq!(normalize_range(5, 4, 2), None);
        assert_eq!(normalize_range(0, 0, -1), None);
    }

    #[tokio::test]
    async fn test_sorted_range_by_score() {
        let store = MemoryBackend::new();
        for (member, score) in [("b", 20.0), ("a", 10.0), ("c", 30.0)] {
            store
                .query(Command::ZAdd {
                    key: "z".into(),
                    member: member.into(),
                    score,
                })
                .await
                .unwrap();
        }
        let reply = store
            .query(Command::ZRangeByScore {
                key: "z".into(),
                min: f64::NEG_INFINITY,
                max: 20.0,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::Array(vec![Reply::Bulk("a".into()), Reply::Bulk("b".into())])
        );
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryBackend::new();
        store.query(set("existing", "old", None)).await.unwrap();

        let batch = vec![
            set("existing", "new", None),
            Command::SAdd {
                key: "members".into(),
                member: "m".into(),
            },
            Command::RequireExists {
                key: "missing".into(),
            },
        ];
        let err = store.exec(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyMissing(_)));

        assert_eq!(
            store.query(Command::Get { key: "existing".into() }).await.unwrap(),
            Reply::Bulk("old".into())
        );
        assert_eq!(
            store.query(Command::SCard { key: "members".into() }).await.unwrap(),
            Reply::Int(0)
        );
        assert_eq!(store.stats().await.batches_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_script_keeps_ttl() {
        let store = MemoryBackend::new();
        store
            .query(set("intent:1", r#"{"id":"1","flags":0}"#, Some(Duration::from_secs(100))))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;

        let flag = Script::Flag {
            intent_key: "intent:1".into(),
            geo_key: "geo".into(),
            member: "1".into(),
            increment: 1,
            hide_at: 3,
        };
        assert_eq!(store.query(Command::Eval(flag)).await.unwrap(), Reply::Int(1));
        assert_eq!(
            store.query(Command::Ttl { key: "intent:1".into() }).await.unwrap(),
            Reply::Ttl(KeyTtl::Remaining(Duration::from_secs(60)))
        );
    }

    #[tokio::test]
    async fn test_flag_script_absent_is_zero() {
        let store = MemoryBackend::new();
        let flag = Script::Flag {
            intent_key: "intent:404".into(),
            geo_key: "geo".into(),
            member: "404".into(),
            increment: 1,
            hide_at: 3,
        };
        assert_eq!(store.query(Command::Eval(flag)).await.unwrap(), Reply::Int(0));
        assert_eq!(store.stats().await.keys, 0);
    }

    #[tokio::test]
    async fn test_flag_script_hides_at_threshold() {
        let store = MemoryBackend::new();
        store
            .query(set("intent:1", r#"{"flags":1}"#, None))
            .await
            .unwrap();
        store
            .query(Command::GeoAdd {
                key: "geo".into(),
                member: "1".into(),
                point: GeoPoint::new(0.0, 0.0),
            })
            .await
            .unwrap();

        let flag = Script::Flag {
            intent_key: "intent:1".into(),
            geo_key: "geo".into(),
            member: "1".into(),
            increment: 1,
            hide_at: 2,
        };
        assert_eq!(store.query(Command::Eval(flag)).await.unwrap(), Reply::Int(2));
        let reply = store
            .query(Command::GeoSearch {
                key: "geo".into(),
                center: GeoPoint::new(0.0, 0.0),
                radius_km: 1.0,
                count: None,
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Geo(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_script() {
        let store = MemoryBackend::new();
        let join = |member: &str| {
            Command::Eval(Script::Join {
                intent_key: "intent:1".into(),
                joins_key: "intent:1:joins".into(),
                member: member.into(),
            })
        };

        assert_eq!(store.query(join("a")).await.unwrap(), Reply::Int(JOIN_MISSING));

        store
            .query(set("intent:1", "{}", Some(Duration::from_secs(50))))
            .await
            .unwrap();
        assert_eq!(store.query(join("a")).await.unwrap(), Reply::Int(1));
        assert_eq!(store.query(join("a")).await.unwrap(), Reply::Int(0));
        assert_eq!(
            store.query(Command::Ttl { key: "intent:1:joins".into() }).await.unwrap(),
            Reply::Ttl(KeyTtl::Remaining(Duration::from_secs(50)))
        );
    }
}
