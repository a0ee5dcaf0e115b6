//! Store commands and replies

use std::time::Duration;

use super::error::{StoreError, StoreResult};
use super::geo::{GeoHit, GeoPoint};
use super::scripts::Script;

/// A single store command.
#[derive(Debug, Clone)]
pub enum Command {
    // Blobs
    Get { key: String },
    MGet { keys: Vec<String> },
    Set { key: String, value: String, ttl: Option<Duration> },
    Ttl { key: String },
    Expire { key: String, ttl: Duration },
    /// Batch guard: fails the whole batch when the key is absent.
    RequireExists { key: String },

    // Geo index
    GeoAdd { key: String, member: String, point: GeoPoint },
    GeoSearch { key: String, center: GeoPoint, radius_km: f64, count: Option<usize> },
    GeoRemove { key: String, members: Vec<String> },

    // Unordered sets
    SAdd { key: String, member: String },
    SRem { key: String, members: Vec<String> },
    SCard { key: String },
    SIsMember { key: String, member: String },
    SMembers { key: String },

    // Sorted sets
    ZAdd { key: String, member: String, score: f64 },
    ZRangeByScore { key: String, min: f64, max: f64, limit: Option<usize> },
    ZRem { key: String, members: Vec<String> },

    // Lists
    RPush { key: String, value: String },
    LTrim { key: String, start: isize, stop: isize },
    LRange { key: String, start: isize, stop: isize },

    // Scripting
    Eval(Script),
}

impl Command {
    /// Command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::MGet { .. } => "MGET",
            Self::Set { .. } => "SET",
            Self::Ttl { .. } => "TTL",
            Self::Expire { .. } => "EXPIRE",
            Self::RequireExists { .. } => "REQUIRE_EXISTS",
            Self::GeoAdd { .. } => "GEOADD",
            Self::GeoSearch { .. } => "GEOSEARCH",
            Self::GeoRemove { .. } => "GEOREM",
            Self::SAdd { .. } => "SADD",
            Self::SRem { .. } => "SREM",
            Self::SCard { .. } => "SCARD",
            Self::SIsMember { .. } => "SISMEMBER",
            Self::SMembers { .. } => "SMEMBERS",
            Self::ZAdd { .. } => "ZADD",
            Self::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Self::ZRem { .. } => "ZREM",
            Self::RPush { .. } => "RPUSH",
            Self::LTrim { .. } => "LTRIM",
            Self::LRange { .. } => "LRANGE",
            Self::Eval(_) => "EVAL",
        }
    }

    /// Whether the command can mutate the keyspace.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Self::Get { .. }
                | Self::MGet { .. }
                | Self::Ttl { .. }
                | Self::GeoSearch { .. }
                | Self::SCard { .. }
                | Self::SIsMember { .. }
                | Self::SMembers { .. }
                | Self::ZRangeByScore { .. }
                | Self::LRange { .. }
        )
    }

    /// Keys the command may touch.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::MGet { keys } => keys.iter().map(String::as_str).collect(),
            Self::Eval(script) => script.keys(),
            Self::Get { key }
            | Self::Set { key, .. }
            | Self::Ttl { key }
            | Self::Expire { key, .. }
            | Self::RequireExists { key }
            | Self::GeoAdd { key, .. }
            | Self::GeoSearch { key, .. }
            | Self::GeoRemove { key, .. }
            | Self::SAdd { key, .. }
            | Self::SRem { key, .. }
            | Self::SCard { key }
            | Self::SIsMember { key, .. }
            | Self::SMembers { key }
            | Self::ZAdd { key, .. }
            | Self::ZRangeByScore { key, .. }
            | Self::ZRem { key, .. }
            | Self::RPush { key, .. }
            | Self::LTrim { key, .. }
            | Self::LRange { key, .. } => vec![key.as_str()],
        }
    }
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or has expired)
    Missing,
    /// The key exists without an expiry
    Persistent,
    /// The key expires after this duration
    Remaining(Duration),
}

impl KeyTtl {
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Remaining(d) => Some(*d),
            _ => None,
        }
    }
}

/// Reply to a store command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Bulk(String),
    Array(Vec<Reply>),
    Ttl(KeyTtl),
    Geo(Vec<GeoHit>),
}

/// Decode a typed value out of a [`Reply`].
pub trait FromReply: Sized {
    fn from_reply(reply: Reply) -> StoreResult<Self>;
}

fn unexpected<T>(expected: &'static str, reply: Reply) -> StoreResult<T> {
    Err(StoreError::UnexpectedReply {
        expected,
        reply: format!("{:?}", reply),
    })
}

impl FromReply for Reply {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        Ok(reply)
    }
}

impl FromReply for () {
    fn from_reply(_reply: Reply) -> StoreResult<Self> {
        Ok(())
    }
}

impl FromReply for i64 {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Int(n) => Ok(n),
            other => unexpected("integer", other),
        }
    }
}

impl FromReply for u64 {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Int(n) if n >= 0 => Ok(n as u64),
            other => unexpected("non-negative integer", other),
        }
    }
}

impl FromReply for usize {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        u64::from_reply(reply).map(|n| n as usize)
    }
}

impl FromReply for bool {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Int(n) => Ok(n != 0),
            other => unexpected("integer", other),
        }
    }
}

impl FromReply for Option<String> {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Nil => Ok(None),
            Reply::Bulk(s) => Ok(Some(s)),
            other => unexpected("bulk string or nil", other),
        }
    }
}

impl FromReply for Vec<Option<String>> {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Array(items) => items.into_iter().map(Option::<String>::from_reply).collect(),
            other => unexpected("array", other),
        }
    }
}

impl FromReply for Vec<String> {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Bulk(s) => Ok(s),
                    other => unexpected("bulk string", other),
                })
                .collect(),
            other => unexpected("array", other),
        }
    }
}

impl FromReply for KeyTtl {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Ttl(ttl) => Ok(ttl),
            other => unexpected("ttl", other),
        }
    }
}

impl FromReply for Vec<GeoHit> {
    fn from_reply(reply: Reply) -> StoreResult<Self> {
        match reply {
            Reply::Geo(hits) => Ok(hits),
            other => unexpected("geo hits", other),
        }
    }
}
