//! Server-side scripts
//!
//! Scripts run inside the backend while it holds its command lock, issuing
//! ordinary [`Command`]s through a [`ScriptContext`]. Nothing else can run
//! between the commands a script issues, which gives the flag and join
//! mutators their compare-and-mutate semantics.

use serde_json::Value;

use super::command::{Command, FromReply, KeyTtl, Reply};
use super::error::{StoreError, StoreResult};

/// Blob field holding the accumulated flag count.
pub const FLAGS_FIELD: &str = "flags";

/// Reply of [`Script::Join`] when the intent blob does not exist.
pub const JOIN_MISSING: i64 = -1;

/// Command access for a running script.
pub trait ScriptContext {
    /// Run a command inside the script's atomic step.
    fn call(&mut self, command: Command) -> StoreResult<Reply>;
}

/// Atomic multi-step operations.
#[derive(Debug, Clone)]
pub enum Script {
    /// Increment the `flags` field of a JSON blob, keeping its remaining
    /// TTL. Once the count reaches `hide_at` the member is removed from the
    /// geo index. Replies with the new count, or 0 when the blob is absent.
    Flag {
        intent_key: String,
        geo_key: String,
        member: String,
        increment: i64,
        hide_at: i64,
    },

    /// Add a member to a join set if the intent blob exists and copy the
    /// blob's remaining TTL onto the set. Replies 1 (added), 0 (already a
    /// member) or [`JOIN_MISSING`].
    Join {
        intent_key: String,
        joins_key: String,
        member: String,
    },
}

impl Script {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Flag {
                intent_key, geo_key, ..
            } => vec![intent_key.as_str(), geo_key.as_str()],
            Self::Join {
                intent_key,
                joins_key,
                ..
            } => vec![intent_key.as_str(), joins_key.as_str()],
        }
    }

    /// Execute the script against a context.
    pub fn run(&self, ctx: &mut dyn ScriptContext) -> StoreResult<Reply> {
        match self {
            Self::Flag {
                intent_key,
                geo_key,
                member,
                increment,
                hide_at,
            } => run_flag(ctx, intent_key, geo_key, member, *increment, *hide_at),
            Self::Join {
                intent_key,
                joins_key,
                member,
            } => run_join(ctx, intent_key, joins_key, member),
        }
    }
}

fn call<T: FromReply>(ctx: &mut dyn ScriptContext, command: Command) -> StoreResult<T> {
    T::from_reply(ctx.call(command)?)
}

fn run_flag(
    ctx: &mut dyn ScriptContext,
    intent_key: &str,
    geo_key: &str,
    member: &str,
    increment: i64,
    hide_at: i64,
) -> StoreResult<Reply> {
    let raw: Option<String> = call(
        ctx,
        Command::Get {
            key: intent_key.to_string(),
        },
    )?;
    let Some(raw) = raw else {
        return Ok(Reply::Int(0));
    };

    let mut doc: Value = serde_json::from_str(&raw)?;
    let fields = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::Script(format!("{} is not a JSON object", intent_key)))?;
    let flags = fields.get(FLAGS_FIELD).and_then(Value::as_i64).unwrap_or(0) + increment;
    fields.insert(FLAGS_FIELD.to_string(), Value::from(flags));

    let ttl: KeyTtl = call(
        ctx,
        Command::Ttl {
            key: intent_key.to_string(),
        },
    )?;
    call::<()>(
        ctx,
        Command::Set {
            key: intent_key.to_string(),
            value: serde_json::to_string(&doc)?,
            ttl: ttl.remaining(),
        },
    )?;

    if flags >= hide_at {
        call::<()>(
            ctx,
            Command::GeoRemove {
                key: geo_key.to_string(),
                members: vec![member.to_string()],
            },
        )?;
    }

    Ok(Reply::Int(flags))
}

fn run_join(
    ctx: &mut dyn ScriptContext,
    intent_key: &str,
    joins_key: &str,
    member: &str,
) -> StoreResult<Reply> {
    let ttl: KeyTtl = call(
        ctx,
        Command::Ttl {
            key: intent_key.to_string(),
        },
    )?;
    if !ttl.exists() {
        return Ok(Reply::Int(JOIN_MISSING));
    }

    let added: bool = call(
        ctx,
        Command::SAdd {
            key: joins_key.to_string(),
            member: member.to_string(),
        },
    )?;

    if let Some(remaining) = ttl.remaining() {
        call::<()>(
            ctx,
            Command::Expire {
                key: joins_key.to_string(),
                ttl: remaining,
            },
        )?;
    }

    Ok(Reply::Int(i64::from(added)))
}
