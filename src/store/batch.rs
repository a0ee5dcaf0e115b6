//! Write batches with deferred results
//!
//! A [`WriteBatch`] collects commands without sending them. Every queued
//! command hands back a [`Deferred`] placeholder; its value only exists once
//! the batch has been submitted and produced a [`CommitReceipt`].
//!
//! ```rust,ignore
//! let mut batch = WriteBatch::new();
//! let added: Deferred<bool> = batch.sadd("intent:1:joins", "alice");
//! // `added` carries no value yet - the batch has not run
//! let receipt = client.submit(batch).await?;
//! let added = receipt.resolve(added)?;
//! ```

use std::marker::PhantomData;
use std::time::Duration;

use super::command::{Command, FromReply, Reply};
use super::error::{StoreError, StoreResult};
use super::geo::GeoPoint;
use super::scripts::Script;

/// Placeholder for the reply of a queued command.
pub struct Deferred<T> {
    index: usize,
    _reply: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").field("index", &self.index).finish()
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Deferred<T> {}

impl<T> Deferred<T> {
    /// Position of the command inside its batch.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Buffered commands awaiting one atomic submission.
#[derive(Debug, Default)]
pub struct WriteBatch {
    commands: Vec<Command>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command, returning a placeholder for its reply.
    pub fn push<T: FromReply>(&mut self, command: Command) -> Deferred<T> {
        self.commands.push(command);
        Deferred {
            index: self.commands.len() - 1,
            _reply: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drop every queued command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn set(&mut self, key: impl Into<String>, value: String, ttl: Option<Duration>) -> Deferred<()> {
        self.push(Command::Set {
            key: key.into(),
            value,
            ttl,
        })
    }

    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> Deferred<bool> {
        self.push(Command::Expire { key: key.into(), ttl })
    }

    pub fn require_exists(&mut self, key: impl Into<String>) -> Deferred<()> {
        self.push(Command::RequireExists { key: key.into() })
    }

    pub fn geo_add(&mut self, key: impl Into<String>, member: impl Into<String>, point: GeoPoint) -> Deferred<bool> {
        self.push(Command::GeoAdd {
            key: key.into(),
            member: member.into(),
            point,
        })
    }

    pub fn geo_remove(&mut self, key: impl Into<String>, members: Vec<String>) -> Deferred<usize> {
        self.push(Command::GeoRemove {
            key: key.into(),
            members,
        })
    }

    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) -> Deferred<bool> {
        self.push(Command::SAdd {
            key: key.into(),
            member: member.into(),
        })
    }

    pub fn zadd(&mut self, key: impl Into<String>, member: impl Into<String>, score: f64) -> Deferred<bool> {
        self.push(Command::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
        })
    }

    pub fn zrem(&mut self, key: impl Into<String>, members: Vec<String>) -> Deferred<usize> {
        self.push(Command::ZRem {
            key: key.into(),
            members,
        })
    }

    pub fn rpush(&mut self, key: impl Into<String>, value: String) -> Deferred<usize> {
        self.push(Command::RPush {
            key: key.into(),
            value,
        })
    }

    pub fn ltrim(&mut self, key: impl Into<String>, start: isize, stop: isize) -> Deferred<()> {
        self.push(Command::LTrim {
            key: key.into(),
            start,
            stop,
        })
    }

    pub fn eval<T: FromReply>(&mut self, script: Script) -> Deferred<T> {
        self.push(Command::Eval(script))
    }
}

/// Replies of a submitted batch.
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    replies: Vec<Reply>,
}

impl CommitReceipt {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies }
    }

    /// Turn a placeholder into its value.
    pub fn resolve<T: FromReply>(&self, deferred: Deferred<T>) -> StoreResult<T> {
        let reply = self.replies.get(deferred.index).cloned().ok_or_else(|| {
            StoreError::UnexpectedReply {
                expected: "reply for deferred command",
                reply: format!("index {} of {}", deferred.index, self.replies.len()),
            }
        })?;
        T::from_reply(reply)
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}
