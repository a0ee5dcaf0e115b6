//! Intent service - write use cases
//!
//! Each handler validates, consults the content policy, stages its writes in
//! a fresh [`UnitOfWork`] and commits. Events reach the bus only after the
//! commit lands.

use std::sync::Arc;

use tracing::{debug, info};

use super::events::EventBus;
use super::policy::ContentPolicy;
use crate::domain::{
    Clock, CreateIntent, DomainEvent, FlagIntent, Intent, IntentCreated, IntentFlagged,
    IntentJoined, JoinIntent, JoinOutcome, Message, MessagePosted, NewIntent, PostMessage,
};
use crate::repo::{JoinReply, Repositories};
use crate::store::StoreClient;
use crate::types::{NowhereError, Result};
use crate::uow::UnitOfWork;

pub struct IntentService {
    store: StoreClient,
    repos: Arc<Repositories>,
    bus: Arc<EventBus>,
    policy: Arc<dyn ContentPolicy>,
    clock: Arc<dyn Clock>,
}

impl IntentService {
    pub fn new(
        store: StoreClient,
        repos: Arc<Repositories>,
        bus: Arc<EventBus>,
        policy: Arc<dyn ContentPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            repos,
            bus,
            policy,
            clock,
        }
    }

    /// Open a unit of work over this service's store and bus.
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork::begin(self.store.clone(), self.repos.clone(), self.bus.clone())
    }

    // =========================================================================
    // Create
    // =========================================================================

    pub async fn handle_create_intent(&self, cmd: CreateIntent) -> Result<Intent> {
        let intent = Intent::create(
            NewIntent {
                owner: Some(cmd.owner.clone()),
                title: cmd.title,
                emoji: cmd.emoji,
                latitude: cmd.latitude,
                longitude: cmd.longitude,
                is_system: false,
            },
            cmd.issued_at,
        )?;

        self.policy
            .review(&cmd.owner, intent.title())
            .await
            .into_result()?;

        self.persist_new(&intent).await?;

        info!(
            intent_id = %intent.id(),
            owner = %cmd.owner,
            command_id = %cmd.command_id,
            "Intent created"
        );
        Ok(intent)
    }

    /// Create an ownerless, always-visible intent.
    pub async fn create_system_intent(
        &self,
        title: &str,
        emoji: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Intent> {
        let intent = Intent::create(
            NewIntent {
                owner: None,
                title: title.to_string(),
                emoji: emoji.to_string(),
                latitude,
                longitude,
                is_system: true,
            },
            self.clock.now(),
        )?;

        self.persist_new(&intent).await?;
        debug!(intent_id = %intent.id(), title = %intent.title(), "System intent created");
        Ok(intent)
    }

    async fn persist_new(&self, intent: &Intent) -> Result<()> {
        let now = self.clock.now();
        let mut uow = self.begin();
        uow.intents().save(intent, now)?;
        uow.collect_event(IntentCreated::from_intent(intent, now));
        uow.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Join
    // =========================================================================

    pub async fn handle_join_intent(&self, cmd: JoinIntent) -> Result<JoinOutcome> {
        let intent_id = cmd.intent_id;
        let occurred_at = self.clock.now();

        let mut uow = self.begin();
        let reply = uow.joins().join(intent_id, &cmd.actor);
        let actor = cmd.actor.clone();
        uow.collect_deferred_event(move |receipt| {
            Ok((receipt.resolve(reply)? == JoinReply::Added)
                .then(|| IntentJoined::new(intent_id, actor, occurred_at).into()))
        });
        let receipt = uow.commit().await?;

        let outcome = receipt.resolve(reply)?.into_outcome(intent_id)?;
        info!(intent_id = %intent_id, actor = %cmd.actor, outcome = ?outcome, "Join handled");
        Ok(outcome)
    }

    // =========================================================================
    // Post message
    // =========================================================================

    pub async fn handle_post_message(&self, cmd: PostMessage) -> Result<Message> {
        let message = Message::create(cmd.intent_id, cmd.author.clone(), cmd.content, cmd.issued_at)?;

        self.policy
            .review(&cmd.author, message.content())
            .await
            .into_result()?;

        let parent_ttl = self.repos.intents.ttl(cmd.intent_id).await?;
        if !parent_ttl.exists() {
            return Err(NowhereError::NotFound(format!("Intent {}", cmd.intent_id)));
        }
        if !self.repos.joins.is_member(cmd.intent_id, &cmd.author).await? {
            return Err(NowhereError::MembershipRequired(format!(
                "{} has not joined intent {}",
                cmd.author, cmd.intent_id
            )));
        }

        let mut uow = self.begin();
        uow.messages().append(&message, parent_ttl)?;
        uow.collect_event(MessagePosted::from_message(&message, self.clock.now()));
        uow.commit().await?;

        info!(
            intent_id = %message.intent_id(),
            message_id = %message.id(),
            author = %message.author(),
            "Message posted"
        );
        Ok(message)
    }

    // =========================================================================
    // Flag
    // =========================================================================

    /// Flag an intent. Returns the new flag count, or 0 when the intent no
    /// longer exists.
    pub async fn handle_flag_intent(&self, cmd: FlagIntent) -> Result<u64> {
        let intent_id = cmd.intent_id;
        let threshold = self.repos.intents.ranking().flag_threshold;
        let occurred_at = self.clock.now();

        let mut uow = self.begin();
        let count = uow.intents().flag(intent_id);
        uow.collect_deferred_event(move |receipt| {
            let count = receipt.resolve(count)?;
            Ok((count > 0).then(|| -> DomainEvent {
                IntentFlagged::new(intent_id, count, threshold, occurred_at).into()
            }))
        });
        let receipt = uow.commit().await?;

        let count = receipt.resolve(count)?;
        if count == threshold {
            info!(intent_id = %intent_id, flags = count, "Intent hidden from discovery");
        } else {
            debug!(intent_id = %intent_id, flags = count, "Intent flagged");
        }
        Ok(count)
    }
}

impl std::fmt::Debug for IntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentService")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
