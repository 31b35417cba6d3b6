use std::collections::HashMap;

use chatlane_frame::Tick;
use serde::Serialize;
use tracing::debug;

/// A chat-lane participant as last seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chatter {
    identity: String,
    last_message: String,
    last_seen: Tick,
}

impl Chatter {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Tick of the most recent message.
    pub fn last_seen(&self) -> Tick {
        self.last_seen
    }
}

/// Callbacks for chat-lane activity. Every method defaults to a no-op.
pub trait ChatterHooks {
    /// Runs before the sender's record is updated.
    fn on_message(&mut self, _identity: &str, _text: &str) {}

    fn on_subscribe(&mut self, _identity: &str) {}

    fn on_donate(&mut self, _identity: &str, _amount: u64) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ChatterHooks for NoHooks {}

/// Chat-lane participants, one record per identity, in first-seen order.
pub struct ChatterRegistry {
    chatters: Vec<Chatter>,
    index: HashMap<String, usize>,
    hooks: Box<dyn ChatterHooks>,
}

impl ChatterRegistry {
    pub fn new() -> Self {
        Self::with_hooks(NoHooks)
    }

    pub fn with_hooks(hooks: impl ChatterHooks + 'static) -> Self {
        Self {
            chatters: Vec::new(),
            index: HashMap::new(),
            hooks: Box::new(hooks),
        }
    }

    pub fn set_hooks(&mut self, hooks: impl ChatterHooks + 'static) {
        self.hooks = Box::new(hooks);
    }

    /// Record a chat-lane message from `identity` at tick `now`.
    ///
    /// A new identity is appended; a known one keeps its position and has
    /// its message and timestamp overwritten.
    pub fn update(&mut self, identity: &str, message: &str, now: Tick) {
        self.hooks.on_message(identity, message);

        match self.index.get(identity) {
            Some(&at) => {
                let chatter = &mut self.chatters[at];
                chatter.last_message = message.to_string();
                chatter.last_seen = now;
            }
            None => {
                debug!(identity, "new chatter");
                self.index.insert(identity.to_string(), self.chatters.len());
                self.chatters.push(Chatter {
                    identity: identity.to_string(),
                    last_message: message.to_string(),
                    last_seen: now,
                });
            }
        }
    }

    /// Drop every chatter silent for at least `max_age` ticks.
    ///
    /// Survivors keep their relative order. Returns how many were dropped.
    pub fn evict_older_than(&mut self, max_age: Tick, now: Tick) -> usize {
        let before = self.chatters.len();
        self.chatters
            .retain(|chatter| now.saturating_sub(chatter.last_seen) < max_age);
        let evicted = before - self.chatters.len();
        if evicted > 0 {
            self.reindex();
            debug!(evicted, remaining = self.chatters.len(), "evicted idle chatters");
        }
        evicted
    }

    /// Report a subscription from `identity`.
    pub fn subscribe(&mut self, identity: &str) {
        self.hooks.on_subscribe(identity);
    }

    /// Report a donation from `identity`.
    pub fn donate(&mut self, identity: &str, amount: u64) {
        self.hooks.on_donate(identity, amount);
    }

    pub fn get(&self, identity: &str) -> Option<&Chatter> {
        self.index.get(identity).map(|&at| &self.chatters[at])
    }

    /// Chatter at `index` in first-seen order.
    pub fn get_at(&self, index: usize) -> Option<&Chatter> {
        self.chatters.get(index)
    }

    pub fn count(&self) -> usize {
        self.chatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chatters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chatter> {
        self.chatters.iter()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.chatters.iter().map(Chatter::identity)
    }

    pub fn clear(&mut self) {
        self.chatters.clear();
        self.index.clear();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (at, chatter) in self.chatters.iter().enumerate() {
            self.index.insert(chatter.identity.clone(), at);
        }
    }
}

impl Default for ChatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatterRegistry")
            .field("chatters", &self.chatters)
            .finish_non_exhaustive()
    }
}
