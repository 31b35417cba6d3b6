use std::collections::HashMap;
use std::error::Error;

use chatlane_frame::{decode_frame, validate_tag, LogicalMessage};
#[cfg(feature = "schema")]
use chatlane_schema::SchemaRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;
#[cfg(feature = "schema")]
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::error::{Result, SessionError};
use crate::outbox::Outbox;

/// Error type handlers may return.
pub type HandlerError = Box<dyn Error + Send + Sync>;

pub type HandlerResult = std::result::Result<(), HandlerError>;

enum Failure {
    Payload(serde_json::Error),
    Handler(HandlerError),
}

type ErasedHandler<C> =
    Box<dyn Fn(&mut C, &mut Outbox, &str, &LogicalMessage) -> std::result::Result<(), Failure>>;

struct Registration<C> {
    shape: &'static str,
    handler: ErasedHandler<C>,
}

/// Counts from dispatching one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Tokens whose handler ran and succeeded.
    pub dispatched: usize,
    /// Well-formed tokens with no registered handler.
    pub unmatched: usize,
    /// Tokens that failed to decode, validate or parse into the handler's shape.
    pub malformed: usize,
    /// Handlers that returned an error.
    pub handler_failures: usize,
}

impl DispatchReport {
    pub fn merge(&mut self, other: DispatchReport) {
        self.dispatched += other.dispatched;
        self.unmatched += other.unmatched;
        self.malformed += other.malformed;
        self.handler_failures += other.handler_failures;
    }

    /// Total tokens seen.
    pub fn tokens(&self) -> usize {
        self.dispatched + self.unmatched + self.malformed + self.handler_failures
    }
}

/// Maps tags to typed handlers over a caller-owned state `C`.
///
/// Built once with chained [`register`](Self::register) calls and read-only
/// afterwards. Handlers receive the state, an [`Outbox`] for replies, the
/// sender identity and the payload parsed into their declared type.
pub struct HandlerRegistry<C> {
    handlers: HashMap<String, Registration<C>>,
    #[cfg(feature = "schema")]
    schemas: Option<SchemaRegistry>,
}

impl<C> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            #[cfg(feature = "schema")]
            schemas: None,
        }
    }

    /// Register the handler for `tag`, whose payload parses into `T`.
    ///
    /// Fails on an invalid tag or a tag that already has a handler.
    pub fn register<T, F>(mut self, tag: &str, handler: F) -> Result<Self>
    where
        C: 'static,
        T: DeserializeOwned + 'static,
        F: Fn(&mut C, &mut Outbox, &str, T) -> HandlerResult + 'static,
    {
        validate_tag(tag).map_err(|err| SessionError::InvalidConfig(err.to_string()))?;
        if self.handlers.contains_key(tag) {
            return Err(SessionError::DuplicateTag(tag.to_string()));
        }

        let erased: ErasedHandler<C> = Box::new(
            move |state: &mut C, outbox: &mut Outbox, sender: &str, message: &LogicalMessage| {
                let payload = message.decode_payload::<T>().map_err(Failure::Payload)?;
                handler(state, outbox, sender, payload).map_err(Failure::Handler)
            },
        );
        self.handlers.insert(
            tag.to_string(),
            Registration {
                shape: std::any::type_name::<T>(),
                handler: erased,
            },
        );
        Ok(self)
    }

    /// Validate payloads against `schemas` before parsing them.
    ///
    /// Tags without a schema are dispatched unvalidated, unless the registry
    /// sets `require_schema`; then their payloads are dropped as malformed.
    #[cfg(feature = "schema")]
    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Some(schemas);
        for tag in self.unvalidated_tags() {
            if self.requires_schema() {
                warn!(tag, "handler has no schema and will never run");
            } else {
                debug!(tag, "handler payloads are not schema-checked");
            }
        }
        self
    }

    /// Handler tags the attached schema registry has no schema for, sorted.
    #[cfg(feature = "schema")]
    pub fn unvalidated_tags(&self) -> Vec<&str> {
        let Some(schemas) = &self.schemas else {
            return self.tags();
        };
        self.tags()
            .into_iter()
            .filter(|tag| !schemas.has_schema(tag))
            .collect()
    }

    #[cfg(feature = "schema")]
    fn requires_schema(&self) -> bool {
        self.schemas
            .as_ref()
            .is_some_and(|schemas| schemas.config().require_schema)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Rust type name of the payload registered for `tag`.
    pub fn shape(&self, tag: &str) -> Option<&'static str> {
        self.handlers.get(tag).map(|registration| registration.shape)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch every token of one inbound frame from `sender`, in order.
    ///
    /// Failures are reported to `diagnostics` and stop only the token they
    /// occur in. Tokens with no handler are skipped silently.
    pub fn dispatch(
        &self,
        state: &mut C,
        outbox: &mut Outbox,
        sender: &str,
        frame_text: &str,
        diagnostics: &mut dyn Diagnostics,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let tokens = match decode_frame(frame_text) {
            Ok(tokens) => tokens,
            Err(err) => {
                diagnostics.malformed(sender, frame_text, &err);
                report.malformed += 1;
                return report;
            }
        };

        for token in tokens {
            let message = match token.message {
                Ok(message) => message,
                Err(err) => {
                    diagnostics.malformed(sender, &token.raw, &err);
                    report.malformed += 1;
                    continue;
                }
            };
            self.dispatch_message(
                state,
                outbox,
                sender,
                &token.raw,
                &message,
                diagnostics,
                &mut report,
            );
        }
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_message(
        &self,
        state: &mut C,
        outbox: &mut Outbox,
        sender: &str,
        raw: &str,
        message: &LogicalMessage,
        diagnostics: &mut dyn Diagnostics,
        report: &mut DispatchReport,
    ) {
        let Some(registration) = self.handlers.get(message.tag()) else {
            trace!(sender, tag = message.tag(), "no handler for tag");
            report.unmatched += 1;
            return;
        };

        #[cfg(feature = "schema")]
        if let Some(schemas) = &self.schemas {
            if let Err(err) = schemas.validate(message.tag(), message.payload()) {
                diagnostics.malformed(sender, raw, &err);
                report.malformed += 1;
                return;
            }
        }

        match (registration.handler)(state, outbox, sender, message) {
            Ok(()) => report.dispatched += 1,
            Err(Failure::Payload(err)) => {
                diagnostics.malformed(sender, raw, &err);
                report.malformed += 1;
            }
            Err(Failure::Handler(err)) => {
                diagnostics.handler_failed(sender, message.tag(), &*err);
                report.handler_failures += 1;
            }
        }
    }
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for HandlerRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tags", &self.tags())
            .finish_non_exhaustive()
    }
}
