//! Narrative source trait and stub implementation.
//!
//! When an SQK effect is planned the simulation asks a
//! [`NarrativeSource`] for a short flavor text describing it. The source
//! could be an LLM backend, a canned table, or a test stub. Failures never
//! reach the tick: [`narrate_with_fallback`] substitutes
//! `"Event: <kind>"` for any error or timeout.

use std::future::Future;
use std::time::Duration;

use knotworld_types::{EffectDetails, EffectKind};
use serde::Serialize;
use tracing::warn;

use crate::effect::{PendingEffect, fallback_narrative};

/// Errors a narrative source can report.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    /// No backend is configured.
    #[error("narrative source unavailable")]
    Unavailable,

    /// The request did not finish in time.
    #[error("narrative request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with something unusable.
    #[error("narrative backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Everything a narrative source gets to see about a planned effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRequest {
    /// Variant tag.
    pub kind: EffectKind,
    /// Mechanical details.
    pub details: EffectDetails,
    /// Duration in ticks.
    pub duration: u32,
    /// Tick at which the triggering knot fired.
    pub knot_tick: u64,
    /// `Re(s)` projection of the triggering knot.
    pub projected_res: f64,
}

impl NarrativeRequest {
    /// Describe a planned effect.
    pub fn from_pending(pending: &PendingEffect) -> Self {
        Self {
            kind: pending.kind(),
            details: pending.details.clone(),
            duration: pending.duration,
            knot_tick: pending.knot.tick,
            projected_res: pending.knot.projected_res,
        }
    }
}

/// A source of effect narratives.
pub trait NarrativeSource {
    /// Produce flavor text for the effect described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`NarrativeError`] when no usable text can be produced. The
    /// caller recovers with fallback text.
    fn narrate(
        &self,
        request: &NarrativeRequest,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send;
}

/// A narrative source with no backend. Every effect gets the fallback
/// text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubNarrativeSource;

impl StubNarrativeSource {
    /// Create a new stub narrative source.
    pub const fn new() -> Self {
        Self
    }
}

impl NarrativeSource for StubNarrativeSource {
    fn narrate(
        &self,
        _request: &NarrativeRequest,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
        std::future::ready(Err(NarrativeError::Unavailable))
    }
}

/// Ask `source` for a narrative, optionally bounded by `timeout`, and fall
/// back to `"Event: <kind>"` on any failure or blank answer.
///
/// Returns the text and whether it came from the source.
pub async fn narrate_with_fallback<N: NarrativeSource>(
    source: &N,
    request: &NarrativeRequest,
    timeout: Option<Duration>,
) -> (String, bool) {
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, source.narrate(request))
            .await
            .unwrap_or(Err(NarrativeError::Timeout(limit))),
        None => source.narrate(request).await,
    };
    match result {
        Ok(text) if !text.trim().is_empty() => (text.trim().to_owned(), true),
        Ok(_) => {
            warn!(kind = %request.kind, "narrative source returned blank text, using fallback");
            (fallback_narrative(request.kind), false)
        }
        Err(NarrativeError::Unavailable) => (fallback_narrative(request.kind), false),
        Err(e) => {
            warn!(kind = %request.kind, error = %e, "narrative request failed, using fallback");
            (fallback_narrative(request.kind), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use knotworld_types::KnotEvent;

    use super::*;

    struct Canned(&'static str);

    impl NarrativeSource for Canned {
        fn narrate(
            &self,
            _request: &NarrativeRequest,
        ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
            std::future::ready(Ok(self.0.to_owned()))
        }
    }

    struct Failing;

    impl NarrativeSource for Failing {
        fn narrate(
            &self,
            _request: &NarrativeRequest,
        ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
            std::future::ready(Err(NarrativeError::Backend {
                message: "boom".to_owned(),
            }))
        }
    }

    struct Slow;

    impl NarrativeSource for Slow {
        fn narrate(
            &self,
            _request: &NarrativeRequest,
        ) -> impl Future<Output = Result<String, NarrativeError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok("too late".to_owned())
            }
        }
    }

    fn request() -> NarrativeRequest {
        NarrativeRequest::from_pending(&PendingEffect {
            knot: KnotEvent {
                tick: 3,
                energy_value: 0.97,
                phase_value: 0.97,
                projected_res: 0.45,
            },
            details: EffectDetails::GoalReveal,
            duration: 10,
        })
    }

    #[tokio::test]
    async fn successful_text_is_used() {
        let (text, from_source) = narrate_with_fallback(&Canned("  A beacon hums. "), &request(), None).await;
        assert_eq!(text, "A beacon hums.");
        assert!(from_source);
    }

    #[tokio::test]
    async fn failures_fall_back_to_event_text() {
        for (text, from_source) in [
            narrate_with_fallback(&Failing, &request(), None).await,
            narrate_with_fallback(&StubNarrativeSource::new(), &request(), None).await,
            narrate_with_fallback(&Canned("   "), &request(), None).await,
        ] {
            assert_eq!(text, "Event: goal_reveal");
            assert!(!from_source);
        }
    }

    #[tokio::test]
    async fn timeout_falls_back() {
        let (text, from_source) =
            narrate_with_fallback(&Slow, &request(), Some(Duration::from_millis(50))).await;
        assert_eq!(text, "Event: goal_reveal");
        assert!(!from_source);
    }
}
