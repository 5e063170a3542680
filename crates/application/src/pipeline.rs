//! The three-stage fault pipeline
//!
//! A matched rule is applied to a message in fixed order: delay, then
//! mangle, then abort. Each stage samples its own bernoulli gate
//! independently under the rule's distribution for that stage. Delay
//! models latency in flight, mangle models corruption of in-flight bytes,
//! abort models the server failing after partial processing; the order is
//! load-bearing and never varies.

use domain::{ProxyMessage, Rule};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::ProxyError;
use crate::sampler::Sampler;

/// What the pipeline decided for a message
#[derive(Debug, Clone, PartialEq)]
pub enum FaultOutcome {
    /// Forward the (possibly mangled) message upstream
    Forward(ProxyMessage),
    /// Skip forwarding and answer with this status and an empty body
    Abort {
        /// Status code of the synthesized response
        status: u16,
    },
}

/// Run a message through the rule's fault stages
///
/// A disabled rule passes the message through untouched. The delay
/// suspension races the caller's cancellation token; mangle and abort are
/// CPU steps, so cancellation there is observed between stages.
///
/// # Errors
///
/// [`ProxyError::Cancelled`] when the token fires during or before a
/// stage; the message is then neither forwarded nor answered with a
/// fault code.
pub async fn apply_rule(
    rule: &Rule,
    mut message: ProxyMessage,
    sampler: &mut Sampler,
    cancel: &CancelToken,
) -> Result<FaultOutcome, ProxyError> {
    if !rule.enabled {
        return Ok(FaultOutcome::Forward(message));
    }

    // Stage 1: delay
    if sampler.bernoulli(rule.delay_distribution, rule.delay_probability) {
        let pause = sampler.sample_duration(rule.delay_distribution, rule.delay_time);
        debug!(?pause, "delaying message");
        tokio::select! {
            () = cancel.cancelled() => return Err(ProxyError::Cancelled),
            () = tokio::time::sleep(pause) => {}
        }
    }
    if cancel.is_cancelled() {
        return Err(ProxyError::Cancelled);
    }

    // Stage 2: mangle
    if sampler.bernoulli(rule.mangle_distribution, rule.mangle_probability) {
        let mangled = rule
            .search_pattern
            .replace_all(&message.body, rule.replace_template.as_str());
        debug!(
            before = message.body.len(),
            after = mangled.len(),
            "mangling message body"
        );
        message.body = mangled.into_owned();
    }
    if cancel.is_cancelled() {
        return Err(ProxyError::Cancelled);
    }

    // Stage 3: abort
    if sampler.bernoulli(rule.abort_distribution, rule.abort_probability) {
        debug!(status = rule.error_code, "aborting message");
        return Ok(FaultOutcome::Abort {
            status: rule.error_code,
        });
    }

    Ok(FaultOutcome::Forward(message))
}
