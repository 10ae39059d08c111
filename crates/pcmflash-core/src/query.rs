//! Single request/reply exchange with bounded retries
//!
//! A [`Query`] pairs a request builder with a reply parser. Each attempt
//! clears stale input, sends a freshly built request and parses one reply.
//! Whether to go again is decided by [`Response::next_step`] alone.

use core::marker::PhantomData;

use maybe_async::maybe_async;

use crate::device::Device;
use crate::error::Result;
use crate::message::Message;
use crate::response::{Failure, NextStep, Response};

/// Attempt budget and backoff for a [`Query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after a send failure or missing reply
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 250,
        }
    }
}

/// A request builder, reply parser and retry policy
///
/// Built fresh for each exchange and consumed by [`Query::execute`].
pub struct Query<T, B, P> {
    build: B,
    parse: P,
    policy: RetryPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T, B, P> Query<T, B, P>
where
    B: Fn() -> Message,
    P: Fn(&Message) -> Response<T>,
{
    /// Create a query with the default policy
    pub fn new(build: B, parse: P) -> Self {
        Self::with_policy(build, parse, RetryPolicy::default())
    }

    /// Create a query with an explicit policy
    pub fn with_policy(build: B, parse: P, policy: RetryPolicy) -> Self {
        Self {
            build,
            parse,
            policy,
            _marker: PhantomData,
        }
    }

    /// The policy this query runs with
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the exchange
    ///
    /// Returns the first `Success` or `Refused`, or the last failure once
    /// the attempts are used up. `Err` only for device faults.
    #[maybe_async]
    pub async fn execute<D: Device + ?Sized>(&self, device: &mut D) -> Result<Response<T>> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = Response::Failure(Failure::NoReply);

        for attempt in 1..=attempts {
            device.clear_message_queue();

            let request = (self.build)();
            log::trace!("query attempt {}/{}: {}", attempt, attempts, request);

            let response = if !device.send_message(&request).await? {
                log::debug!("send failed (attempt {}/{})", attempt, attempts);
                Response::Failure(Failure::SendFailed)
            } else {
                match device.receive_message().await? {
                    Some(reply) => {
                        log::trace!("reply: {}", reply);
                        (self.parse)(&reply)
                    }
                    None => {
                        log::debug!("no reply (attempt {}/{})", attempt, attempts);
                        Response::Failure(Failure::NoReply)
                    }
                }
            };

            if response.next_step() == NextStep::Stop {
                return Ok(response);
            }

            let backoff = matches!(response, Response::Failure(f) if f.is_transport());
            last = response;
            if backoff && attempt < attempts {
                device.delay_ms(self.policy.backoff_ms).await;
            }
        }

        Ok(last)
    }
}
