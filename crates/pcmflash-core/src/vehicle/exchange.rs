//! Validated send
//!
//! Sends one frame and waits for a reply that the parser accepts. Two
//! retry budgets are nested: the outer loop repeats the whole exchange when
//! no valid reply arrives, and each outer attempt retries the send itself on
//! transport failure.

use maybe_async::maybe_async;

use super::Vehicle;
use crate::cancel::CancellationToken;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::message::Message;
use crate::protocol::{request, response};
use crate::response::{Ack, Response};

/// Number of replies examined while probing a possibly crashed kernel
const PROBE_POLLS: u32 = 10;

/// Description and messages for one validated send
#[derive(Debug, Clone)]
pub struct Exchange {
    description: String,
    success: String,
    failure: String,
    max_attempts: Option<u32>,
    ping_on_failure: bool,
    quiet: bool,
}

impl Exchange {
    /// Describe an exchange; `description` completes "Sending ..."
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            success: String::new(),
            failure: String::new(),
            max_attempts: None,
            ping_on_failure: false,
            quiet: false,
        }
    }

    /// Message reported when a valid reply arrives
    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.success = message.into();
        self
    }

    /// Message reported when every attempt failed
    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.failure = message.into();
        self
    }

    /// Override the outer attempt count from the vehicle configuration
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Probe the kernel once after every failed attempt
    pub fn ping_on_failure(mut self, ping: bool) -> Self {
        self.ping_on_failure = ping;
        self
    }

    /// Report per-attempt progress as debug messages only
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// What is being sent
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Result of polling for a validated reply
enum Poll {
    Accepted,
    Refused,
    Nothing,
}

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Send `message` until `parse` accepts a reply
    ///
    /// Cancellation is checked before each outer attempt, never while a
    /// frame is in flight. A refusal ends the loop at once.
    #[maybe_async]
    pub async fn send_and_validate<P>(
        &mut self,
        message: &Message,
        parse: P,
        exchange: &Exchange,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        P: Fn(&Message) -> Ack,
    {
        let attempts = exchange
            .max_attempts
            .unwrap_or(self.config.exchange_attempts)
            .max(1);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                self.report_failure(exchange);
                return Err(Error::Cancelled);
            }

            self.progress_message(exchange, &format!("Sending {}", exchange.description));

            if !self.try_send_message(message, &exchange.description, attempts).await? {
                self.progress_message(exchange, &format!("Unable to send {}", exchange.description));
                if exchange.ping_on_failure {
                    self.probe_kernel().await?;
                }
                continue;
            }

            match self.wait_for_success(&parse, self.config.response_polls).await? {
                Poll::Accepted => {
                    self.progress_message(exchange, &exchange.success);
                    return Ok(());
                }
                Poll::Refused => {
                    log::debug!("{} refused on attempt {}", exchange.description, attempt);
                    self.report_failure(exchange);
                    return Err(Error::Refused {
                        operation: exchange.description.clone(),
                    });
                }
                Poll::Nothing => {
                    self.progress_message(
                        exchange,
                        &format!("No {} response received.", exchange.description),
                    );
                    if exchange.ping_on_failure {
                        self.probe_kernel().await?;
                    }
                }
            }
        }

        self.report_failure(exchange);
        if exchange.ping_on_failure {
            self.probe_kernel().await?;
        }
        Err(Error::NoResponse {
            operation: exchange.description.clone(),
            attempts,
        })
    }

    /// Put a frame on the bus, retrying transport failures
    #[maybe_async]
    async fn try_send_message(
        &mut self,
        message: &Message,
        description: &str,
        attempts: u32,
    ) -> Result<bool> {
        for attempt in 1..=attempts {
            if self.device.send_message(message).await? {
                return Ok(true);
            }
            log::debug!("unable to send {} (attempt {}/{})", description, attempt, attempts);
            if attempt < attempts {
                self.device.delay_ms(self.config.query_policy.backoff_ms).await;
            }
        }
        Ok(false)
    }

    /// Examine up to `polls` replies for one `parse` accepts
    #[maybe_async]
    async fn wait_for_success<P>(&mut self, parse: &P, polls: u32) -> Result<Poll>
    where
        P: Fn(&Message) -> Ack,
    {
        for _ in 0..polls {
            let Some(reply) = self.device.receive_message().await? else {
                continue;
            };
            match parse(&reply) {
                Response::Success(()) => return Ok(Poll::Accepted),
                Response::Refused => return Ok(Poll::Refused),
                Response::Failure(failure) => {
                    log::trace!("ignoring reply {} ({:?})", reply, failure);
                }
            }
        }
        Ok(Poll::Nothing)
    }

    /// Single kernel ping, used to notice a crashed kernel early
    #[maybe_async]
    async fn probe_kernel(&mut self) -> Result<bool> {
        let ping = request::kernel_ping();
        if !self.device.send_message(&ping).await? {
            self.logger.debug_message("Kernel probe could not be sent.");
            return Ok(false);
        }
        let poll = self.wait_for_success(&response::kernel_ping, PROBE_POLLS).await?;
        let alive = matches!(poll, Poll::Accepted);
        if alive {
            self.logger.debug_message("Kernel is responding.");
        } else {
            self.logger.user_message("No response received from the flash kernel.");
        }
        Ok(alive)
    }

    fn report_failure(&self, exchange: &Exchange) {
        if !exchange.failure.is_empty() {
            self.logger.user_message(&exchange.failure);
        }
    }

    fn progress_message(&self, exchange: &Exchange, message: &str) {
        if message.is_empty() {
            return;
        }
        if exchange.quiet {
            self.logger.debug_message(message);
        } else {
            self.logger.user_message(message);
        }
    }
}
