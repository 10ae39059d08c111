//! Typed outcome of parsing a reply
//!
//! Refusal and failure are kept apart on purpose: the retry loops stop on
//! [`Response::Refused`] and keep going on [`Response::Failure`], and that
//! decision is made by [`Response::next_step`] from the variant alone.

use crate::error::Error;

/// Why an exchange did not produce a usable reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The device could not put the request on the bus
    SendFailed,
    /// Nothing arrived within the receive window
    NoReply,
    /// The reply was shorter than the expected shape
    Truncated,
    /// The reply did not match the request (wrong mode, echo or source)
    Unexpected,
}

impl Failure {
    /// Transport-level noise, as opposed to a protocol mismatch
    pub fn is_transport(self) -> bool {
        matches!(self, Self::SendFailed | Self::NoReply)
    }
}

/// Outcome of one request/reply exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<T> {
    /// Valid reply carrying a value
    Success(T),
    /// The module explicitly rejected the request
    Refused,
    /// Malformed, unexpected or missing reply
    Failure(Failure),
}

/// Acknowledgement-only reply
pub type Ack = Response<()>;

/// What a retry loop should do after seeing a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Return this response to the caller
    Stop,
    /// Try again if the budget allows
    Retry,
}

impl<T> Response<T> {
    /// Whether this is a `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether this is a `Refused`
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused)
    }

    /// The carried value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Map the success value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        match self {
            Self::Success(value) => Response::Success(f(value)),
            Self::Refused => Response::Refused,
            Self::Failure(failure) => Response::Failure(failure),
        }
    }

    /// Retry policy shared by every exchange loop
    ///
    /// Success and refusal are final; every failure may be bus noise.
    pub fn next_step(&self) -> NextStep {
        match self {
            Self::Success(_) | Self::Refused => NextStep::Stop,
            Self::Failure(_) => NextStep::Retry,
        }
    }

    /// Convert into a `Result`, naming the operation in the error
    pub fn into_result(self, operation: &str, attempts: u32) -> Result<T, Error> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Refused => Err(Error::Refused {
                operation: operation.to_string(),
            }),
            Self::Failure(_) => Err(Error::NoResponse {
                operation: operation.to_string(),
                attempts,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_step_is_a_function_of_the_variant() {
        assert_eq!(Response::Success(7u32).next_step(), NextStep::Stop);
        assert_eq!(Response::<u32>::Refused.next_step(), NextStep::Stop);
        for failure in [
            Failure::SendFailed,
            Failure::NoReply,
            Failure::Truncated,
            Failure::Unexpected,
        ] {
            assert_eq!(Response::<u32>::Failure(failure).next_step(), NextStep::Retry);
        }
    }

    #[test]
    fn test_transport_vs_protocol_failures() {
        assert!(Failure::SendFailed.is_transport());
        assert!(Failure::NoReply.is_transport());
        assert!(!Failure::Truncated.is_transport());
        assert!(!Failure::Unexpected.is_transport());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Response::Success(3u8).into_result("crc", 5).unwrap(), 3);
        assert!(matches!(
            Response::<u8>::Refused.into_result("crc", 5),
            Err(Error::Refused { .. })
        ));
        assert!(matches!(
            Response::<u8>::Failure(Failure::NoReply).into_result("crc", 5),
            Err(Error::NoResponse { attempts: 5, .. })
        ));
    }

    #[test]
    fn test_map_preserves_non_success() {
        assert_eq!(Response::Success(2u32).map(|v| v * 2), Response::Success(4));
        assert_eq!(Response::<u32>::Refused.map(|v| v * 2), Response::Refused);
    }
}
