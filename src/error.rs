use std::sync::PoisonError;

use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection to {0} failed")]
    Connection(String),

    #[error("unable to find successor of #{0}")]
    Routing(String),

    #[error("all successors failed")]
    RingPartitioned,

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("node is off")]
    NotRunning,

    #[error("remote call failed: {0}")]
    Remote(String),

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::KeyNotFound(key) => Status::not_found(key),
            Error::Routing(id) => Status::aborted(id),
            Error::RingPartitioned => Status::failed_precondition(err.to_string()),
            Error::Connection(addr) => Status::unavailable(addr),
            Error::Parse(msg) => Status::invalid_argument(msg),
            err => Status::internal(err.to_string()),
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        let message = status.message().to_owned();
        match status.code() {
            Code::NotFound => Error::KeyNotFound(message),
            Code::Aborted => Error::Routing(message),
            Code::FailedPrecondition => Error::RingPartitioned,
            Code::Unavailable => Error::Connection(message),
            _ => Error::Remote(status.to_string()),
        }
    }
}

#[test]
fn test_status_round_trip_keeps_taxonomy() {
    let status: Status = Error::KeyNotFound("x".into()).into();
    assert_eq!(status.code(), Code::NotFound);
    assert!(matches!(Error::from(status), Error::KeyNotFound(key) if key == "x"));

    let status: Status = Error::RingPartitioned.into();
    assert!(matches!(Error::from(status), Error::RingPartitioned));

    let status: Status = Error::Routing("ab".into()).into();
    assert!(matches!(Error::from(status), Error::Routing(id) if id == "ab"));
}
