use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure an endpoint can report, grouped by kind.
/// The kind decides the response status; the message is returned as the
/// response body and logged against the request ID.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    /// Ill-formed input caught by a handler, e.g. an invalid election window
    /// or a bad challenge code.
    #[error("Invalid request: {0}")]
    Validation(String),
    /// Missing or invalid admin session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The caller is known but not allowed, e.g. an unverified wallet voting.
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// A write that lost to an earlier one: duplicate votes, duplicate
    /// registrations, candidates after the freeze, refinalizing differently.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// An operation attempted in the wrong lifecycle phase.
    #[error("Wrong election state: {0}")]
    State(String),
    /// An external collaborator (SMS delivery, ledger) failed.
    #[error("External service failure: {0}")]
    External(String),
}

impl Error {
    /// Shorthand for the most common error.
    pub fn not_found(what: impl Into<String>) -> Self {
        let mut msg = what.into();
        msg.push_str(" not found");
        Self::NotFound(msg)
    }

    /// The response status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Validation(_) | Self::State(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::External(_) => Status::BadGateway,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Respond with the status for this error's kind and the message as a
    /// plain-text body, logging it against the request ID.
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let id = req.local_cache(RequestId::next);
        let status = self.status();
        if status.class().is_server_error() {
            error!("err in req{id}: {self}");
        } else {
            warn!("err in req{id}: {self}");
        }
        (status, self.to_string()).respond_to(req)
    }
}
