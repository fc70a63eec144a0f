use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("relay at {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("relay at {address} refused the request: HTTP {status}")]
    Refused { address: String, status: u16 },

    #[error("relay at {address} sent an unreadable reply: {reason}")]
    BadReply { address: String, reason: String },
}

impl RelayError {
    pub(crate) fn unreachable(address: &str, err: reqwest::Error) -> Self {
        Self::Unreachable {
            address: address.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn bad_reply(address: &str, err: reqwest::Error) -> Self {
        Self::BadReply {
            address: address.to_string(),
            reason: err.to_string(),
        }
    }
}
