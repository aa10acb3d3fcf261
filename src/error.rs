/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code.
    ///
    /// The message is the upstream body's `message` field when it carries
    /// one, otherwise the synthesized status line `Error: <status> <reason>`.
    /// `Display` prints the message alone so consumers can surface it as-is.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// Response body could not be parsed as the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FeedError {
    /// HTTP status code of the failing response, when the error is [`FeedError::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            FeedError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FeedError;

    #[test]
    fn http_error_displays_message_alone() {
        let err = FeedError::Http {
            status: 404,
            message: "Coin not found".to_owned(),
        };
        assert_eq!(err.to_string(), "Coin not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn decode_error_is_prefixed() {
        let err = FeedError::Decode("expected value at line 1".to_owned());
        assert_eq!(err.to_string(), "decode error: expected value at line 1");
        assert_eq!(err.status(), None);
    }
}
