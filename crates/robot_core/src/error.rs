use std::fmt;

/// Numeric error taxonomy shared by every job.
///
/// Codes below [`ErrorCode::USER_DEFINED`] belong to the base job, the
/// request pipeline uses the range right above it, and endpoints extend the
/// taxonomy upward through [`ErrorCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Killed,
    MissingConfig,
    MissingUser,
    MissingPassword,
    InvalidRequestUrl,
    RequestTimedOut,
    JsonParseError,
    WrongOutputType,
    EmptyJson,
    EmptyReply,
    NetworkError,
    NotFound,
    Custom(i32),
}

impl ErrorCode {
    /// First code available to job implementations.
    pub const USER_DEFINED: i32 = 100;

    pub fn code(self) -> i32 {
        match self {
            ErrorCode::Killed => 1,
            ErrorCode::MissingConfig => Self::USER_DEFINED + 1,
            ErrorCode::MissingUser => Self::USER_DEFINED + 2,
            ErrorCode::MissingPassword => Self::USER_DEFINED + 3,
            ErrorCode::InvalidRequestUrl => Self::USER_DEFINED + 4,
            ErrorCode::RequestTimedOut => Self::USER_DEFINED + 5,
            ErrorCode::JsonParseError => Self::USER_DEFINED + 6,
            ErrorCode::WrongOutputType => Self::USER_DEFINED + 7,
            ErrorCode::EmptyJson => Self::USER_DEFINED + 8,
            ErrorCode::EmptyReply => Self::USER_DEFINED + 9,
            ErrorCode::NetworkError => Self::USER_DEFINED + 10,
            ErrorCode::NotFound => Self::USER_DEFINED + 11,
            ErrorCode::Custom(code) => code,
        }
    }

    /// Maps a numeric code back to its variant. `0` means "no error".
    pub fn from_code(code: i32) -> Option<Self> {
        let known = [
            ErrorCode::Killed,
            ErrorCode::MissingConfig,
            ErrorCode::MissingUser,
            ErrorCode::MissingPassword,
            ErrorCode::InvalidRequestUrl,
            ErrorCode::RequestTimedOut,
            ErrorCode::JsonParseError,
            ErrorCode::WrongOutputType,
            ErrorCode::EmptyJson,
            ErrorCode::EmptyReply,
            ErrorCode::NetworkError,
            ErrorCode::NotFound,
        ];
        if code == 0 {
            return None;
        }
        Some(
            known
                .into_iter()
                .find(|candidate| candidate.code() == code)
                .unwrap_or(ErrorCode::Custom(code)),
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Custom(code) => write!(f, "Custom({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Terminal error of a job: a code plus a free-text detail.
///
/// `Display` renders the human-readable message; the detail is embedded
/// for the codes that carry one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub struct JobError {
    pub code: ErrorCode,
    pub text: String,
}

impl JobError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            text: String::new(),
        }
    }

    pub fn with_text(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn is_killed(&self) -> bool {
        self.code == ErrorCode::Killed
    }

    /// Human-readable message for this error.
    ///
    /// `NetworkError` is the raw transport text. Custom codes fall back to
    /// their detail text when one is present.
    pub fn message(&self) -> String {
        match self.code {
            ErrorCode::Killed => "The job has been killed.".to_string(),
            ErrorCode::MissingConfig => "No configuration set.".to_string(),
            ErrorCode::MissingUser => "Missing username.".to_string(),
            ErrorCode::MissingPassword => "Missing user password.".to_string(),
            ErrorCode::InvalidRequestUrl => format!(
                "The URL ({}) generated to perform the request is not valid, please check your input values.",
                self.text
            ),
            ErrorCode::RequestTimedOut => {
                format!("The request timed out after {} seconds.", self.text)
            }
            ErrorCode::JsonParseError => {
                format!("Failed to parse the received JSON data: {}", self.text)
            }
            ErrorCode::WrongOutputType => "Unexpected JSON type in received data.".to_string(),
            ErrorCode::EmptyJson | ErrorCode::EmptyReply => {
                "Unexpected empty reply data.".to_string()
            }
            ErrorCode::NetworkError => self.text.clone(),
            ErrorCode::NotFound => "The requested resource could not be found.".to_string(),
            ErrorCode::Custom(_) if !self.text.is_empty() => self.text.clone(),
            ErrorCode::Custom(_) => {
                "Sorry, but unfortunately an unknown error has occurred.".to_string()
            }
        }
    }
}
