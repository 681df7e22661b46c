use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(JobState {
    Queued => "queued",
    Running => "running",
    Completed => "completed",
    Error => "error",
});

impl JobState {
    /// Completed and error are final: a job never leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

str_enum!(ErrorKind {
    UnsupportedFormat => "unsupported_format",
    CorruptDocument => "corrupt_document",
    OcrEngineError => "ocr_engine_error",
    NoExtractableContent => "no_extractable_content",
    JobNotFound => "job_not_found",
    Internal => "internal",
});

str_enum!(FileCategory {
    Pdf => "pdf",
    Image => "image",
    Unsupported => "unsupported",
});

impl FileCategory {
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn job_state_round_trip() {
        for (variant, s) in [
            (JobState::Queued, "queued"),
            (JobState::Running, "running"),
            (JobState::Completed, "completed"),
            (JobState::Error, "error"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(JobState::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn only_completed_and_error_are_terminal() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Error.is_terminal());
    }

    #[test]
    fn error_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NoExtractableContent).unwrap();
        assert_eq!(json, "\"no_extractable_content\"");
        assert_eq!(ErrorKind::OcrEngineError.to_string(), "ocr_engine_error");
    }

    #[test]
    fn invalid_enum_value_rejected() {
        let err = JobState::from_str("cancelled").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }
}
