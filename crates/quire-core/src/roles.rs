use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::QuireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Author,
    Editor,
    Referee,
    CopyEditor,
    Formatter,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Author => "AUTHOR",
            Self::Editor => "EDITOR",
            Self::Referee => "REFEREE",
            Self::CopyEditor => "COPY_EDITOR",
            Self::Formatter => "FORMATTER",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::Editor => "Editor",
            Self::Referee => "Referee",
            Self::CopyEditor => "Copy editor",
            Self::Formatter => "Formatter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = QuireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "author" => Ok(Self::Author),
            "editor" => Ok(Self::Editor),
            "referee" | "reviewer" => Ok(Self::Referee),
            "copy_editor" | "copyeditor" => Ok(Self::CopyEditor),
            "formatter" => Ok(Self::Formatter),
            _ => Err(QuireError::UnknownCode(s.to_string())),
        }
    }
}

const DUPLICATE_ROLE_PATTERN: &str =
    r"(?i)\b(duplicate\s+role|role\s+already\s+(assigned|exists)|already\s+has\s+(this|the|that)\s+role)\b";

static DUPLICATE_ROLE: OnceLock<Option<Regex>> = OnceLock::new();

/// Matches the people service's wording for assigning a role twice.
///
/// There is no structured conflict code on that endpoint, so this couples us
/// to the server's error text. Keep the pattern narrow.
pub fn is_duplicate_role_error(message: &str) -> bool {
    DUPLICATE_ROLE
        .get_or_init(|| Regex::new(DUPLICATE_ROLE_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}
