use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Display preference persisted next to the habit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontTheme {
    #[default]
    Clean,
    Cartoon,
}

impl FontTheme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Clean => Self::Cartoon,
            Self::Cartoon => Self::Clean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Cartoon => "cartoon",
        }
    }
}

impl fmt::Display for FontTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "cartoon" => Ok(Self::Cartoon),
            other => Err(format!("unknown font theme `{other}`")),
        }
    }
}
