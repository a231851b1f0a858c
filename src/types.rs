/// Shared types used across the codebase

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported site languages. Used both for UI copy and for per-entity translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Pt,
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Pt, Locale::En, Locale::Es];

    /// Locale every translated entity must carry; reads fall back to it.
    pub const FALLBACK: Locale = Locale::Pt;

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Pt => "pt",
            Locale::En => "en",
            Locale::Es => "es",
        }
    }
}

/// Named bucket of UI copy, editable per locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Common,
    Home,
    Services,
    Faq,
    Contact,
    About,
    News,
    Segments,
}

impl Namespace {
    pub const ALL: [Namespace; 8] = [
        Namespace::Common,
        Namespace::Home,
        Namespace::Services,
        Namespace::Faq,
        Namespace::Contact,
        Namespace::About,
        Namespace::News,
        Namespace::Segments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Common => "common",
            Namespace::Home => "home",
            Namespace::Services => "services",
            Namespace::Faq => "faq",
            Namespace::Contact => "contact",
            Namespace::About => "about",
            Namespace::News => "news",
            Namespace::Segments => "segments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unsupported locale '{0}'. Expected one of: pt, en, es")]
    Locale(String),

    #[error("Unknown namespace '{0}'")]
    Namespace(String),
}

impl FromStr for Locale {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::ALL
            .into_iter()
            .find(|locale| locale.as_str() == s)
            .ok_or_else(|| ParseError::Locale(s.to_string()))
    }
}

impl FromStr for Namespace {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| ParseError::Namespace(s.to_string()))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
