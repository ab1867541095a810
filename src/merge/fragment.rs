use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A numeric-looking field that falls back to the raw text when it does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(_) => None,
        }
    }

    /// Zero and empty text are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Count::Number(n) => *n != 0,
            Count::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Number(n) => write!(f, "{}", n),
            Count::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    ContactForm,
    OnlineChat,
    Messengers,
    SupportSection,
    KbFaq,
    #[serde(rename = "24_7")]
    TwentyFourSeven,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Email,
        Channel::ContactForm,
        Channel::OnlineChat,
        Channel::Messengers,
        Channel::SupportSection,
        Channel::KbFaq,
        Channel::TwentyFourSeven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::ContactForm => "contact_form",
            Channel::OnlineChat => "online_chat",
            Channel::Messengers => "messengers",
            Channel::SupportSection => "support_section",
            Channel::KbFaq => "kb_faq",
            Channel::TwentyFourSeven => "24_7",
        }
    }
}

pub type Channels = BTreeMap<Channel, bool>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportInfo {
    pub team_size: Option<Count>,
    pub evidence: Option<String>,
    pub evidence_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub channels: Channels,
    pub chat_vendor: Option<String>,
    pub support_vacancies: Option<Count>,
    pub total_vacancies: Option<Count>,
    pub vacancy_details: Option<String>,
}

impl SupportInfo {
    pub fn is_empty(&self) -> bool {
        self == &SupportInfo::default()
    }

    pub fn channel(&self, channel: Channel) -> bool {
        self.channels.get(&channel).copied().unwrap_or(false)
    }

    pub fn active_channels(&self) -> usize {
        self.channels.values().filter(|v| **v).count()
    }
}

/// Provenance and debug flags copied from the collectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub parsing_success: Option<bool>,
    pub parsing_method: Option<String>,
    pub analysis_success: Option<bool>,
    pub data_source: Option<String>,
    pub page_title: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self == &Metadata::default()
    }
}

/// Everything known about one company, accumulated across source tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fragment {
    pub name: String,
    pub sites: Vec<String>,
    pub emails: Vec<String>,
    pub industry: Option<String>,
    pub inn: Option<String>,
    pub support_info: Option<SupportInfo>,
    pub metadata: Option<Metadata>,
    pub sources: Vec<String>,
    /// Table the fragment was extracted from; not kept after merging.
    #[serde(skip)]
    pub source: String,
    pub normalized_name: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Fragment {
    pub fn primary_site(&self) -> Option<&str> {
        self.sites.first().map(String::as_str)
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    pub fn team_size(&self) -> Option<&Count> {
        self.support_info.as_ref()?.team_size.as_ref()
    }
}
