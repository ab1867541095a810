//! Column names recognised in the collector tables. Earlier entries win.

use super::fragment::Channel;

pub const NAME: &[&str] = &["name", "company_name", "employer", "hh_employer_name"];

pub const SITES: &[&str] = &[
    "site",
    "site_url",
    "website",
    "final_url",
    "url",
    "hh_employer_url",
    "support_url",
    "kb_url",
];

pub const EMAILS: &[&str] = &["support_email", "email", "e-mail", "contact_email"];

pub const INDUSTRY: &[&str] = &["industry"];

pub const INN: &[&str] = &["inn"];

pub const TEAM_SIZE: &[&str] = &["support_team_size_min", "support_team_size", "team_size"];

pub const EVIDENCE: &[&str] = &["support_evidence", "evidence_type"];

pub const EVIDENCE_URL: &[&str] = &["evidence_url"];

pub const CHAT_VENDOR: &[&str] = &["chat_vendor"];

pub const SUPPORT_VACANCIES: &[&str] = &["support_vacancies_found"];

pub const TOTAL_VACANCIES: &[&str] = &["vacancies_count"];

pub const VACANCY_DETAILS: &[&str] = &["vacancy_details"];

pub const CHANNELS: &[(&str, Channel)] = &[
    ("has_support_email", Channel::Email),
    ("has_contact_form", Channel::ContactForm),
    ("has_online_chat", Channel::OnlineChat),
    ("has_messengers", Channel::Messengers),
    ("has_support_section", Channel::SupportSection),
    ("has_kb_or_faq", Channel::KbFaq),
    ("mentions_24_7", Channel::TwentyFourSeven),
];

pub const PARSING_SUCCESS: &str = "parsing_success";
pub const PARSING_METHOD: &str = "parsing_method";
pub const ANALYSIS_SUCCESS: &str = "analysis_success";
/// The collectors' own `source` column, kept as `metadata.data_source`.
pub const DATA_SOURCE: &str = "source";
pub const PAGE_TITLE: &str = "page_title";
