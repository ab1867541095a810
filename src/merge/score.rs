use serde::Serialize;

use super::fragment::{Channel, Fragment};

const BASIC_CAP: u32 = 30;
const CONTACT_CAP: u32 = 30;
const SUPPORT_CAP: u32 = 40;
const CHANNELS_CAP: u32 = 10;
const PER_CHANNEL: u32 = 3;

pub const NO_INFO: &str = "Информация отсутствует";

/// Data-completeness score in `0..=100`.
///
/// Three buckets, each capped: identity (name, inn, industry), contacts
/// (primary site, primary email) and support evidence.
pub fn score(fragment: &Fragment) -> u32 {
    let basic = present(!fragment.name.is_empty(), 10)
        + present(has_text(&fragment.inn), 10)
        + present(has_text(&fragment.industry), 10);

    let contact = present(fragment.primary_site().is_some(), 15)
        + present(fragment.primary_email().is_some(), 15);

    let support = match &fragment.support_info {
        Some(info) => {
            let channels = (info.active_channels() as u32 * PER_CHANNEL).min(CHANNELS_CAP);
            10 + present(info.team_size.as_ref().is_some_and(|t| t.is_truthy()), 10)
                + present(has_text(&info.evidence), 10)
                + channels
        }
        None => 0,
    };

    (basic.min(BASIC_CAP) + contact.min(CONTACT_CAP) + support.min(SUPPORT_CAP)).min(100)
}

fn present(cond: bool, points: u32) -> u32 {
    if cond {
        points
    } else {
        0
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// A merged fragment frozen with its derived summary fields.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyRecord {
    pub company_id: String,
    pub data_quality_score: u32,
    pub primary_site: Option<String>,
    pub primary_email: Option<String>,
    pub has_support_team: bool,
    pub support_team_size: i64,
    pub support_channels_count: usize,
    pub has_24_7_support: bool,
    pub support_vacancies: i64,
    pub total_vacancies: i64,
    pub data_sources: String,
    pub description: String,
    #[serde(flatten)]
    pub fragment: Fragment,
}

/// `seq` is 1-based; ids are assigned in enrichment order, before any sort.
pub fn enrich(fragment: Fragment, seq: usize) -> CompanyRecord {
    let data_quality_score = score(&fragment);
    let support = fragment.support_info.clone().unwrap_or_default();

    let team_size = support.team_size.as_ref();
    let has_support_team = team_size.is_some_and(|t| t.is_truthy());
    let support_team_size = team_size.and_then(|t| t.as_number()).unwrap_or(0);
    let support_channels_count = support.active_channels();

    let mut parts = Vec::new();
    if let Some(industry) = fragment.industry.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("Отрасль: {}", industry));
    }
    if let Some(size) = team_size.filter(|t| t.is_truthy()) {
        parts.push(format!("Размер команды поддержки: {}", size));
    }
    if support_channels_count > 0 {
        parts.push(format!("Каналы поддержки: {}", support_channels_count));
    }
    let description = if parts.is_empty() {
        NO_INFO.to_string()
    } else {
        parts.join(" | ")
    };

    CompanyRecord {
        company_id: format!("C{:04}", seq),
        data_quality_score,
        primary_site: fragment.primary_site().map(str::to_string),
        primary_email: fragment.primary_email().map(str::to_string),
        has_support_team,
        support_team_size,
        support_channels_count,
        has_24_7_support: support.channel(Channel::TwentyFourSeven),
        support_vacancies: support
            .support_vacancies
            .as_ref()
            .and_then(|c| c.as_number())
            .unwrap_or(0),
        total_vacancies: support
            .total_vacancies
            .as_ref()
            .and_then(|c| c.as_number())
            .unwrap_or(0),
        data_sources: fragment.sources.join(", "),
        description,
        fragment,
    }
}

/// Enrich every fragment in index order.
pub fn enrich_all(fragments: Vec<Fragment>) -> Vec<CompanyRecord> {
    fragments
        .into_iter()
        .enumerate()
        .map(|(i, f)| enrich(f, i + 1))
        .collect()
}
