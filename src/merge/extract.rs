use super::columns;
use super::fragment::{Fragment, Metadata, SupportInfo};
use super::row::RawRow;

/// Pull everything the merge cares about out of one source row.
///
/// The result always carries `source`; callers drop fragments whose `name` is empty.
pub fn extract(row: &RawRow, source: &str) -> Fragment {
    let name = row.first_text(columns::NAME).unwrap_or_default();

    let sites = collect_unique(row, columns::SITES, |_| true);
    let emails = collect_unique(row, columns::EMAILS, |v| v.contains('@'));

    let support = extract_support(row);
    let metadata = extract_metadata(row);

    Fragment {
        name,
        sites,
        emails,
        industry: row.first_text(columns::INDUSTRY),
        inn: row.first_text(columns::INN),
        support_info: (!support.is_empty()).then_some(support),
        metadata: (!metadata.is_empty()).then_some(metadata),
        sources: vec![source.to_string()],
        source: source.to_string(),
        normalized_name: String::new(),
        last_updated: None,
    }
}

fn collect_unique<F>(row: &RawRow, cols: &[&str], keep: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut out: Vec<String> = Vec::new();
    for col in cols {
        if let Some(val) = row.text(col) {
            if keep(&val) && !out.contains(&val) {
                out.push(val);
            }
        }
    }
    out
}

fn extract_support(row: &RawRow) -> SupportInfo {
    let mut support = SupportInfo {
        team_size: row.first_count(columns::TEAM_SIZE),
        evidence: row.first_text(columns::EVIDENCE),
        evidence_url: row.first_text(columns::EVIDENCE_URL),
        chat_vendor: row.first_text(columns::CHAT_VENDOR),
        support_vacancies: row.first_count(columns::SUPPORT_VACANCIES),
        total_vacancies: row.first_count(columns::TOTAL_VACANCIES),
        vacancy_details: row.first_text(columns::VACANCY_DETAILS),
        ..Default::default()
    };
    for (col, channel) in columns::CHANNELS {
        if let Some(flag) = row.flag(col) {
            support.channels.insert(*channel, flag);
        }
    }
    support
}

fn extract_metadata(row: &RawRow) -> Metadata {
    Metadata {
        parsing_success: row.flag(columns::PARSING_SUCCESS),
        parsing_method: row.text(columns::PARSING_METHOD),
        analysis_success: row.flag(columns::ANALYSIS_SUCCESS),
        data_source: row.text(columns::DATA_SOURCE),
        page_title: row.text(columns::PAGE_TITLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::fragment::{Channel, Count};

    #[test]
    fn name_uses_first_non_empty_candidate() {
        let row = RawRow::new()
            .with("name", "  ")
            .with("company_name", "Ромашка")
            .with("employer", "Other");
        assert_eq!(extract(&row, "seed").name, "Ромашка");
    }

    #[test]
    fn sites_keep_first_seen_order_and_dedupe() {
        let row = RawRow::new()
            .with("site", "https://a.ru")
            .with("final_url", "https://a.ru")
            .with("support_url", "https://a.ru/help")
            .with("website", "a.ru");
        let f = extract(&row, "site");
        assert_eq!(f.sites, vec!["https://a.ru", "a.ru", "https://a.ru/help"]);
    }

    #[test]
    fn emails_require_at_sign() {
        let row = RawRow::new()
            .with("support_email", "help@a.ru")
            .with("email", "n/a")
            .with("contact_email", "help@a.ru");
        assert_eq!(extract(&row, "site").emails, vec!["help@a.ru"]);
    }

    #[test]
    fn team_size_falls_back_to_raw_text() {
        let row = RawRow::new().with("name", "A").with("team_size", "около 10");
        let f = extract(&row, "jobs");
        assert_eq!(f.team_size(), Some(&Count::Text("около 10".into())));

        let row = RawRow::new()
            .with("name", "A")
            .with("support_team_size_min", "12.0")
            .with("team_size", 40i64);
        assert_eq!(extract(&row, "jobs").team_size(), Some(&Count::Number(12)));
    }

    #[test]
    fn support_only_when_a_column_is_present() {
        let row = RawRow::new().with("name", "A").with("industry", "Retail");
        let f = extract(&row, "seed");
        assert!(f.support_info.is_none());
        assert!(f.metadata.is_none());
        assert_eq!(f.industry.as_deref(), Some("Retail"));
    }

    #[test]
    fn channels_and_metadata() {
        let row = RawRow::new()
            .with("name", "A")
            .with("has_online_chat", true)
            .with("has_contact_form", "False")
            .with("mentions_24_7", 1i64)
            .with("chat_vendor", "jivo")
            .with("parsing_method", "requests")
            .with("source", "hh.ru");
        let f = extract(&row, "site");
        let support = f.support_info.unwrap();
        assert!(support.channel(Channel::OnlineChat));
        assert!(support.channel(Channel::TwentyFourSeven));
        assert_eq!(support.channels.get(&Channel::ContactForm), Some(&false));
        assert!(!support.channel(Channel::Email));
        assert_eq!(support.chat_vendor.as_deref(), Some("jivo"));
        let meta = f.metadata.unwrap();
        assert_eq!(meta.parsing_method.as_deref(), Some("requests"));
        assert_eq!(meta.data_source.as_deref(), Some("hh.ru"));
        assert_eq!(f.sources, vec!["site"]);
    }

    #[test]
    fn empty_row_still_carries_source() {
        let f = extract(&RawRow::new(), "jobs");
        assert!(f.name.is_empty());
        assert_eq!(f.source, "jobs");
    }
}
