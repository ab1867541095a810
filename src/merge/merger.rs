use chrono::{DateTime, Utc};

use super::fragment::{Count, Fragment, Metadata, SupportInfo};

/// Fold `incoming` into `existing`, stamping `last_updated` with the current time.
pub fn merge(existing: Option<Fragment>, incoming: Fragment) -> Fragment {
    merge_at(existing, incoming, Utc::now())
}

/// Field policy:
/// * sets (sites, emails, sources) are unioned in first-seen order;
/// * counts keep the larger number; a mixed number/text pair keeps whatever was there first;
/// * channel flags are OR-ed;
/// * everything else keeps the first non-empty value.
///
/// Only the first-wins fields depend on the order fragments arrive in.
pub fn merge_at(existing: Option<Fragment>, incoming: Fragment, now: DateTime<Utc>) -> Fragment {
    let mut merged = existing.unwrap_or_default();

    if merged.name.is_empty() {
        merged.name = incoming.name;
    }

    union_into(&mut merged.sites, incoming.sites);
    union_into(&mut merged.emails, incoming.emails);

    first_wins(&mut merged.industry, incoming.industry);
    first_wins(&mut merged.inn, incoming.inn);

    merged.support_info = match (merged.support_info.take(), incoming.support_info) {
        (Some(current), Some(new)) => Some(merge_support(current, new)),
        (current, new) => current.or(new),
    };

    merged.metadata = match (merged.metadata.take(), incoming.metadata) {
        (Some(current), Some(new)) => Some(merge_metadata(current, new)),
        (current, new) => current.or(new),
    };

    let mut sources = incoming.sources;
    if !incoming.source.is_empty() {
        sources.push(incoming.source);
    }
    union_into(&mut merged.sources, sources);

    merged.last_updated = Some(now);
    merged
}

fn union_into(target: &mut Vec<String>, values: Vec<String>) {
    for v in values {
        if !target.contains(&v) {
            target.push(v);
        }
    }
}

fn first_wins(target: &mut Option<String>, value: Option<String>) {
    let empty = target.as_deref().map_or(true, str::is_empty);
    if empty {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            *target = Some(v);
        }
    }
}

fn max_count(target: &mut Option<Count>, value: Option<Count>) {
    let Some(new) = value else {
        return;
    };
    let replace = match (target.as_ref(), &new) {
        (None, _) => true,
        (Some(Count::Number(current)), Count::Number(n)) => n > current,
        _ => false,
    };
    if replace {
        *target = Some(new);
    }
}

fn merge_support(mut current: SupportInfo, new: SupportInfo) -> SupportInfo {
    max_count(&mut current.team_size, new.team_size);
    max_count(&mut current.support_vacancies, new.support_vacancies);
    max_count(&mut current.total_vacancies, new.total_vacancies);

    for (channel, seen) in new.channels {
        let flag = current.channels.entry(channel).or_insert(false);
        *flag = *flag || seen;
    }

    first_wins(&mut current.evidence, new.evidence);
    first_wins(&mut current.evidence_url, new.evidence_url);
    first_wins(&mut current.chat_vendor, new.chat_vendor);
    first_wins(&mut current.vacancy_details, new.vacancy_details);
    current
}

fn merge_metadata(current: Metadata, new: Metadata) -> Metadata {
    let text = |a: Option<String>, b: Option<String>| {
        let mut out = a;
        first_wins(&mut out, b);
        out
    };
    Metadata {
        parsing_success: current.parsing_success.or(new.parsing_success),
        parsing_method: text(current.parsing_method, new.parsing_method),
        analysis_success: current.analysis_success.or(new.analysis_success),
        data_source: text(current.data_source, new.data_source),
        page_title: text(current.page_title, new.page_title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::fragment::Channel;
    use chrono::TimeZone;

    fn frag(source: &str) -> Fragment {
        Fragment {
            name: "A".into(),
            sources: vec![source.into()],
            source: source.into(),
            ..Default::default()
        }
    }

    fn support(f: impl FnOnce(&mut SupportInfo)) -> Option<SupportInfo> {
        let mut s = SupportInfo::default();
        f(&mut s);
        Some(s)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 23, 16, 51, 11).unwrap()
    }

    #[test]
    fn name_kept_when_present() {
        let mut b = frag("b");
        b.name = "B".into();
        assert_eq!(merge_at(Some(frag("a")), b.clone(), now()).name, "A");

        let mut empty = frag("a");
        empty.name.clear();
        assert_eq!(merge_at(Some(empty), b, now()).name, "B");
    }

    #[test]
    fn sets_union_in_first_seen_order() {
        let mut a = frag("a");
        a.sites = vec!["x.ru".into(), "y.ru".into()];
        a.emails = vec!["a@x.ru".into()];
        let mut b = frag("b");
        b.sites = vec!["y.ru".into(), "z.ru".into()];
        b.emails = vec!["b@x.ru".into(), "a@x.ru".into()];

        let m = merge_at(Some(a), b, now());
        assert_eq!(m.sites, vec!["x.ru", "y.ru", "z.ru"]);
        assert_eq!(m.emails, vec!["a@x.ru", "b@x.ru"]);
        assert_eq!(m.primary_site(), Some("x.ru"));
        assert_eq!(m.primary_email(), Some("a@x.ru"));
    }

    #[test]
    fn inn_first_wins_in_either_order() {
        let mut a = frag("a");
        a.inn = Some("111".into());
        let mut b = frag("b");
        b.inn = Some("222".into());

        assert_eq!(
            merge_at(Some(a.clone()), b.clone(), now()).inn.as_deref(),
            Some("111")
        );
        assert_eq!(merge_at(Some(b), a, now()).inn.as_deref(), Some("222"));
    }

    #[test]
    fn empty_text_does_not_block_later_value() {
        let mut a = frag("a");
        a.industry = Some(String::new());
        let mut b = frag("b");
        b.industry = Some("Retail".into());
        assert_eq!(merge_at(Some(a), b, now()).industry.as_deref(), Some("Retail"));
    }

    #[test]
    fn counts_keep_maximum() {
        let mut a = frag("a");
        a.support_info = support(|s| s.team_size = Some(Count::Number(12)));
        let mut b = frag("b");
        b.support_info = support(|s| {
            s.team_size = Some(Count::Number(5));
            s.total_vacancies = Some(Count::Number(40));
        });
        let m = merge_at(Some(a), b, now());
        let s = m.support_info.unwrap();
        assert_eq!(s.team_size, Some(Count::Number(12)));
        assert_eq!(s.total_vacancies, Some(Count::Number(40)));
    }

    #[test]
    fn mixed_counts_keep_existing() {
        let mut a = frag("a");
        a.support_info = support(|s| s.team_size = Some(Count::Number(12)));
        let mut b = frag("b");
        b.support_info = support(|s| s.team_size = Some(Count::Text("много".into())));

        let ab = merge_at(Some(a.clone()), b.clone(), now());
        let ba = merge_at(Some(b), a, now());
        assert_eq!(ab.team_size(), Some(&Count::Number(12)));
        assert_eq!(ba.team_size(), Some(&Count::Text("много".into())));
    }

    #[test]
    fn channels_are_or_ed() {
        let mut a = frag("a");
        a.support_info = support(|s| {
            s.channels.insert(Channel::OnlineChat, true);
            s.channels.insert(Channel::Email, false);
        });
        let mut b = frag("b");
        b.support_info = support(|s| {
            s.channels.insert(Channel::OnlineChat, false);
            s.channels.insert(Channel::Email, true);
            s.channels.insert(Channel::KbFaq, false);
        });
        let ab = merge_at(Some(a.clone()), b.clone(), now());
        let ba = merge_at(Some(b), a, now());
        let channels = &ab.support_info.as_ref().unwrap().channels;
        assert_eq!(channels.get(&Channel::OnlineChat), Some(&true));
        assert_eq!(channels.get(&Channel::Email), Some(&true));
        assert_eq!(channels.get(&Channel::KbFaq), Some(&false));
        assert_eq!(channels, &ba.support_info.unwrap().channels);
    }

    #[test]
    fn support_free_text_first_wins() {
        let mut a = frag("a");
        a.support_info = support(|s| s.evidence = Some("vacancy".into()));
        let mut b = frag("b");
        b.support_info = support(|s| {
            s.evidence = Some("site".into());
            s.chat_vendor = Some("jivo".into());
        });
        let s = merge_at(Some(a), b, now()).support_info.unwrap();
        assert_eq!(s.evidence.as_deref(), Some("vacancy"));
        assert_eq!(s.chat_vendor.as_deref(), Some("jivo"));
    }

    #[test]
    fn metadata_first_value_per_key() {
        let mut a = frag("a");
        a.metadata = Some(Metadata {
            parsing_method: Some("requests".into()),
            ..Default::default()
        });
        let mut b = frag("b");
        b.metadata = Some(Metadata {
            parsing_method: Some("selenium".into()),
            parsing_success: Some(false),
            ..Default::default()
        });
        let meta = merge_at(Some(a), b, now()).metadata.unwrap();
        assert_eq!(meta.parsing_method.as_deref(), Some("requests"));
        assert_eq!(meta.parsing_success, Some(false));
    }

    #[test]
    fn sources_appended_once_and_timestamp_set() {
        let m = merge_at(Some(frag("site")), frag("jobs"), now());
        let m = merge_at(Some(m), frag("site"), now());
        assert_eq!(m.sources, vec!["site", "jobs"]);
        assert_eq!(m.last_updated, Some(now()));
    }

    #[test]
    fn merge_into_nothing_takes_incoming() {
        let mut b = frag("jobs");
        b.inn = Some("7700".into());
        let m = merge_at(None, b, now());
        assert_eq!(m.name, "A");
        assert_eq!(m.inn.as_deref(), Some("7700"));
        assert_eq!(m.sources, vec!["jobs"]);
    }

    #[test]
    fn order_insensitive_fields_are_commutative() {
        let mut a = frag("a");
        a.sites = vec!["a.ru".into(), "shared.ru".into()];
        a.emails = vec!["help@a.ru".into(), "info@shared.ru".into()];
        a.support_info = support(|s| {
            s.team_size = Some(Count::Number(3));
            s.support_vacancies = Some(Count::Number(7));
            s.channels.insert(Channel::Email, true);
            s.channels.insert(Channel::OnlineChat, false);
        });
        let mut b = frag("b");
        b.sites = vec!["shared.ru".into(), "b.ru".into()];
        b.emails = vec!["info@shared.ru".into(), "sales@b.ru".into()];
        b.support_info = support(|s| {
            s.team_size = Some(Count::Number(9));
            s.support_vacancies = Some(Count::Number(2));
            s.total_vacancies = Some(Count::Number(30));
            s.channels.insert(Channel::OnlineChat, true);
            s.channels.insert(Channel::KbFaq, false);
        });

        let ab = merge_at(Some(a.clone()), b.clone(), now());
        let ba = merge_at(Some(b), a, now());

        let sorted = |v: &[String]| {
            let mut v = v.to_vec();
            v.sort();
            v
        };
        assert_eq!(sorted(&ab.sites), sorted(&ba.sites));
        assert_eq!(sorted(&ab.sites), vec!["a.ru", "b.ru", "shared.ru"]);
        assert_eq!(sorted(&ab.emails), sorted(&ba.emails));
        assert_eq!(
            sorted(&ab.emails),
            vec!["help@a.ru", "info@shared.ru", "sales@b.ru"]
        );

        let (sa, sb) = (ab.support_info.unwrap(), ba.support_info.unwrap());
        assert_eq!(sa.channels, sb.channels);
        assert_eq!(sa.active_channels(), 2);
        assert_eq!(sa.team_size, Some(Count::Number(9)));
        assert_eq!(sa.team_size, sb.team_size);
        assert_eq!(sa.support_vacancies, Some(Count::Number(7)));
        assert_eq!(sa.support_vacancies, sb.support_vacancies);
        assert_eq!(sa.total_vacancies, Some(Count::Number(30)));
        assert_eq!(sa.total_vacancies, sb.total_vacancies);
    }

    #[test]
    fn order_insensitive_fields_are_associative() {
        let mut a = frag("a");
        a.sites = vec!["a.ru".into()];
        a.support_info = support(|s| {
            s.team_size = Some(Count::Number(3));
            s.channels.insert(Channel::Email, true);
        });
        let mut b = frag("b");
        b.sites = vec!["b.ru".into()];
        b.support_info = support(|s| {
            s.team_size = Some(Count::Number(9));
            s.support_vacancies = Some(Count::Number(2));
        });
        let mut c = frag("c");
        c.sites = vec!["a.ru".into(), "c.ru".into()];
        c.support_info = support(|s| {
            s.support_vacancies = Some(Count::Number(4));
            s.channels.insert(Channel::Messengers, true);
        });

        let left = merge_at(Some(merge_at(Some(a.clone()), b.clone(), now())), c.clone(), now());
        let right = merge_at(Some(a), merge_at(Some(b), c, now()), now());
        let mut l_sites = left.sites.clone();
        let mut r_sites = right.sites.clone();
        l_sites.sort();
        r_sites.sort();
        assert_eq!(l_sites, r_sites);

        let (ls, rs) = (left.support_info.unwrap(), right.support_info.unwrap());
        assert_eq!(ls.team_size, rs.team_size);
        assert_eq!(ls.support_vacancies, rs.support_vacancies);
        assert_eq!(ls.channels, rs.channels);
    }
}
