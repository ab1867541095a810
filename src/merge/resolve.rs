use std::collections::HashMap;

use tracing::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::extract::extract;
use super::fragment::Fragment;
use super::merger::merge;
use super::normalize::normalize_name;
use super::row::RawRow;

/// One fragment per normalized name, kept in first-seen order.
#[derive(Debug, Default)]
pub struct CompanyIndex {
    fragments: Vec<Fragment>,
    by_key: HashMap<String, usize>,
}

impl CompanyIndex {
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }

    fn upsert(&mut self, key: String, fragment: Fragment) -> bool {
        match self.by_key.get(&key) {
            Some(&idx) => {
                let slot = &mut self.fragments[idx];
                let current = std::mem::take(slot);
                *slot = merge(Some(current), fragment);
                false
            }
            None => {
                let mut fragment = fragment;
                fragment.normalized_name = key.clone();
                self.by_key.insert(key, self.fragments.len());
                self.fragments.push(fragment);
                true
            }
        }
    }
}

/// What happened to the rows of one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub rows: usize,
    pub skipped_blank_name: usize,
    pub new_companies: usize,
    pub merged: usize,
}

/// Incremental form of [`resolve`]: feed tables in order, then take the index.
#[derive(Debug, Default)]
pub struct Resolver {
    index: CompanyIndex,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, source: &str, rows: &[RawRow]) -> SourceStats {
        let mut stats = SourceStats {
            source: source.to_string(),
            rows: rows.len(),
            ..Default::default()
        };

        for (row, fragment) in extract_table(source, rows).into_iter().enumerate() {
            if fragment.name.is_empty() {
                debug!(source, row, "no company name, row skipped");
                stats.skipped_blank_name += 1;
                continue;
            }
            // a name of pure punctuation still counts; it lands under the empty key
            let key = normalize_name(&fragment.name);
            if self.index.upsert(key.clone(), fragment) {
                debug!(source, row, key = %key, "new company");
                stats.new_companies += 1;
            } else {
                debug!(source, row, key = %key, "merged into existing company");
                stats.merged += 1;
            }
        }

        debug!(
            source,
            rows = stats.rows,
            new = stats.new_companies,
            merged = stats.merged,
            skipped = stats.skipped_blank_name,
            "source resolved"
        );
        stats
    }

    pub fn finish(self) -> CompanyIndex {
        self.index
    }
}

/// Group every row of every source by normalized name, folding duplicates
/// together. Tables are consumed in the order given.
pub fn resolve<S, R>(sources: S) -> CompanyIndex
where
    S: IntoIterator<Item = (String, R)>,
    R: AsRef<[RawRow]>,
{
    let mut resolver = Resolver::new();
    for (name, rows) in sources {
        resolver.ingest(&name, rows.as_ref());
    }
    resolver.finish()
}

// Extraction is pure per row, so it can fan out; the fold above stays in table order.
#[cfg(feature = "rayon")]
fn extract_table(source: &str, rows: &[RawRow]) -> Vec<Fragment> {
    rows.par_iter().map(|row| extract(row, source)).collect()
}

#[cfg(not(feature = "rayon"))]
fn extract_table(source: &str, rows: &[RawRow]) -> Vec<Fragment> {
    rows.iter().map(|row| extract(row, source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::fragment::{Channel, Count};

    fn find<'a>(index: &'a CompanyIndex, key: &str) -> Option<&'a Fragment> {
        index.iter().find(|f| f.normalized_name == key)
    }

    #[test]
    fn site_then_jobs_fold_into_one_company() {
        let site = vec![RawRow::new()
            .with("name", "Ромашка")
            .with("support_team_size_min", 12i64)
            .with("has_online_chat", true)];
        let jobs = vec![RawRow::new()
            .with("name", "«Ромашка»")
            .with("support_vacancies_found", 3i64)
            .with("has_support_email", true)];
        let index = resolve(vec![("site".to_string(), site), ("jobs".to_string(), jobs)]);

        assert_eq!(index.len(), 1);
        let f = find(&index, "РОМАШКА").unwrap();
        let s = f.support_info.as_ref().unwrap();
        assert_eq!(s.team_size, Some(Count::Number(12)));
        assert_eq!(s.support_vacancies, Some(Count::Number(3)));
        assert_eq!(s.channels.len(), 2);
        assert!(s.channel(Channel::OnlineChat));
        assert!(s.channel(Channel::Email));
        assert_eq!(f.sources, vec!["site", "jobs"]);
    }

    #[test]
    fn legal_form_is_part_of_the_key() {
        let rows = vec![
            RawRow::new().with("name", "ООО Ромашка"),
            RawRow::new().with("name", "Ромашка"),
        ];
        let index = resolve(vec![("seed".to_string(), rows)]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn same_normalized_name_merges_across_sources() {
        let seed = vec![
            RawRow::new().with("name", "«Ромашка»").with("inn", "7701"),
            RawRow::new().with("name", "Лютик"),
        ];
        let jobs = vec![
            RawRow::new()
                .with("employer", "ромашка")
                .with("support_vacancies_found", 3i64),
            RawRow::new().with("employer", "Василёк"),
        ];
        let index = resolve(vec![("seed".to_string(), seed), ("jobs".to_string(), jobs)]);

        assert_eq!(index.len(), 3);
        let f = find(&index, "РОМАШКА").unwrap();
        assert_eq!(f.name, "«Ромашка»");
        assert_eq!(f.inn.as_deref(), Some("7701"));
        assert_eq!(f.sources, vec!["seed", "jobs"]);
        assert_eq!(f.normalized_name, "РОМАШКА");

        let order: Vec<&str> = index.iter().map(|f| f.normalized_name.as_str()).collect();
        assert_eq!(order, vec!["РОМАШКА", "ЛЮТИК", "ВАСИЛЁК"]);
    }

    #[test]
    fn only_empty_names_are_excluded() {
        let rows = vec![
            RawRow::new().with("name", "").with("inn", "1"),
            RawRow::new().with("site", "a.ru"),
            RawRow::new().with("name", "«»").with("inn", "7701"),
            RawRow::new().with("name", "Real"),
        ];
        let mut resolver = Resolver::new();
        let stats = resolver.ingest("seed", &rows);
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.skipped_blank_name, 2);
        assert_eq!(stats.new_companies, 2);
        let index = resolver.finish();
        assert_eq!(index.len(), 2);

        let punct = find(&index, "").unwrap();
        assert_eq!(punct.name, "«»");
        assert_eq!(punct.inn.as_deref(), Some("7701"));
    }

    #[test]
    fn punctuation_only_names_share_the_empty_key() {
        let rows = vec![
            RawRow::new().with("name", "«»").with("inn", "7701"),
            RawRow::new().with("name", "\"...\"").with("site", "x.ru"),
        ];
        let index = resolve(vec![("seed".to_string(), rows)]);
        assert_eq!(index.len(), 1);
        let f = find(&index, "").unwrap();
        assert_eq!(f.inn.as_deref(), Some("7701"));
        assert_eq!(f.sites, vec!["x.ru"]);
    }

    #[test]
    fn same_table_duplicates_merge() {
        let rows = vec![
            RawRow::new().with("name", "A").with("site", "a.ru"),
            RawRow::new().with("name", "a.").with("site", "b.ru"),
        ];
        let mut resolver = Resolver::new();
        let stats = resolver.ingest("seed", &rows);
        assert_eq!(stats.merged, 1);
        let index = resolver.finish();
        let f = find(&index, "A").unwrap();
        assert_eq!(f.sites, vec!["a.ru", "b.ru"]);
        assert_eq!(f.sources, vec!["seed"]);
        assert!(f.last_updated.is_some());
    }

    #[test]
    fn one_record_per_distinct_key() {
        let names = ["Alpha", "ALPHA", "alpha!", "Beta", "beta", "Gamma", "", "  "];
        let rows: Vec<RawRow> = names.iter().map(|n| RawRow::new().with("name", *n)).collect();
        let index = resolve(vec![("seed".to_string(), rows)]);
        let mut keys: Vec<&str> = index.iter().map(|f| f.normalized_name.as_str()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), index.len());
        assert_eq!(index.len(), 3);
    }
}
