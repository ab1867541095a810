use std::collections::{BTreeMap, HashSet};
use std::fmt;

use itertools::Itertools;

use crate::merge::score::CompanyRecord;

/// The slice of a master-table row the overview and report work from.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRow {
    pub company_id: String,
    pub name: String,
    pub normalized_name: String,
    pub industry: Option<String>,
    pub primary_site: Option<String>,
    pub score: u32,
    pub has_support_team: bool,
    pub team_size: i64,
    pub channels: usize,
    pub has_24_7: bool,
}

impl From<&CompanyRecord> for CompanyRow {
    fn from(r: &CompanyRecord) -> Self {
        CompanyRow {
            company_id: r.company_id.clone(),
            name: r.fragment.name.clone(),
            normalized_name: r.fragment.normalized_name.clone(),
            industry: r.fragment.industry.clone(),
            primary_site: r.primary_site.clone(),
            score: r.data_quality_score,
            has_support_team: r.has_support_team,
            team_size: r.support_team_size,
            channels: r.support_channels_count,
            has_24_7: r.has_24_7_support,
        }
    }
}

pub const SCORE_BINS: [(&str, u32, u32); 5] = [
    ("very low", 0, 30),
    ("low", 30, 50),
    ("medium", 50, 70),
    ("high", 70, 90),
    ("very high", 90, 101),
];

const INDUSTRY_LIMIT: usize = 10;
const LOW_SCORE: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub label: &'static str,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndustryStats {
    pub industry: String,
    pub companies: usize,
    pub mean_score: f64,
    pub with_team: usize,
    /// Over every company in the industry; unknown sizes count as zero.
    pub mean_team_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total: usize,
    pub distinct_names: usize,
    pub mean_score: f64,
    pub bins: Vec<Bin>,
    pub with_team: usize,
    pub with_24_7: usize,
    /// Over companies with a numeric team size above zero.
    pub mean_team_size: f64,
    pub mean_channels: f64,
    pub top: Vec<CompanyRow>,
    pub industries: Vec<IndustryStats>,
    pub low_score: usize,
    pub without_team_info: usize,
}

fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn analyze(rows: &[CompanyRow], top_n: usize) -> Report {
    let total = rows.len();
    let distinct_names = rows
        .iter()
        .map(|r| r.normalized_name.as_str())
        .collect::<HashSet<_>>()
        .len();

    let bins = SCORE_BINS
        .iter()
        .map(|&(label, lo, hi)| {
            let count = rows.iter().filter(|r| r.score >= lo && r.score < hi).count();
            Bin {
                label,
                count,
                pct: pct(count, total),
            }
        })
        .collect();

    let with_team = rows.iter().filter(|r| r.has_support_team).count();

    let top = rows
        .iter()
        .sorted_by(|a, b| b.score.cmp(&a.score))
        .take(top_n)
        .cloned()
        .collect();

    let mut by_industry: BTreeMap<&str, Vec<&CompanyRow>> = BTreeMap::new();
    for row in rows {
        if let Some(industry) = row.industry.as_deref().filter(|s| !s.is_empty()) {
            by_industry.entry(industry).or_default().push(row);
        }
    }
    let industries = by_industry
        .into_iter()
        .map(|(industry, group)| IndustryStats {
            industry: industry.to_string(),
            companies: group.len(),
            mean_score: mean(group.iter().map(|r| r.score as f64)),
            with_team: group.iter().filter(|r| r.has_support_team).count(),
            mean_team_size: mean(group.iter().map(|r| r.team_size as f64)),
        })
        .sorted_by(|a, b| b.mean_score.total_cmp(&a.mean_score))
        .take(INDUSTRY_LIMIT)
        .collect();

    Report {
        total,
        distinct_names,
        mean_score: mean(rows.iter().map(|r| r.score as f64)),
        bins,
        with_team,
        with_24_7: rows.iter().filter(|r| r.has_24_7).count(),
        mean_team_size: mean(
            rows.iter()
                .filter(|r| r.team_size > 0)
                .map(|r| r.team_size as f64),
        ),
        mean_channels: mean(rows.iter().map(|r| r.channels as f64)),
        top,
        industries,
        low_score: rows.iter().filter(|r| r.score < LOW_SCORE).count(),
        without_team_info: total - with_team,
    }
}

impl fmt::Display for Report {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(out, "=== Company master report ===")?;
        writeln!(out, "Companies:        {}", self.total)?;
        writeln!(out, "Distinct names:   {}", self.distinct_names)?;
        writeln!(out, "Mean score:       {:.1}", self.mean_score)?;

        writeln!(out, "\n--- Data quality ---")?;
        for bin in &self.bins {
            writeln!(out, "  {:<10} {:>6} ({:.1}%)", bin.label, bin.count, bin.pct)?;
        }

        writeln!(out, "\n--- Support ---")?;
        writeln!(
            out,
            "  With support team: {} ({:.1}%)",
            self.with_team,
            pct(self.with_team, self.total)
        )?;
        writeln!(
            out,
            "  With 24/7:         {} ({:.1}%)",
            self.with_24_7,
            pct(self.with_24_7, self.total)
        )?;
        writeln!(out, "  Mean team size:    {:.1}", self.mean_team_size)?;
        writeln!(out, "  Mean channels:     {:.1}", self.mean_channels)?;

        if !self.top.is_empty() {
            writeln!(out, "\n--- Top {} by score ---", self.top.len())?;
            for (i, r) in self.top.iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}. {} [{}] score {} | team {} | channels {}",
                    i + 1,
                    r.name,
                    r.industry.as_deref().unwrap_or("-"),
                    r.score,
                    r.team_size,
                    r.channels
                )?;
            }
        }

        if !self.industries.is_empty() {
            writeln!(out, "\n--- Industries ---")?;
            for s in &self.industries {
                writeln!(
                    out,
                    "  {:<24} {:>4} companies | score {:.1} | teams {} | team size {:.1}",
                    s.industry, s.companies, s.mean_score, s.with_team, s.mean_team_size
                )?;
            }
        }

        writeln!(out, "\n--- Recommendations ---")?;
        writeln!(
            out,
            "  {} companies score below {}: enrich their contacts",
            self.low_score, LOW_SCORE
        )?;
        writeln!(
            out,
            "  {} companies have no support team info",
            self.without_team_info
        )?;
        Ok(())
    }
}
