// Priority-weighted evidence ranking: source-authority tier × token-overlap
// relevance, with tier-ordered selection so authoritative sources are never
// crowded out by a flood of low-tier matches.

use std::collections::HashSet;

use claimtrace_common::{EvidenceItem, EvidenceSource, RankedEvidence, SourceTier};

use crate::search::REGIONAL_FACTCHECK_WHITELIST;

/// Downstream synthesis sees at most this many evidence items.
pub const MAX_SELECTED: usize = 10;
/// Fact-check-tier items get at most this many of the selection slots first.
const MAX_FACT_CHECK_SLOTS: usize = 5;
/// Flat score bonus for fact-check-tier evidence.
const FACT_CHECK_BONUS: f32 = 0.5;

/// Known fact-check publishers; matching any of these puts a URL in the
/// fact-check tier regardless of its source tag.
const FACT_CHECK_DOMAINS: &[&str] = &[
    "factcheck.org",
    "snopes.com",
    "politifact.com",
    "factchecker.in",
    "fullfact.org",
    "africacheck.org",
    "checkyourfact.com",
    "leadstories.com",
    "factcheck",
    "snopes",
    "politifact",
];

/// Government and education TLD patterns.
const GOV_EDU_PATTERNS: &[&str] = &[".gov", ".gov.uk", ".gov.au", ".gov.ca", ".europa.eu", ".edu", ".ac.uk", ".edu.au", ".ac.ca"];

/// Major news organizations.
const NEWS_DOMAINS: &[&str] = &[
    "reuters.com",
    "ap.org",
    "bbc.com",
    "bbc.co.uk",
    "nytimes.com",
    "washingtonpost.com",
    "theguardian.com",
    "wsj.com",
    "bloomberg.com",
    "cnn.com",
    "npr.org",
    "pbs.org",
];

/// Classify an evidence item's origin into a priority tier.
pub fn source_tier(url: &str, source: EvidenceSource) -> SourceTier {
    if source == EvidenceSource::FactCheckApi {
        return SourceTier::FactCheck;
    }

    let url_lower = url.to_lowercase();

    if FACT_CHECK_DOMAINS
        .iter()
        .chain(REGIONAL_FACTCHECK_WHITELIST.iter())
        .any(|domain| url_lower.contains(domain))
    {
        return SourceTier::FactCheck;
    }

    if GOV_EDU_PATTERNS.iter().any(|pattern| {
        url_lower.ends_with(pattern) || url_lower.contains(&format!("{pattern}/"))
    }) {
        return SourceTier::Authoritative;
    }

    if NEWS_DOMAINS.iter().any(|domain| url_lower.contains(domain)) {
        return SourceTier::Authoritative;
    }

    SourceTier::Other
}

/// Weighted token overlap between the claim and the item's title and body:
/// title overlap × 0.4 + body overlap × 0.3, each normalized by the claim's
/// word count. Effective range [0, 0.7].
fn relevance_score(claim_words: &HashSet<String>, item: &EvidenceItem) -> f32 {
    if claim_words.is_empty() {
        return 0.0;
    }
    let denominator = claim_words.len() as f32;

    let overlap = |text: &str| -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let words: HashSet<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();
        claim_words.intersection(&words).count() as f32 / denominator
    };

    overlap(&item.title) * 0.4 + overlap(item.body_text()) * 0.3
}

pub struct EvidenceRanker;

impl EvidenceRanker {
    /// Score and order evidence for a claim. The sort is stable, so items
    /// with equal scores keep their retrieval order.
    pub fn rank(claim: &str, items: Vec<EvidenceItem>) -> Vec<RankedEvidence> {
        let claim_words: HashSet<String> = claim
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect();

        let mut ranked: Vec<RankedEvidence> = items
            .into_iter()
            .map(|item| {
                let tier = source_tier(&item.url, item.source);
                let relevance = relevance_score(&claim_words, &item);
                let mut final_score = relevance * tier.weight();
                if tier == SourceTier::FactCheck {
                    final_score += FACT_CHECK_BONUS;
                }
                RankedEvidence {
                    is_authoritative: tier.weight() >= SourceTier::Authoritative.weight(),
                    relevance_score: relevance,
                    tier,
                    final_score,
                    item,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
    }

    /// Select up to `max` items in strict tier order: fact-check items fill
    /// the first (at most 5) slots, authoritative items the remainder, then
    /// everything else.
    pub fn select(ranked: &[RankedEvidence], max: usize) -> Vec<RankedEvidence> {
        let of_tier = |tier: SourceTier| ranked.iter().filter(move |r| r.tier == tier).cloned();

        let mut selected: Vec<RankedEvidence> = of_tier(SourceTier::FactCheck)
            .take(MAX_FACT_CHECK_SLOTS.min(max))
            .collect();

        let remaining = max.saturating_sub(selected.len());
        selected.extend(of_tier(SourceTier::Authoritative).take(remaining));

        let remaining = max.saturating_sub(selected.len());
        selected.extend(of_tier(SourceTier::Other).take(remaining));

        selected.truncate(max);
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, source: EvidenceSource, title: &str, snippet: &str) -> EvidenceItem {
        EvidenceItem::new(title, url, snippet, source)
    }

    #[test]
    fn test_source_tier_fact_check_by_tag() {
        assert_eq!(
            source_tier("https://random.example/x", EvidenceSource::FactCheckApi),
            SourceTier::FactCheck
        );
    }

    #[test]
    fn test_source_tier_fact_check_by_domain() {
        assert_eq!(
            source_tier("https://www.snopes.com/check", EvidenceSource::WebSearch),
            SourceTier::FactCheck
        );
        assert_eq!(
            source_tier("https://altnews.in/story", EvidenceSource::WebSearch),
            SourceTier::FactCheck
        );
    }

    #[test]
    fn test_source_tier_authoritative() {
        assert_eq!(
            source_tier("https://www.cdc.gov", EvidenceSource::WebSearch),
            SourceTier::Authoritative
        );
        assert_eq!(
            source_tier("https://www.cdc.gov/vaccines/safety", EvidenceSource::WebSearch),
            SourceTier::Authoritative
        );
        assert_eq!(
            source_tier("https://www.reuters.com/article", EvidenceSource::WebSearch),
            SourceTier::Authoritative
        );
        assert_eq!(
            source_tier("https://www.mit.edu", EvidenceSource::WebSearch),
            SourceTier::Authoritative
        );
    }

    #[test]
    fn test_source_tier_other() {
        assert_eq!(
            source_tier("https://someblog.example/post", EvidenceSource::WebSearch),
            SourceTier::Other
        );
    }

    #[test]
    fn test_rank_orders_descending() {
        let claim = "vaccines cause autism";
        let items = vec![
            item("https://blog.example/a", EvidenceSource::WebSearch, "unrelated", "nothing"),
            item(
                "https://snopes.com/b",
                EvidenceSource::WebSearch,
                "vaccines cause autism",
                "vaccines cause autism claim reviewed",
            ),
            item(
                "https://reuters.com/c",
                EvidenceSource::WebSearch,
                "vaccines autism review",
                "review of the claim",
            ),
        ];
        let ranked = EvidenceRanker::rank(claim, items);
        for pair in ranked.windows(2) {
            assert!(pair[0].final_score >= pair[1].final_score);
        }
        assert_eq!(ranked[0].item.url, "https://snopes.com/b");
    }

    #[test]
    fn test_scores_within_derivable_bounds() {
        let claim = "the earth orbits the sun once a year";
        let items = vec![
            item("https://snopes.com/a", EvidenceSource::FactCheckApi, claim, claim),
            item("https://nasa.gov/b", EvidenceSource::WebSearch, claim, claim),
            item("https://blog.example/c", EvidenceSource::WebSearch, claim, claim),
        ];
        for r in EvidenceRanker::rank(claim, items) {
            assert!(r.relevance_score >= 0.0 && r.relevance_score <= 0.7 + 1e-6);
            let max = 0.7 * r.tier.weight()
                + if r.tier == SourceTier::FactCheck { FACT_CHECK_BONUS } else { 0.0 };
            assert!(r.final_score >= 0.0 && r.final_score <= max + 1e-6);
        }
    }

    #[test]
    fn test_stable_order_for_equal_scores() {
        let items = vec![
            item("https://a.example/1", EvidenceSource::WebSearch, "", ""),
            item("https://b.example/2", EvidenceSource::WebSearch, "", ""),
            item("https://c.example/3", EvidenceSource::WebSearch, "", ""),
        ];
        let ranked = EvidenceRanker::rank("some claim", items);
        assert_eq!(ranked[0].item.url, "https://a.example/1");
        assert_eq!(ranked[1].item.url, "https://b.example/2");
        assert_eq!(ranked[2].item.url, "https://c.example/3");
    }

    #[test]
    fn test_fact_check_bonus_applied() {
        let ranked = EvidenceRanker::rank(
            "claim words",
            vec![item("https://x.example/a", EvidenceSource::FactCheckApi, "", "")],
        );
        assert_eq!(ranked[0].final_score, FACT_CHECK_BONUS);
    }

    #[test]
    fn test_selection_tier_order_beats_relevance() {
        // One fact-check item with zero relevance against five high-overlap
        // OTHER items: the fact-check item still leads the selection.
        let claim = "solar panels generate power at night";
        let mut items = vec![item(
            "https://factcheck.example/a",
            EvidenceSource::FactCheckApi,
            "irrelevant title",
            "irrelevant snippet",
        )];
        for i in 0..5 {
            items.push(item(
                &format!("https://blog{i}.example/x"),
                EvidenceSource::WebSearch,
                claim,
                claim,
            ));
        }
        let ranked = EvidenceRanker::rank(claim, items);
        let selected = EvidenceRanker::select(&ranked, MAX_SELECTED);
        assert_eq!(selected[0].tier, SourceTier::FactCheck);
        assert_eq!(selected.len(), 6);
    }

    #[test]
    fn test_selection_caps_fact_check_slots() {
        let mut items = Vec::new();
        for i in 0..8 {
            items.push(item(
                &format!("https://snopes.com/{i}"),
                EvidenceSource::FactCheckApi,
                "t",
                "s",
            ));
        }
        for i in 0..8 {
            items.push(item(&format!("https://nasa.gov/{i}"), EvidenceSource::WebSearch, "t", "s"));
        }
        let ranked = EvidenceRanker::rank("claim", items);
        let selected = EvidenceRanker::select(&ranked, MAX_SELECTED);
        assert_eq!(selected.len(), MAX_SELECTED);
        let fc = selected.iter().filter(|r| r.tier == SourceTier::FactCheck).count();
        assert_eq!(fc, 5);
        let auth = selected.iter().filter(|r| r.tier == SourceTier::Authoritative).count();
        assert_eq!(auth, 5);
    }

    #[test]
    fn test_relevance_uses_crawled_text_when_present() {
        let mut evidence = item("https://blog.example/a", EvidenceSource::WebSearch, "", "nothing");
        evidence.crawled_text = Some("vaccines cause autism discussion".to_string());
        let ranked = EvidenceRanker::rank("vaccines cause autism", vec![evidence]);
        assert!(ranked[0].relevance_score > 0.0);
    }
}
