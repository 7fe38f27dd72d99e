//! Headline scraping and lexicon-based sentiment scoring
//!
//! Headlines are pulled from Google News search results and scored with a
//! VADER-style analyzer. The per-headline compound scores are summarised into
//! a [`NewsSentimentSummary`] that is reported next to each forecast.
//!
//! The lexicon holds a few hundred finance and general-purpose terms rather
//! than the full VADER word list, so compound scores track VADER's direction
//! but not its exact values. Words missing from the lexicon score 0.

mod analyzer;
mod lexicon;
mod scraper;

pub use analyzer::{PolarityScores, SentimentAnalyzer};
pub use scraper::{NewsScraper, extract_headlines};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Compound score at or above which a headline counts as positive
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound score at or below which a headline counts as negative
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

/// A scored headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSentiment {
    pub date: NaiveDate,
    pub headline: String,
    pub sentiment: f64,
}

/// Aggregate sentiment over a batch of headlines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsSentimentSummary {
    /// Mean compound score, 0 when nothing was scraped
    pub score: f64,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub headlines: Vec<HeadlineSentiment>,
}

impl NewsSentimentSummary {
    /// Summarise scored headlines
    pub fn aggregate(rows: Vec<HeadlineSentiment>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }

        let positive = rows
            .iter()
            .filter(|r| r.sentiment >= POSITIVE_THRESHOLD)
            .count();
        let negative = rows
            .iter()
            .filter(|r| r.sentiment <= NEGATIVE_THRESHOLD)
            .count();
        let score = rows.iter().map(|r| r.sentiment).sum::<f64>() / rows.len() as f64;

        Self {
            score,
            positive,
            negative,
            neutral: rows.len() - positive - negative,
            headlines: rows,
        }
    }

    /// Label for the mean score
    pub fn label(&self) -> &'static str {
        if self.score >= POSITIVE_THRESHOLD {
            "positive"
        } else if self.score <= NEGATIVE_THRESHOLD {
            "negative"
        } else {
            "neutral"
        }
    }
}
