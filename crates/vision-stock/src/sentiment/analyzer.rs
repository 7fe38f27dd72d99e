//! VADER-style rule-based sentiment scoring

use super::lexicon::{self, CAPS_INCR, NEGATION_SCALAR};
use serde::{Deserialize, Serialize};

/// Normalisation constant for the compound score
const ALPHA: f64 = 15.0;
const EXCLAMATION_INCR: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const QUESTION_INCR: f64 = 0.18;
const QUESTION_MAX: f64 = 0.96;

/// Proportions of negative, neutral and positive content plus the
/// normalised compound score in `[-1, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// Lexicon-driven sentiment analyzer
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

struct Token {
    lower: String,
    is_caps: bool,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score a piece of text
    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return PolarityScores::default();
        }

        let any_lower = tokens.iter().any(|t| !t.is_caps);
        let any_caps = tokens.iter().any(|t| t.is_caps);
        let mixed_case = any_lower && any_caps;

        let mut valences: Vec<f64> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| word_valence(&tokens, i, token, mixed_case))
            .collect();

        apply_but_rule(&tokens, &mut valences);

        let sum: f64 = valences.iter().sum();
        let emphasis = punctuation_emphasis(text);
        let compound = if sum > 0.0 {
            normalize(sum + emphasis)
        } else if sum < 0.0 {
            normalize(sum - emphasis)
        } else {
            normalize(sum)
        };

        let (mut pos_sum, mut neg_sum, mut neu_count) = (0.0, 0.0, 0.0);
        for v in &valences {
            if *v > 0.0 {
                pos_sum += v + 1.0;
            } else if *v < 0.0 {
                neg_sum += v - 1.0;
            } else {
                neu_count += 1.0;
            }
        }

        if pos_sum > neg_sum.abs() {
            pos_sum += emphasis;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= emphasis;
        }

        let total = pos_sum + neg_sum.abs() + neu_count;
        if total == 0.0 {
            return PolarityScores::default();
        }

        PolarityScores {
            neg: round3((neg_sum / total).abs()),
            neu: round3((neu_count / total).abs()),
            pos: round3((pos_sum / total).abs()),
            compound: round4(compound),
        }
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .filter(|w| w.chars().count() > 1)
        .map(|w| Token {
            lower: w.to_lowercase(),
            is_caps: w.chars().any(char::is_alphabetic)
                && w.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase),
        })
        .collect()
}

fn word_valence(tokens: &[Token], i: usize, token: &Token, mixed_case: bool) -> f64 {
    // boosters carry no valence of their own
    if lexicon::booster(&token.lower).is_some() {
        return 0.0;
    }

    let Some(mut valence) = lexicon::valence(&token.lower) else {
        return 0.0;
    };

    if token.is_caps && mixed_case {
        valence += CAPS_INCR.copysign(valence);
    }

    for distance in 1..=3 {
        let Some(prev) = i.checked_sub(distance).map(|j| &tokens[j]) else {
            break;
        };

        if let Some(scalar) = lexicon::booster(&prev.lower) {
            // boosters push away from zero, dampeners pull towards it
            let scalar = if valence < 0.0 { -scalar } else { scalar };
            let damp = match distance {
                1 => 1.0,
                2 => 0.95,
                _ => 0.9,
            };
            valence += scalar * damp;
        }

        if lexicon::is_negation(&prev.lower) {
            valence *= NEGATION_SCALAR;
        }
    }

    valence
}

/// Sentiment before "but" is halved, after it is boosted by half
fn apply_but_rule(tokens: &[Token], valences: &mut [f64]) {
    let Some(pos) = tokens.iter().position(|t| t.lower == "but") else {
        return;
    };
    for (i, v) in valences.iter_mut().enumerate() {
        if i < pos {
            *v *= 0.5;
        } else if i > pos {
            *v *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();
    let question_amp = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_INCR,
        _ => QUESTION_MAX,
    };
    exclamations as f64 * EXCLAMATION_INCR + question_amp
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
