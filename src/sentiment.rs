//! # Sentiment Scorer
//! Lexicon-based polarity scoring in the VADER family: every token with a
//! lexicon valence contributes to a signed sum, adjusted for negation,
//! intensity boosters, capitalisation and trailing punctuation. The sum is
//! squashed into a compound score in `[-1, 1]`; the positive / negative /
//! neutral shares of the text sum to exactly 1.
//!
//! Pure and deterministic: no I/O, no randomness, no state between calls.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Compound score at or above which a headline is `positive`.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound score at or below which a headline is `negative`.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCR: f64 = 0.293;
const CAPS_INCR: f64 = 0.733;
const EXCLAIM_INCR: f64 = 0.292;
const QUESTION_INCR: f64 = 0.18;
const NORMALIZATION_ALPHA: f64 = 15.0;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Four-component polarity score of one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentScores {
    /// Score of empty or unscoreable text.
    pub const fn neutral() -> Self {
        Self {
            compound: 0.0,
            positive: 0.0,
            negative: 0.0,
            neutral: 1.0,
        }
    }

    pub fn classification(&self) -> Classification {
        classify(self.compound)
    }
}

/// Three-way label derived from the compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Positive,
    Negative,
    Neutral,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Positive => "positive",
            Classification::Negative => "negative",
            Classification::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Classification::Positive),
            "negative" => Some(Classification::Negative),
            "neutral" => Some(Classification::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed thresholding policy; the only place a classification is derived.
pub fn classify(compound: f64) -> Classification {
    if compound >= POSITIVE_THRESHOLD {
        Classification::Positive
    } else if compound <= NEGATIVE_THRESHOLD {
        Classification::Negative
    } else {
        Classification::Neutral
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn valence(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }

    /// Score arbitrary text. Never fails; text without any lexicon hit is
    /// fully neutral.
    pub fn score(&self, text: &str) -> SentimentScores {
        let raw_tokens = tokenize(text);
        if raw_tokens.is_empty() {
            return SentimentScores::neutral();
        }
        let lower: Vec<String> = raw_tokens.iter().map(|t| t.to_lowercase()).collect();

        // Shouting only counts when the rest of the text is not shouted too.
        let caps_count = raw_tokens.iter().filter(|t| is_all_caps(t)).count();
        let caps_differential = caps_count > 0 && caps_count < raw_tokens.len();

        let mut sentiments = Vec::with_capacity(raw_tokens.len());
        for (i, word) in lower.iter().enumerate() {
            let Some(base) = self.valence(word) else {
                sentiments.push(0.0);
                continue;
            };

            let mut v = base;
            if caps_differential && is_all_caps(raw_tokens[i]) {
                v += CAPS_INCR * v.signum();
            }

            let mut negated = false;
            for k in 1..=3 {
                if i < k {
                    break;
                }
                let prev = lower[i - k].as_str();
                let decay = 1.0 - 0.05 * (k as f64 - 1.0);
                if is_booster(prev) {
                    v += BOOSTER_INCR * decay * v.signum();
                } else if is_damper(prev) {
                    v -= BOOSTER_INCR * decay * v.signum();
                }
                if is_negator(prev) {
                    negated = true;
                }
            }
            if negated {
                v *= NEGATION_SCALAR;
            }
            sentiments.push(v);
        }

        // Contrastive "but": the clause after it carries the weight.
        if let Some(pivot) = lower.iter().position(|w| w == "but") {
            for (i, s) in sentiments.iter_mut().enumerate() {
                if i < pivot {
                    *s *= 0.5;
                } else if i > pivot {
                    *s *= 1.5;
                }
            }
        }

        let punct = punctuation_emphasis(text);
        let mut sum: f64 = sentiments.iter().sum();
        if sum > 0.0 {
            sum += punct;
        } else if sum < 0.0 {
            sum -= punct;
        }
        let compound = normalize_sum(sum);

        let mut pos_sum = 0.0f64;
        let mut neg_sum = 0.0f64;
        let mut neu_count = 0.0f64;
        for &s in &sentiments {
            if s > 0.0 {
                pos_sum += s + 1.0;
            } else if s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1.0;
            }
        }
        if pos_sum > neg_sum.abs() {
            pos_sum += punct;
        } else if pos_sum < neg_sum.abs() {
            neg_sum -= punct;
        }

        let total = pos_sum + neg_sum.abs() + neu_count;
        if total <= 0.0 {
            return SentimentScores::neutral();
        }

        SentimentScores {
            compound,
            positive: pos_sum / total,
            negative: neg_sum.abs() / total,
            neutral: neu_count / total,
        }
    }
}

fn normalize_sum(sum: f64) -> f64 {
    let c = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
    c.clamp(-1.0, 1.0)
}

/// Whitespace tokens with surrounding punctuation trimmed; apostrophes are
/// kept so contractions like "isn't" survive.
fn tokenize(s: &str) -> Vec<&str> {
    s.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .collect()
}

fn is_all_caps(tok: &str) -> bool {
    tok.chars().filter(|c| c.is_alphabetic()).count() > 1
        && !tok.chars().any(|c| c.is_lowercase())
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclaims = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let question_amp = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_INCR,
        _ => 0.96,
    };
    exclaims * EXCLAIM_INCR + question_amp
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nothing"
            | "neither"
            | "nor"
            | "without"
            | "cannot"
            | "hardly"
            | "barely"
    ) || tok.ends_with("n't")
}

fn is_booster(tok: &str) -> bool {
    matches!(
        tok,
        "very"
            | "extremely"
            | "highly"
            | "hugely"
            | "sharply"
            | "significantly"
            | "massively"
            | "incredibly"
            | "really"
            | "so"
            | "most"
            | "more"
    )
}

fn is_damper(tok: &str) -> bool {
    matches!(
        tok,
        "slightly" | "somewhat" | "marginally" | "less" | "little" | "kinda"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums_to_one(s: &SentimentScores) -> bool {
        (s.positive + s.negative + s.neutral - 1.0).abs() < 1e-9
    }

    #[test]
    fn lexicon_is_parseable_and_nonempty() {
        assert!(LEXICON.len() > 100);
        assert!(LEXICON.get("soars").copied().unwrap_or_default() > 0.0);
        assert!(LEXICON.get("plunge").copied().unwrap_or_default() < 0.0);
    }

    #[test]
    fn empty_and_punctuation_only_are_neutral() {
        let a = SentimentAnalyzer::new();
        assert_eq!(a.score(""), SentimentScores::neutral());
        assert_eq!(a.score("   \n\t"), SentimentScores::neutral());
        assert_eq!(a.score("!!! ??? ..."), SentimentScores::neutral());
    }

    #[test]
    fn polarity_follows_lexicon() {
        let a = SentimentAnalyzer::new();
        let up = a.score("Palantir stock soars after record earnings beat");
        assert!(up.compound > 0.5, "{up:?}");
        assert_eq!(up.classification(), Classification::Positive);
        assert!(sums_to_one(&up));

        let down = a.score("Palantir shares plunge on lawsuit fears");
        assert!(down.compound < -0.5, "{down:?}");
        assert_eq!(down.classification(), Classification::Negative);
        assert!(sums_to_one(&down));
    }

    #[test]
    fn no_lexicon_hits_is_fully_neutral() {
        let a = SentimentAnalyzer::new();
        let s = a.score("Palantir to report earnings on Monday");
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.neutral, 1.0);
        assert_eq!(s.classification(), Classification::Neutral);
    }

    #[test]
    fn negation_flips_sign() {
        let a = SentimentAnalyzer::new();
        assert!(a.score("Results were good").compound > 0.0);
        assert!(a.score("Results were not good").compound < 0.0);
        assert!(a.score("Results weren't good").compound < 0.0);
    }

    #[test]
    fn boosters_and_exclamations_intensify() {
        let a = SentimentAnalyzer::new();
        let plain = a.score("Palantir posts strong quarter").compound;
        let boosted = a.score("Palantir posts very strong quarter").compound;
        let shouted = a.score("Palantir posts strong quarter!!").compound;
        assert!(boosted > plain);
        assert!(shouted > plain);
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        let a = SentimentAnalyzer::new();
        let s = a.score("Revenue growth is good but guidance is terrible");
        assert!(s.compound < 0.0, "{s:?}");
    }

    #[test]
    fn deterministic() {
        let a = SentimentAnalyzer::new();
        let t = "Palantir rallies as Army contract win boosts optimism";
        assert_eq!(a.score(t), a.score(t));
    }

    #[test]
    fn classification_round_trips_through_str() {
        for c in [
            Classification::Positive,
            Classification::Negative,
            Classification::Neutral,
        ] {
            assert_eq!(Classification::parse(c.as_str()), Some(c));
        }
        assert_eq!(Classification::parse("bullish"), None);
    }
}
