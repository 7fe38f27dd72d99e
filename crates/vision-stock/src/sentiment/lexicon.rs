//! Word valences on the -4..=4 scale, plus modifier word lists

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Increment applied by intensifiers such as "very"
pub(super) const BOOSTER_INCR: f64 = 0.293;
/// Decrement applied by dampeners such as "slightly"
pub(super) const BOOSTER_DECR: f64 = -0.293;
/// Extra valence for an ALL-CAPS sentiment word in mixed-case text
pub(super) const CAPS_INCR: f64 = 0.733;
/// Scalar applied to a negated sentiment word
pub(super) const NEGATION_SCALAR: f64 = -0.74;

static VALENCES: &[(&str, f64)] = &[
    // general
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 2.7),
    ("best", 3.2),
    ("better", 1.9),
    ("positive", 2.6),
    ("happy", 2.7),
    ("win", 2.8),
    ("wins", 2.7),
    ("winning", 2.4),
    ("success", 2.7),
    ("successful", 2.8),
    ("strong", 2.3),
    ("stronger", 2.1),
    ("strength", 2.2),
    ("optimism", 2.5),
    ("optimistic", 2.3),
    ("confident", 2.2),
    ("confidence", 2.3),
    ("hope", 1.9),
    ("love", 3.2),
    ("like", 1.5),
    ("nice", 1.8),
    ("wonderful", 2.7),
    ("amazing", 2.8),
    ("impressive", 2.3),
    ("benefit", 2.0),
    ("benefits", 1.6),
    ("opportunity", 1.8),
    ("opportunities", 1.6),
    ("support", 1.7),
    ("secure", 1.4),
    ("safe", 1.9),
    ("stable", 1.2),
    ("growth", 1.6),
    ("grow", 1.3),
    ("grows", 1.1),
    ("growing", 1.2),
    ("bad", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("poor", -2.1),
    ("negative", -2.7),
    ("fear", -2.2),
    ("fears", -1.8),
    ("worry", -1.9),
    ("worries", -1.8),
    ("worried", -1.2),
    ("concern", -1.4),
    ("concerns", -1.3),
    ("risk", -1.1),
    ("risks", -1.1),
    ("risky", -1.4),
    ("weak", -1.9),
    ("weaker", -1.9),
    ("weakness", -1.6),
    ("fail", -2.5),
    ("fails", -2.2),
    ("failed", -2.3),
    ("failure", -2.3),
    ("problem", -1.7),
    ("problems", -1.7),
    ("trouble", -1.7),
    ("crisis", -3.1),
    ("threat", -2.4),
    ("threats", -1.8),
    ("warn", -1.4),
    ("warns", -1.4),
    ("warning", -1.4),
    ("lose", -1.7),
    ("loses", -1.3),
    ("losing", -1.6),
    ("loss", -1.3),
    ("losses", -1.7),
    ("lost", -1.3),
    ("hurt", -2.4),
    ("hurts", -2.1),
    ("damage", -2.2),
    ("uncertain", -1.2),
    ("uncertainty", -1.4),
    ("volatile", -1.1),
    ("panic", -2.3),
    ("scandal", -2.6),
    ("fraud", -2.8),
    ("lawsuit", -1.3),
    ("probe", -0.8),
    ("bankrupt", -2.6),
    ("bankruptcy", -2.7),
    ("layoffs", -1.8),
    ("recession", -2.1),
    ("inflation", -0.9),
    ("debt", -1.5),
    ("default", -1.7),
    ("angry", -2.3),
    ("sad", -2.1),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("horrible", -2.5),
    ("disappoint", -1.9),
    ("disappointing", -2.2),
    ("disappointed", -1.9),
    ("disappointment", -2.3),
    // market moves
    ("gain", 2.4),
    ("gains", 1.8),
    ("gained", 1.6),
    ("rise", 0.9),
    ("rises", 0.9),
    ("rising", 0.8),
    ("jump", 1.0),
    ("jumps", 1.0),
    ("surge", 1.6),
    ("surges", 1.6),
    ("surged", 1.5),
    ("soar", 2.0),
    ("soars", 2.0),
    ("soared", 1.9),
    ("rally", 1.7),
    ("rallies", 1.6),
    ("boom", 1.9),
    ("booming", 2.0),
    ("rebound", 1.4),
    ("rebounds", 1.4),
    ("recover", 1.4),
    ("recovery", 1.5),
    ("record", 0.6),
    ("beat", 0.9),
    ("beats", 1.0),
    ("upgrade", 1.6),
    ("upgraded", 1.6),
    ("outperform", 1.8),
    ("bullish", 2.1),
    ("profit", 1.9),
    ("profits", 1.9),
    ("profitable", 2.0),
    ("boost", 1.7),
    ("boosts", 1.5),
    ("climb", 1.0),
    ("climbs", 1.0),
    ("fall", -1.0),
    ("falls", -1.0),
    ("falling", -1.0),
    ("fell", -1.1),
    ("drop", -1.1),
    ("drops", -1.1),
    ("dropped", -1.1),
    ("decline", -1.1),
    ("declines", -1.1),
    ("slide", -1.1),
    ("slides", -1.1),
    ("slump", -1.8),
    ("slumps", -1.8),
    ("plunge", -2.0),
    ("plunges", -2.0),
    ("plunged", -2.0),
    ("tumble", -1.7),
    ("tumbles", -1.7),
    ("sink", -1.3),
    ("sinks", -1.3),
    ("crash", -2.6),
    ("crashes", -2.6),
    ("selloff", -1.8),
    ("sell-off", -1.8),
    ("miss", -1.1),
    ("misses", -1.2),
    ("downgrade", -1.6),
    ("downgraded", -1.6),
    ("underperform", -1.7),
    ("bearish", -2.1),
    ("cut", -1.1),
    ("cuts", -1.1),
];

static NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere",
    "cannot", "without", "isnt", "arent", "wasnt", "werent", "dont", "doesnt",
    "didnt", "cant", "couldnt", "wont", "wouldnt", "shouldnt", "hasnt", "havent",
    "hadnt", "aint",
];

static BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOSTER_INCR),
    ("completely", BOOSTER_INCR),
    ("deeply", BOOSTER_INCR),
    ("enormously", BOOSTER_INCR),
    ("extremely", BOOSTER_INCR),
    ("hugely", BOOSTER_INCR),
    ("incredibly", BOOSTER_INCR),
    ("massively", BOOSTER_INCR),
    ("most", BOOSTER_INCR),
    ("more", BOOSTER_INCR),
    ("really", BOOSTER_INCR),
    ("sharply", BOOSTER_INCR),
    ("significantly", BOOSTER_INCR),
    ("so", BOOSTER_INCR),
    ("strongly", BOOSTER_INCR),
    ("totally", BOOSTER_INCR),
    ("very", BOOSTER_INCR),
    ("barely", BOOSTER_DECR),
    ("hardly", BOOSTER_DECR),
    ("less", BOOSTER_DECR),
    ("little", BOOSTER_DECR),
    ("marginally", BOOSTER_DECR),
    ("mildly", BOOSTER_DECR),
    ("modestly", BOOSTER_DECR),
    ("partly", BOOSTER_DECR),
    ("slightly", BOOSTER_DECR),
    ("somewhat", BOOSTER_DECR),
];

static VALENCE_MAP: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| VALENCES.iter().copied().collect());

static NEGATION_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| NEGATIONS.iter().copied().collect());

static BOOSTER_MAP: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| BOOSTERS.iter().copied().collect());

/// Valence for a lower-cased word
pub(super) fn valence(word: &str) -> Option<f64> {
    VALENCE_MAP.get(word).copied()
}

/// Booster scalar for a lower-cased word
pub(super) fn booster(word: &str) -> Option<f64> {
    BOOSTER_MAP.get(word).copied()
}

/// Whether a lower-cased word negates what follows
pub(super) fn is_negation(word: &str) -> bool {
    let stripped: String = word.chars().filter(|c| *c != '\'').collect();
    NEGATION_SET.contains(stripped.as_str()) || word.ends_with("n't")
}
