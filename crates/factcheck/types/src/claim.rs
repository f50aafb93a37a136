//! Claims, evidence and verdicts as they travel through the state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Factuality judgement for a claim or a whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    False,
    /// Partly supported, partly contradicted.
    Mixed,
    /// No judgement could be made.
    Abstain,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "true",
            Verdict::False => "false",
            Verdict::Mixed => "mixed",
            Verdict::Abstain => "abstain",
        }
    }

    /// Combine per-claim verdicts into a response verdict.
    ///
    /// Abstentions are ignored unless every claim abstained.
    pub fn aggregate<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> Verdict {
        let mut saw_true = false;
        let mut saw_false = false;
        for verdict in verdicts {
            match verdict {
                Verdict::True => saw_true = true,
                Verdict::False => saw_false = true,
                Verdict::Mixed => return Verdict::Mixed,
                Verdict::Abstain => {}
            }
        }
        match (saw_true, saw_false) {
            (true, false) => Verdict::True,
            (false, true) => Verdict::False,
            (true, true) => Verdict::Mixed,
            (false, false) => Verdict::Abstain,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "supported" => Ok(Verdict::True),
            "false" | "refuted" => Ok(Verdict::False),
            "mixed" => Ok(Verdict::Mixed),
            "abstain" | "unknown" => Ok(Verdict::Abstain),
            other => Err(format!("unrecognised verdict: {other}")),
        }
    }
}

/// A retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub score: f64,
}

/// A claim paired with the evidence retrieved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEvidence {
    pub claim: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// The verdict reached for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim: String,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}
