//! Provenance of metadata records and the precedence order between them.
//!
//! Precedence is a total order: `manual > agentTool > inferred`. Every write
//! site in the metadata store goes through [`Provenance::may_overwrite`].

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin of a metadata record.
///
/// Variant order is precedence order, lowest first, so the derived `Ord`
/// is the precedence comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Provenance {
    /// Produced by the extraction pipeline.
    Inferred,
    /// Written by an agent through a tool call.
    AgentTool,
    /// Edited by a human.
    Manual,
}

impl Provenance {
    /// All provenances, lowest precedence first.
    pub const ALL: [Provenance; 3] = [Provenance::Inferred, Provenance::AgentTool, Provenance::Manual];

    /// Whether `self` strictly outranks `other`.
    pub fn outranks(self, other: Provenance) -> bool {
        self > other
    }

    /// Whether a write from `incoming` may modify a record owned by `self`.
    pub fn may_overwrite(self, incoming: Provenance) -> bool {
        !self.outranks(incoming)
    }

    /// Whether an inference pass may delete a record owned by `self`.
    ///
    /// Curated records are only ever flagged stale.
    pub fn may_be_deleted_by_inference(self) -> bool {
        self == Provenance::Inferred
    }

    /// The provenance a record carries after a permitted write from `incoming`.
    ///
    /// Never moves toward lower precedence.
    pub fn promote(self, incoming: Provenance) -> Provenance {
        self.max(incoming)
    }

    /// Storage literal.
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Inferred => "inferred",
            Provenance::AgentTool => "agentTool",
            Provenance::Manual => "manual",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "inferred" => Ok(Provenance::Inferred),
            "agentTool" | "agent_tool" => Ok(Provenance::AgentTool),
            "manual" => Ok(Provenance::Manual),
            other => Err(CoreError::UnknownVariant {
                kind: "provenance",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_total() {
        assert!(Provenance::Manual.outranks(Provenance::AgentTool));
        assert!(Provenance::AgentTool.outranks(Provenance::Inferred));
        assert!(Provenance::Manual.outranks(Provenance::Inferred));
        assert!(!Provenance::Inferred.outranks(Provenance::Inferred));
    }

    #[test]
    fn inference_cannot_overwrite_curated_records() {
        assert!(!Provenance::Manual.may_overwrite(Provenance::Inferred));
        assert!(!Provenance::AgentTool.may_overwrite(Provenance::Inferred));
        assert!(Provenance::Inferred.may_overwrite(Provenance::Inferred));
        assert!(Provenance::AgentTool.may_overwrite(Provenance::Manual));
    }

    #[test]
    fn promote_never_lowers_precedence() {
        for existing in Provenance::ALL {
            for incoming in Provenance::ALL {
                assert!(existing.promote(incoming) >= existing);
            }
        }
    }

    #[test]
    fn parses_storage_literals() {
        for p in Provenance::ALL {
            assert_eq!(p.as_str().parse::<Provenance>().unwrap(), p);
        }
        assert!("human".parse::<Provenance>().is_err());
    }
}
