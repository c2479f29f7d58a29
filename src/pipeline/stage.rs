use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed, ordered lead-processing sequence. Order is load-bearing: each
/// stage is gated on the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Validate,
    CheckSalesforce,
    Enrich,
    Sync,
}

impl StageKey {
    pub const ALL: [StageKey; 4] = [
        StageKey::Validate,
        StageKey::CheckSalesforce,
        StageKey::Enrich,
        StageKey::Sync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKey::Validate => "validate",
            StageKey::CheckSalesforce => "check_salesforce",
            StageKey::Enrich => "enrich",
            StageKey::Sync => "sync",
        }
    }

    pub fn predecessor(&self) -> Option<StageKey> {
        let position = StageKey::ALL
            .iter()
            .position(|key| key == self)
            .expect("stage is part of the fixed sequence");
        if position == 0 {
            None
        } else {
            Some(StageKey::ALL[position - 1])
        }
    }

    pub fn definition(&self) -> &'static StageDefinition {
        STAGES
            .iter()
            .find(|definition| definition.key == *self)
            .expect("every stage has a definition")
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(StageKey::Validate),
            "check_salesforce" => Ok(StageKey::CheckSalesforce),
            "enrich" => Ok(StageKey::Enrich),
            "sync" => Ok(StageKey::Sync),
            other => Err(anyhow::anyhow!(
                "Unknown stage '{}'. Expected one of: validate, check_salesforce, enrich, sync",
                other
            )),
        }
    }
}

pub struct StageDefinition {
    pub key: StageKey,
    pub title: &'static str,
    pub description: &'static str,
}

pub const STAGES: [StageDefinition; 4] = [
    StageDefinition {
        key: StageKey::Validate,
        title: "Validate emails",
        description: "Check lead email addresses for deliverability",
    },
    StageDefinition {
        key: StageKey::CheckSalesforce,
        title: "Check Salesforce",
        description: "Match leads against existing Salesforce contacts",
    },
    StageDefinition {
        key: StageKey::Enrich,
        title: "Enrich leads",
        description: "Fill in company and contact details from the enrichment provider",
    },
    StageDefinition {
        key: StageKey::Sync,
        title: "Sync to CRM",
        description: "Push processed leads into the CRM",
    },
];
