use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EarningStatus {
    Pending,
    Available,
    Paid,
    Hold,
}

impl EarningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EarningStatus::Pending => "pending",
            EarningStatus::Available => "available",
            EarningStatus::Paid => "paid",
            EarningStatus::Hold => "hold",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(EarningStatus::Pending),
            "available" => Some(EarningStatus::Available),
            "paid" => Some(EarningStatus::Paid),
            "hold" => Some(EarningStatus::Hold),
            _ => None,
        }
    }
}

impl Display for EarningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
