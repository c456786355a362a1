//! Prioritization weights
//!
//! Three integer percentages that always sum to 100. Changing one weight
//! rescales all three; rounding uses the largest-remainder method so the sum
//! never drifts. Remainder ties go to the later field (fulfillment, then cost,
//! then speed), which makes an even split come out as 33/33/34.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriorityError {
    #[error("unknown priority \"{0}\" (expected fulfillment, cost or speed)")]
    UnknownKey(String),
    #[error("unknown template \"{0}\"")]
    UnknownTemplate(String),
    #[error("weight must be between 0 and 100, got {0}")]
    OutOfRange(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityKey {
    Fulfillment,
    Cost,
    Speed,
}

impl PriorityKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityKey::Fulfillment => "fulfillment",
            PriorityKey::Cost => "cost",
            PriorityKey::Speed => "speed",
        }
    }

    fn index(&self) -> usize {
        match self {
            PriorityKey::Fulfillment => 0,
            PriorityKey::Cost => 1,
            PriorityKey::Speed => 2,
        }
    }
}

impl FromStr for PriorityKey {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fulfillment" => Ok(PriorityKey::Fulfillment),
            "cost" => Ok(PriorityKey::Cost),
            "speed" => Ok(PriorityKey::Speed),
            _ => Err(PriorityError::UnknownKey(s.to_string())),
        }
    }
}

/// Preset weightings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTemplate {
    MaximizeFulfillment,
    MinimizeCost,
    Balanced,
}

impl PriorityTemplate {
    pub const ALL: [PriorityTemplate; 3] = [
        PriorityTemplate::MaximizeFulfillment,
        PriorityTemplate::MinimizeCost,
        PriorityTemplate::Balanced,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PriorityTemplate::MaximizeFulfillment => "Maximize Fulfillment",
            PriorityTemplate::MinimizeCost => "Minimize Cost",
            PriorityTemplate::Balanced => "Balanced",
        }
    }

    pub fn weights(&self) -> PriorityWeights {
        let [fulfillment, cost, speed] = match self {
            PriorityTemplate::MaximizeFulfillment => [80, 10, 10],
            PriorityTemplate::MinimizeCost => [20, 70, 10],
            PriorityTemplate::Balanced => [33, 33, 34],
        };
        PriorityWeights { fulfillment, cost, speed }
    }
}

impl FromStr for PriorityTemplate {
    type Err = PriorityError;

    /// Accepts the display name ("Minimize Cost") or a kebab form ("minimize-cost").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        PriorityTemplate::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| PriorityError::UnknownTemplate(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawWeights")]
pub struct PriorityWeights {
    pub fulfillment: u32,
    pub cost: u32,
    pub speed: u32,
}

/// Weights as read from a file, before normalization.
#[derive(Deserialize)]
struct RawWeights {
    #[serde(default)]
    fulfillment: u32,
    #[serde(default)]
    cost: u32,
    #[serde(default)]
    speed: u32,
}

impl From<RawWeights> for PriorityWeights {
    fn from(raw: RawWeights) -> Self {
        PriorityWeights::normalized([raw.fulfillment, raw.cost, raw.speed])
    }
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self { fulfillment: 40, cost: 30, speed: 30 }
    }
}

impl PriorityWeights {
    /// Scale arbitrary non-negative weights to percentages summing to 100.
    /// An all-zero input yields the Balanced split.
    pub fn normalized(values: [u32; 3]) -> Self {
        let total: u64 = values.iter().map(|&v| v as u64).sum();
        if total == 0 {
            return PriorityTemplate::Balanced.weights();
        }

        let mut out = [0u32; 3];
        let mut remainders = [0u64; 3];
        for (i, &v) in values.iter().enumerate() {
            let scaled = v as u64 * 100;
            out[i] = (scaled / total) as u32;
            remainders[i] = scaled % total;
        }

        let assigned: u32 = out.iter().sum();
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(b.cmp(&a)));
        for &i in order.iter().take((100 - assigned) as usize) {
            out[i] += 1;
        }

        let [fulfillment, cost, speed] = out;
        Self { fulfillment, cost, speed }
    }

    /// Change one weight and renormalize all three.
    pub fn set(&mut self, key: PriorityKey, value: u32) -> Result<(), PriorityError> {
        if value > 100 {
            return Err(PriorityError::OutOfRange(value));
        }
        let mut values = self.as_array();
        values[key.index()] = value;
        *self = Self::normalized(values);
        log::debug!(
            "set {}={} -> fulfillment={} cost={} speed={}",
            key.as_str(),
            value,
            self.fulfillment,
            self.cost,
            self.speed
        );
        Ok(())
    }

    pub fn apply_template(&mut self, template: PriorityTemplate) {
        *self = template.weights();
    }

    pub fn total(&self) -> u32 {
        self.fulfillment + self.cost + self.speed
    }

    fn as_array(&self) -> [u32; 3] {
        [self.fulfillment, self.cost, self.speed]
    }
}
