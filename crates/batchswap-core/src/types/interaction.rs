//! Arbitrary contract calls bundled into a settlement.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A single contract call executed as part of a settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub target: Address,
    pub value: U256,
    pub call_data: Bytes,
}

impl Interaction {
    /// A call with no attached ether value.
    pub fn new(target: Address, call_data: Bytes) -> Self {
        Self {
            target,
            value: U256::ZERO,
            call_data,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// When an interaction runs relative to the trades of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionStage {
    /// Before any token transfers in.
    Pre,
    /// Between transfers in and transfers out.
    Intra,
    /// After all transfers out.
    Post,
}

impl InteractionStage {
    pub const ALL: [InteractionStage; 3] = [
        InteractionStage::Pre,
        InteractionStage::Intra,
        InteractionStage::Post,
    ];

    /// Position of the stage in an encoded settlement.
    pub fn index(&self) -> usize {
        match self {
            InteractionStage::Pre => 0,
            InteractionStage::Intra => 1,
            InteractionStage::Post => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_interaction_has_zero_value() {
        let interaction = Interaction::new(Address::repeat_byte(0x01), Bytes::from(vec![1, 2]));
        assert_eq!(interaction.value, U256::ZERO);

        let funded = interaction.with_value(U256::from(7));
        assert_eq!(funded.value, U256::from(7));
    }

    #[test]
    fn test_stage_indices_cover_all_slots() {
        let indices: Vec<usize> = InteractionStage::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_interaction_serde_shape() {
        let interaction = Interaction::new(Address::repeat_byte(0x01), Bytes::from(vec![0xab]));
        let value = serde_json::to_value(&interaction).unwrap();
        assert!(value.get("callData").is_some());
        assert_eq!(value["callData"], "0xab");

        assert_eq!(
            serde_json::to_string(&InteractionStage::Pre).unwrap(),
            "\"pre\""
        );
    }
}
