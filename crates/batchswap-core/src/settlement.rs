//! Settlement batch encoding.
//!
//! A settlement clears a batch of signed orders against a single
//! vector of clearing prices. The encoder collects orders, their
//! signatures and any supporting interactions, maintains the token
//! registry the trades index into, and produces the final settlement
//! call data model.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::signing::schemes::{sign_order, OrderSignature, SigningScheme};
use crate::signing::typed_data::TypedDataDomain;
use crate::signing::wallet::Wallet;
use crate::types::{Interaction, InteractionStage, Order, OrderKind};

/// Per-trade flags packed into a single word.
///
/// Bit 0 is the order kind, bit 1 the partial fill flag, bits 2 and 3
/// the signing scheme. All higher bits are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeFlags {
    pub kind: OrderKind,
    pub partially_fillable: bool,
    pub scheme: SigningScheme,
}

impl TradeFlags {
    pub fn encode(&self) -> u32 {
        let mut flags = 0;
        if self.kind == OrderKind::Buy {
            flags |= 1;
        }
        if self.partially_fillable {
            flags |= 1 << 1;
        }
        if self.scheme == SigningScheme::EthSign {
            flags |= 1 << 2;
        }
        flags
    }

    pub fn decode(flags: u32) -> Result<Self> {
        if flags >> 4 != 0 {
            return Err(Error::Settlement {
                message: format!("unknown trade flag bits in {flags:#x}"),
            });
        }
        let scheme = match (flags >> 2) & 0b11 {
            0 => SigningScheme::Eip712,
            1 => SigningScheme::EthSign,
            other => {
                return Err(Error::Settlement {
                    message: format!("unknown signing scheme {other}"),
                });
            }
        };
        Ok(Self {
            kind: if flags & 1 == 1 {
                OrderKind::Buy
            } else {
                OrderKind::Sell
            },
            partially_fillable: flags & (1 << 1) != 0,
            scheme,
        })
    }
}

/// One order of a settlement, with token addresses replaced by indices
/// into the settlement's token vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub sell_token_index: u32,
    pub buy_token_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub valid_to: u32,
    pub app_data: u32,
    pub fee_amount: U256,
    pub flags: u32,
    /// Filled portion for partially fillable orders, zero for
    /// fill-or-kill orders.
    pub executed_amount: U256,
    pub signature: OrderSignature,
}

/// The fully assembled settlement call data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSettlement {
    pub tokens: Vec<Address>,
    /// One price per token, aligned with `tokens`.
    pub clearing_prices: Vec<U256>,
    pub trades: Vec<Trade>,
    /// Pre, intra and post stage interactions.
    pub interactions: [Vec<Interaction>; 3],
}

/// Incrementally builds an [`EncodedSettlement`].
#[derive(Debug, Clone)]
pub struct SettlementEncoder {
    domain: TypedDataDomain,
    tokens: Vec<Address>,
    token_indices: HashMap<Address, u32>,
    trades: Vec<Trade>,
    interactions: [Vec<Interaction>; 3],
}

impl SettlementEncoder {
    pub fn new(domain: TypedDataDomain) -> Self {
        Self {
            domain,
            tokens: Vec::new(),
            token_indices: HashMap::new(),
            trades: Vec::new(),
            interactions: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    /// The signing domain trades in this settlement are verified
    /// against.
    pub fn domain(&self) -> &TypedDataDomain {
        &self.domain
    }

    /// The token registry, in first-use order.
    pub fn tokens(&self) -> &[Address] {
        &self.tokens
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn interactions(&self, stage: InteractionStage) -> &[Interaction] {
        &self.interactions[stage.index()]
    }

    fn token_index(&mut self, token: Address) -> u32 {
        if let Some(&index) = self.token_indices.get(&token) {
            return index;
        }
        let index = self.tokens.len() as u32;
        self.tokens.push(token);
        self.token_indices.insert(token, index);
        index
    }

    /// Add a signed order to the settlement.
    ///
    /// Partially fillable orders must state how much of them executes;
    /// fill-or-kill orders carry a zero executed amount.
    pub fn encode_trade(
        &mut self,
        order: &Order,
        signature: OrderSignature,
        executed_amount: Option<U256>,
    ) -> Result<()> {
        let executed_amount = match (order.partially_fillable, executed_amount) {
            (true, None) => {
                return Err(Error::Settlement {
                    message: "partially fillable orders require an executed amount".to_string(),
                });
            }
            (_, amount) => amount.unwrap_or(U256::ZERO),
        };

        let flags = TradeFlags {
            kind: order.kind,
            partially_fillable: order.partially_fillable,
            scheme: signature.scheme,
        };
        let sell_token_index = self.token_index(order.sell_token);
        let buy_token_index = self.token_index(order.buy_token);
        debug!(
            sell_token = %order.sell_token,
            buy_token = %order.buy_token,
            kind = %order.kind,
            scheme = signature.scheme.as_str(),
            "Encoding trade"
        );
        self.trades.push(Trade {
            sell_token_index,
            buy_token_index,
            receiver: order.receiver,
            sell_amount: order.sell_amount,
            buy_amount: order.buy_amount,
            valid_to: order.valid_to,
            app_data: order.app_data,
            fee_amount: order.fee_amount,
            flags: flags.encode(),
            executed_amount,
            signature,
        });
        Ok(())
    }

    /// Sign an order with `wallet` and add it in one step.
    pub async fn sign_encode_trade(
        &mut self,
        order: &Order,
        wallet: &Wallet,
        scheme: SigningScheme,
        executed_amount: Option<U256>,
    ) -> Result<()> {
        let signature = sign_order(wallet, &self.domain, order, scheme).await?;
        self.encode_trade(order, signature, executed_amount)
    }

    /// Schedule an interaction at the given stage.
    pub fn encode_interaction(&mut self, interaction: Interaction, stage: InteractionStage) {
        self.interactions[stage.index()].push(interaction);
    }

    /// Finalize the settlement against a set of clearing prices.
    ///
    /// Every registered token needs a price; the output price vector
    /// is aligned with the token vector.
    pub fn encoded_settlement(
        self,
        clearing_prices: &HashMap<Address, U256>,
    ) -> Result<EncodedSettlement> {
        let mut prices = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let price = clearing_prices.get(token).ok_or_else(|| Error::Settlement {
                message: format!("missing clearing price for {token}"),
            })?;
            prices.push(*price);
        }

        debug!(
            tokens = self.tokens.len(),
            trades = self.trades.len(),
            "Finalizing settlement"
        );
        Ok(EncodedSettlement {
            tokens: self.tokens,
            clearing_prices: prices,
            trades: self.trades,
            interactions: self.interactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::domain::settlement_domain;
    use crate::signing::schemes::recover_order_signer;
    use crate::signing::typed_data::EcdsaSignature;
    use crate::signing::wallet::LocalWallet;
    use crate::types::OrderBuilder;
    use alloy_primitives::{Bytes, B256};

    fn test_domain() -> TypedDataDomain {
        settlement_domain(31337, Address::repeat_byte(0x90))
    }

    fn test_signature() -> OrderSignature {
        OrderSignature {
            scheme: SigningScheme::Eip712,
            signature: EcdsaSignature {
                r: B256::repeat_byte(0x01),
                s: B256::repeat_byte(0x02),
                v: 27,
            },
        }
    }

    fn test_order(sell: Address, buy: Address) -> Order {
        OrderBuilder::new()
            .sell_token(sell)
            .buy_token(buy)
            .sell_amount(U256::from(100))
            .buy_amount(U256::from(90))
            .valid_to(0xffffffff)
            .kind(OrderKind::Sell)
            .build()
            .unwrap()
    }

    #[test]
    fn test_token_registry_deduplicates() {
        let token_a = Address::repeat_byte(0x0a);
        let token_b = Address::repeat_byte(0x0b);
        let token_c = Address::repeat_byte(0x0c);

        let mut encoder = SettlementEncoder::new(test_domain());
        encoder
            .encode_trade(&test_order(token_a, token_b), test_signature(), None)
            .unwrap();
        encoder
            .encode_trade(&test_order(token_b, token_c), test_signature(), None)
            .unwrap();

        assert_eq!(encoder.tokens(), &[token_a, token_b, token_c]);
        assert_eq!(encoder.trades()[0].sell_token_index, 0);
        assert_eq!(encoder.trades()[0].buy_token_index, 1);
        assert_eq!(encoder.trades()[1].sell_token_index, 1);
        assert_eq!(encoder.trades()[1].buy_token_index, 2);
    }

    #[test]
    fn test_prices_align_with_tokens() {
        let token_a = Address::repeat_byte(0x0a);
        let token_b = Address::repeat_byte(0x0b);

        let mut encoder = SettlementEncoder::new(test_domain());
        encoder
            .encode_trade(&test_order(token_a, token_b), test_signature(), None)
            .unwrap();

        let prices = HashMap::from([
            (token_a, U256::from(3)),
            (token_b, U256::from(5)),
        ]);
        let settlement = encoder.encoded_settlement(&prices).unwrap();

        assert_eq!(settlement.tokens, vec![token_a, token_b]);
        assert_eq!(settlement.clearing_prices, vec![U256::from(3), U256::from(5)]);
    }

    #[test]
    fn test_missing_clearing_price_is_error() {
        let token_a = Address::repeat_byte(0x0a);
        let token_b = Address::repeat_byte(0x0b);

        let mut encoder = SettlementEncoder::new(test_domain());
        encoder
            .encode_trade(&test_order(token_a, token_b), test_signature(), None)
            .unwrap();

        let prices = HashMap::from([(token_a, U256::from(1))]);
        let err = encoder.encoded_settlement(&prices).unwrap_err();
        assert!(err.to_string().contains("missing clearing price"));
    }

    #[test]
    fn test_partial_fill_requires_executed_amount() {
        let mut order = test_order(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b));
        order.partially_fillable = true;

        let mut encoder = SettlementEncoder::new(test_domain());
        let err = encoder
            .encode_trade(&order, test_signature(), None)
            .unwrap_err();
        assert!(err.to_string().contains("executed amount"));

        encoder
            .encode_trade(&order, test_signature(), Some(U256::from(40)))
            .unwrap();
        assert_eq!(encoder.trades()[0].executed_amount, U256::from(40));
    }

    #[test]
    fn test_fill_or_kill_executed_amount_is_zero() {
        let order = test_order(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b));

        let mut encoder = SettlementEncoder::new(test_domain());
        encoder.encode_trade(&order, test_signature(), None).unwrap();
        assert_eq!(encoder.trades()[0].executed_amount, U256::ZERO);
    }

    #[test]
    fn test_interactions_are_staged() {
        let mut encoder = SettlementEncoder::new(test_domain());
        let permit_call = Interaction::new(Address::repeat_byte(0x55), Bytes::from(vec![0x01]));
        let sweep_call = Interaction::new(Address::repeat_byte(0x66), Bytes::from(vec![0x02]));

        encoder.encode_interaction(permit_call.clone(), InteractionStage::Pre);
        encoder.encode_interaction(sweep_call.clone(), InteractionStage::Post);

        assert_eq!(encoder.interactions(InteractionStage::Pre), &[permit_call.clone()]);
        assert!(encoder.interactions(InteractionStage::Intra).is_empty());
        assert_eq!(encoder.interactions(InteractionStage::Post), &[sweep_call.clone()]);

        let settlement = encoder.encoded_settlement(&HashMap::new()).unwrap();
        assert_eq!(settlement.interactions[0], vec![permit_call]);
        assert!(settlement.interactions[1].is_empty());
        assert_eq!(settlement.interactions[2], vec![sweep_call]);
    }

    #[test]
    fn test_trade_flags_round_trip() {
        for kind in [OrderKind::Sell, OrderKind::Buy] {
            for partially_fillable in [false, true] {
                for scheme in [SigningScheme::Eip712, SigningScheme::EthSign] {
                    let flags = TradeFlags {
                        kind,
                        partially_fillable,
                        scheme,
                    };
                    assert_eq!(TradeFlags::decode(flags.encode()).unwrap(), flags);
                }
            }
        }
    }

    #[test]
    fn test_trade_flags_reject_unknown_bits() {
        assert!(TradeFlags::decode(1 << 4).is_err());
        assert!(TradeFlags::decode(2 << 2).is_err());
        assert!(TradeFlags::decode(3 << 2).is_err());
    }

    #[tokio::test]
    async fn test_sign_encode_trade_recovers_signer() {
        // Hardhat development account #0.
        let wallet = Wallet::local(
            LocalWallet::from_private_key(
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            )
            .unwrap(),
        );
        let order = test_order(Address::repeat_byte(0x0a), Address::repeat_byte(0x0b));

        let mut encoder = SettlementEncoder::new(test_domain());
        encoder
            .sign_encode_trade(&order, &wallet, SigningScheme::EthSign, None)
            .await
            .unwrap();

        let trade = &encoder.trades()[0];
        let flags = TradeFlags::decode(trade.flags).unwrap();
        assert_eq!(flags.scheme, SigningScheme::EthSign);
        assert_eq!(flags.kind, order.kind);

        let recovered =
            recover_order_signer(encoder.domain(), &order, &trade.signature).unwrap();
        assert_eq!(recovered, wallet.address());
    }
}
