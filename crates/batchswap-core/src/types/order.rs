//! Order model, digests and unique identifiers.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, B256, U256};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::signing::typed_data::{
    signing_digest, TypedDataDomain, TypedDataField, TypedDataTypes,
};

/// Trade direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Sell a fixed amount for as much as possible.
    Sell,
    /// Buy a fixed amount for as little as possible.
    Buy,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Sell => "sell",
            OrderKind::Buy => "buy",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A limit order to trade one token for another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub sell_token: Address,
    pub buy_token: Address,
    /// Recipient of the buy amount. `None` means the order owner, and
    /// hashes as the zero address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    pub sell_amount: U256,
    pub buy_amount: U256,
    /// Unix timestamp the order expires at.
    pub valid_to: u32,
    /// Opaque application tag carried into the digest.
    pub app_data: u32,
    pub fee_amount: U256,
    pub kind: OrderKind,
    pub partially_fillable: bool,
}

impl Order {
    /// The EIP-712 struct type of an order.
    pub fn typed_data_types() -> TypedDataTypes {
        TypedDataTypes::new().with_type(
            "Order",
            vec![
                TypedDataField::new("sellToken", "address"),
                TypedDataField::new("buyToken", "address"),
                TypedDataField::new("receiver", "address"),
                TypedDataField::new("sellAmount", "uint256"),
                TypedDataField::new("buyAmount", "uint256"),
                TypedDataField::new("validTo", "uint32"),
                TypedDataField::new("appData", "uint32"),
                TypedDataField::new("feeAmount", "uint256"),
                TypedDataField::new("kind", "string"),
                TypedDataField::new("partiallyFillable", "bool"),
            ],
        )
    }

    /// The order as a typed data value record.
    pub fn typed_value(&self) -> Value {
        json!({
            "sellToken": self.sell_token,
            "buyToken": self.buy_token,
            "receiver": self.receiver.unwrap_or(Address::ZERO),
            "sellAmount": self.sell_amount.to_string(),
            "buyAmount": self.buy_amount.to_string(),
            "validTo": self.valid_to,
            "appData": self.app_data,
            "feeAmount": self.fee_amount.to_string(),
            "kind": self.kind.as_str(),
            "partiallyFillable": self.partially_fillable,
        })
    }

    /// The EIP-712 signing digest of this order under a settlement
    /// domain.
    pub fn signing_digest(&self, domain: &TypedDataDomain) -> Result<B256> {
        signing_digest(domain, &Self::typed_data_types(), &self.typed_value())
    }

    /// The unique identifier of this order once placed by `owner`.
    pub fn uid(&self, domain: &TypedDataDomain, owner: Address) -> Result<OrderUid> {
        Ok(OrderUid::pack(
            self.signing_digest(domain)?,
            owner,
            self.valid_to,
        ))
    }
}

/// Globally unique order identifier: the order digest, the owner
/// address and the expiry packed into 56 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderUid(pub [u8; 56]);

impl OrderUid {
    pub fn pack(digest: B256, owner: Address, valid_to: u32) -> Self {
        let mut bytes = [0u8; 56];
        bytes[..32].copy_from_slice(digest.as_slice());
        bytes[32..52].copy_from_slice(owner.as_slice());
        bytes[52..].copy_from_slice(&valid_to.to_be_bytes());
        Self(bytes)
    }

    pub fn digest(&self) -> B256 {
        B256::from_slice(&self.0[..32])
    }

    pub fn owner(&self) -> Address {
        Address::from_slice(&self.0[32..52])
    }

    pub fn valid_to(&self) -> u32 {
        u32::from_be_bytes([self.0[52], self.0[53], self.0[54], self.0[55]])
    }
}

impl fmt::Display for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for OrderUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderUid({self})")
    }
}

impl FromStr for OrderUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| Error::Order {
            message: format!("invalid order uid hex: {e}"),
        })?;
        if bytes.len() != 56 {
            return Err(Error::Order {
                message: format!("order uid has {} bytes, expected 56", bytes.len()),
            });
        }
        let mut buf = [0u8; 56];
        buf.copy_from_slice(&bytes);
        Ok(Self(buf))
    }
}

impl Serialize for OrderUid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderUid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Fluent construction of orders with validation of the required
/// fields.
#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    sell_token: Option<Address>,
    buy_token: Option<Address>,
    receiver: Option<Address>,
    sell_amount: Option<U256>,
    buy_amount: Option<U256>,
    valid_to: Option<u32>,
    app_data: u32,
    fee_amount: U256,
    kind: Option<OrderKind>,
    partially_fillable: bool,
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sell_token(mut self, token: Address) -> Self {
        self.sell_token = Some(token);
        self
    }

    pub fn buy_token(mut self, token: Address) -> Self {
        self.buy_token = Some(token);
        self
    }

    pub fn receiver(mut self, receiver: Address) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn sell_amount(mut self, amount: U256) -> Self {
        self.sell_amount = Some(amount);
        self
    }

    pub fn buy_amount(mut self, amount: U256) -> Self {
        self.buy_amount = Some(amount);
        self
    }

    pub fn valid_to(mut self, valid_to: u32) -> Self {
        self.valid_to = Some(valid_to);
        self
    }

    /// Expire the order `seconds` from now.
    pub fn valid_for(mut self, seconds: u64) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        self.valid_to = Some((now + seconds) as u32);
        self
    }

    pub fn app_data(mut self, app_data: u32) -> Self {
        self.app_data = app_data;
        self
    }

    pub fn fee_amount(mut self, fee_amount: U256) -> Self {
        self.fee_amount = fee_amount;
        self
    }

    pub fn kind(mut self, kind: OrderKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn partially_fillable(mut self, partially_fillable: bool) -> Self {
        self.partially_fillable = partially_fillable;
        self
    }

    pub fn build(self) -> Result<Order> {
        Ok(Order {
            sell_token: self.sell_token.ok_or_else(|| Error::Order {
                message: "order is missing a sell token".to_string(),
            })?,
            buy_token: self.buy_token.ok_or_else(|| Error::Order {
                message: "order is missing a buy token".to_string(),
            })?,
            receiver: self.receiver,
            sell_amount: self.sell_amount.ok_or_else(|| Error::Order {
                message: "order is missing a sell amount".to_string(),
            })?,
            buy_amount: self.buy_amount.ok_or_else(|| Error::Order {
                message: "order is missing a buy amount".to_string(),
            })?,
            valid_to: self.valid_to.ok_or_else(|| Error::Order {
                message: "order is missing an expiry".to_string(),
            })?,
            app_data: self.app_data,
            fee_amount: self.fee_amount,
            kind: self.kind.ok_or_else(|| Error::Order {
                message: "order is missing a kind".to_string(),
            })?,
            partially_fillable: self.partially_fillable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::domain::settlement_domain;

    fn test_domain() -> TypedDataDomain {
        settlement_domain(31337, Address::repeat_byte(0x90))
    }

    fn test_order() -> Order {
        OrderBuilder::new()
            .sell_token(Address::repeat_byte(0x01))
            .buy_token(Address::repeat_byte(0x02))
            .sell_amount(U256::from(1_000_000_000_000_000_000u128))
            .buy_amount(U256::from(500_000u64))
            .valid_to(0xffffffff)
            .kind(OrderKind::Sell)
            .build()
            .unwrap()
    }

    #[test]
    fn test_order_encode_type_string() {
        let types = Order::typed_data_types();
        assert_eq!(
            types.encode_type("Order").unwrap(),
            "Order(address sellToken,address buyToken,address receiver,\
             uint256 sellAmount,uint256 buyAmount,uint32 validTo,uint32 appData,\
             uint256 feeAmount,string kind,bool partiallyFillable)"
        );
        assert_eq!(types.primary_type().unwrap(), "Order");
    }

    #[test]
    fn test_digest_is_deterministic() {
        let domain = test_domain();
        assert_eq!(
            test_order().signing_digest(&domain).unwrap(),
            test_order().signing_digest(&domain).unwrap()
        );
    }

    #[test]
    fn test_digest_depends_on_kind() {
        let domain = test_domain();
        let sell = test_order();
        let mut buy = test_order();
        buy.kind = OrderKind::Buy;
        assert_ne!(
            sell.signing_digest(&domain).unwrap(),
            buy.signing_digest(&domain).unwrap()
        );
    }

    #[test]
    fn test_absent_receiver_hashes_as_zero_address() {
        let domain = test_domain();
        let implicit = test_order();
        let mut explicit = test_order();
        explicit.receiver = Some(Address::ZERO);

        assert_eq!(implicit.receiver, None);
        assert_eq!(
            implicit.signing_digest(&domain).unwrap(),
            explicit.signing_digest(&domain).unwrap()
        );

        let mut other = test_order();
        other.receiver = Some(Address::repeat_byte(0x03));
        assert_ne!(
            implicit.signing_digest(&domain).unwrap(),
            other.signing_digest(&domain).unwrap()
        );
    }

    #[test]
    fn test_typed_value_amounts_are_decimal_strings() {
        let value = test_order().typed_value();
        assert_eq!(value["sellAmount"], "1000000000000000000");
        assert_eq!(value["buyAmount"], "500000");
        assert_eq!(value["kind"], "sell");
    }

    #[test]
    fn test_uid_packing() {
        let domain = test_domain();
        let order = test_order();
        let owner = Address::repeat_byte(0xaa);

        let uid = order.uid(&domain, owner).unwrap();
        assert_eq!(uid.digest(), order.signing_digest(&domain).unwrap());
        assert_eq!(uid.owner(), owner);
        assert_eq!(uid.valid_to(), order.valid_to);
    }

    #[test]
    fn test_uid_string_round_trip() {
        let uid = OrderUid::pack(B256::repeat_byte(0x11), Address::repeat_byte(0x22), 42);
        let text = uid.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 56 * 2);
        assert_eq!(text.parse::<OrderUid>().unwrap(), uid);

        assert!("0x1234".parse::<OrderUid>().is_err());
        assert!("zz".parse::<OrderUid>().is_err());
    }

    #[test]
    fn test_builder_requires_core_fields() {
        let err = OrderBuilder::new()
            .buy_token(Address::repeat_byte(0x02))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("sell token"));

        let err = OrderBuilder::new()
            .sell_token(Address::repeat_byte(0x01))
            .buy_token(Address::repeat_byte(0x02))
            .sell_amount(U256::from(1))
            .buy_amount(U256::from(1))
            .valid_to(100)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("kind"));
    }

    #[test]
    fn test_builder_defaults() {
        let order = test_order();
        assert_eq!(order.receiver, None);
        assert_eq!(order.app_data, 0);
        assert_eq!(order.fee_amount, U256::ZERO);
        assert!(!order.partially_fillable);
    }

    #[test]
    fn test_valid_for_is_in_the_future() {
        let order = OrderBuilder::new()
            .sell_token(Address::repeat_byte(0x01))
            .buy_token(Address::repeat_byte(0x02))
            .sell_amount(U256::from(1))
            .buy_amount(U256::from(1))
            .valid_for(3600)
            .kind(OrderKind::Buy)
            .build()
            .unwrap();

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        assert!(order.valid_to > now);
        assert!(order.valid_to <= now + 3601);
    }

    #[test]
    fn test_order_serde_uses_camel_case() {
        let value = serde_json::to_value(test_order()).unwrap();
        assert!(value.get("sellToken").is_some());
        assert!(value.get("validTo").is_some());
        assert!(value.get("partiallyFillable").is_some());
        // An absent receiver is omitted entirely.
        assert!(value.get("receiver").is_none());

        let parsed: Order = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, test_order());
    }
}
