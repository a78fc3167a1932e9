//! Dynamic EIP-712 typed data hashing.
//!
//! Implements the full EIP-712 encoding pipeline over runtime type
//! descriptions: domain separators built from whichever domain fields
//! are present, `encodeType` with transitively referenced structs,
//! recursive `hashStruct` over JSON value records, and the final
//! `\x19\x01` signing digest. Message values are plain
//! [`serde_json::Value`] records so callers can hash any struct shape
//! without compile-time bindings.

use std::collections::BTreeSet;
use std::fmt;

use alloy_primitives::{keccak256, Address, Signature, B256, U256};
use alloy_sol_types::SolValue;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// EIP-712 signing domain.
///
/// Every field is optional. A field that is `None` is left out of the
/// synthesized `EIP712Domain` type entirely, which is not the same as
/// hashing it with a zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

impl TypedDataDomain {
    /// Create an empty domain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the domain name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the domain version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the chain id.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the verifying contract address.
    pub fn with_verifying_contract(mut self, contract: Address) -> Self {
        self.verifying_contract = Some(contract);
        self
    }

    /// Set the domain salt.
    pub fn with_salt(mut self, salt: B256) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Field descriptors for the present fields, in the canonical
    /// EIP-712 order (name, version, chainId, verifyingContract, salt).
    pub fn type_fields(&self) -> Vec<TypedDataField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TypedDataField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedDataField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedDataField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedDataField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedDataField::new("salt", "bytes32"));
        }
        fields
    }

    /// Compute the EIP-712 domain separator hash.
    ///
    /// Both the type string and the encoded data cover exactly the
    /// fields that are present.
    pub fn separator(&self) -> B256 {
        let mut declarations = Vec::new();
        let mut words = Vec::new();

        if let Some(name) = &self.name {
            declarations.push("string name");
            words.push(keccak256(name.as_bytes()));
        }
        if let Some(version) = &self.version {
            declarations.push("string version");
            words.push(keccak256(version.as_bytes()));
        }
        if let Some(chain_id) = self.chain_id {
            declarations.push("uint256 chainId");
            words.push(uint_word(U256::from(chain_id)));
        }
        if let Some(contract) = self.verifying_contract {
            declarations.push("address verifyingContract");
            words.push(B256::left_padding_from(contract.as_slice()));
        }
        if let Some(salt) = self.salt {
            declarations.push("bytes32 salt");
            words.push(salt);
        }

        let type_string = format!("EIP712Domain({})", declarations.join(","));

        let mut encoded = Vec::with_capacity(32 * (words.len() + 1));
        encoded.extend_from_slice(keccak256(type_string.as_bytes()).as_slice());
        for word in &words {
            encoded.extend_from_slice(word.as_slice());
        }

        keccak256(&encoded)
    }
}

/// A single field descriptor within a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl TypedDataField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// Struct type descriptions keyed by type name.
///
/// Field order within a type is the hashing order, so entries preserve
/// the order they were declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedDataTypes {
    types: Vec<(String, Vec<TypedDataField>)>,
}

impl TypedDataTypes {
    /// Create an empty type table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a struct type, replacing any previous definition of the
    /// same name.
    pub fn with_type(mut self, name: impl Into<String>, fields: Vec<TypedDataField>) -> Self {
        self.insert(name, fields);
        self
    }

    /// Insert or replace a struct type definition.
    pub fn insert(&mut self, name: impl Into<String>, fields: Vec<TypedDataField>) {
        let name = name.into();
        if let Some(entry) = self.types.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = fields;
        } else {
            self.types.push((name, fields));
        }
    }

    /// Field descriptors of a declared type.
    pub fn get(&self, name: &str) -> Option<&[TypedDataField]> {
        self.types
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, fields)| fields.as_slice())
    }

    /// Infer the primary type: the unique declared type that no other
    /// declared type references. The reserved `EIP712Domain` entry is
    /// never a candidate.
    pub fn primary_type(&self) -> Result<&str> {
        let mut referenced = BTreeSet::new();
        for (_, fields) in &self.types {
            for field in fields {
                referenced.insert(base_type(&field.field_type));
            }
        }

        let mut candidates = self
            .types
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| *name != "EIP712Domain" && !referenced.contains(name));

        let first = candidates
            .next()
            .ok_or_else(|| Error::typed_data("cannot infer a primary type: no unreferenced struct type"))?;
        if let Some(second) = candidates.next() {
            return Err(Error::typed_data(format!(
                "ambiguous primary type: both {first} and {second} are unreferenced"
            )));
        }
        Ok(first)
    }

    /// The `encodeType` string: the primary type first, followed by
    /// every transitively referenced struct type in alphabetical order.
    pub fn encode_type(&self, primary: &str) -> Result<String> {
        let mut dependencies = BTreeSet::new();
        self.collect_dependencies(primary, &mut dependencies)?;
        dependencies.remove(primary);

        let mut encoded = String::new();
        self.append_type(primary, &mut encoded)?;
        for dependency in dependencies {
            self.append_type(dependency, &mut encoded)?;
        }
        Ok(encoded)
    }

    /// `keccak256(encodeType(primary))`.
    pub fn type_hash(&self, primary: &str) -> Result<B256> {
        Ok(keccak256(self.encode_type(primary)?.as_bytes()))
    }

    /// The EIP-712 `hashStruct` of a JSON value record.
    ///
    /// Every declared field must be present in the record; extra keys
    /// are ignored.
    pub fn hash_struct(&self, type_name: &str, value: &Value) -> Result<B256> {
        let fields = self
            .get(type_name)
            .ok_or_else(|| Error::typed_data(format!("unknown struct type {type_name}")))?;
        let record = value
            .as_object()
            .ok_or_else(|| Error::typed_data(format!("{type_name} value must be a JSON object")))?;

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(self.type_hash(type_name)?.as_slice());
        for field in fields {
            let field_value = record.get(&field.name).ok_or_else(|| {
                Error::typed_data(format!("missing field {} in {type_name} value", field.name))
            })?;
            let word = self.encode_value(&field.field_type, field_value)?;
            encoded.extend_from_slice(word.as_slice());
        }
        Ok(keccak256(&encoded))
    }

    fn collect_dependencies<'a>(
        &'a self,
        type_name: &str,
        out: &mut BTreeSet<&'a str>,
    ) -> Result<()> {
        let fields = self
            .get(type_name)
            .ok_or_else(|| Error::typed_data(format!("unknown struct type {type_name}")))?;
        for field in fields {
            let base = base_type(&field.field_type);
            if let Some((name, _)) = self.types.iter().find(|(n, _)| n == base) {
                if out.insert(name.as_str()) {
                    self.collect_dependencies(name, out)?;
                }
            }
        }
        Ok(())
    }

    fn append_type(&self, type_name: &str, out: &mut String) -> Result<()> {
        let fields = self
            .get(type_name)
            .ok_or_else(|| Error::typed_data(format!("unknown struct type {type_name}")))?;
        out.push_str(type_name);
        out.push('(');
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&field.field_type);
            out.push(' ');
            out.push_str(&field.name);
        }
        out.push(')');
        Ok(())
    }

    /// Encode a single value as its 32-byte EIP-712 word.
    fn encode_value(&self, field_type: &str, value: &Value) -> Result<B256> {
        // Arrays hash the concatenation of their element encodings.
        if field_type.ends_with(']') {
            let open = field_type
                .rfind('[')
                .ok_or_else(|| Error::typed_data(format!("malformed array type {field_type}")))?;
            let element_type = &field_type[..open];
            let len_spec = &field_type[open + 1..field_type.len() - 1];

            let items = value
                .as_array()
                .ok_or_else(|| Error::typed_data(format!("{field_type} value must be a JSON array")))?;
            if !len_spec.is_empty() {
                let expected: usize = len_spec
                    .parse()
                    .map_err(|_| Error::typed_data(format!("malformed array type {field_type}")))?;
                if items.len() != expected {
                    return Err(Error::typed_data(format!(
                        "{field_type} value has {} elements, expected {expected}",
                        items.len()
                    )));
                }
            }

            let mut encoded = Vec::with_capacity(32 * items.len());
            for item in items {
                encoded.extend_from_slice(self.encode_value(element_type, item)?.as_slice());
            }
            return Ok(keccak256(&encoded));
        }

        // Nested structs hash recursively.
        if self.get(field_type).is_some() {
            return self.hash_struct(field_type, value);
        }

        match field_type {
            "string" => {
                let text = value.as_str().ok_or_else(|| {
                    Error::typed_data(format!("string value must be a JSON string, got {value}"))
                })?;
                Ok(keccak256(text.as_bytes()))
            }
            "bytes" => {
                let bytes = parse_hex_bytes(value)?;
                Ok(keccak256(&bytes))
            }
            "address" => {
                let address = parse_address(value)?;
                Ok(B256::left_padding_from(address.as_slice()))
            }
            "bool" => {
                let flag = value
                    .as_bool()
                    .ok_or_else(|| Error::typed_data(format!("bool value must be a JSON bool, got {value}")))?;
                Ok(B256::left_padding_from(&[flag as u8]))
            }
            ty if ty.starts_with("uint") => {
                check_numeric_width(ty, &ty[4..])?;
                Ok(uint_word(parse_uint(value, ty)?))
            }
            ty if ty.starts_with("int") => {
                check_numeric_width(ty, &ty[3..])?;
                Ok(uint_word(parse_int(value, ty)?))
            }
            ty if ty.starts_with("bytes") => {
                let width: usize = ty[5..]
                    .parse()
                    .map_err(|_| Error::typed_data(format!("unsupported type {ty}")))?;
                if width == 0 || width > 32 {
                    return Err(Error::typed_data(format!("unsupported type {ty}")));
                }
                let bytes = parse_hex_bytes(value)?;
                if bytes.len() != width {
                    return Err(Error::typed_data(format!(
                        "{ty} value has {} bytes, expected {width}",
                        bytes.len()
                    )));
                }
                Ok(B256::right_padding_from(&bytes))
            }
            other => Err(Error::typed_data(format!("unsupported type {other}"))),
        }
    }
}

impl Serialize for TypedDataTypes {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.types.len()))?;
        for (name, fields) in &self.types {
            map.serialize_entry(name, fields)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypedDataTypes {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map =
            std::collections::BTreeMap::<String, Vec<TypedDataField>>::deserialize(deserializer)?;
        Ok(Self {
            types: map.into_iter().collect(),
        })
    }
}

/// The JSON payload shape `eth_signTypedData_v4` expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedDataPayload {
    pub types: TypedDataTypes,
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    pub domain: TypedDataDomain,
    pub message: Value,
}

impl TypedDataPayload {
    /// Assemble a payload, synthesizing the `EIP712Domain` entry from
    /// the present domain fields.
    pub fn new(domain: &TypedDataDomain, types: &TypedDataTypes, message: &Value) -> Result<Self> {
        let primary_type = types.primary_type()?.to_string();
        let mut full_types = types.clone();
        full_types.insert("EIP712Domain", domain.type_fields());
        Ok(Self {
            types: full_types,
            primary_type,
            domain: domain.clone(),
            message: message.clone(),
        })
    }

    /// The digest a compliant node signs for this payload.
    pub fn signing_digest(&self) -> Result<B256> {
        let struct_hash = self.types.hash_struct(&self.primary_type, &self.message)?;
        Ok(eip712_digest(self.domain.separator(), struct_hash))
    }
}

/// Full EIP-712 signing digest for a value record of the inferred
/// primary type.
pub fn signing_digest(
    domain: &TypedDataDomain,
    types: &TypedDataTypes,
    value: &Value,
) -> Result<B256> {
    let primary = types.primary_type()?;
    let struct_hash = types.hash_struct(primary, value)?;
    Ok(eip712_digest(domain.separator(), struct_hash))
}

/// The final digest: `keccak256("\x19\x01" ++ domainSeparator ++ structHash)`.
pub fn eip712_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    // Typed so the prefix packs as two raw bytes, not padded integer words.
    let prefix: [u8; 2] = [0x19, 0x01];
    let data = (prefix, domain_separator, struct_hash).abi_encode_packed();
    keccak256(&data)
}

/// An ECDSA signature split into its r, s and v components.
///
/// `v` is always normalized to 27 or 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl EcdsaSignature {
    /// Build a signature from components, normalizing a 0/1 recovery
    /// id to 27/28. Other recovery ids are rejected.
    pub fn from_rsv(r: B256, s: B256, v: u8) -> Result<Self> {
        let v = match v {
            27 | 28 => v,
            0 | 1 => v + 27,
            other => {
                return Err(Error::signature(format!("invalid recovery id {other}")));
            }
        };
        Ok(Self { r, s, v })
    }

    /// Parse the packed 65-byte `r || s || v` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(Error::signature(format!(
                "signature has {} bytes, expected 65",
                bytes.len()
            )));
        }
        Self::from_rsv(
            B256::from_slice(&bytes[..32]),
            B256::from_slice(&bytes[32..64]),
            bytes[64],
        )
    }

    /// Parse a hex-encoded packed signature, with or without the `0x`
    /// prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| Error::signature(format!("invalid signature hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Packed 65-byte `r || s || v` form.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    /// Hex encoding of the packed form with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Recover the signing address from a 32-byte prehash.
    pub fn recover(&self, digest: B256) -> Result<Address> {
        let signature = Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            self.v == 28,
        );
        signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| Error::signature(format!("recovery failed: {e}")))
    }
}

impl From<Signature> for EcdsaSignature {
    fn from(signature: Signature) -> Self {
        let bytes = signature.as_bytes();
        Self {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }
}

impl fmt::Display for EcdsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

/// A bare `uint`/`int` aliases the 256-bit form; sized forms must be
/// a multiple of 8 bits up to 256.
fn check_numeric_width(field_type: &str, suffix: &str) -> Result<()> {
    if suffix.is_empty() {
        return Ok(());
    }
    match suffix.parse::<usize>() {
        Ok(bits) if bits % 8 == 0 && (8..=256).contains(&bits) => Ok(()),
        _ => Err(Error::typed_data(format!("unsupported type {field_type}"))),
    }
}

/// Strip array suffixes from a type name: `Person[]` and `Person[3]`
/// both reduce to `Person`.
fn base_type(field_type: &str) -> &str {
    match field_type.find('[') {
        Some(index) => &field_type[..index],
        None => field_type,
    }
}

fn uint_word(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

fn parse_address(value: &Value) -> Result<Address> {
    let text = value
        .as_str()
        .ok_or_else(|| Error::typed_data(format!("address value must be a hex string, got {value}")))?;
    text.parse::<Address>()
        .map_err(|e| Error::typed_data(format!("invalid address {text}: {e}")))
}

fn parse_hex_bytes(value: &Value) -> Result<Vec<u8>> {
    let text = value
        .as_str()
        .ok_or_else(|| Error::typed_data(format!("bytes value must be a hex string, got {value}")))?;
    hex::decode(text.trim_start_matches("0x"))
        .map_err(|e| Error::typed_data(format!("invalid hex bytes {text}: {e}")))
}

fn parse_uint(value: &Value, field_type: &str) -> Result<U256> {
    match value {
        Value::Number(number) => {
            let unsigned = number.as_u64().ok_or_else(|| {
                Error::typed_data(format!("{field_type} value must be a non-negative integer"))
            })?;
            Ok(U256::from(unsigned))
        }
        Value::String(text) => {
            let text = text.trim();
            let (digits, radix) = match text.strip_prefix("0x") {
                Some(hex_digits) => (hex_digits, 16),
                None => (text, 10),
            };
            U256::from_str_radix(digits, radix)
                .map_err(|e| Error::typed_data(format!("invalid {field_type} value {text}: {e}")))
        }
        other => Err(Error::typed_data(format!(
            "{field_type} value must be a number or numeric string, got {other}"
        ))),
    }
}

fn parse_int(value: &Value, field_type: &str) -> Result<U256> {
    match value {
        // A single leading sign; anything left over must be digits.
        Value::String(text) => match text.trim().strip_prefix('-') {
            Some(magnitude_text) => {
                let magnitude = U256::from_str_radix(magnitude_text, 10).map_err(|e| {
                    Error::typed_data(format!("invalid {field_type} value {text}: {e}"))
                })?;
                Ok(twos_complement(magnitude))
            }
            None => parse_uint(value, field_type),
        },
        Value::Number(number) if number.as_u64().is_none() => {
            let signed = number.as_i64().ok_or_else(|| {
                Error::typed_data(format!("{field_type} value must be an integer"))
            })?;
            Ok(twos_complement(U256::from(signed.unsigned_abs())))
        }
        other => parse_uint(other, field_type),
    }
}

/// Two's complement of a magnitude: `2^256 - magnitude`.
fn twos_complement(magnitude: U256) -> U256 {
    if magnitude.is_zero() {
        U256::ZERO
    } else {
        (!magnitude).wrapping_add(U256::from(1))
    }
}
