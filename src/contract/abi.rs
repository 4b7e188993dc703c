//! Contract ABI Codec
//!
//! Solidity ABI encoding for the MatchUp contract interface:
//! calldata for every function, return data for the views, and the
//! standard `Error(string)` revert payload.
//!
//! Only the types the contract uses are supported: `uint256`, `uint8`,
//! `address`, `bool`, `string` and tuples of those.

use thiserror::Error;

use crate::contract::types::{Match, MatchId, MatchStatus, UserProfile};
use crate::core::address::Address;
use crate::core::amount::TokenAmount;
use crate::core::hash::{selector, Selector};

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// A single 32-byte ABI word.
pub type Word = [u8; WORD];

/// Signature of the standard revert payload.
pub const ERROR_SIGNATURE: &str = "Error(string)";

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Input shorter than the layout requires.
    #[error("data too short: need {needed} bytes, got {got}")]
    TooShort {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        got: usize,
    },
    /// Calldata selector matches no known function.
    #[error("unknown function selector 0x{}", hex::encode(.0))]
    UnknownSelector(Selector),
    /// Status discriminant outside the known enum.
    #[error("unknown match status {0}")]
    UnknownStatus(u8),
    /// Integer does not fit the target type.
    #[error("integer overflow decoding {0}")]
    Overflow(&'static str),
    /// Bool word other than 0 or 1.
    #[error("invalid bool word")]
    InvalidBool,
    /// Address word with dirty upper bytes.
    #[error("invalid address word")]
    InvalidAddress,
    /// Dynamic offset points outside the data.
    #[error("invalid offset {0}")]
    InvalidOffset(usize),
    /// String bytes are not UTF-8.
    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

// =============================================================================
// ENCODING
// =============================================================================

/// An ABI value to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `uint256` (values above u128 are not needed by this contract).
    Uint(u128),
    /// `address`.
    Address(Address),
    /// `bool`.
    Bool(bool),
    /// `string` (dynamic).
    String(String),
    /// Tuple; dynamic if any member is.
    Tuple(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) => true,
            Token::Tuple(members) => members.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    /// Size of this token's head slot(s).
    fn head_len(&self) -> usize {
        match self {
            Token::Tuple(members) if !self.is_dynamic() => members.iter().map(Token::head_len).sum(),
            _ => WORD,
        }
    }
}

/// Encode an unsigned integer word.
pub fn uint_word(value: u128) -> Word {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode an address word.
pub fn address_word(address: &Address) -> Word {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Encode a bool word.
pub fn bool_word(value: bool) -> Word {
    uint_word(value as u128)
}

fn encode_string_body(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&uint_word(bytes.len() as u128));
    out.extend_from_slice(bytes);
    let pad = (WORD - bytes.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(pad));
}

/// Encode a parameter list with head/tail layout.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_size: usize = tokens.iter().map(Token::head_len).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_size + tail.len()) as u128));
            match token {
                Token::String(s) => encode_string_body(s, &mut tail),
                Token::Tuple(members) => tail.extend_from_slice(&encode(members)),
                _ => unreachable!("only strings and tuples are dynamic"),
            }
        } else {
            match token {
                Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
                Token::Address(a) => head.extend_from_slice(&address_word(a)),
                Token::Bool(b) => head.extend_from_slice(&bool_word(*b)),
                Token::Tuple(members) => head.extend_from_slice(&encode(members)),
                Token::String(_) => unreachable!("strings are dynamic"),
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Prefix encoded parameters with a selector.
pub fn encode_with_selector(sel: Selector, tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + tokens.len() * WORD);
    out.extend_from_slice(&sel);
    out.extend_from_slice(&encode(tokens));
    out
}

// =============================================================================
// DECODING
// =============================================================================

/// Cursor over an ABI-encoded parameter block.
///
/// `index` arguments address head slots (word index), so a static tuple
/// occupying several slots is read field by field.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Wrap an encoded block.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw word at a head slot.
    pub fn word(&self, index: usize) -> Result<&'a [u8], AbiError> {
        let start = index * WORD;
        let end = start + WORD;
        if self.data.len() < end {
            return Err(AbiError::TooShort { needed: end, got: self.data.len() });
        }
        Ok(&self.data[start..end])
    }

    /// `uint256` that must fit in u128.
    pub fn uint(&self, index: usize) -> Result<u128, AbiError> {
        let word = self.word(index)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow("uint128"));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(bytes))
    }

    /// `uint256` that must fit in u64.
    pub fn uint64(&self, index: usize) -> Result<u64, AbiError> {
        let value = self.uint(index)?;
        u64::try_from(value).map_err(|_| AbiError::Overflow("uint64"))
    }

    /// `uint8`.
    pub fn uint8(&self, index: usize) -> Result<u8, AbiError> {
        let value = self.uint(index)?;
        u8::try_from(value).map_err(|_| AbiError::Overflow("uint8"))
    }

    /// `address`.
    pub fn address(&self, index: usize) -> Result<Address, AbiError> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddress);
        }
        Address::from_slice(&word[12..]).ok_or(AbiError::InvalidAddress)
    }

    /// `bool`.
    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        match self.uint(index) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) | Err(AbiError::Overflow(_)) => Err(AbiError::InvalidBool),
            Err(e) => Err(e),
        }
    }

    /// Follow the offset in a head slot to a nested dynamic block.
    pub fn nested(&self, index: usize) -> Result<Decoder<'a>, AbiError> {
        let offset = self
            .uint(index)
            .ok()
            .and_then(|raw| usize::try_from(raw).ok())
            .ok_or(AbiError::InvalidOffset(usize::MAX))?;
        if offset > self.data.len() {
            return Err(AbiError::InvalidOffset(offset));
        }
        Ok(Decoder::new(&self.data[offset..]))
    }

    /// Dynamic `string` referenced from a head slot.
    pub fn string(&self, index: usize) -> Result<String, AbiError> {
        let body = self.nested(index)?;
        let len = body
            .uint(0)
            .ok()
            .and_then(|raw| usize::try_from(raw).ok())
            .ok_or(AbiError::Overflow("string length"))?;
        let needed = WORD
            .checked_add(len)
            .ok_or(AbiError::Overflow("string length"))?;
        if body.data.len() < needed {
            return Err(AbiError::TooShort { needed, got: body.data.len() });
        }
        String::from_utf8(body.data[WORD..needed].to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }
}

// =============================================================================
// CONTRACT CALLS
// =============================================================================

/// Every function of the MatchUp contract interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// `createMatch(uint256)`
    CreateMatch {
        /// Wager escrowed from the caller.
        bet_amount: TokenAmount,
    },
    /// `joinMatch(uint256)`
    JoinMatch {
        /// Match to join.
        match_id: MatchId,
    },
    /// `readyUp(uint256)` (payable)
    ReadyUp {
        /// Match to ready up in.
        match_id: MatchId,
    },
    /// `declareWinner(uint256,address)`
    DeclareWinner {
        /// Match to resolve.
        match_id: MatchId,
        /// Winner to pay out.
        winner: Address,
    },
    /// `cancelMatch(uint256)`
    CancelMatch {
        /// Match to cancel.
        match_id: MatchId,
    },
    /// `createUserProfile(string)`
    CreateUserProfile {
        /// Riot ID handle.
        riot_id: String,
    },
    /// `getMatch(uint256)` view
    GetMatch {
        /// Match to read.
        match_id: MatchId,
    },
    /// `getUserProfile(address)` view
    GetUserProfile {
        /// Profile owner.
        user: Address,
    },
    /// `matchCount()` view
    MatchCount,
    /// `matches(uint256)` public mapping getter
    Matches {
        /// Match to read.
        match_id: MatchId,
    },
    /// `PLATFORM_FEE()` constant
    PlatformFee,
    /// `platformWallet()` view
    PlatformWallet,
    /// `userProfiles(address)` public mapping getter
    UserProfiles {
        /// Profile owner.
        user: Address,
    },
}

/// Canonical signatures, in the order selectors are matched.
const SIGNATURES: [&str; 13] = [
    "createMatch(uint256)",
    "joinMatch(uint256)",
    "readyUp(uint256)",
    "declareWinner(uint256,address)",
    "cancelMatch(uint256)",
    "createUserProfile(string)",
    "getMatch(uint256)",
    "getUserProfile(address)",
    "matchCount()",
    "matches(uint256)",
    "PLATFORM_FEE()",
    "platformWallet()",
    "userProfiles(address)",
];

impl ContractCall {
    fn signature_index(&self) -> usize {
        match self {
            ContractCall::CreateMatch { .. } => 0,
            ContractCall::JoinMatch { .. } => 1,
            ContractCall::ReadyUp { .. } => 2,
            ContractCall::DeclareWinner { .. } => 3,
            ContractCall::CancelMatch { .. } => 4,
            ContractCall::CreateUserProfile { .. } => 5,
            ContractCall::GetMatch { .. } => 6,
            ContractCall::GetUserProfile { .. } => 7,
            ContractCall::MatchCount => 8,
            ContractCall::Matches { .. } => 9,
            ContractCall::PlatformFee => 10,
            ContractCall::PlatformWallet => 11,
            ContractCall::UserProfiles { .. } => 12,
        }
    }

    /// Canonical Solidity signature.
    pub fn signature(&self) -> &'static str {
        SIGNATURES[self.signature_index()]
    }

    /// Function name without parameter list.
    pub fn name(&self) -> &'static str {
        let sig = self.signature();
        sig.split('(').next().unwrap_or(sig)
    }

    /// 4-byte selector.
    pub fn selector(&self) -> Selector {
        selector(self.signature())
    }

    /// Read-only functions (served by `eth_call`).
    pub fn is_view(&self) -> bool {
        self.signature_index() >= 6
    }

    /// Whether the function accepts a value transfer.
    pub fn is_payable(&self) -> bool {
        matches!(self, ContractCall::ReadyUp { .. })
    }

    /// Encode calldata.
    pub fn encode(&self) -> Vec<u8> {
        let tokens = match self {
            ContractCall::CreateMatch { bet_amount } => vec![Token::Uint(bet_amount.0)],
            ContractCall::JoinMatch { match_id }
            | ContractCall::ReadyUp { match_id }
            | ContractCall::CancelMatch { match_id }
            | ContractCall::GetMatch { match_id }
            | ContractCall::Matches { match_id } => vec![Token::Uint(match_id.0 as u128)],
            ContractCall::DeclareWinner { match_id, winner } => {
                vec![Token::Uint(match_id.0 as u128), Token::Address(*winner)]
            }
            ContractCall::CreateUserProfile { riot_id } => vec![Token::String(riot_id.clone())],
            ContractCall::GetUserProfile { user } | ContractCall::UserProfiles { user } => {
                vec![Token::Address(*user)]
            }
            ContractCall::MatchCount | ContractCall::PlatformFee | ContractCall::PlatformWallet => vec![],
        };
        encode_with_selector(self.selector(), &tokens)
    }

    /// Decode calldata.
    pub fn decode(calldata: &[u8]) -> Result<Self, AbiError> {
        if calldata.len() < 4 {
            return Err(AbiError::TooShort { needed: 4, got: calldata.len() });
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&calldata[..4]);
        let args = Decoder::new(&calldata[4..]);

        let index = SIGNATURES
            .iter()
            .position(|sig| selector(sig) == sel)
            .ok_or(AbiError::UnknownSelector(sel))?;

        let id = |d: &Decoder| d.uint64(0).map(MatchId);
        let call = match index {
            0 => ContractCall::CreateMatch { bet_amount: TokenAmount(args.uint(0)?) },
            1 => ContractCall::JoinMatch { match_id: id(&args)? },
            2 => ContractCall::ReadyUp { match_id: id(&args)? },
            3 => ContractCall::DeclareWinner { match_id: id(&args)?, winner: args.address(1)? },
            4 => ContractCall::CancelMatch { match_id: id(&args)? },
            5 => ContractCall::CreateUserProfile { riot_id: args.string(0)? },
            6 => ContractCall::GetMatch { match_id: id(&args)? },
            7 => ContractCall::GetUserProfile { user: args.address(0)? },
            8 => ContractCall::MatchCount,
            9 => ContractCall::Matches { match_id: id(&args)? },
            10 => ContractCall::PlatformFee,
            11 => ContractCall::PlatformWallet,
            _ => ContractCall::UserProfiles { user: args.address(0)? },
        };
        Ok(call)
    }
}

// =============================================================================
// RETURN DATA
// =============================================================================

fn match_tokens(m: &Match) -> Vec<Token> {
    vec![
        Token::Address(m.creator),
        Token::Address(m.challenger),
        Token::Uint(m.bet_amount.0),
        Token::Uint(m.status.as_u8() as u128),
        Token::Bool(m.creator_ready),
        Token::Bool(m.challenger_ready),
    ]
}

/// Encode a `Match` (static tuple, six words). Same layout for `getMatch` and `matches`.
pub fn encode_match(m: &Match) -> Vec<u8> {
    encode(&[Token::Tuple(match_tokens(m))])
}

/// Decode a `Match` return value.
pub fn decode_match(data: &[u8]) -> Result<Match, AbiError> {
    let d = Decoder::new(data);
    let raw_status = d.uint8(3)?;
    Ok(Match {
        creator: d.address(0)?,
        challenger: d.address(1)?,
        bet_amount: TokenAmount(d.uint(2)?),
        status: MatchStatus::from_u8(raw_status).ok_or(AbiError::UnknownStatus(raw_status))?,
        creator_ready: d.bool(4)?,
        challenger_ready: d.bool(5)?,
    })
}

/// Encode `getUserProfile` output: a dynamic `tuple(string)`.
pub fn encode_user_profile(profile: &UserProfile) -> Vec<u8> {
    encode(&[Token::Tuple(vec![Token::String(profile.riot_id.clone())])])
}

/// Decode `getUserProfile` output.
pub fn decode_user_profile(data: &[u8]) -> Result<UserProfile, AbiError> {
    let tuple = Decoder::new(data).nested(0)?;
    Ok(UserProfile { riot_id: tuple.string(0)? })
}

/// Encode a single `string` return (`userProfiles` getter).
pub fn encode_string(s: &str) -> Vec<u8> {
    encode(&[Token::String(s.to_string())])
}

/// Decode a single `string` return.
pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    Decoder::new(data).string(0)
}

/// Decode a single `uint256` return.
pub fn decode_uint(data: &[u8]) -> Result<u128, AbiError> {
    Decoder::new(data).uint(0)
}

/// Decode a single `address` return.
pub fn decode_address(data: &[u8]) -> Result<Address, AbiError> {
    Decoder::new(data).address(0)
}

// =============================================================================
// REVERTS
// =============================================================================

/// Encode an `Error(string)` revert payload.
pub fn encode_revert(reason: &str) -> Vec<u8> {
    encode_with_selector(selector(ERROR_SIGNATURE), &[Token::String(reason.to_string())])
}

/// Extract the reason from an `Error(string)` revert payload.
///
/// Returns `None` for empty data, custom errors and panics.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != selector(ERROR_SIGNATURE) {
        return None;
    }
    Decoder::new(&data[4..]).string(0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_create_match_calldata_layout() {
        let data = ContractCall::CreateMatch { bet_amount: TokenAmount(10) }.encode();
        assert_eq!(data.len(), 4 + WORD);
        assert_eq!(&data[..4], &selector("createMatch(uint256)"));
        assert_eq!(data[4 + 31], 10);
        assert!(data[4..4 + 31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_declare_winner_calldata() {
        let call = ContractCall::DeclareWinner { match_id: MatchId(7), winner: addr(0xaa) };
        let data = call.encode();
        assert_eq!(data.len(), 4 + 2 * WORD);
        assert_eq!(&data[4 + WORD + 12..], &[0xaa; 20]);
        assert_eq!(ContractCall::decode(&data).unwrap(), call);
    }

    #[test]
    fn test_string_calldata_padding() {
        let call = ContractCall::CreateUserProfile { riot_id: "fac3_m4n#EUW".to_string() };
        let data = call.encode();
        // selector + offset + length + one padded data word
        assert_eq!(data.len(), 4 + 3 * WORD);
        assert_eq!(data[4 + 31], 0x20);
        assert_eq!(data[4 + WORD + 31], 12);
        assert_eq!(ContractCall::decode(&data).unwrap(), call);
    }

    #[test]
    fn test_decode_unknown_selector() {
        let result = ContractCall::decode(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(result, Err(AbiError::UnknownSelector([0xde, 0xad, 0xbe, 0xef])));
        assert!(matches!(ContractCall::decode(&[1, 2]), Err(AbiError::TooShort { .. })));
    }

    #[test]
    fn test_view_and_payable_flags() {
        assert!(!ContractCall::JoinMatch { match_id: MatchId(1) }.is_view());
        assert!(ContractCall::GetMatch { match_id: MatchId(1) }.is_view());
        assert!(ContractCall::PlatformFee.is_view());
        assert!(ContractCall::ReadyUp { match_id: MatchId(1) }.is_payable());
        assert!(!ContractCall::CancelMatch { match_id: MatchId(1) }.is_payable());
        assert_eq!(ContractCall::MatchCount.name(), "matchCount");
    }

    #[test]
    fn test_match_return_is_six_words() {
        let mut m = Match::new(addr(1), TokenAmount(500));
        m.challenger = addr(2);
        m.status = MatchStatus::Joined;
        m.challenger_ready = true;

        let data = encode_match(&m);
        assert_eq!(data.len(), 6 * WORD);
        assert_eq!(decode_match(&data).unwrap(), m);
    }

    #[test]
    fn test_match_unknown_status_rejected() {
        let mut data = encode_match(&Match::new(addr(1), TokenAmount(1)));
        data[3 * WORD + 31] = 9;
        assert_eq!(decode_match(&data), Err(AbiError::UnknownStatus(9)));
    }

    #[test]
    fn test_dirty_words_rejected() {
        let mut data = encode_match(&Match::new(addr(1), TokenAmount(1)));
        data[0] = 1;
        assert_eq!(decode_match(&data), Err(AbiError::InvalidAddress));

        let mut data = encode_match(&Match::new(addr(1), TokenAmount(1)));
        data[4 * WORD + 31] = 2;
        assert_eq!(decode_match(&data), Err(AbiError::InvalidBool));
    }

    #[test]
    fn test_user_profile_tuple_layout() {
        let profile = UserProfile { riot_id: "abc".to_string() };
        let data = encode_user_profile(&profile);
        // outer offset, inner offset, length, data
        assert_eq!(data.len(), 4 * WORD);
        assert_eq!(data[31], 0x20);
        assert_eq!(data[WORD + 31], 0x20);
        assert_eq!(data[2 * WORD + 31], 3);
        assert_eq!(decode_user_profile(&data).unwrap(), profile);
    }

    #[test]
    fn test_empty_string_profile() {
        let data = encode_user_profile(&UserProfile::default());
        let decoded = decode_user_profile(&data).unwrap();
        assert!(!decoded.exists());
    }

    #[test]
    fn test_revert_reason() {
        let data = encode_revert("Match not open");
        assert_eq!(&data[..4], &[0x08, 0xc3, 0x79, 0xa0]);
        assert_eq!(decode_revert(&data).as_deref(), Some("Match not open"));
        assert_eq!(decode_revert(&[]), None);
        assert_eq!(decode_revert(&[0x4e, 0x48, 0x7b, 0x71]), None);
    }

    #[test]
    fn test_truncated_string_rejected() {
        let mut data = encode_string("hello world");
        data.truncate(2 * WORD + 4);
        assert!(matches!(decode_string(&data), Err(AbiError::TooShort { .. })));
    }

    #[test]
    fn test_oversized_offset_and_length_rejected() {
        let far = 1u128 << 100;
        assert_eq!(decode_string(&uint_word(far)), Err(AbiError::InvalidOffset(usize::MAX)));

        let mut data = uint_word(0x20).to_vec();
        data.extend_from_slice(&uint_word(far));
        assert_eq!(decode_string(&data), Err(AbiError::Overflow("string length")));

        let mut data = uint_word(0x20).to_vec();
        data.extend_from_slice(&uint_word(usize::MAX as u128));
        assert_eq!(decode_string(&data), Err(AbiError::Overflow("string length")));
    }

    #[test]
    fn test_uint_overflow() {
        let mut word = uint_word(0).to_vec();
        word[0] = 1;
        assert_eq!(decode_uint(&word), Err(AbiError::Overflow("uint128")));
    }
}
