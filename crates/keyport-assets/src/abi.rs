//! Solidity ABI encoding for the token transfer calls the planner emits.
//!
//! Only the argument kinds those calls need are supported: `address`,
//! `uint256`, `uint256[]` and `bytes`. Static arguments occupy one
//! 32-byte head word; dynamic ones put an offset in the head and their
//! length-prefixed body in the tail.

use alloy_primitives::U256;
use keyport_crypto::hash::function_selector;
use keyport_types::EvmAddress;

/// ERC-20 `transfer`.
pub const ERC20_TRANSFER: &str = "transfer(address,uint256)";

/// ERC-721 `safeTransferFrom` without data.
pub const ERC721_SAFE_TRANSFER_FROM: &str = "safeTransferFrom(address,address,uint256)";

/// ERC-1155 single-token `safeTransferFrom`.
pub const ERC1155_SAFE_TRANSFER_FROM: &str =
    "safeTransferFrom(address,address,uint256,uint256,bytes)";

/// ERC-1155 `safeBatchTransferFrom`.
pub const ERC1155_SAFE_BATCH_TRANSFER_FROM: &str =
    "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)";

const WORD: usize = 32;

/// One call argument.
#[derive(Clone, Copy, Debug)]
pub enum Token<'a> {
    /// `address`, left-padded to 32 bytes.
    Address(EvmAddress),
    /// `uint256`, big-endian.
    Uint(U256),
    /// `uint256[]`.
    UintArray(&'a [U256]),
    /// `bytes`.
    Bytes(&'a [u8]),
}

fn address_word(address: &EvmAddress) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - EvmAddress::LEN..].copy_from_slice(address.as_bytes());
    word
}

fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

fn len_word(len: usize) -> [u8; WORD] {
    uint_word(U256::from(len))
}

/// ABI-encodes `tokens` as the argument tuple of a call.
pub fn encode_args(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => head.extend_from_slice(&address_word(address)),
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::UintArray(values) => {
                head.extend_from_slice(&len_word(head_len + tail.len()));
                tail.extend_from_slice(&len_word(values.len()));
                for value in values.iter() {
                    tail.extend_from_slice(&uint_word(*value));
                }
            }
            Token::Bytes(bytes) => {
                head.extend_from_slice(&len_word(head_len + tail.len()));
                tail.extend_from_slice(&len_word(bytes.len()));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Encodes a full call: 4-byte selector of `signature` followed by the
/// encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token<'_>]) -> Vec<u8> {
    let mut data = function_selector(signature).to_vec();
    data.extend_from_slice(&encode_args(tokens));
    data
}

/// `transfer(to, amount)`.
pub fn erc20_transfer(to: EvmAddress, amount: U256) -> Vec<u8> {
    encode_call(ERC20_TRANSFER, &[Token::Address(to), Token::Uint(amount)])
}

/// `safeTransferFrom(from, to, tokenId)`.
pub fn erc721_safe_transfer_from(from: EvmAddress, to: EvmAddress, token_id: U256) -> Vec<u8> {
    encode_call(
        ERC721_SAFE_TRANSFER_FROM,
        &[Token::Address(from), Token::Address(to), Token::Uint(token_id)],
    )
}

/// `safeTransferFrom(from, to, id, amount, "")`.
pub fn erc1155_safe_transfer_from(
    from: EvmAddress,
    to: EvmAddress,
    token_id: U256,
    amount: U256,
) -> Vec<u8> {
    encode_call(
        ERC1155_SAFE_TRANSFER_FROM,
        &[
            Token::Address(from),
            Token::Address(to),
            Token::Uint(token_id),
            Token::Uint(amount),
            Token::Bytes(&[]),
        ],
    )
}

/// `safeBatchTransferFrom(from, to, ids, amounts, "")`.
pub fn erc1155_safe_batch_transfer_from(
    from: EvmAddress,
    to: EvmAddress,
    token_ids: &[U256],
    amounts: &[U256],
) -> Vec<u8> {
    encode_call(
        ERC1155_SAFE_BATCH_TRANSFER_FROM,
        &[
            Token::Address(from),
            Token::Address(to),
            Token::UintArray(token_ids),
            Token::UintArray(amounts),
            Token::Bytes(&[]),
        ],
    )
}
