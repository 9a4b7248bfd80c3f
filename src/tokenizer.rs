//! Tokenizer integration over the `tokenizers` library.

use std::path::Path;

use tokenizers::{Encoding, PostProcessor, Token};

use crate::assemble::PairTemplate;
use crate::constants::assemble::{FIRST_TYPE_ID, SECOND_TYPE_ID};
use crate::constants::tokenizer::PAD_TOKEN_NAMES;
use crate::errors::PairsError;
use crate::types::{Segment, TextLine, TokenId, TypeId};

/// Wrapper around a `tokenizer.json` tokenizer that encodes lines without
/// special tokens and lays out pairs with the tokenizer's own post-processor.
///
/// A tokenizer without a post-processor adds no boundary tokens, so it is
/// rejected as a pair template.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    /// Load a tokenizer from a local `tokenizer.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PairsError> {
        let inner = tokenizers::Tokenizer::from_file(path.as_ref())
            .map_err(|e| PairsError::Tokenizer(e.to_string()))?;
        Ok(Self::from_tokenizer(inner))
    }

    /// Load a tokenizer from serialized `tokenizer.json` bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PairsError> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| PairsError::Tokenizer(e.to_string()))?;
        Ok(Self::from_tokenizer(inner))
    }

    pub fn from_tokenizer(inner: tokenizers::Tokenizer) -> Self {
        Self { inner }
    }

    /// Encode one line to token ids, special tokens excluded.
    pub fn encode_line(&self, text: &str) -> Result<Segment, PairsError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| PairsError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Encode lines in order. Blank lines become empty segments.
    pub fn encode_lines(&self, lines: &[TextLine]) -> Result<Vec<Segment>, PairsError> {
        let inputs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let encodings = self
            .inner
            .encode_batch(inputs, false)
            .map_err(|e| PairsError::Tokenizer(e.to_string()))?;
        Ok(encodings
            .iter()
            .map(|encoding| encoding.get_ids().to_vec())
            .collect())
    }

    /// Decode token ids to text, keeping special tokens.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String, PairsError> {
        self.inner
            .decode(ids, false)
            .map_err(|e| PairsError::Tokenizer(e.to_string()))
    }

    /// Model max length from the serialized truncation settings, if any.
    pub fn model_max_length(&self) -> Option<usize> {
        self.inner
            .get_truncation()
            .map(|truncation| truncation.max_length)
    }

    /// Get pad token ID if available.
    ///
    /// Tries the configured padding first, then common pad token names.
    pub fn pad_token_id(&self) -> Option<TokenId> {
        self.inner
            .get_padding()
            .map(|padding| padding.pad_id)
            .or_else(|| first_token_id(&self.inner, &PAD_TOKEN_NAMES))
    }

    /// Get vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl PairTemplate for HfTokenizer {
    fn special_tokens_overhead(&self, pair: bool) -> usize {
        self.inner
            .get_post_processor()
            .map_or(0, |processor| processor.added_tokens(pair))
    }

    fn assemble_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TokenId>, PairsError> {
        Ok(self.encode_pair(tokens_a, tokens_b)?.0)
    }

    fn token_type_ids_for_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<Vec<TypeId>, PairsError> {
        Ok(self.encode_pair(tokens_a, tokens_b)?.1)
    }

    fn encode_pair(
        &self,
        tokens_a: &[TokenId],
        tokens_b: &[TokenId],
    ) -> Result<(Vec<TokenId>, Vec<TypeId>), PairsError> {
        let first = id_encoding(tokens_a, FIRST_TYPE_ID);
        let second = id_encoding(tokens_b, SECOND_TYPE_ID);
        let encoding = match self.inner.get_post_processor() {
            Some(processor) => processor
                .process(first, Some(second), true)
                .map_err(|e| PairsError::Tokenizer(e.to_string()))?,
            None => Encoding::merge([first, second], false),
        };
        Ok((encoding.get_ids().to_vec(), encoding.get_type_ids().to_vec()))
    }
}

/// Encoding of already-tokenized ids, as the post-processor expects to receive it.
fn id_encoding(ids: &[TokenId], type_id: TypeId) -> Encoding {
    let tokens = ids
        .iter()
        .map(|&id| Token::new(id, String::new(), (0, 0)))
        .collect();
    Encoding::from_tokens(tokens, type_id)
}

fn first_token_id(tokenizer: &tokenizers::Tokenizer, names: &[&str]) -> Option<TokenId> {
    names.iter().find_map(|name| tokenizer.token_to_id(name))
}
