/// Token id produced by the external tokenizer.
/// Example: `2023` (`"this"` in a BERT uncased vocabulary)
pub type TokenId = u32;
/// Token-type id assigned by the pair template (`0` for the first half, `1` for the second).
pub type TypeId = u32;
/// Position of a segment within its chunk, recorded per token before renumbering.
/// Example: `[0, 0, 1, 2, 2]` for segments of lengths 2, 1, 2
pub type OriginId = u32;
/// Renumbered per-token segment id emitted with each instance.
/// Example: `[0, 1, 1, 2, 3, 4, 4, 4, 5]`
pub type SegmentId = u32;
/// One tokenized input line; the atomic chunking unit.
/// Example: `[101, 7592, 2088]` minus special tokens, i.e. `[7592, 2088]`
pub type Segment = Vec<TokenId>;
/// Raw text line read from a corpus before tokenization.
/// Example: `The quick brown fox jumps over the lazy dog.`
pub type TextLine = String;
