//! Method descriptors: decoding method tokens and log folder names into the
//! memory configuration they were run with, and mapping that configuration
//! onto a report row.
//!
//! Two input shapes are understood, tried in order by [`DescriptorParser`]:
//!
//! 1. structured tokens, `{strategy}_{uses_memory}_{uses_glove}`
//!    (e.g. `vanilla_True_True`);
//! 2. free-form log folder names, e.g.
//!    `log_hidden_frozenlake_llama3.1-8b_vanilla_True_False`, where the model
//!    token may sit before or after the strategy token and either boolean
//!    may be missing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::Regime;

const IMPLICIT_PREFIX: &str = "log_hidden_";
const LOG_PREFIX: &str = "log_";

// ---------------------------------------------------------------------------
// Memory strategy
// ---------------------------------------------------------------------------

/// Long-term memory mechanism used by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStrategy {
    Vanilla,
    #[serde(rename = "memorybank")]
    MemoryBank,
    Voyager,
    Generative,
}

impl MemoryStrategy {
    pub const ALL: [MemoryStrategy; 4] = [
        MemoryStrategy::Vanilla,
        MemoryStrategy::MemoryBank,
        MemoryStrategy::Voyager,
        MemoryStrategy::Generative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vanilla => "vanilla",
            Self::MemoryBank => "memorybank",
            Self::Voyager => "voyager",
            Self::Generative => "generative",
        }
    }
}

impl fmt::Display for MemoryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryStrategy {
    type Err = ParseFailure;

    /// Exact, case-sensitive match against the closed strategy set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseFailure::UnknownStrategy {
                token: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Row labels
// ---------------------------------------------------------------------------

/// Report row. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowLabel {
    #[serde(rename = "no-memory")]
    NoMemory,
    #[serde(rename = "vanilla")]
    Vanilla,
    #[serde(rename = "vanilla-glove")]
    VanillaGlove,
    #[serde(rename = "memorybank")]
    MemoryBank,
    #[serde(rename = "memorybank-glove")]
    MemoryBankGlove,
    #[serde(rename = "voyager")]
    Voyager,
    #[serde(rename = "voyager-glove")]
    VoyagerGlove,
    #[serde(rename = "generative")]
    Generative,
    #[serde(rename = "generative-glove")]
    GenerativeGlove,
}

impl RowLabel {
    /// All rows in display order.
    pub const ALL: [RowLabel; 9] = [
        RowLabel::NoMemory,
        RowLabel::Vanilla,
        RowLabel::VanillaGlove,
        RowLabel::MemoryBank,
        RowLabel::MemoryBankGlove,
        RowLabel::Voyager,
        RowLabel::VoyagerGlove,
        RowLabel::Generative,
        RowLabel::GenerativeGlove,
    ];

    /// Plain/glove row pairs, plain first.
    pub const GLOVE_PAIRS: [(RowLabel, RowLabel); 4] = [
        (RowLabel::Vanilla, RowLabel::VanillaGlove),
        (RowLabel::MemoryBank, RowLabel::MemoryBankGlove),
        (RowLabel::Voyager, RowLabel::VoyagerGlove),
        (RowLabel::Generative, RowLabel::GenerativeGlove),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMemory => "no-memory",
            Self::Vanilla => "vanilla",
            Self::VanillaGlove => "vanilla-glove",
            Self::MemoryBank => "memorybank",
            Self::MemoryBankGlove => "memorybank-glove",
            Self::Voyager => "voyager",
            Self::VoyagerGlove => "voyager-glove",
            Self::Generative => "generative",
            Self::GenerativeGlove => "generative-glove",
        }
    }
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown row label: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Memory configuration of one experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub memory_strategy: MemoryStrategy,
    pub uses_memory: bool,
    pub uses_embedding_augmentation: bool,
}

impl MethodDescriptor {
    pub fn new(memory_strategy: MemoryStrategy, uses_memory: bool, uses_glove: bool) -> Self {
        Self {
            memory_strategy,
            uses_memory,
            uses_embedding_augmentation: uses_glove,
        }
    }

    /// Report row for this configuration.
    ///
    /// Only the nine combinations that appear in the report layout have a
    /// row; anything else (e.g. `memorybank` with memory disabled) yields
    /// `None` and is expected to be dropped by the caller with a diagnostic.
    pub fn row_label(&self) -> Option<RowLabel> {
        use MemoryStrategy::*;
        match (
            self.memory_strategy,
            self.uses_memory,
            self.uses_embedding_augmentation,
        ) {
            (Vanilla, false, false) => Some(RowLabel::NoMemory),
            (Vanilla, true, false) => Some(RowLabel::Vanilla),
            (Vanilla, true, true) => Some(RowLabel::VanillaGlove),
            (MemoryBank, true, false) => Some(RowLabel::MemoryBank),
            (MemoryBank, true, true) => Some(RowLabel::MemoryBankGlove),
            (Voyager, true, false) => Some(RowLabel::Voyager),
            (Voyager, true, true) => Some(RowLabel::VoyagerGlove),
            (Generative, true, false) => Some(RowLabel::Generative),
            (Generative, true, true) => Some(RowLabel::GenerativeGlove),
            _ => None,
        }
    }

    /// Structured token, e.g. `vanilla_True_False`.
    pub fn token(&self) -> String {
        format!(
            "{}_{}_{}",
            self.memory_strategy,
            bool_literal(self.uses_memory),
            bool_literal(self.uses_embedding_augmentation)
        )
    }
}

fn bool_literal(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn parse_bool_literal(token: &str) -> Option<bool> {
    match token {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Why a name could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("expected 3 fields separated by '_', found {found}")]
    FieldCount { found: usize },

    #[error("unknown memory strategy: {token}")]
    UnknownStrategy { token: String },

    #[error("expected True or False, found {token}")]
    InvalidBool { token: String },

    #[error("no memory strategy token found")]
    NoStrategyToken,

    #[error("empty name")]
    Empty,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Parse a structured method token, `{strategy}_{uses_memory}_{uses_glove}`.
pub fn parse_structured(token: &str) -> Result<MethodDescriptor, ParseFailure> {
    if token.is_empty() {
        return Err(ParseFailure::Empty);
    }
    let fields: Vec<&str> = token.split('_').collect();
    let [strategy, uses_memory, uses_glove] = fields.as_slice() else {
        return Err(ParseFailure::FieldCount { found: fields.len() });
    };

    let memory_strategy: MemoryStrategy = strategy.parse()?;
    let uses_memory = parse_bool_literal(uses_memory).ok_or_else(|| ParseFailure::InvalidBool {
        token: uses_memory.to_string(),
    })?;
    let uses_glove = parse_bool_literal(uses_glove).ok_or_else(|| ParseFailure::InvalidBool {
        token: uses_glove.to_string(),
    })?;

    Ok(MethodDescriptor::new(memory_strategy, uses_memory, uses_glove))
}

/// Decoding strategies, in the order [`DescriptorParser::parse`] tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorStrategy {
    Structured,
    FreeForm,
}

impl DescriptorStrategy {
    pub const ORDER: [DescriptorStrategy; 2] =
        [DescriptorStrategy::Structured, DescriptorStrategy::FreeForm];
}

/// A successfully decoded name, tagged with the strategy that decoded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMethod {
    pub descriptor: MethodDescriptor,
    pub strategy: DescriptorStrategy,
    /// Environment token, free-form names only.
    pub environment: Option<String>,
    /// Model token, free-form names only, when one was recognised.
    pub model: Option<String>,
    /// Regime implied by the folder prefix, free-form names only.
    pub regime: Option<Regime>,
}

impl ParsedMethod {
    pub fn row_label(&self) -> Option<RowLabel> {
        self.descriptor.row_label()
    }
}

/// Decodes method tokens and log folder names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorParser {
    model_fragments: Vec<String>,
}

impl DescriptorParser {
    /// `model_fragments` are matched case-insensitively against free-form
    /// tokens to recover the model name.
    pub fn new(model_fragments: &[String]) -> Self {
        Self {
            model_fragments: model_fragments.iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    /// Try each strategy in [`DescriptorStrategy::ORDER`]; the first success
    /// wins. When all fail, the free-form failure is returned since it
    /// describes the more general shape.
    pub fn parse(&self, name: &str) -> Result<ParsedMethod, ParseFailure> {
        let mut last_failure = ParseFailure::Empty;
        for strategy in DescriptorStrategy::ORDER {
            match self.parse_with(strategy, name) {
                Ok(parsed) => return Ok(parsed),
                Err(failure) => last_failure = failure,
            }
        }
        Err(last_failure)
    }

    /// Run a single strategy.
    pub fn parse_with(
        &self,
        strategy: DescriptorStrategy,
        name: &str,
    ) -> Result<ParsedMethod, ParseFailure> {
        match strategy {
            DescriptorStrategy::Structured => {
                parse_structured(name).map(|descriptor| ParsedMethod {
                    descriptor,
                    strategy,
                    environment: None,
                    model: None,
                    regime: None,
                })
            }
            DescriptorStrategy::FreeForm => self.parse_free_form(name),
        }
    }

    fn is_model_token(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.model_fragments.iter().any(|f| lower.contains(f.as_str()))
    }

    /// Decode a log folder name such as
    /// `log_{env}_{model}_{strategy}_{uses_memory}_{uses_glove}`.
    pub fn parse_free_form(&self, name: &str) -> Result<ParsedMethod, ParseFailure> {
        let (regime, remainder) = if let Some(rest) = name.strip_prefix(IMPLICIT_PREFIX) {
            (Regime::Implicit, rest)
        } else if let Some(rest) = name.strip_prefix(LOG_PREFIX) {
            (Regime::Explicit, rest)
        } else {
            (Regime::Explicit, name)
        };

        // Splitting and dropping empty tokens collapses doubled separators.
        let tokens: Vec<&str> = remainder.split('_').filter(|t| !t.is_empty()).collect();
        let Some((environment, rest)) = tokens.split_first() else {
            return Err(ParseFailure::Empty);
        };

        let (anchor, memory_strategy) = rest
            .iter()
            .enumerate()
            .find_map(|(i, t)| t.parse::<MemoryStrategy>().ok().map(|m| (i, m)))
            .ok_or(ParseFailure::NoStrategyToken)?;

        let before = &rest[..anchor];
        let after = &rest[anchor + 1..];

        let model = before
            .iter()
            .chain(after.iter())
            .find(|t| self.is_model_token(t))
            .map(|t| t.to_string());

        let bools: Vec<bool> = after.iter().filter_map(|t| parse_bool_literal(t)).collect();
        let uses_memory = bools.first().copied().unwrap_or(true);
        let uses_glove = bools.get(1).copied().unwrap_or(false);

        Ok(ParsedMethod {
            descriptor: MethodDescriptor::new(memory_strategy, uses_memory, uses_glove),
            strategy: DescriptorStrategy::FreeForm,
            environment: Some(environment.to_string()),
            model,
            regime: Some(regime),
        })
    }
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new(&["gpt".to_string(), "llama".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_token() {
        let d = parse_structured("vanilla_True_True").unwrap();
        assert_eq!(d.memory_strategy, MemoryStrategy::Vanilla);
        assert!(d.uses_memory);
        assert!(d.uses_embedding_augmentation);
        assert_eq!(d.row_label(), Some(RowLabel::VanillaGlove));
        assert_eq!(d.token(), "vanilla_True_True");
    }

    #[test]
    fn test_structured_rejects_unknown_strategy() {
        let err = parse_structured("reflexion_True_False").unwrap_err();
        assert_eq!(
            err,
            ParseFailure::UnknownStrategy {
                token: "reflexion".to_string()
            }
        );
    }

    #[test]
    fn test_structured_rejects_field_count() {
        assert_eq!(
            parse_structured("vanilla_True").unwrap_err(),
            ParseFailure::FieldCount { found: 2 }
        );
    }

    #[test]
    fn test_structured_rejects_lowercase_bool() {
        assert!(matches!(
            parse_structured("vanilla_true_False"),
            Err(ParseFailure::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_free_form_implicit_with_model_before_strategy() {
        let parser = DescriptorParser::default();
        let parsed = parser
            .parse("log_hidden_frozenlake_llama3.1-8b_vanilla_True_False")
            .unwrap();
        assert_eq!(parsed.strategy, DescriptorStrategy::FreeForm);
        assert_eq!(parsed.descriptor.memory_strategy, MemoryStrategy::Vanilla);
        assert!(parsed.descriptor.uses_memory);
        assert!(!parsed.descriptor.uses_embedding_augmentation);
        assert_eq!(parsed.model.as_deref(), Some("llama3.1-8b"));
        assert_eq!(parsed.environment.as_deref(), Some("frozenlake"));
        assert_eq!(parsed.regime, Some(Regime::Implicit));
    }

    #[test]
    fn test_free_form_missing_glove_defaults_false() {
        let parser = DescriptorParser::default();
        let parsed = parser.parse("log_mountaincar_gpt4o_memorybank_True").unwrap();
        assert_eq!(parsed.descriptor.memory_strategy, MemoryStrategy::MemoryBank);
        assert!(parsed.descriptor.uses_memory);
        assert!(!parsed.descriptor.uses_embedding_augmentation);
        assert_eq!(parsed.regime, Some(Regime::Explicit));
        assert_eq!(parsed.row_label(), Some(RowLabel::MemoryBank));
    }

    #[test]
    fn test_free_form_missing_both_bools_defaults() {
        let parsed = DescriptorParser::default()
            .parse("log_webshop_gpt4o_voyager")
            .unwrap();
        assert!(parsed.descriptor.uses_memory);
        assert!(!parsed.descriptor.uses_embedding_augmentation);
    }

    #[test]
    fn test_free_form_model_after_strategy() {
        let parsed = DescriptorParser::default()
            .parse("log_hidden_frozenlake_generative_gpt-4o_True_True")
            .unwrap();
        assert_eq!(parsed.model.as_deref(), Some("gpt-4o"));
        assert_eq!(parsed.row_label(), Some(RowLabel::GenerativeGlove));
    }

    #[test]
    fn test_free_form_double_separator() {
        let parsed = DescriptorParser::default()
            .parse("log_webshop_gpt4o_memorybank__True_True")
            .unwrap();
        assert_eq!(parsed.row_label(), Some(RowLabel::MemoryBankGlove));
    }

    #[test]
    fn test_free_form_no_strategy_fails() {
        let err = DescriptorParser::default()
            .parse("log_webshop_gpt4o_reflexion_True")
            .unwrap_err();
        assert_eq!(err, ParseFailure::NoStrategyToken);
    }

    #[test]
    fn test_free_form_unknown_model_is_none() {
        let parsed = DescriptorParser::default()
            .parse("log_webshop_grok-3_vanilla_False_False")
            .unwrap();
        assert_eq!(parsed.model, None);
        assert_eq!(parsed.row_label(), Some(RowLabel::NoMemory));
    }

    #[test]
    fn test_row_label_drops_unlisted_combinations() {
        let d = MethodDescriptor::new(MemoryStrategy::MemoryBank, false, false);
        assert_eq!(d.row_label(), None);
        let d = MethodDescriptor::new(MemoryStrategy::Vanilla, false, true);
        assert_eq!(d.row_label(), None);
    }

    #[test]
    fn test_row_label_order_is_display_order() {
        let mut sorted = RowLabel::ALL;
        sorted.sort();
        assert_eq!(sorted, RowLabel::ALL);
        assert_eq!(RowLabel::ALL[0].as_str(), "no-memory");
        assert_eq!("voyager-glove".parse::<RowLabel>(), Ok(RowLabel::VoyagerGlove));
    }
}
