//! Reversible, lex-only identifier obfuscation.
//!
//! The transform re-emits the token stream byte-for-byte, substituting only
//! identifier text through a bijective map. Encoding generates fresh
//! equal-length identifiers on first sight; decoding looks up the reverse
//! map and passes unknown identifiers through unchanged. Every encoding run
//! is verified twice before its output is released: the output must be
//! obfuscation-equivalent to the input, and decoding the output must
//! reproduce the input exactly.

use std::fmt::Write as _;
use std::ops::{Deref, DerefMut};

use rand::Rng;

use crate::bijective_map::BijectiveMap;
use crate::error::{Error, Result};
use crate::lexer::{classify_word, lex};
use crate::search::{find_all_tagged, get_subtree_as_leaf};
use crate::syntax::NodeTag;
use crate::token::TokenKind;

/// Generates a replacement string for a given input identifier.
pub type Generator = Box<dyn Fn(&str) -> String>;

/// Translates input strings into generated strings, remembering and re-using
/// every substitution so the mapping stays one-to-one and reversible.
pub struct Obfuscator {
    generator: Generator,
    translator: BijectiveMap<String, String>,
    decode_mode: bool,
}

impl Obfuscator {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            translator: BijectiveMap::new(),
            decode_mode: false,
        }
    }

    /// Declare a key-value mapping up front, e.g. to re-apply a previously
    /// saved translation. Returns false if either side is already mapped.
    pub fn encode(&mut self, key: &str, value: &str) -> bool {
        self.translator.insert(key.to_string(), value.to_string())
    }

    pub fn set_decode_mode(&mut self, decode: bool) {
        self.decode_mode = decode;
    }

    pub fn is_decoding(&self) -> bool {
        self.decode_mode
    }

    /// Translate one identifier, creating a fresh mapping in encode mode.
    /// In decode mode unknown identifiers pass through unchanged.
    pub fn translate(&mut self, input: &str) -> String {
        if self.decode_mode {
            match self.translator.find_reverse(input) {
                Some(original) => original.clone(),
                None => input.to_string(),
            }
        } else {
            let generator = &self.generator;
            self.translator
                .insert_using_value_generator(input.to_string(), || generator(input))
                .clone()
        }
    }

    /// Read-only view of the translation map.
    pub fn translator(&self) -> &BijectiveMap<String, String> {
        &self.translator
    }

    /// Parse a saved mapping dictionary and pre-load the translator with it.
    /// Format: one whitespace-separated pair per line.
    pub fn load(&mut self, text: &str) -> Result<()> {
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
                return Err(Error::MapLoad {
                    line: index + 1,
                    message: format!("expected two fields, got \"{line}\""),
                });
            };
            if !self.encode(key, value) && self.translator.find_forward(key).map(String::as_str) != Some(value) {
                return Err(Error::MapLoad {
                    line: index + 1,
                    message: format!("conflicting entry for \"{key}\""),
                });
            }
        }
        Ok(())
    }

    /// Serialize the internal identifier map; inverse of [`Obfuscator::load`].
    pub fn save(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.translator.forward_view() {
            let _ = writeln!(out, "{key} {value}");
        }
        out
    }
}

/// An [`Obfuscator`] whose pre-declared mappings must preserve identifier
/// length, keeping all source offsets intact.
pub struct IdentifierObfuscator {
    inner: Obfuscator,
}

impl IdentifierObfuscator {
    pub fn new(generator: Generator) -> Self {
        Self {
            inner: Obfuscator::new(generator),
        }
    }

    /// Same as [`Obfuscator::encode`], but rejects unequal-length pairs.
    pub fn encode(&mut self, key: &str, value: &str) -> Result<bool> {
        if key.len() != value.len() {
            return Err(Error::obfuscation(format!(
                "mapping \"{key}\" -> \"{value}\" does not preserve length"
            )));
        }
        Ok(self.inner.encode(key, value))
    }
}

impl Deref for IdentifierObfuscator {
    type Target = Obfuscator;
    fn deref(&self) -> &Obfuscator {
        &self.inner
    }
}

impl DerefMut for IdentifierObfuscator {
    fn deref_mut(&mut self) -> &mut Obfuscator {
        &mut self.inner
    }
}

/// Random identifier of the same byte length as `input`. Retries until the
/// candidate lexes as a plain identifier, so keywords can never be produced.
pub fn random_equal_length_identifier(input: &str) -> String {
    const FIRST: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
    const REST: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";
    let mut rng = rand::thread_rng();
    loop {
        let mut candidate = String::with_capacity(input.len());
        for i in 0..input.len() {
            let alphabet = if i == 0 { FIRST } else { REST };
            candidate.push(alphabet[rng.gen_range(0..alphabet.len())] as char);
        }
        if classify_word(&candidate) == TokenKind::SymbolIdentifier {
            return candidate;
        }
    }
}

/// IEEE 1800 builtin math function names, pinnable via identity mappings so
/// obfuscated sources still call them by name.
pub const BUILTIN_FUNCTIONS: [&str; 22] = [
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atan2", "atanh", "ceil", "cos", "cosh",
    "exp", "floor", "hypot", "ln", "log", "pow", "sin", "sinh", "sqrt", "tan", "tanh",
];

/// Pin all builtin function names with identity mappings.
pub fn preserve_builtin_functions(subst: &mut IdentifierObfuscator) -> Result<()> {
    for name in BUILTIN_FUNCTIONS {
        // Already-identical mappings are fine; only conflicts would fail.
        let _ = subst.encode(name, name)?;
    }
    Ok(())
}

/// Pin module/interface names and their port and parameter names with
/// identity mappings, so obfuscated files keep their external interface.
pub fn preserve_interface_names(subst: &mut IdentifierObfuscator, content: &str) -> Result<()> {
    let tokens = crate::lexer::lex_significant(content);
    let result = crate::parser::parse(content, &tokens);

    let mut pin = |name: &str| -> Result<()> {
        let _ = subst.encode(name, name)?;
        Ok(())
    };

    for m in find_all_tagged(&result.root, NodeTag::ModuleHeader) {
        if let Some(name) = get_subtree_as_leaf(m.symbol, NodeTag::ModuleHeader, 1) {
            pin(name.text(content))?;
        }
    }
    for m in find_all_tagged(&result.root, NodeTag::PortDeclaration) {
        if let Some(name) = get_subtree_as_leaf(m.symbol, NodeTag::PortDeclaration, 2) {
            pin(name.text(content))?;
        }
    }
    for m in find_all_tagged(&result.root, NodeTag::FormalParameterList) {
        if let Some(node) = m.symbol.as_node() {
            for assign in node.present_children() {
                if assign.tag() == Some(NodeTag::ParamAssign)
                    && let Some(name) = get_subtree_as_leaf(assign, NodeTag::ParamAssign, 0)
                {
                    pin(name.text(content))?;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Lexical re-emit
// ============================================================================

fn obfuscate_internal(content: &str, output: &mut String, subst: &mut IdentifierObfuscator) {
    for token in lex(content) {
        let text = token.text(content);
        match token.kind {
            TokenKind::SymbolIdentifier | TokenKind::PpIdentifier => {
                output.push_str(&subst.translate(text));
            }
            // Preserve all $ID calls, including system task/function calls.
            TokenKind::SystemTfIdentifier => output.push_str(text),
            // The leading sigil character is preserved; the rest is mapped.
            TokenKind::MacroIdentifier | TokenKind::MacroCallId | TokenKind::MacroIdItem => {
                output.push_str(&text[..1]);
                let mapped = subst.translate(&text[1..]);
                output.push_str(&mapped);
            }
            // Un-lexed bodies are lexed and rewritten recursively.
            TokenKind::MacroArg | TokenKind::PpDefineBody => {
                obfuscate_internal(text, output, subst);
            }
            TokenKind::Eof => {}
            // Everything else, lexical error tokens included, passes through.
            _ => output.push_str(text),
        }
    }
}

/// Outcome of the obfuscation-equivalence comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    Equivalent,
    Different,
    LeftError,
    RightError,
}

/// Compare two sources for equivalence under identifier substitution: the
/// token sequences must match kind-for-kind, identifier text may differ,
/// and all other token text must be identical. Lexical errors on either
/// side are reported as distinct statuses.
pub fn obfuscation_equivalent(lhs: &str, rhs: &str) -> (DiffStatus, String) {
    compare_token_streams(lhs, rhs)
}

fn compare_token_streams(lhs: &str, rhs: &str) -> (DiffStatus, String) {
    let left = lex(lhs);
    let right = lex(rhs);

    if let Some(t) = left.iter().find(|t| t.kind == TokenKind::LexicalError) {
        return (
            DiffStatus::LeftError,
            format!("lexical error at byte {}: \"{}\"", t.offset(), t.text(lhs)),
        );
    }
    if let Some(t) = right.iter().find(|t| t.kind == TokenKind::LexicalError) {
        return (
            DiffStatus::RightError,
            format!("lexical error at byte {}: \"{}\"", t.offset(), t.text(rhs)),
        );
    }
    if left.len() != right.len() {
        return (
            DiffStatus::Different,
            format!("token counts differ: {} vs {}", left.len(), right.len()),
        );
    }

    for (lt, rt) in left.iter().zip(right.iter()) {
        if lt.kind != rt.kind {
            return (
                DiffStatus::Different,
                format!(
                    "token kind mismatch at byte {}: {:?} vs {:?}",
                    lt.offset(),
                    lt.kind,
                    rt.kind
                ),
            );
        }
        let (ltext, rtext) = (lt.text(lhs), rt.text(rhs));
        match lt.kind {
            // Raw bodies must themselves be equivalent.
            TokenKind::MacroArg | TokenKind::PpDefineBody => {
                let (status, message) = compare_token_streams(ltext, rtext);
                if status != DiffStatus::Equivalent {
                    return (status, message);
                }
            }
            // Substitutable identifiers may differ in text.
            TokenKind::SymbolIdentifier
            | TokenKind::PpIdentifier
            | TokenKind::MacroIdentifier
            | TokenKind::MacroCallId
            | TokenKind::MacroIdItem => {}
            _ => {
                if ltext != rtext {
                    return (
                        DiffStatus::Different,
                        format!(
                            "token text mismatch at byte {}: \"{ltext}\" vs \"{rtext}\"",
                            lt.offset()
                        ),
                    );
                }
            }
        }
    }
    (DiffStatus::Equivalent, String::new())
}

fn verify_equivalence(original: &str, encoded: &str) -> Result<()> {
    let (status, message) = obfuscation_equivalent(original, encoded);
    match status {
        DiffStatus::Equivalent => Ok(()),
        DiffStatus::Different => Err(Error::obfuscation_internal(format!(
            "output is not equivalent: {message}\nORIGINAL:\n{original}\nENCODED:\n{encoded}"
        ))),
        DiffStatus::LeftError => Err(Error::LexicalInput(message)),
        DiffStatus::RightError => Err(Error::obfuscation_internal(format!(
            "output contains lexical errors: {message}\nORIGINAL:\n{original}\nENCODED:\n{encoded}"
        ))),
    }
}

// Internal consistency check that decoding restores the original text.
fn verify_decoding(original: &str, encoded: &str, subst: &IdentifierObfuscator) -> Result<()> {
    // Skip if the original transformation was already decoding.
    if subst.is_decoding() {
        return Ok(());
    }

    let mut reverse = IdentifierObfuscator::new(Box::new(random_equal_length_identifier));
    reverse.set_decode_mode(true);
    reverse.load(&subst.save())?;

    let mut decoded = String::with_capacity(original.len());
    obfuscate_internal(encoded, &mut decoded, &mut reverse);
    if decoded != original {
        return Err(Error::obfuscation_internal(format!(
            "decode(encode) != original\nORIGINAL:\n{original}\nENCODED:\n{encoded}\nDECODED:\n{decoded}"
        )));
    }
    Ok(())
}

/// Obfuscate `content` through `subst`, verifying equivalence and (when
/// encoding) byte-exact reversibility before returning the result.
pub fn obfuscate_code(content: &str, subst: &mut IdentifierObfuscator) -> Result<String> {
    let mut output = String::with_capacity(content.len());
    obfuscate_internal(content, &mut output, subst);

    verify_equivalence(content, &output)?;
    verify_decoding(content, &output, subst)?;

    Ok(output)
}
