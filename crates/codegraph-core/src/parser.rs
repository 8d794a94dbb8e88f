//! Parser: owns the grammar pool, dispatches files to analyzers, and caches
//! parse results keyed on `(path, internal content digest)`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use tree_sitter::{Language, Parser, Tree};

use crate::error::ParserError;
use crate::ids::file_digest;
use crate::model::ParseResult;

/// Files above this size bypass the parse cache and get a tighter timeout.
pub const LARGE_FILE_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Languages supported by the Parser and Language Analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLanguage {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    C,
    Cpp,
    CSharp,
    Java,
    Kotlin,
    /// No tree-sitter grammar; handled by a regex-based analyzer.
    Vba,
    Markdown,
}

impl SupportedLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Rust => "rust",
            Self::Go => "go",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Vba => "vba",
            Self::Markdown => "markdown",
        }
    }

    /// Whether this language has a tree-sitter grammar, as opposed to being
    /// handled by a regex-based analyzer.
    pub fn has_grammar(&self) -> bool {
        !matches!(self, Self::Vba)
    }

    pub fn tree_sitter_language(&self) -> Option<Language> {
        Some(match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
            Self::C => tree_sitter_c::LANGUAGE.into(),
            Self::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            Self::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
            Self::Markdown => tree_sitter_md::LANGUAGE.into(),
            Self::Vba => return None,
        })
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        get_extension_map().get(ext.to_lowercase().as_str()).copied()
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn all_extensions() -> &'static [&'static str] {
        &[
            "py", "js", "mjs", "cjs", "ts", "tsx", "rs", "go", "c", "h", "cpp", "hpp", "cc", "cxx",
            "cs", "java", "kt", "kts", "bas", "cls", "frm", "md", "markdown",
        ]
    }
}

impl std::fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static EXTENSION_MAP: OnceLock<HashMap<&'static str, SupportedLanguage>> = OnceLock::new();

fn get_extension_map() -> &'static HashMap<&'static str, SupportedLanguage> {
    EXTENSION_MAP.get_or_init(|| {
        use SupportedLanguage::*;
        HashMap::from([
            ("py", Python),
            ("js", JavaScript),
            ("mjs", JavaScript),
            ("cjs", JavaScript),
            ("ts", TypeScript),
            ("tsx", Tsx),
            ("rs", Rust),
            ("go", Go),
            ("c", C),
            ("h", C),
            ("cpp", Cpp),
            ("hpp", Cpp),
            ("cc", Cpp),
            ("cxx", Cpp),
            ("cs", CSharp),
            ("java", Java),
            ("kt", Kotlin),
            ("kts", Kotlin),
            ("bas", Vba),
            ("cls", Vba),
            ("frm", Vba),
            ("md", Markdown),
            ("markdown", Markdown),
        ])
    })
}

/// An LRU cache of parsed trees keyed on `(path, internal digest)`. Keeping
/// the digest in the key (rather than only the path) means a stale entry is
/// never returned even if an external caller reuses a path across distinct
/// content.
pub struct ParseCache {
    inner: Mutex<LruCache<(String, String), Tree>>,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get(&self, path: &str, digest: &str) -> Option<Tree> {
        self.inner
            .lock()
            .get(&(path.to_string(), digest.to_string()))
            .cloned()
    }

    fn put(&self, path: &str, digest: &str, tree: Tree) {
        self.inner.lock().put((path.to_string(), digest.to_string()), tree);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns a pool of tree-sitter grammars and the parse cache; dispatches
/// parsed trees to the appropriate [`crate::analyzers::Analyzer`].
pub struct CodeParser {
    cache: ParseCache,
}

impl CodeParser {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: ParseCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    /// Parse `source` for `path`, using the cache when the file is small
    /// enough and its digest matches a cached entry.
    pub fn parse(
        &self,
        path: &Path,
        source: &[u8],
        language: SupportedLanguage,
    ) -> Result<(Tree, String, u64), ParserError> {
        let path_str = path.to_string_lossy().to_string();
        let digest = file_digest(source);
        let start = Instant::now();

        let use_cache = (source.len() as u64) < LARGE_FILE_THRESHOLD_BYTES;

        if use_cache {
            if let Some(tree) = self.cache.get(&path_str, &digest) {
                return Ok((tree, digest, 0));
            }
        }

        let ts_language = language.tree_sitter_language().ok_or_else(|| {
            ParserError::UnsupportedLanguage(path.to_path_buf())
        })?;

        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|_| ParserError::UnsupportedLanguage(path.to_path_buf()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParserError::ParseFailed(path.to_path_buf()))?;

        if use_cache {
            self.cache.put(&path_str, &digest, tree.clone());
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        Ok((tree, digest, elapsed_ms))
    }

    /// Incremental re-parse against a previous tree, given byte-range edits
    /// already applied to `tree` by the caller via `Tree::edit`.
    pub fn reparse(
        &self,
        previous: &Tree,
        source: &[u8],
        language: SupportedLanguage,
    ) -> Result<Tree, ParserError> {
        let ts_language = language
            .tree_sitter_language()
            .ok_or(ParserError::UnsupportedLanguage(std::path::PathBuf::new()))?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|_| ParserError::UnsupportedLanguage(std::path::PathBuf::new()))?;
        parser
            .parse(source, Some(previous))
            .ok_or_else(|| ParserError::ParseFailed(std::path::PathBuf::new()))
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new(4_096)
    }
}

/// Produce an empty [`ParseResult`] shell for a file whose language has no
/// analyzer (yet), or which failed to parse. Analyzers fill in the rest.
pub fn empty_parse_result(file_path: &str, language: &str, content_hash: &str) -> ParseResult {
    ParseResult {
        file_path: file_path.to_string(),
        language: language.to_string(),
        content_hash: content_hash.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_from_extension() {
        assert_eq!(SupportedLanguage::from_extension("rs"), Some(SupportedLanguage::Rust));
        assert_eq!(SupportedLanguage::from_extension("tsx"), Some(SupportedLanguage::Tsx));
        assert_eq!(SupportedLanguage::from_extension("bas"), Some(SupportedLanguage::Vba));
        assert_eq!(SupportedLanguage::from_extension("zz"), None);
    }

    #[test]
    fn vba_has_no_grammar() {
        assert!(!SupportedLanguage::Vba.has_grammar());
        assert!(SupportedLanguage::Rust.has_grammar());
    }

    #[test]
    fn parse_is_cached_by_digest() {
        let parser = CodeParser::new(16);
        let path = Path::new("a.rs");
        let source = b"fn main() {}";
        let (_, digest1, ms1) = parser.parse(path, source, SupportedLanguage::Rust).unwrap();
        assert!(ms1 > 0 || parser.cache().len() == 1);
        let (_, digest2, ms2) = parser.parse(path, source, SupportedLanguage::Rust).unwrap();
        assert_eq!(digest1, digest2);
        assert_eq!(ms2, 0);
    }

    #[test]
    fn parse_cache_differentiates_by_content() {
        let parser = CodeParser::new(16);
        let path = Path::new("a.rs");
        parser.parse(path, b"fn a() {}", SupportedLanguage::Rust).unwrap();
        parser.parse(path, b"fn b() {}", SupportedLanguage::Rust).unwrap();
        assert_eq!(parser.cache().len(), 2);
    }
}
