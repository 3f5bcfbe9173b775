//! Read-only text corpus
//!
//! The corpus is an external collaborator: it owns the Shabads, Banis, lines
//! and their translations. The server only ever reads from it through the
//! [`Corpus`] trait.
//!
//! # Implementations
//!
//! - [`SqliteCorpus`] - the Shabad OS database file (production)
//! - [`MemoryCorpus`] - in-memory fixtures (tests, demos)
//!
//! Corpus calls are synchronous. Async callers go through [`query`], which
//! runs the call on the blocking pool so socket traffic keeps flowing while a
//! lookup is outstanding.

pub mod letters;
pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{PresenterError, Result};

pub use memory::MemoryCorpus;
pub use sqlite::SqliteCorpus;

/// Maximum number of search results returned in one go
pub const MAX_RESULTS: usize = 50;

/// Language ids used by the corpus
pub mod language {
    pub const ENGLISH: i64 = 1;
    pub const PUNJABI: i64 = 2;
    pub const SPANISH: i64 = 3;
    pub const HINDI: i64 = 4;
    pub const URDU: i64 = 5;
}

/// A single displayable line of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: String,
    pub shabad_id: String,
    pub order_id: i64,
    pub gurmukhi: String,
    #[serde(default)]
    pub type_id: Option<i64>,
    #[serde(default)]
    pub first_letters: String,
    #[serde(default)]
    pub source_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translations: Vec<Translation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transliterations: Vec<Transliteration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

impl Line {
    /// First translation in the given language
    pub fn translation_in(&self, language_id: i64) -> Option<&str> {
        self.translations
            .iter()
            .find(|t| t.language_id == language_id)
            .map(|t| t.translation.as_str())
    }

    /// First transliteration in the given language
    pub fn transliteration_in(&self, language_id: i64) -> Option<&str> {
        self.transliterations
            .iter()
            .find(|t| t.language_id == language_id)
            .map(|t| t.transliteration.as_str())
    }

    /// Copy without any enrichment data
    pub fn bare(&self) -> Self {
        Self {
            translations: Vec::new(),
            transliterations: Vec::new(),
            citation: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translation_source_id: i64,
    pub language_id: i64,
    pub translation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transliteration {
    pub language_id: i64,
    pub transliteration: String,
}

/// Where a line comes from (source, page, section, writer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source_name: String,
    pub page: Option<i64>,
    pub section_name: Option<String>,
    pub writer_name: Option<String>,
}

/// A hymn: an ordered run of lines with one source/author attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shabad {
    pub id: String,
    pub order_id: i64,
    pub source_id: i64,
    pub writer_id: Option<i64>,
    pub section_id: Option<i64>,
    pub lines: Vec<Line>,
}

/// A curated selection of lines, possibly spanning several Shabads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bani {
    pub id: i64,
    pub name_gurmukhi: String,
    pub name_english: Option<String>,
    pub lines: Vec<Line>,
}

/// Bani list entry (no lines)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaniSummary {
    pub id: i64,
    pub name_gurmukhi: String,
    pub name_english: Option<String>,
}

impl From<&Bani> for BaniSummary {
    fn from(bani: &Bani) -> Self {
        Self {
            id: bani.id,
            name_gurmukhi: bani.name_gurmukhi.clone(),
            name_english: bani.name_english.clone(),
        }
    }
}

/// The currently displayable content: a Shabad or a Bani
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Shabad(Shabad),
    Bani(Bani),
}

impl Content {
    pub fn lines(&self) -> &[Line] {
        match self {
            Content::Shabad(shabad) => &shabad.lines,
            Content::Bani(bani) => &bani.lines,
        }
    }

    pub fn content_ref(&self) -> ContentRef {
        match self {
            Content::Shabad(shabad) => ContentRef::Shabad {
                id: shabad.id.clone(),
            },
            Content::Bani(bani) => ContentRef::Bani { id: bani.id },
        }
    }

    /// Shabad order id; Banis have none
    pub fn order_id(&self) -> Option<i64> {
        match self {
            Content::Shabad(shabad) => Some(shabad.order_id),
            Content::Bani(_) => None,
        }
    }
}

/// Identifies a Shabad or Bani without carrying its lines
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentRef {
    Shabad { id: String },
    Bani { id: i64 },
}

impl ContentRef {
    /// Bare id as written to the history file
    pub fn id_string(&self) -> String {
        match self {
            ContentRef::Shabad { id } => id.clone(),
            ContentRef::Bani { id } => id.to_string(),
        }
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentRef::Shabad { id } => write!(f, "shabad:{}", id),
            ContentRef::Bani { id } => write!(f, "bani:{}", id),
        }
    }
}

/// Inclusive range of valid Shabad order ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRange {
    pub min: i64,
    pub max: i64,
}

impl OrderRange {
    pub fn clamp(&self, order_id: i64) -> i64 {
        order_id.clamp(self.min, self.max)
    }
}

/// Search matching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// First letter of each word, accent-insensitive, `*` wildcard
    FirstLetter,
    /// Substring / phrase match on the line text
    FullWord,
}

/// Optional enrichment stages requested with a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub translations: bool,
    pub transliterations: bool,
    pub citations: bool,
}

impl SearchOptions {
    /// Requested stages in application order
    pub fn stages(&self) -> Vec<Enrichment> {
        [
            (self.transliterations, Enrichment::Transliterations),
            (self.translations, Enrichment::Translations),
            (self.citations, Enrichment::Citations),
        ]
        .into_iter()
        .filter(|(requested, _)| *requested)
        .map(|(_, stage)| stage)
        .collect()
    }
}

/// One enrichment stage applied to search results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    Translations,
    Transliterations,
    Citations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationSource {
    pub id: i64,
    pub source_id: i64,
    pub language_id: i64,
    pub name_gurmukhi: String,
    pub name_english: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub id: i64,
    pub name_gurmukhi: String,
    pub name_english: String,
    pub length: Option<i64>,
    pub page_name_gurmukhi: Option<String>,
    pub page_name_english: Option<String>,
}

/// Source with every translation source attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub info: SourceInfo,
    pub translation_sources: Vec<TranslationSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedSource {
    #[serde(flatten)]
    pub info: SourceInfo,
    /// Translation sources grouped by language id
    pub translation_sources: BTreeMap<i64, Vec<TranslationSource>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedSource {
    #[serde(flatten)]
    pub info: SourceInfo,
    /// One recommended translation source per language id
    pub translation_sources: BTreeMap<i64, TranslationSource>,
}

/// Payload of `GET /sources`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesResponse {
    pub sources: BTreeMap<i64, GroupedSource>,
    pub recommended_sources: BTreeMap<i64, RecommendedSource>,
}

/// Group translation sources by language and recommend the last one listed
/// for each language.
pub fn group_sources(sources: Vec<Source>) -> SourcesResponse {
    let mut grouped = BTreeMap::new();
    let mut recommended = BTreeMap::new();

    for source in sources {
        let mut by_language: BTreeMap<i64, Vec<TranslationSource>> = BTreeMap::new();
        for ts in source.translation_sources {
            by_language.entry(ts.language_id).or_default().push(ts);
        }

        let picks = by_language
            .iter()
            .filter_map(|(language, list)| list.last().map(|ts| (*language, ts.clone())))
            .collect();

        recommended.insert(
            source.info.id,
            RecommendedSource {
                info: source.info.clone(),
                translation_sources: picks,
            },
        );
        grouped.insert(
            source.info.id,
            GroupedSource {
                info: source.info,
                translation_sources: by_language,
            },
        );
    }

    SourcesResponse {
        sources: grouped,
        recommended_sources: recommended,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: i64,
    pub name_english: String,
    pub name_gurmukhi: String,
    pub name_international: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Writer {
    pub id: i64,
    pub name_english: String,
    pub name_gurmukhi: String,
}

/// Read-only access to the text corpus
pub trait Corpus: Send + Sync {
    /// Shabad with its ordered lines and their translations
    fn shabad(&self, id: &str) -> Result<Option<Shabad>>;

    /// Shabad at an exact order id
    fn shabad_by_order_id(&self, order_id: i64) -> Result<Option<Shabad>>;

    /// Smallest and largest Shabad order ids, `None` for an empty corpus
    fn shabad_order_range(&self) -> Result<Option<OrderRange>>;

    /// Bani with its lines ordered by line group, then order id
    fn bani(&self, id: i64) -> Result<Option<Bani>>;

    /// All Banis, without lines
    fn banis(&self) -> Result<Vec<BaniSummary>>;

    /// Ranked matching lines without enrichment, at most `limit`
    fn search_lines(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<Line>>;

    /// Apply one enrichment stage in place
    fn enrich(&self, lines: &mut [Line], stage: Enrichment) -> Result<()>;

    fn sources(&self) -> Result<Vec<Source>>;

    fn languages(&self) -> Result<Vec<Language>>;

    fn writers(&self) -> Result<Vec<Writer>>;

    /// Corpus data version, if known
    fn version(&self) -> Option<String>;
}

/// Shared handle to a corpus
pub type SharedCorpus = Arc<dyn Corpus>;

/// Run a corpus call on the blocking pool.
pub async fn query<T, F>(corpus: &SharedCorpus, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Corpus) -> Result<T> + Send + 'static,
{
    let corpus = Arc::clone(corpus);
    tokio::task::spawn_blocking(move || f(corpus.as_ref()))
        .await
        .map_err(|e| PresenterError::Corpus {
            message: format!("corpus task failed: {}", e),
        })?
}
