//! In-memory corpus
//!
//! Holds Shabads and Banis in plain vectors. Used by tests and demos where a
//! database file would only get in the way.

use super::letters;
use super::{
    Bani, BaniSummary, Citation, Corpus, Enrichment, Language, Line, OrderRange, SearchMode,
    Shabad, Source, Writer,
};
use crate::Result;

/// Corpus backed by in-memory collections
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    shabads: Vec<Shabad>,
    banis: Vec<Bani>,
    sources: Vec<Source>,
    languages: Vec<Language>,
    writers: Vec<Writer>,
    version: Option<String>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shabad(mut self, shabad: Shabad) -> Self {
        self.shabads.push(shabad);
        self
    }

    pub fn with_bani(mut self, bani: Bani) -> Self {
        self.banis.push(bani);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.languages.push(language);
        self
    }

    pub fn with_writer(mut self, writer: Writer) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn all_lines(&self) -> impl Iterator<Item = &Line> {
        self.shabads.iter().flat_map(|s| s.lines.iter())
    }

    fn full_line(&self, id: &str) -> Option<&Line> {
        self.all_lines().find(|l| l.id == id)
    }
}

impl Corpus for MemoryCorpus {
    fn shabad(&self, id: &str) -> Result<Option<Shabad>> {
        Ok(self.shabads.iter().find(|s| s.id == id).cloned())
    }

    fn shabad_by_order_id(&self, order_id: i64) -> Result<Option<Shabad>> {
        Ok(self.shabads.iter().find(|s| s.order_id == order_id).cloned())
    }

    fn shabad_order_range(&self) -> Result<Option<OrderRange>> {
        let min = self.shabads.iter().map(|s| s.order_id).min();
        let max = self.shabads.iter().map(|s| s.order_id).max();
        Ok(min.zip(max).map(|(min, max)| OrderRange { min, max }))
    }

    fn bani(&self, id: i64) -> Result<Option<Bani>> {
        Ok(self.banis.iter().find(|b| b.id == id).cloned())
    }

    fn banis(&self) -> Result<Vec<BaniSummary>> {
        Ok(self.banis.iter().map(BaniSummary::from).collect())
    }

    fn search_lines(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<Line>> {
        let mut ranked: Vec<(usize, &Line)> = match mode {
            SearchMode::FirstLetter => self
                .all_lines()
                .filter_map(|line| {
                    letters::first_letter_offset(query, &line.first_letters).map(|pos| (pos, line))
                })
                .collect(),
            SearchMode::FullWord => {
                let words = query.trim();
                if words.is_empty() {
                    return Ok(Vec::new());
                }
                self.all_lines()
                    .filter_map(|line| line.gurmukhi.find(words).map(|pos| (pos, line)))
                    .collect()
            }
        };

        // Prefix matches first, then corpus order
        ranked.sort_by_key(|(pos, line)| (*pos != 0, line.order_id));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, line)| line.bare())
            .collect())
    }

    fn enrich(&self, lines: &mut [Line], stage: Enrichment) -> Result<()> {
        for line in lines.iter_mut() {
            let Some(full) = self.full_line(&line.id) else {
                continue;
            };
            match stage {
                Enrichment::Translations => line.translations = full.translations.clone(),
                Enrichment::Transliterations => {
                    line.transliterations = full.transliterations.clone()
                }
                Enrichment::Citations => {
                    line.citation = full.citation.clone().or_else(|| {
                        self.shabads
                            .iter()
                            .find(|s| s.id == line.shabad_id)
                            .and_then(|s| self.sources.iter().find(|src| src.info.id == s.source_id))
                            .map(|src| Citation {
                                source_name: src.info.name_english.clone(),
                                page: line.source_page,
                                section_name: None,
                                writer_name: None,
                            })
                    })
                }
            }
        }
        Ok(())
    }

    fn sources(&self) -> Result<Vec<Source>> {
        Ok(self.sources.clone())
    }

    fn languages(&self) -> Result<Vec<Language>> {
        Ok(self.languages.clone())
    }

    fn writers(&self) -> Result<Vec<Writer>> {
        Ok(self.writers.clone())
    }

    fn version(&self) -> Option<String> {
        self.version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Translation;

    fn line(id: &str, shabad_id: &str, order_id: i64, first_letters: &str) -> Line {
        Line {
            id: id.to_string(),
            shabad_id: shabad_id.to_string(),
            order_id,
            gurmukhi: format!("line {}", id),
            type_id: None,
            first_letters: first_letters.to_string(),
            source_page: Some(1),
            translations: vec![Translation {
                translation_source_id: 1,
                language_id: 1,
                translation: format!("translation of {}", id),
            }],
            transliterations: Vec::new(),
            citation: None,
        }
    }

    fn corpus() -> MemoryCorpus {
        MemoryCorpus::new().with_shabad(Shabad {
            id: "S1".to_string(),
            order_id: 1,
            source_id: 1,
            writer_id: None,
            section_id: None,
            lines: vec![line("A", "S1", 1, "gmhk"), line("B", "S1", 2, "hkgm")],
        })
    }

    #[test]
    fn test_search_returns_bare_lines_ranked_by_prefix() {
        let corpus = corpus();
        let results = corpus.search_lines("hk", SearchMode::FirstLetter, 10).unwrap();

        let ids: Vec<_> = results.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert!(results.iter().all(|l| l.translations.is_empty()));
    }

    #[test]
    fn test_first_letter_accents_are_stripped_on_both_sides() {
        let corpus = MemoryCorpus::new().with_shabad(Shabad {
            id: "S1".to_string(),
            order_id: 1,
            source_id: 1,
            writer_id: None,
            section_id: None,
            lines: vec![line("A", "S1", 1, "^ss"), line("B", "S1", 2, "ssn")],
        });

        let found = |query: &str| -> Vec<String> {
            corpus
                .search_lines(query, SearchMode::FirstLetter, 10)
                .unwrap()
                .into_iter()
                .map(|l| l.id)
                .collect()
        };

        assert_eq!(found("kss"), vec!["A"]);
        assert_eq!(found("^ss"), vec!["A"]);
        assert_eq!(found("Ssn"), vec!["B"]);
    }

    #[test]
    fn test_enrich_restores_requested_stage_only() {
        let corpus = corpus();
        let mut results = corpus.search_lines("gm", SearchMode::FirstLetter, 10).unwrap();
        corpus.enrich(&mut results, Enrichment::Translations).unwrap();

        assert!(results.iter().all(|l| !l.translations.is_empty()));
        assert!(results.iter().all(|l| l.citation.is_none()));
    }
}
