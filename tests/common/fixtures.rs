//! Corpus fixtures
//!
//! Shabads, in order:
//! - `S1` (order 1): `L1`(10) `L2`(11) `L3`(12)
//! - `S2` (order 2): `M1`(20) `M2`(21)
//! - `S3` (order 3): `N1`(30)
//!
//! Bani `1` ("Japji") spans `L2` and `M1`.

use std::sync::Arc;

use presenter_engine::corpus::{
    Bani, Language, Line, MemoryCorpus, Shabad, SharedCorpus, Source, SourceInfo, Translation,
    TranslationSource, Writer,
};

pub fn line(id: &str, shabad_id: &str, order_id: i64, first_letters: &str) -> Line {
    Line {
        id: id.to_string(),
        shabad_id: shabad_id.to_string(),
        order_id,
        gurmukhi: format!("gurmukhi {}", id),
        type_id: None,
        first_letters: first_letters.to_string(),
        source_page: Some(1),
        translations: vec![Translation {
            translation_source_id: 1,
            language_id: 1,
            translation: format!("english {}", id),
        }],
        transliterations: Vec::new(),
        citation: None,
    }
}

pub fn shabad(id: &str, order_id: i64, lines: &[(&str, i64, &str)]) -> Shabad {
    Shabad {
        id: id.to_string(),
        order_id,
        source_id: 1,
        writer_id: Some(1),
        section_id: None,
        lines: lines
            .iter()
            .map(|(line_id, order, letters)| line(line_id, id, *order, letters))
            .collect(),
    }
}

fn translation_source(id: i64, language_id: i64, name: &str) -> TranslationSource {
    TranslationSource {
        id,
        source_id: 1,
        language_id,
        name_gurmukhi: name.to_string(),
        name_english: name.to_string(),
    }
}

pub fn memory_corpus() -> MemoryCorpus {
    let s1 = shabad("S1", 1, &[("L1", 10, "hgmk"), ("L2", 11, "ssgn"), ("L3", 12, "dkhr")]);
    let s2 = shabad("S2", 2, &[("M1", 20, "jpmn"), ("M2", 21, "ssak")]);
    let s3 = shabad("S3", 3, &[("N1", 30, "bbrk")]);

    let japji = Bani {
        id: 1,
        name_gurmukhi: "jpujI swihb".to_string(),
        name_english: Some("Japji Sahib".to_string()),
        lines: vec![s1.lines[1].clone(), s2.lines[0].clone()],
    };

    MemoryCorpus::new()
        .with_shabad(s1)
        .with_shabad(s2)
        .with_shabad(s3)
        .with_bani(japji)
        .with_source(Source {
            info: SourceInfo {
                id: 1,
                name_gurmukhi: "sRI gurU gRMQ swihb jI".to_string(),
                name_english: "Sri Guru Granth Sahib Ji".to_string(),
                length: Some(1430),
                page_name_gurmukhi: Some("AMg".to_string()),
                page_name_english: Some("Ang".to_string()),
            },
            translation_sources: vec![
                translation_source(1, 1, "SGGS Translation"),
                translation_source(2, 1, "Dr. Sant Singh Khalsa"),
                translation_source(3, 2, "Prof. Sahib Singh"),
            ],
        })
        .with_language(Language {
            id: 1,
            name_english: "English".to_string(),
            name_gurmukhi: "AMgryzI".to_string(),
            name_international: "English".to_string(),
        })
        .with_writer(Writer {
            id: 1,
            name_english: "Guru Nanak Dev Ji".to_string(),
            name_gurmukhi: "gurU nwnk dyv jI".to_string(),
        })
        .with_version("4.8.7")
}

pub fn corpus() -> SharedCorpus {
    Arc::new(memory_corpus())
}
