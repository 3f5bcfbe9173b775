//! SQLite-backed corpus
//!
//! Reads the Shabad OS database file. The connection is opened read-only and
//! guarded by a mutex; callers are expected to come through
//! [`super::query`] so lookups run on the blocking pool.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};

use super::letters;
use super::{
    Bani, BaniSummary, Citation, Corpus, Enrichment, Language, Line, OrderRange, SearchMode,
    Shabad, Source, SourceInfo, Translation, TranslationSource, Transliteration, Writer,
};
use crate::Result;

/// Tables and columns the corpus reads.
///
/// Used to build fixture databases in tests; production databases ship with
/// this layout already in place.
pub const SCHEMA: &str = r#"
    CREATE TABLE sources (
        id INTEGER PRIMARY KEY,
        name_gurmukhi TEXT NOT NULL,
        name_english TEXT NOT NULL,
        length INTEGER,
        page_name_gurmukhi TEXT,
        page_name_english TEXT
    );

    CREATE TABLE writers (
        id INTEGER PRIMARY KEY,
        name_gurmukhi TEXT NOT NULL,
        name_english TEXT NOT NULL
    );

    CREATE TABLE sections (
        id INTEGER PRIMARY KEY,
        name_gurmukhi TEXT NOT NULL,
        name_english TEXT NOT NULL
    );

    CREATE TABLE languages (
        id INTEGER PRIMARY KEY,
        name_english TEXT NOT NULL,
        name_gurmukhi TEXT NOT NULL,
        name_international TEXT NOT NULL
    );

    CREATE TABLE shabads (
        id TEXT PRIMARY KEY,
        source_id INTEGER NOT NULL,
        writer_id INTEGER,
        section_id INTEGER,
        order_id INTEGER NOT NULL
    );

    CREATE TABLE lines (
        id TEXT PRIMARY KEY,
        shabad_id TEXT NOT NULL,
        source_page INTEGER,
        first_letters TEXT NOT NULL DEFAULT '',
        gurmukhi TEXT NOT NULL,
        type_id INTEGER,
        order_id INTEGER NOT NULL
    );
    CREATE INDEX lines_shabad ON lines (shabad_id);

    CREATE TABLE translation_sources (
        id INTEGER PRIMARY KEY,
        name_gurmukhi TEXT NOT NULL,
        name_english TEXT NOT NULL,
        source_id INTEGER NOT NULL,
        language_id INTEGER NOT NULL
    );

    CREATE TABLE translations (
        line_id TEXT NOT NULL,
        translation_source_id INTEGER NOT NULL,
        translation TEXT NOT NULL,
        PRIMARY KEY (line_id, translation_source_id)
    );

    CREATE TABLE transliterations (
        line_id TEXT NOT NULL,
        language_id INTEGER NOT NULL,
        transliteration TEXT NOT NULL,
        PRIMARY KEY (line_id, language_id)
    );

    CREATE TABLE banis (
        id INTEGER PRIMARY KEY,
        name_gurmukhi TEXT NOT NULL,
        name_english TEXT
    );

    CREATE TABLE bani_lines (
        line_id TEXT NOT NULL,
        bani_id INTEGER NOT NULL,
        line_group INTEGER NOT NULL,
        PRIMARY KEY (line_id, bani_id)
    );
"#;

const LINE_COLUMNS: &str =
    "l.id, l.shabad_id, l.order_id, l.gurmukhi, l.type_id, l.first_letters, l.source_page";

/// Corpus backed by a SQLite database file
pub struct SqliteCorpus {
    conn: Mutex<Connection>,
    version: Option<String>,
}

impl SqliteCorpus {
    /// Open a database file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::info!("Opened corpus database at {}", path.display());
        Self::from_connection(conn)
    }

    /// Wrap an existing connection (in-memory fixtures in tests).
    pub fn from_connection(conn: Connection) -> Result<Self> {
        // Data version is stored in the standard user_version pragma
        let user_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let version = (user_version > 0).then(|| user_version.to_string());

        Ok(Self {
            conn: Mutex::new(conn),
            version,
        })
    }

    fn lines_where(&self, conn: &Connection, clause: &str, id: &dyn rusqlite::ToSql) -> Result<Vec<Line>> {
        let sql = format!("SELECT {} FROM lines l WHERE {}", LINE_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map([id], line_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    fn load_shabad(&self, conn: &Connection, clause: &str, key: &dyn rusqlite::ToSql) -> Result<Option<Shabad>> {
        let sql = format!(
            "SELECT id, order_id, source_id, writer_id, section_id FROM shabads WHERE {}",
            clause
        );
        let shabad = conn
            .query_row(&sql, [key], |row| {
                Ok(Shabad {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    source_id: row.get(2)?,
                    writer_id: row.get(3)?,
                    section_id: row.get(4)?,
                    lines: Vec::new(),
                })
            })
            .optional()?;

        let Some(mut shabad) = shabad else {
            return Ok(None);
        };

        let mut lines =
            self.lines_where(conn, "l.shabad_id = ?1 ORDER BY l.order_id", &shabad.id)?;
        add_translations(conn, &mut lines)?;
        add_transliterations(conn, &mut lines)?;
        shabad.lines = lines;

        Ok(Some(shabad))
    }
}

fn line_from_row(row: &Row<'_>) -> rusqlite::Result<Line> {
    Ok(Line {
        id: row.get(0)?,
        shabad_id: row.get(1)?,
        order_id: row.get(2)?,
        gurmukhi: row.get(3)?,
        type_id: row.get(4)?,
        first_letters: row.get(5)?,
        source_page: row.get(6)?,
        translations: Vec::new(),
        transliterations: Vec::new(),
        citation: None,
    })
}

fn add_translations(conn: &Connection, lines: &mut [Line]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.translation_source_id, ts.language_id, t.translation
         FROM translations t
         JOIN translation_sources ts ON ts.id = t.translation_source_id
         WHERE t.line_id = ?1
         ORDER BY t.translation_source_id",
    )?;

    for line in lines.iter_mut() {
        line.translations = stmt
            .query_map([&line.id], |row| {
                Ok(Translation {
                    translation_source_id: row.get(0)?,
                    language_id: row.get(1)?,
                    translation: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }
    Ok(())
}

fn add_transliterations(conn: &Connection, lines: &mut [Line]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT language_id, transliteration FROM transliterations
         WHERE line_id = ?1 ORDER BY language_id",
    )?;

    for line in lines.iter_mut() {
        line.transliterations = stmt
            .query_map([&line.id], |row| {
                Ok(Transliteration {
                    language_id: row.get(0)?,
                    transliteration: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }
    Ok(())
}

fn add_citations(conn: &Connection, lines: &mut [Line]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.name_english, l.source_page, sec.name_english, w.name_english
         FROM lines l
         JOIN shabads sh ON sh.id = l.shabad_id
         JOIN sources s ON s.id = sh.source_id
         LEFT JOIN sections sec ON sec.id = sh.section_id
         LEFT JOIN writers w ON w.id = sh.writer_id
         WHERE l.id = ?1",
    )?;

    for line in lines.iter_mut() {
        line.citation = stmt
            .query_row([&line.id], |row| {
                Ok(Citation {
                    source_name: row.get(0)?,
                    page: row.get(1)?,
                    section_name: row.get(2)?,
                    writer_name: row.get(3)?,
                })
            })
            .optional()?;
    }
    Ok(())
}

impl Corpus for SqliteCorpus {
    fn shabad(&self, id: &str) -> Result<Option<Shabad>> {
        let conn = self.conn.lock();
        self.load_shabad(&conn, "id = ?1", &id)
    }

    fn shabad_by_order_id(&self, order_id: i64) -> Result<Option<Shabad>> {
        let conn = self.conn.lock();
        self.load_shabad(&conn, "order_id = ?1", &order_id)
    }

    fn shabad_order_range(&self) -> Result<Option<OrderRange>> {
        let conn = self.conn.lock();
        let (min, max): (Option<i64>, Option<i64>) = conn.query_row(
            "SELECT MIN(order_id), MAX(order_id) FROM shabads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(min.zip(max).map(|(min, max)| OrderRange { min, max }))
    }

    fn bani(&self, id: i64) -> Result<Option<Bani>> {
        let conn = self.conn.lock();
        let bani = conn
            .query_row(
                "SELECT id, name_gurmukhi, name_english FROM banis WHERE id = ?1",
                [id],
                |row| {
                    Ok(Bani {
                        id: row.get(0)?,
                        name_gurmukhi: row.get(1)?,
                        name_english: row.get(2)?,
                        lines: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut bani) = bani else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM lines l
             JOIN bani_lines bl ON bl.line_id = l.id
             WHERE bl.bani_id = ?1
             ORDER BY bl.line_group, l.order_id",
            LINE_COLUMNS
        );
        let mut lines = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id], line_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        add_translations(&conn, &mut lines)?;
        add_transliterations(&conn, &mut lines)?;
        bani.lines = lines;

        Ok(Some(bani))
    }

    fn banis(&self) -> Result<Vec<BaniSummary>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name_gurmukhi, name_english FROM banis ORDER BY id")?;
        let banis = stmt
            .query_map([], |row| {
                Ok(BaniSummary {
                    id: row.get(0)?,
                    name_gurmukhi: row.get(1)?,
                    name_english: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(banis)
    }

    fn search_lines(&self, query: &str, mode: SearchMode, limit: usize) -> Result<Vec<Line>> {
        let (column, pattern, prefix) = match mode {
            SearchMode::FirstLetter => {
                let normalized = letters::normalize(query);
                if normalized.is_empty() {
                    return Ok(Vec::new());
                }
                let pattern = letters::first_letter_pattern(&normalized);
                // Same pattern without the leading '%' ranks prefix matches first
                let prefix = pattern[1..].to_string();
                ("l.first_letters", pattern, prefix)
            }
            SearchMode::FullWord => {
                if query.trim().is_empty() {
                    return Ok(Vec::new());
                }
                let pattern = letters::full_word_pattern(query);
                let prefix = pattern[1..].to_string();
                ("l.gurmukhi", pattern, prefix)
            }
        };

        let sql = format!(
            "SELECT {cols} FROM lines l
             WHERE {column} LIKE ?1 ESCAPE '\\'
             ORDER BY ({column} LIKE ?2 ESCAPE '\\') DESC, l.order_id
             LIMIT ?3",
            cols = LINE_COLUMNS,
            column = column,
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let lines = stmt
            .query_map(params![pattern, prefix, limit as i64], line_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    fn enrich(&self, lines: &mut [Line], stage: Enrichment) -> Result<()> {
        let conn = self.conn.lock();
        match stage {
            Enrichment::Translations => add_translations(&conn, lines),
            Enrichment::Transliterations => add_transliterations(&conn, lines),
            Enrichment::Citations => add_citations(&conn, lines),
        }
    }

    fn sources(&self) -> Result<Vec<Source>> {
        let conn = self.conn.lock();

        let infos = {
            let mut stmt = conn.prepare(
                "SELECT id, name_gurmukhi, name_english, length, page_name_gurmukhi, page_name_english
                 FROM sources ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SourceInfo {
                        id: row.get(0)?,
                        name_gurmukhi: row.get(1)?,
                        name_english: row.get(2)?,
                        length: row.get(3)?,
                        page_name_gurmukhi: row.get(4)?,
                        page_name_english: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut stmt = conn.prepare_cached(
            "SELECT id, source_id, language_id, name_gurmukhi, name_english
             FROM translation_sources WHERE source_id = ?1 ORDER BY id",
        )?;

        let mut sources = Vec::with_capacity(infos.len());
        for info in infos {
            let translation_sources = stmt
                .query_map([info.id], |row| {
                    Ok(TranslationSource {
                        id: row.get(0)?,
                        source_id: row.get(1)?,
                        language_id: row.get(2)?,
                        name_gurmukhi: row.get(3)?,
                        name_english: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            sources.push(Source {
                info,
                translation_sources,
            });
        }

        Ok(sources)
    }

    fn languages(&self) -> Result<Vec<Language>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name_english, name_gurmukhi, name_international FROM languages ORDER BY id",
        )?;
        let languages = stmt
            .query_map([], |row| {
                Ok(Language {
                    id: row.get(0)?,
                    name_english: row.get(1)?,
                    name_gurmukhi: row.get(2)?,
                    name_international: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(languages)
    }

    fn writers(&self) -> Result<Vec<Writer>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, name_english, name_gurmukhi FROM writers ORDER BY id")?;
        let writers = stmt
            .query_map([], |row| {
                Ok(Writer {
                    id: row.get(0)?,
                    name_english: row.get(1)?,
                    name_gurmukhi: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(writers)
    }

    fn version(&self) -> Option<String> {
        self.version.clone()
    }
}
