//! Search dispatch
//!
//! A search runs the corpus query and every requested enrichment stage in one
//! blocking task, then answers only the client that asked. Each client keeps
//! a search sequence number; a response is delivered only if no newer search
//! from the same client was started in the meantime, so results always match
//! the latest query the client typed.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::corpus::{query, Line, SearchMode, SharedCorpus, MAX_RESULTS};
use crate::socket_server::{Client, ClientEvent, SearchRequest};
use crate::Result;

pub struct SearchDispatcher {
    corpus: SharedCorpus,
    limit: usize,
}

impl SearchDispatcher {
    pub fn new(corpus: SharedCorpus) -> Self {
        Self {
            corpus,
            limit: MAX_RESULTS,
        }
    }

    /// Cap the number of results (defaults to [`MAX_RESULTS`]).
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Run a search and its enrichment stages.
    pub async fn search(&self, mode: SearchMode, request: SearchRequest) -> Result<Vec<Line>> {
        let query_text = request.query.trim().to_string();
        if query_text.is_empty() {
            return Ok(Vec::new());
        }

        let stages = request.options.unwrap_or_default().stages();
        let limit = self.limit;

        query(&self.corpus, move |corpus| {
            let mut lines = corpus.search_lines(&query_text, mode, limit)?;
            for stage in stages {
                corpus.enrich(&mut lines, stage)?;
            }
            Ok(lines)
        })
        .await
    }

    /// Search in the background and send the results to `client`.
    pub fn dispatch(self: &Arc<Self>, client: Arc<Client>, mode: SearchMode, request: SearchRequest) -> JoinHandle<()> {
        let seq = client.next_search();
        let dispatcher = Arc::clone(self);

        tokio::spawn(async move {
            tracing::debug!(host = %client.host(), "Searching {:?} for '{}'", mode, request.query);

            let results = match dispatcher.search(mode, request).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!(host = %client.host(), "Search failed: {}", e);
                    return;
                }
            };

            if !client.is_latest_search(seq) {
                tracing::debug!(host = %client.host(), "Discarding results of superseded search {}", seq);
                return;
            }

            client.send(&ClientEvent::SearchResults(results));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{MemoryCorpus, SearchOptions, Shabad, Translation};
    use crate::socket_server::{ConnectionState, Outbound};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    fn line(id: &str, order_id: i64, first_letters: &str) -> Line {
        Line {
            id: id.to_string(),
            shabad_id: "S1".to_string(),
            order_id,
            gurmukhi: format!("gurmukhi {}", id),
            type_id: None,
            first_letters: first_letters.to_string(),
            source_page: None,
            translations: vec![Translation {
                translation_source_id: 1,
                language_id: 1,
                translation: format!("english {}", id),
            }],
            transliterations: Vec::new(),
            citation: None,
        }
    }

    fn dispatcher() -> Arc<SearchDispatcher> {
        let corpus = MemoryCorpus::new().with_shabad(Shabad {
            id: "S1".to_string(),
            order_id: 1,
            source_id: 1,
            writer_id: None,
            section_id: None,
            lines: vec![line("L1", 1, "hggm"), line("L2", 2, "ggmh"), line("L3", 3, "abcd")],
        });
        Arc::new(SearchDispatcher::new(Arc::new(corpus)))
    }

    fn client() -> (Arc<Client>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(Client::new("127.0.0.1:5000".parse().unwrap(), tx));
        client.set_state(ConnectionState::Connected);
        (client, rx)
    }

    fn results(outbound: Outbound) -> Vec<Line> {
        match outbound {
            Outbound::Frame(Message::Text(text)) => match serde_json::from_str(&text).unwrap() {
                ClientEvent::SearchResults(lines) => lines,
                other => panic!("unexpected event {:?}", other),
            },
            other => panic!("unexpected outbound {:?}", other),
        }
    }

    fn request(query: &str, options: Option<SearchOptions>) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            options,
        }
    }

    #[tokio::test]
    async fn test_first_letter_search_ranks_prefix_matches_first() {
        let lines = dispatcher()
            .search(SearchMode::FirstLetter, request("gg", None))
            .await
            .unwrap();

        let ids: Vec<_> = lines.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L2", "L1"]);
        assert!(lines.iter().all(|l| l.translations.is_empty()));
    }

    #[tokio::test]
    async fn test_translations_stage_enriches_results() {
        let options = SearchOptions {
            translations: true,
            ..Default::default()
        };
        let lines = dispatcher()
            .search(SearchMode::FirstLetter, request("abcd", Some(options)))
            .await
            .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].translation_in(1), Some("english L3"));
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let lines = dispatcher()
            .search(SearchMode::FullWord, request("   ", None))
            .await
            .unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_results_respect_limit() {
        let corpus = MemoryCorpus::new().with_shabad(Shabad {
            id: "S1".to_string(),
            order_id: 1,
            source_id: 1,
            writer_id: None,
            section_id: None,
            lines: (0..10).map(|i| line(&format!("L{}", i), i, "kk")).collect(),
        });
        let dispatcher = SearchDispatcher::new(Arc::new(corpus)).with_limit(3);

        let lines = dispatcher
            .search(SearchMode::FirstLetter, request("k", None))
            .await
            .unwrap();
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_dispatch_answers_only_the_requester() {
        let dispatcher = dispatcher();
        let (asker, mut asker_rx) = client();
        let (_other, mut other_rx) = client();

        dispatcher
            .dispatch(Arc::clone(&asker), SearchMode::FirstLetter, request("abcd", None))
            .await
            .unwrap();

        let lines = results(asker_rx.try_recv().unwrap());
        assert_eq!(lines[0].id, "L3");
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_superseded_search_is_dropped() {
        let dispatcher = dispatcher();
        let (client, mut rx) = client();

        let first = dispatcher.dispatch(Arc::clone(&client), SearchMode::FirstLetter, request("gg", None));
        let second = dispatcher.dispatch(Arc::clone(&client), SearchMode::FirstLetter, request("abcd", None));
        first.await.unwrap();
        second.await.unwrap();

        let lines = results(rx.try_recv().unwrap());
        assert_eq!(lines[0].id, "L3");
        assert!(rx.try_recv().is_err());
    }
}
