//! Medical literature search via NCBI E-utilities.
//!
//! `esearch` returns relevance-sorted PMIDs as JSON; `efetch` returns the
//! matching records as MEDLINE text, which is parsed here. NCBI asks
//! callers to identify themselves with an email address; an API key raises
//! the rate limit and is passed along when configured.
//!
//! Search failures never surface to the caller: a transport or API error
//! is logged and reported as an empty result list, so a flaky upstream
//! degrades an answer instead of killing a run.

use crate::Result;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// One PubMed article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub pmid: String,
    pub title: String,
    pub authors: Vec<String>,
    pub date: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
}

/// NCBI Entrez client.
#[derive(Clone)]
pub struct PubMedClient {
    http: reqwest::Client,
    email: String,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl PubMedClient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            email: email.into(),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search PubMed, returning at most `max_results` articles.
    ///
    /// Empty on no results and on any upstream failure.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<Article> {
        match self.try_search(query, max_results).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!(query, error = %err, "pubmed search failed");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, query: &str, max_results: usize) -> Result<Vec<Article>> {
        debug!(query, max_results, "pubmed esearch");
        let retmax = max_results.to_string();
        let mut params = vec![
            ("db", "pubmed"),
            ("term", query),
            ("retmax", retmax.as_str()),
            ("sort", "relevance"),
            ("retmode", "json"),
            ("email", self.email.as_str()),
        ];
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.as_str()));
        }

        let response: ESearchResponse = self
            .http
            .get(format!("{}/esearch.fcgi", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Api(e.to_string()))?
            .json()
            .await?;

        let ids = response.esearchresult.idlist;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.join(",");
        let mut params = vec![
            ("db", "pubmed"),
            ("id", id_list.as_str()),
            ("rettype", "medline"),
            ("retmode", "text"),
            ("email", self.email.as_str()),
        ];
        if let Some(api_key) = &self.api_key {
            params.push(("api_key", api_key.as_str()));
        }

        let medline = self
            .http
            .get(format!("{}/efetch.fcgi", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Api(e.to_string()))?
            .text()
            .await?;

        Ok(parse_medline(&medline))
    }
}

/// Parse MEDLINE plain-text output into articles.
///
/// Records are separated by blank lines. Each field line is a 4-character
/// tag, "- ", and a value; continuation lines are indented six spaces and
/// belong to the preceding field. Records without both a PMID and a title
/// are skipped.
pub fn parse_medline(text: &str) -> Vec<Article> {
    text.split("\n\n").filter_map(parse_record).collect()
}

fn parse_record(chunk: &str) -> Option<Article> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in chunk.lines() {
        if line.starts_with("      ") {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(line.trim_start());
            }
        } else if line.get(4..6) == Some("- ") {
            // The slices below are safe: a matching separator proves both
            // byte offsets sit on char boundaries.
            fields.push((line[..4].trim().to_string(), line[6..].trim().to_string()));
        }
    }

    let first = |tag: &str| {
        fields
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.clone())
    };

    let pmid = first("PMID").unwrap_or_default();
    let title = first("TI").unwrap_or_default();
    if pmid.is_empty() && title.is_empty() {
        return None;
    }

    let authors = fields
        .iter()
        .filter(|(t, _)| t == "AU")
        .map(|(_, v)| v.clone())
        .collect();
    let date = first("DP").or_else(|| first("EDAT")).unwrap_or_default();
    let url = if pmid.is_empty() {
        String::new()
    } else {
        format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/")
    };

    Some(Article {
        abstract_text: first("AB").unwrap_or_default(),
        pmid,
        title,
        authors,
        date,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
PMID- 38012345
DP  - 2024 Mar
TI  - PCSK9 inhibitors in secondary prevention: an updated
      meta-analysis of cardiovascular outcomes.
AU  - Weber K
AU  - Fischer M
AB  - Background: PCSK9 inhibition lowers LDL cholesterol.
      Methods: We pooled twelve trials.

PMID- 38067890
EDAT- 2024/01/15 06:00
TI  - Lipid management guidelines 2024.
AU  - Schmidt L";

    #[test]
    fn parses_records_with_continuation_lines() {
        let articles = parse_medline(FIXTURE);
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.pmid, "38012345");
        assert_eq!(
            first.title,
            "PCSK9 inhibitors in secondary prevention: an updated meta-analysis of \
             cardiovascular outcomes."
        );
        assert_eq!(first.authors, vec!["Weber K", "Fischer M"]);
        assert_eq!(first.date, "2024 Mar");
        assert!(first.abstract_text.contains("pooled twelve trials"));
        assert_eq!(first.url, "https://pubmed.ncbi.nlm.nih.gov/38012345/");
    }

    #[test]
    fn date_falls_back_to_entrez_date() {
        let articles = parse_medline(FIXTURE);
        assert_eq!(articles[1].date, "2024/01/15 06:00");
    }

    #[test]
    fn records_without_pmid_and_title_are_skipped() {
        let articles = parse_medline("SO  - Unknown Source\nAU  - Nobody N");
        assert!(articles.is_empty());
    }

    #[test]
    fn non_medline_bodies_are_ignored_not_a_panic() {
        // An upstream proxy error page is arbitrary text, possibly with
        // multibyte characters straddling the tag offsets.
        for garbage in ["aaa\u{e4}- x", "<html>ärgerlich</html>", "ää  - wert"] {
            assert!(parse_medline(garbage).is_empty());
        }
    }

    #[test]
    fn empty_idlist_parses() {
        let raw = r#"{"esearchresult": {"idlist": []}}"#;
        let parsed: ESearchResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.esearchresult.idlist.is_empty());
    }
}
