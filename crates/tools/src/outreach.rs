//! Personalized outreach message generation.

use crate::pubmed::{Article, PubMedClient};
use storage::HcpRecord;

/// Composes outreach messages, enriched with a relevant publication when
/// one can be found.
pub struct OutreachWriter {
    pubmed: PubMedClient,
}

impl OutreachWriter {
    pub fn new(pubmed: PubMedClient) -> Self {
        Self { pubmed }
    }

    /// Generate a message for one HCP, citing the top literature hit for
    /// current treatment guidelines in their specialty when one exists.
    pub async fn generate(&self, hcp: &HcpRecord) -> String {
        let query = format!("{} treatment guidelines 2024", hcp.specialty);
        let articles = self.pubmed.search(&query, 1).await;
        compose(hcp, articles.first())
    }
}

/// Render the outreach template for one HCP.
pub fn compose(hcp: &HcpRecord, article: Option<&Article>) -> String {
    let research = match article {
        Some(article) => format!(
            "\n\nRecent research you might find valuable:\n\"{}\"\n{}",
            article.title, article.url
        ),
        None => String::new(),
    };

    format!(
        "Dear {name},\n\n\
         As a specialist in {specialty} based in {city}, we believe our latest \
         insights could be highly relevant to your practice.{research}\n\n\
         Let us know if you'd like to explore further.\n\n\
         Best regards,\nYour Outreach Team",
        name = hcp.name,
        specialty = hcp.specialty,
        city = hcp.city,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hcp() -> HcpRecord {
        HcpRecord {
            id: 7,
            name: "Dr. Weber".into(),
            specialty: "Cardiology".into(),
            city: "Berlin".into(),
            preferred_channel: "email".into(),
            contacted: false,
        }
    }

    #[test]
    fn message_is_personalized_from_the_record() {
        let message = compose(&hcp(), None);
        assert!(message.starts_with("Dear Dr. Weber,"));
        assert!(message.contains("specialist in Cardiology based in Berlin"));
        assert!(!message.contains("Recent research"));
    }

    #[test]
    fn message_cites_the_article_when_present() {
        let article = Article {
            pmid: "38012345".into(),
            title: "Lipid management guidelines 2024.".into(),
            authors: vec!["Schmidt L".into()],
            date: "2024 Mar".into(),
            abstract_text: String::new(),
            url: "https://pubmed.ncbi.nlm.nih.gov/38012345/".into(),
        };
        let message = compose(&hcp(), Some(&article));
        assert!(message.contains("\"Lipid management guidelines 2024.\""));
        assert!(message.contains("https://pubmed.ncbi.nlm.nih.gov/38012345/"));
    }
}
