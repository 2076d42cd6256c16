//! The agent's tool bindings and registry assembly.
//!
//! Six tools, registered in a fixed order that is rendered verbatim into
//! the model context. Store and client failures are mapped onto
//! [`ToolError`] here; the dispatcher above turns those into failed
//! observations the model can react to.

use crate::outreach::OutreachWriter;
use crate::places::PlacesClient;
use crate::pubmed::PubMedClient;
use async_trait::async_trait;
use runtime::tools::{ArgSpec, ArgType, ToolArgs, ToolError, ToolHandler, ToolRegistry, ToolSpec};
use serde_json::{Value, json};
use std::sync::Arc;
use storage::{ContactStore, HcpFilter};

/// Hard cap on records returned by a database query.
const QUERY_RESULT_CAP: usize = 10;

const DEFAULT_LITERATURE_RESULTS: i64 = 10;

/// Build the full tool registry over the given collaborators.
///
/// Registration order is fixed; it determines the tool catalog the model
/// sees.
pub fn build_registry(
    store: Arc<ContactStore>,
    places: PlacesClient,
    pubmed: PubMedClient,
) -> Result<ToolRegistry, ToolError> {
    let writer = OutreachWriter::new(pubmed.clone());
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolSpec::new(
            "FindHCPs",
            "Find healthcare professionals and their contact details by specialty and location.",
        )
        .arg(ArgSpec::required("specialty", ArgType::String))
        .arg(ArgSpec::optional("location", ArgType::String).with_default(json!(""))),
        Arc::new(FindHcps {
            places: places.clone(),
        }),
    )?;

    registry.register(
        ToolSpec::new(
            "SearchMedicalLiterature",
            "Search PubMed for medical research articles relevant to a query.",
        )
        .arg(ArgSpec::required("query", ArgType::String))
        .arg(
            ArgSpec::optional("max_results", ArgType::Integer)
                .with_default(json!(DEFAULT_LITERATURE_RESULTS)),
        ),
        Arc::new(SearchLiterature {
            pubmed: pubmed.clone(),
        }),
    )?;

    registry.register(
        ToolSpec::new(
            "GeneratePersonalizedOutreach",
            "Generate a personalized outreach message for one HCP, citing recent research.",
        )
        .arg(ArgSpec::required("hcp_id", ArgType::Integer)),
        Arc::new(GenerateOutreach {
            store: store.clone(),
            writer,
        }),
    )?;

    registry.register(
        ToolSpec::new(
            "GetOutreachCandidates",
            "List HCPs in the database who have not been contacted yet.",
        ),
        Arc::new(GetOutreachCandidates {
            store: store.clone(),
        }),
    )?;

    registry.register(
        ToolSpec::new(
            "RecordContact",
            "Record that an HCP has been contacted, by their numeric id.",
        )
        .arg(ArgSpec::required("hcp_id", ArgType::Integer)),
        Arc::new(RecordContact {
            store: store.clone(),
        }),
    )?;

    registry.register(
        ToolSpec::new(
            "QueryHCPDatabase",
            "Query the HCP database by specialty, city, and contacted status.",
        )
        .arg(ArgSpec::optional("specialty", ArgType::String))
        .arg(ArgSpec::optional("city", ArgType::String))
        .arg(ArgSpec::optional("contacted", ArgType::Boolean)),
        Arc::new(QueryDatabase { store }),
    )?;

    Ok(registry)
}

struct FindHcps {
    places: PlacesClient,
}

#[async_trait]
impl ToolHandler for FindHcps {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let specialty = args.str("specialty")?;
        let location = args.opt_str("location").unwrap_or_default();
        let practitioners = self
            .places
            .search(specialty, location)
            .await
            .map_err(|e| ToolError::execution(e.to_string()))?;
        Ok(json!({
            "count": practitioners.len(),
            "practitioners": practitioners,
        }))
    }
}

struct SearchLiterature {
    pubmed: PubMedClient,
}

#[async_trait]
impl ToolHandler for SearchLiterature {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let query = args.str("query")?;
        let max_results = args.int("max_results")?.clamp(1, 50) as usize;
        let articles = self.pubmed.search(query, max_results).await;
        Ok(json!({
            "count": articles.len(),
            "articles": articles,
        }))
    }
}

struct GenerateOutreach {
    store: Arc<ContactStore>,
    writer: OutreachWriter,
}

#[async_trait]
impl ToolHandler for GenerateOutreach {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let hcp_id = args.int("hcp_id")?;
        let record = self
            .store
            .get(hcp_id)
            .map_err(|e| ToolError::execution(e.to_string()))?
            .ok_or_else(|| ToolError::NotFound(format!("HCP {hcp_id}")))?;
        let message = self.writer.generate(&record).await;
        Ok(json!({
            "hcp_id": record.id,
            "name": record.name,
            "preferred_channel": record.preferred_channel,
            "message": message,
        }))
    }
}

struct GetOutreachCandidates {
    store: Arc<ContactStore>,
}

#[async_trait]
impl ToolHandler for GetOutreachCandidates {
    async fn call(&self, _args: ToolArgs) -> Result<Value, ToolError> {
        let candidates = self
            .store
            .list_uncontacted()
            .map_err(|e| ToolError::execution(e.to_string()))?;
        Ok(json!({
            "count": candidates.len(),
            "candidates": candidates,
        }))
    }
}

struct RecordContact {
    store: Arc<ContactStore>,
}

#[async_trait]
impl ToolHandler for RecordContact {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let hcp_id = args.int("hcp_id")?;
        let found = self
            .store
            .mark_contacted(hcp_id)
            .map_err(|e| ToolError::execution(e.to_string()))?;
        if !found {
            return Err(ToolError::NotFound(format!("HCP {hcp_id}")));
        }
        Ok(json!({"hcp_id": hcp_id, "contacted": true}))
    }
}

struct QueryDatabase {
    store: Arc<ContactStore>,
}

#[async_trait]
impl ToolHandler for QueryDatabase {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let mut filter = HcpFilter::default();
        if let Some(specialty) = args.opt_str("specialty") {
            filter = filter.specialty(specialty);
        }
        if let Some(city) = args.opt_str("city") {
            filter = filter.city(city);
        }
        if let Some(contacted) = args.opt_bool("contacted") {
            filter = filter.contacted(contacted);
        }

        let mut records = self
            .store
            .find(&filter)
            .map_err(|e| ToolError::execution(e.to_string()))?;
        let matched = records.len();
        records.truncate(QUERY_RESULT_CAP);
        Ok(json!({
            "matched": matched,
            "returned": records.len(),
            "hcps": records,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::tools::validate_args;
    use storage::HcpRecord;

    // Unroutable endpoints so client failures are fast and deterministic.
    fn offline_places() -> PlacesClient {
        PlacesClient::new("test-key").with_base_url("http://127.0.0.1:1")
    }

    fn offline_pubmed() -> PubMedClient {
        PubMedClient::new("test@example.com").with_base_url("http://127.0.0.1:1")
    }

    fn record(id: i64, contacted: bool) -> HcpRecord {
        HcpRecord {
            id,
            name: format!("Dr. {id}"),
            specialty: "Cardiology".into(),
            city: "Berlin".into(),
            preferred_channel: "email".into(),
            contacted,
        }
    }

    fn registry_over(store: Arc<ContactStore>) -> ToolRegistry {
        build_registry(store, offline_places(), offline_pubmed()).unwrap()
    }

    async fn invoke(registry: &ToolRegistry, name: &str, raw: Value) -> Result<Value, ToolError> {
        let tool = registry.get(name).unwrap();
        let args = validate_args(&tool.spec, &raw).unwrap();
        tool.handler().call(args).await
    }

    #[test]
    fn registry_holds_six_tools_in_fixed_order() {
        let registry = registry_over(Arc::new(ContactStore::in_memory().unwrap()));
        let names: Vec<&str> = registry.list().iter().map(|t| t.spec.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "FindHCPs",
                "SearchMedicalLiterature",
                "GeneratePersonalizedOutreach",
                "GetOutreachCandidates",
                "RecordContact",
                "QueryHCPDatabase",
            ]
        );
    }

    #[test]
    fn literature_search_defaults_to_ten_results() {
        let registry = registry_over(Arc::new(ContactStore::in_memory().unwrap()));
        let tool = registry.get("SearchMedicalLiterature").unwrap();
        let args = validate_args(&tool.spec, &json!({"query": "statin adherence"})).unwrap();
        assert_eq!(args.opt_int("max_results"), Some(10));
    }

    #[tokio::test]
    async fn record_contact_unknown_id_is_not_found() {
        let registry = registry_over(Arc::new(ContactStore::in_memory().unwrap()));
        let err = invoke(&registry, "RecordContact", json!({"hcp_id": 99}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::NotFound("HCP 99".into()));
    }

    #[tokio::test]
    async fn record_contact_marks_the_record() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        store.insert_new(&record(1, false)).unwrap();
        let registry = registry_over(store.clone());

        let value = invoke(&registry, "RecordContact", json!({"hcp_id": 1}))
            .await
            .unwrap();
        assert_eq!(value["contacted"], json!(true));
        assert!(store.get(1).unwrap().unwrap().contacted);
    }

    #[tokio::test]
    async fn outreach_candidates_exclude_contacted_records() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        store.insert_new(&record(1, false)).unwrap();
        store.insert_new(&record(2, true)).unwrap();
        let registry = registry_over(store);

        let value = invoke(&registry, "GetOutreachCandidates", Value::Null)
            .await
            .unwrap();
        assert_eq!(value["count"], json!(1));
        assert_eq!(value["candidates"][0]["id"], json!(1));
    }

    #[tokio::test]
    async fn database_query_caps_returned_records() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        for id in 1..=12 {
            store.insert_new(&record(id, false)).unwrap();
        }
        let registry = registry_over(store);

        let value = invoke(&registry, "QueryHCPDatabase", json!({"specialty": "Cardiology"}))
            .await
            .unwrap();
        assert_eq!(value["matched"], json!(12));
        assert_eq!(value["returned"], json!(10));
        assert_eq!(value["hcps"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn outreach_generation_survives_an_offline_literature_search() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        store.insert_new(&record(1, false)).unwrap();
        let registry = registry_over(store);

        let value = invoke(&registry, "GeneratePersonalizedOutreach", json!({"hcp_id": 1}))
            .await
            .unwrap();
        let message = value["message"].as_str().unwrap();
        assert!(message.starts_with("Dear Dr. 1,"));
        assert!(!message.contains("Recent research"));
    }

    #[tokio::test]
    async fn outreach_generation_unknown_id_is_not_found() {
        let registry = registry_over(Arc::new(ContactStore::in_memory().unwrap()));
        let err = invoke(&registry, "GeneratePersonalizedOutreach", json!({"hcp_id": 5}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::NotFound("HCP 5".into()));
    }

    #[tokio::test]
    async fn places_outage_surfaces_as_execution_error() {
        let registry = registry_over(Arc::new(ContactStore::in_memory().unwrap()));
        let err = invoke(&registry, "FindHCPs", json!({"specialty": "cardiologists"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
