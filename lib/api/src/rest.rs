use actix_web::{web, App, HttpServer, HttpResponse, Result as ActixResult};
use actix_cors::Cors;
use selfquery_core::Document;
use selfquery_query::{RetrievalError, SelfQueryRetriever};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Serialize)]
struct FieldInfo {
    name: String,
    #[serde(rename = "type")]
    semantic_type: String,
    description: String,
    comparators: Vec<&'static str>,
}

#[derive(Serialize)]
struct DocumentResult<'a> {
    id: String,
    content: &'a str,
    metadata: &'a serde_json::Map<String, serde_json::Value>,
    score: f32,
}

impl<'a> DocumentResult<'a> {
    fn new(document: &'a Document, score: f32) -> Self {
        Self {
            id: document.id.to_string(),
            content: &document.content,
            metadata: &document.metadata,
            score,
        }
    }
}

const EMPTY_QUERY: &str = "Please enter a query";

pub struct RestApi;

impl RestApi {
    pub async fn start(retriever: Arc<SelfQueryRetriever>, port: u16) -> std::io::Result<()> {
        info!("Starting HTTP server on port {}", port);
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(retriever.clone()))
                .configure(RestApi::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Register every route. Handlers expect `web::Data<Arc<SelfQueryRetriever>>`.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/schema", web::get().to(get_schema))
            .route("/query", web::post().to(run_query))
            .route("/query/interpret", web::post().to(interpret_query));
    }
}

async fn health(retriever: web::Data<Arc<SelfQueryRetriever>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "documents": retriever.document_count(),
    })))
}

async fn get_schema(retriever: web::Data<Arc<SelfQueryRetriever>>) -> ActixResult<HttpResponse> {
    let schema = retriever.schema();
    let fields: Vec<FieldInfo> = schema
        .fields()
        .iter()
        .map(|field| FieldInfo {
            name: field.name.clone(),
            semantic_type: field.semantic_type.to_string(),
            description: field.description.clone(),
            comparators: field
                .semantic_type
                .comparators()
                .iter()
                .map(|c| c.as_str())
                .collect(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "content_description": schema.content_description(),
        "fields": fields,
    })))
}

async fn run_query(
    retriever: web::Data<Arc<SelfQueryRetriever>>,
    req: web::Json<QueryRequest>,
) -> ActixResult<HttpResponse> {
    let query = req.query.trim();
    if query.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": EMPTY_QUERY
        })));
    }

    match retriever.retrieve(query).await {
        Ok(result) => {
            let documents: Vec<DocumentResult> = result
                .iter()
                .map(|d| DocumentResult::new(&d.document, d.score))
                .collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "result": {
                    "structured_query": result.structured_query,
                    "documents": documents,
                }
            })))
        }
        Err(e) => Ok(error_response(&e)),
    }
}

async fn interpret_query(
    retriever: web::Data<Arc<SelfQueryRetriever>>,
    req: web::Json<QueryRequest>,
) -> ActixResult<HttpResponse> {
    let query = req.query.trim();
    if query.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": EMPTY_QUERY
        })));
    }

    match retriever.interpret(query).await {
        Ok(interpretation) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "result": interpretation
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

fn error_response(err: &RetrievalError) -> HttpResponse {
    warn!("Query failed ({}): {}", err.kind(), err);
    let body = serde_json::json!({
        "error": err.user_message(),
        "kind": err.kind(),
        "detail": err.to_string(),
    });

    if err.is_retryable() {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::UnprocessableEntity().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use async_trait::async_trait;
    use selfquery_core::{Collection, CollectionConfig, Vector};
    use selfquery_llm::{EmbeddingProvider, HashEmbedder, LanguageModel, ProviderError};
    use selfquery_schema::{FieldSpec, Schema, SemanticType};
    use serde_json::{json, Value};

    struct ScriptedModel(Result<String, ProviderError>);

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.0.clone()
        }
    }

    async fn retriever(answer: Result<String, ProviderError>) -> Arc<SelfQueryRetriever> {
        let schema = Schema::from_fields(
            "Brief summary of a movie",
            vec![
                FieldSpec::new("year", SemanticType::Integer, "The year the movie was released"),
                FieldSpec::new("rating", SemanticType::Float, "A 1-10 rating for the movie"),
            ],
        )
        .unwrap();

        let embedder = Arc::new(HashEmbedder::new(16));
        let collection = Collection::new(CollectionConfig {
            name: "movies".into(),
            vector_dim: 16,
            ..Default::default()
        });
        for (id, content, year, rating) in [
            ("sholay", "two ex-convicts hunt a bandit", 1975, 8.2),
            ("ghoomer", "a cricketer loses her arm", 2023, 7.8),
        ] {
            let metadata = json!({"year": year, "rating": rating});
            let document = Document::new(content, metadata.as_object().unwrap().clone()).with_id(id);
            let vector = Vector::new(embedder.embed(content).await.unwrap());
            collection.insert(document, vector).unwrap();
        }

        Arc::new(SelfQueryRetriever::new(
            Arc::new(schema),
            Arc::new(ScriptedModel(answer)),
            embedder,
            Arc::new(collection),
        ))
    }

    macro_rules! app {
        ($retriever:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($retriever))
                    .configure(RestApi::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_and_schema() {
        let app = app!(retriever(Ok(String::new())).await);

        let resp: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/health").to_request(),
        )
        .await;
        assert_eq!(resp, json!({"status": "ok", "documents": 2}));

        let resp: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/schema").to_request(),
        )
        .await;
        assert_eq!(resp["content_description"], "Brief summary of a movie");
        assert_eq!(resp["fields"][1]["name"], "rating");
        assert_eq!(resp["fields"][1]["type"], "float");
        assert_eq!(resp["fields"][1]["comparators"][2], "gt");
    }

    #[actix_web::test]
    async fn test_query_returns_documents() {
        let answer = r#"{"query": "", "filter": "lt(\"year\", 2000)"}"#.to_string();
        let app = app!(retriever(Ok(answer)).await);

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"query": "movies from before 2000"}))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;

        let documents = resp["result"]["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["id"], "sholay");
        assert_eq!(documents[0]["metadata"]["year"], 1975);
        assert_eq!(resp["result"]["structured_query"]["filter"], r#"lt("year", 2000)"#);
    }

    #[actix_web::test]
    async fn test_blank_query_is_rejected() {
        let app = app!(retriever(Ok(String::new())).await);
        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"query": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_malformed_query_maps_to_422() {
        let answer = r#"{"query": "", "filter": "gt(\"budget\", 100)"}"#.to_string();
        let app = app!(retriever(Ok(answer)).await);

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({"query": "big budget movies"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "malformed_query");
        assert!(body["error"].as_str().unwrap().contains("rephrasing"));
    }

    #[actix_web::test]
    async fn test_model_failure_maps_to_503() {
        let app = app!(retriever(Err(ProviderError::Http("connection refused".into()))).await);

        let req = test::TestRequest::post()
            .uri("/query/interpret")
            .set_json(json!({"query": "old movies"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_interpret() {
        let answer = r#"{"query": "bandits", "filter": "NO_FILTER", "limit": 1}"#.to_string();
        let app = app!(retriever(Ok(answer)).await);

        let req = test::TestRequest::post()
            .uri("/query/interpret")
            .set_json(json!({"query": "one movie about bandits"}))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(
            resp["result"]["structured_query"],
            json!({"query": "bandits", "filter": "NO_FILTER", "limit": 1})
        );
        assert!(resp["result"]["prompt"].as_str().unwrap().contains("one movie about bandits"));
    }
}
