// Performance benchmarks for the self-query pipeline
use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use selfquery::prelude::*;
use selfquery::{FilterTranslator, ProviderError, StructuredQueryParser};
use selfquery_core::ConditionKind;
use serde_json::json;
use std::sync::Arc;

const FILTER: &str = r#"and(or(eq("genre", "drama"), eq("genre", "comedy")), gte("rating", 7.5), not(in("year", [1975, 1989])))"#;

const ANSWER: &str = r#"```json
{
    "query": "friendship",
    "filter": "and(gte(\"rating\", 7.5), lt(\"year\", 2010))",
    "limit": 10
}
```"#;

const GENRES: [&str; 4] = ["drama", "comedy", "romance", "action"];

fn schema() -> Schema {
    Schema::from_fields(
        "Brief summary of a movie",
        vec![
            FieldSpec::new("genre", SemanticType::String, "The genre of the movie"),
            FieldSpec::new("year", SemanticType::Integer, "The year the movie was released"),
            FieldSpec::new("rating", SemanticType::Float, "A 1-10 rating for the movie"),
        ],
    )
    .unwrap()
}

fn generate_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let metadata = json!({
                "genre": GENRES[i % GENRES.len()],
                "year": 1950 + (i % 75) as i64,
                "rating": 1.0 + (i % 90) as f64 / 10.0,
            });
            Document::new(
                format!("movie {} about friendship, family and a journey number {}", i, i % 13),
                metadata.as_object().unwrap().clone(),
            )
            .with_id(i as u64)
        })
        .collect()
}

struct FixedModel;

#[async_trait]
impl LanguageModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(ANSWER.to_string())
    }
}

fn benchmark_parse(c: &mut Criterion) {
    let schema = schema();
    let parser = StructuredQueryParser::new(&schema);

    c.bench_function("parse_filter", |b| {
        b.iter(|| parser.parse_filter(black_box(FILTER)).unwrap())
    });
    c.bench_function("parse_model_output", |b| {
        b.iter(|| parser.parse(black_box(ANSWER)).unwrap())
    });
}

fn benchmark_translate(c: &mut Criterion) {
    let schema = schema();
    let filter = StructuredQueryParser::new(&schema).parse_filter(FILTER).unwrap();
    let translator = FilterTranslator::new(ConditionKind::ALL);

    c.bench_function("translate_filter", |b| {
        b.iter(|| translator.translate(black_box(Some(&filter))).unwrap())
    });
}

fn benchmark_search(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let embedder = HashEmbedder::default();
    let schema = schema();
    let filter = StructuredQueryParser::new(&schema).parse_filter(FILTER).unwrap();
    let condition = FilterTranslator::new(ConditionKind::ALL)
        .translate(Some(&filter))
        .unwrap();
    let query = Vector::new(rt.block_on(embedder.embed("friendship and family")).unwrap());

    let mut group = c.benchmark_group("filtered_search");
    for size in [1000, 10000].iter() {
        let collection = rt
            .block_on(build_collection(
                CollectionConfig::default(),
                generate_documents(*size),
                &embedder,
            ))
            .unwrap();

        group.bench_with_input(BenchmarkId::new("unfiltered", size), size, |b, _| {
            b.iter(|| collection.search_with_condition(black_box(&query), 4, None).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("filtered", size), size, |b, _| {
            b.iter(|| {
                collection
                    .search_with_condition(black_box(&query), 4, condition.as_ref())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn benchmark_retrieve(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let embedder = Arc::new(HashEmbedder::default());
    let store = rt
        .block_on(build_collection(
            CollectionConfig::default(),
            generate_documents(5000),
            embedder.as_ref(),
        ))
        .unwrap();
    let retriever = SelfQueryRetriever::new(
        Arc::new(schema()),
        Arc::new(FixedModel),
        embedder,
        Arc::new(store),
    );

    c.bench_function("retrieve_end_to_end", |b| {
        b.to_async(&rt)
            .iter(|| async { retriever.retrieve(black_box("good movies about friendship")).await.unwrap() })
    });
}

criterion_group!(benches, benchmark_parse, benchmark_translate, benchmark_search, benchmark_retrieve);
criterion_main!(benches);
