use crate::HarvestError;
use serde_json::{json, Map, Value};
use serde_json_path::JsonPath;

/// Result of evaluating one JSONPath query
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Values the query selected, in document order
    Matches(Vec<Value>),

    /// The query could not be parsed; other queries are unaffected
    Error(String),
}

/// Evaluates each query against `app_state` independently
///
/// Results keep the order of `queries`. A query that fails to parse yields
/// [`FilterOutcome::Error`] for that query alone.
///
/// # Example
///
/// ```
/// use page_harvest::metadata::{apply_filters, FilterOutcome};
/// use serde_json::json;
///
/// let state = json!({"items": [{"id": 1}, {"id": 2}]});
/// let results = apply_filters(&state, &["$.items[*].id".to_string(), "$[".to_string()]);
/// assert_eq!(results[0].1, FilterOutcome::Matches(vec![json!(1), json!(2)]));
/// assert!(matches!(results[1].1, FilterOutcome::Error(_)));
/// ```
pub fn apply_filters(app_state: &Value, queries: &[String]) -> Vec<(String, FilterOutcome)> {
    queries
        .iter()
        .map(|query| {
            let outcome = match evaluate(app_state, query) {
                Ok(matches) => FilterOutcome::Matches(matches),
                Err(e) => {
                    tracing::debug!("{}", e);
                    FilterOutcome::Error(e.to_string())
                }
            };
            (query.clone(), outcome)
        })
        .collect()
}

fn evaluate(app_state: &Value, query: &str) -> Result<Vec<Value>, HarvestError> {
    let path = JsonPath::parse(query).map_err(|e| HarvestError::FilterQuery {
        query: query.to_string(),
        message: e.to_string(),
    })?;

    Ok(path.query(app_state).all().into_iter().cloned().collect())
}

/// Renders filter results as `{query: {"matches": [...]} | {"error": "..."}}`
pub fn filters_to_json(results: &[(String, FilterOutcome)]) -> Value {
    let mut map = Map::new();
    for (query, outcome) in results {
        let value = match outcome {
            FilterOutcome::Matches(matches) => json!({ "matches": matches }),
            FilterOutcome::Error(message) => json!({ "error": message }),
        };
        map.insert(query.clone(), value);
    }
    Value::Object(map)
}
