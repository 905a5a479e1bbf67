use crate::dataset::Dataset;
use crate::errors::{Result, StoreError};
use crate::filter::{eval_filter, parse_filter};
use crate::scanner::{ScanError, Scanner};
use crate::value::{Document, Map};

/// Pluggable query engine used by the store for `fetch`, `subscribe` and
/// change notification. Results must be the dataset's own documents so
/// identity comparisons between snapshots work.
pub trait QueryEvaluator: Send + Sync {
    fn evaluate(&self, query: &str, dataset: &Dataset, params: &Map) -> Result<Vec<Document>>;
}

impl<F> QueryEvaluator for F
where
    F: Fn(&str, &Dataset, &Map) -> Result<Vec<Document>> + Send + Sync,
{
    fn evaluate(&self, query: &str, dataset: &Dataset, params: &Map) -> Result<Vec<Document>> {
        self(query, dataset, params)
    }
}

/// Built-in evaluator for `*` and `*[<filter>]` queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterQuery;

fn query_error(query: &str, e: ScanError) -> StoreError {
    StoreError::Query(format!("{} at offset {} in `{query}`", e.message, e.offset))
}

impl QueryEvaluator for FilterQuery {
    fn evaluate(&self, query: &str, dataset: &Dataset, params: &Map) -> Result<Vec<Document>> {
        let mut scanner = Scanner::new(query);
        scanner.skip_ws();
        scanner.expect('*').map_err(|e| query_error(query, e))?;
        scanner.skip_ws();

        let filter = if scanner.consume_char('[') {
            let filter = parse_filter(&mut scanner, params).map_err(|e| query_error(query, e))?;
            scanner.skip_ws();
            scanner.expect(']').map_err(|e| query_error(query, e))?;
            Some(filter)
        } else {
            None
        };

        scanner.skip_ws();
        if !scanner.eof() {
            return Err(query_error(query, scanner.error("unsupported query syntax")));
        }

        Ok(dataset
            .iter()
            .filter(|doc| match &filter {
                Some(filter) => eval_filter(filter, &doc.to_value()),
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dataset() -> Dataset {
        [
            json!({"_id": "a", "_type": "post", "n": 1}),
            json!({"_id": "b", "_type": "page", "n": 2}),
            json!({"_id": "c", "_type": "post", "n": 3}),
        ]
        .into_iter()
        .map(|doc| Document::try_from(doc).unwrap())
        .collect()
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(Document::id).collect()
    }

    #[test]
    fn star_returns_everything() {
        let data = dataset();
        let docs = FilterQuery.evaluate(" * ", &data, &Map::new()).unwrap();
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);
        assert!(docs[0].ptr_eq(data.get("a").unwrap()));
    }

    #[test]
    fn filters_with_params() {
        let mut params = Map::new();
        params.insert("type".into(), Value::from("post"));
        let docs = FilterQuery
            .evaluate("*[_type == $type && n > 1]", &dataset(), &params)
            .unwrap();
        assert_eq!(ids(&docs), vec!["c"]);
    }

    #[test]
    fn rejects_other_syntax() {
        for query in ["", "*[_type == 'post'", "*[_type == 'post'] | order(n)", "count(*)"] {
            assert!(
                matches!(FilterQuery.evaluate(query, &dataset(), &Map::new()), Err(StoreError::Query(_))),
                "{query}"
            );
        }
    }

    #[test]
    fn closures_are_evaluators() {
        let first = |_: &str, data: &Dataset, _: &Map| -> Result<Vec<Document>> {
            Ok(data.iter().take(1).cloned().collect())
        };
        let docs = first.evaluate("anything", &dataset(), &Map::new()).unwrap();
        assert_eq!(ids(&docs), vec!["a"]);
    }
}
