use std::collections::BTreeMap;
use std::time::Duration;

use crate::{
    error::{ChartError, ChartResult},
    person::PersonNode,
};

/// Where update cycles get their datasets from. The chart never mutates state
/// before a fetch has succeeded, so implementations may fail freely.
pub trait DataSource {
    fn fetch(&self, url: &str) -> ChartResult<Vec<PersonNode>>;
}

/// Blocking HTTP source decoding a JSON array of person nodes.
pub struct HttpDataSource {
    client: reqwest::blocking::Client,
}

impl HttpDataSource {
    pub fn new() -> ChartResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChartError::data(format!("build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl DataSource for HttpDataSource {
    fn fetch(&self, url: &str) -> ChartResult<Vec<PersonNode>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ChartError::data(format!("fetch '{url}': {e}")))?
            .error_for_status()
            .map_err(|e| ChartError::data(format!("fetch '{url}': {e}")))?;
        response
            .json::<Vec<PersonNode>>()
            .map_err(|e| ChartError::data(format!("decode dataset from '{url}': {e}")))
    }
}

/// In-memory source keyed by url, for tests and offline CLI runs.
#[derive(Debug, Default)]
pub struct StaticDataSource {
    datasets: BTreeMap<String, Vec<PersonNode>>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, dataset: Vec<PersonNode>) {
        self.datasets.insert(url.into(), dataset);
    }
}

impl DataSource for StaticDataSource {
    fn fetch(&self, url: &str) -> ChartResult<Vec<PersonNode>> {
        self.datasets
            .get(url)
            .cloned()
            .ok_or_else(|| ChartError::data(format!("no dataset registered for '{url}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::PersonId;

    #[test]
    fn static_source_returns_registered_dataset() {
        let mut source = StaticDataSource::new();
        source.insert(
            "/update/1",
            vec![PersonNode {
                id: PersonId(1),
                xref: "I1".to_string(),
                depth: 0,
                url: String::new(),
                update_url: String::new(),
                name: String::new(),
                timespan: String::new(),
            }],
        );

        let dataset = source.fetch("/update/1").unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0].id, PersonId(1));
    }

    #[test]
    fn static_source_errors_on_unknown_url() {
        let err = StaticDataSource::new().fetch("/missing").unwrap_err();
        assert!(matches!(err, ChartError::Data(_)));
    }
}
