use crate::{config::OutputConfig, CrawlerError, Record};
use itertools::Itertools;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug)]
pub enum Sink {
    Post {
        url: String,
        client: reqwest::Client,
    },
    Csv {
        path: PathBuf,
        aggregate: bool,
    },
}

impl Sink {
    pub fn from_config(output: &OutputConfig) -> Result<Sink, CrawlerError> {
        match output.action.as_str() {
            "post" => {
                let url = output
                    .url
                    .clone()
                    .ok_or(CrawlerError::MissingOutputField {
                        action: "post",
                        field: "url",
                    })?;
                Ok(Sink::Post {
                    url,
                    client: reqwest::Client::new(),
                })
            }
            "csv" => {
                let path = output
                    .path
                    .clone()
                    .ok_or(CrawlerError::MissingOutputField {
                        action: "csv",
                        field: "path",
                    })?;
                Ok(Sink::Csv {
                    path,
                    aggregate: output.aggregate,
                })
            }
            other => Err(CrawlerError::NoHandler(other.to_string())),
        }
    }

    pub async fn save(&self, records: &[Record]) {
        match self {
            Sink::Post { url, client } => {
                for record in records {
                    info!("Save to post");
                    match post(client, url, record).await {
                        Ok(body) => info!("saveToPost -> success {}", body),
                        Err(err) => error!(
                            error = ?err,
                            "saveToPost -> error {}",
                            record.get("title").map(cell).unwrap_or_default()
                        ),
                    }
                }
            }
            Sink::Csv {
                path,
                aggregate: false,
            } => {
                // Every record replaces the file, so only the last one is kept.
                for record in records {
                    info!("Save to Csv {}", path.display());
                    let columns = columns(std::slice::from_ref(record));
                    log_csv_result(path, write_csv(path, &columns, &rows(record, &columns)));
                }
            }
            Sink::Csv {
                path,
                aggregate: true,
            } => {
                info!("Save {} records to Csv {}", records.len(), path.display());
                let columns = columns(records);
                let rows = records
                    .iter()
                    .flat_map(|record| rows(record, &columns))
                    .collect::<Vec<_>>();
                log_csv_result(path, write_csv(path, &columns, &rows));
            }
        }
    }
}

pub async fn save(records: &[Record], output: &OutputConfig) -> Result<(), CrawlerError> {
    if records.is_empty() {
        info!("No records to save");
        return Ok(());
    }
    Sink::from_config(output)?.save(records).await;
    Ok(())
}

async fn post(client: &reqwest::Client, url: &str, record: &Record) -> Result<String, CrawlerError> {
    let res = client
        .post(url)
        .header(ACCEPT, "application/json")
        .form(&form_fields(record))
        .send()
        .await?
        .error_for_status()?;
    Ok(res.text().await?)
}

pub fn form_fields(record: &Record) -> Vec<(String, String)> {
    let mut fields = vec![];
    for (key, value) in record {
        push_form_field(key.clone(), value, &mut fields);
    }
    fields
}

fn push_form_field(key: String, value: &Value, fields: &mut Vec<(String, String)>) {
    match value {
        Value::Null => fields.push((key, String::new())),
        Value::String(s) => fields.push((key, s.clone())),
        Value::Bool(_) | Value::Number(_) => fields.push((key, value.to_string())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                push_form_field(format!("{}[{}]", key, i), item, fields);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                push_form_field(format!("{}[{}]", key, k), v, fields);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Column {
    Scalar(String),
    Group(String, String),
}

impl Column {
    fn name(&self) -> String {
        match self {
            Column::Scalar(key) => key.clone(),
            Column::Group(key, child) => format!("{}.{}", key, child),
        }
    }
}

fn group_entries(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(Value::as_object).collect(),
        _ => None,
    }
}

fn columns(records: &[Record]) -> Vec<Column> {
    records
        .iter()
        .flat_map(|record| record.iter())
        .flat_map(|(key, value)| match group_entries(value) {
            Some(entries) => entries
                .into_iter()
                .flat_map(|entry| entry.keys())
                .map(|child| Column::Group(key.clone(), child.clone()))
                .collect::<Vec<_>>(),
            None => vec![Column::Scalar(key.clone())],
        })
        .unique()
        .collect()
}

fn rows(record: &Record, columns: &[Column]) -> Vec<Vec<String>> {
    let height = record
        .values()
        .filter_map(group_entries)
        .map(|entries| entries.len())
        .max()
        .unwrap_or(1);

    (0..height)
        .map(|i| {
            columns
                .iter()
                .map(|column| match column {
                    Column::Scalar(key) => record.get(key).map(cell).unwrap_or_default(),
                    Column::Group(key, child) => record
                        .get(key)
                        .and_then(group_entries)
                        .and_then(|entries| entries.get(i).and_then(|e| e.get(child)).map(cell))
                        .unwrap_or_default(),
                })
                .collect()
        })
        .collect()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => {
            items.iter().map(cell).join(";")
        }
        _ => value.to_string(),
    }
}

fn write_csv(path: &Path, columns: &[Column], rows: &[Vec<String>]) -> Result<(), CrawlerError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns.iter().map(Column::name))?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn log_csv_result(path: &Path, result: Result<(), CrawlerError>) {
    match result {
        Ok(()) => info!("It's saved! {}", path.display()),
        Err(err) => error!(
            error = ?err,
            "Some error occured - file either not saved or corrupted file saved."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("Not an object"),
        }
    }

    fn output(action: &str) -> OutputConfig {
        OutputConfig {
            action: action.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_fields_nest_groups() {
        let fields = form_fields(&record(json!({
            "title": "Hello",
            "missing": null,
            "listing": [{ "title": "a" }, { "link": "https://x.test/" }],
            "date": 20190114,
        })));

        let expected = vec![
            ("title", "Hello"),
            ("missing", ""),
            ("listing[0][title]", "a"),
            ("listing[1][link]", "https://x.test/"),
            ("date", "20190114"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<Vec<_>>();
        assert_eq!(fields, expected);
    }

    #[test]
    fn test_unknown_action_has_no_handler() {
        let res = Sink::from_config(&output("ftp"));
        assert!(matches!(res, Err(CrawlerError::NoHandler(ref a)) if a == "ftp"));
    }

    #[test]
    fn test_missing_output_fields() {
        assert!(matches!(
            Sink::from_config(&output("post")),
            Err(CrawlerError::MissingOutputField { field: "url", .. })
        ));
        assert!(matches!(
            Sink::from_config(&output("csv")),
            Err(CrawlerError::MissingOutputField { field: "path", .. })
        ));
    }

    #[tokio::test]
    async fn test_save_fails_on_unknown_action() {
        let records = vec![record(json!({ "title": "a" }))];
        let res = save(&records, &output("ftp")).await;
        assert!(matches!(res, Err(CrawlerError::NoHandler(_))));

        // nothing to write, nothing to resolve
        assert!(save(&[], &output("ftp")).await.is_ok());
    }

    #[tokio::test]
    async fn test_post_one_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let config = OutputConfig {
            action: "post".to_string(),
            url: Some(format!("{}/records", server.uri())),
            ..Default::default()
        };
        let records = vec![record(json!({ "title": "Hello", "date": "2019-01-14" }))];
        save(&records, &config).await.expect("Save failed");

        let requests = server.received_requests().await.expect("Recording disabled");
        assert_eq!(requests.len(), 1);
        assert_eq!(
            String::from_utf8_lossy(&requests[0].body),
            "title=Hello&date=2019-01-14"
        );
    }

    #[tokio::test]
    async fn test_post_failure_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("title=bad"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = OutputConfig {
            action: "post".to_string(),
            url: Some(server.uri()),
            ..Default::default()
        };
        let records = vec![
            record(json!({ "title": "good" })),
            record(json!({ "title": "bad" })),
            record(json!({ "title": "fine" })),
        ];
        save(&records, &config).await.expect("Save failed");

        let requests = server.received_requests().await.expect("Recording disabled");
        let bodies = requests
            .iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect::<Vec<_>>();
        assert_eq!(bodies, vec!["title=good", "title=bad", "title=fine"]);
    }

    #[tokio::test]
    async fn test_csv_keeps_only_last_record() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let path = dir.path().join("out.csv");
        let config = OutputConfig {
            action: "csv".to_string(),
            path: Some(path.clone()),
            ..Default::default()
        };
        let records = vec![
            record(json!({ "title": "First", "date": "2019-01-07" })),
            record(json!({ "title": "Second", "date": "2019-01-14" })),
            record(json!({ "title": "Third", "date": "2019-01-21" })),
        ];
        save(&records, &config).await.expect("Save failed");

        let csv = fs::read_to_string(&path).expect("Missing csv");
        assert_eq!(csv, "title,date\nThird,2019-01-21\n");
    }

    #[tokio::test]
    async fn test_csv_aggregate_writes_every_record() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let path = dir.path().join("out.csv");
        let config = OutputConfig {
            action: "csv".to_string(),
            path: Some(path.clone()),
            aggregate: true,
            ..Default::default()
        };
        let records = vec![
            record(json!({ "title": "First", "date": 1 })),
            record(json!({ "title": null, "author": "Jane", "date": 2 })),
        ];
        save(&records, &config).await.expect("Save failed");

        let csv = fs::read_to_string(&path).expect("Missing csv");
        assert_eq!(csv, "title,date,author\nFirst,1,\n,2,Jane\n");
    }

    #[tokio::test]
    async fn test_csv_write_error_is_not_fatal() {
        let dir = tempfile::tempdir().expect("Unable to create temp dir");
        let config = OutputConfig {
            action: "csv".to_string(),
            path: Some(dir.path().join("missing").join("out.csv")),
            ..Default::default()
        };
        let records = vec![record(json!({ "title": "First" }))];
        assert!(save(&records, &config).await.is_ok());
    }

    #[test]
    fn test_group_rows() {
        let record = record(json!({
            "title": "T",
            "listing": [{ "title": "a" }, { "link": "x" }],
            "tags": ["rust", "csv"],
            "date": 1,
        }));
        let columns = columns(std::slice::from_ref(&record));
        let names = columns.iter().map(Column::name).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["title", "listing.title", "listing.link", "tags", "date"]
        );
        assert_eq!(
            rows(&record, &columns),
            vec![
                vec!["T", "a", "", "rust;csv", "1"],
                vec!["T", "", "x", "rust;csv", "1"],
            ]
        );
    }
}
