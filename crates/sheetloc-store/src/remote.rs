//! Google Sheets v4 backend over a blocking HTTP client.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};
use sheetloc_config::SheetNames;
use sheetloc_core::{Field, Table};

use crate::auth::ServiceAccountAuth;
use crate::reconcile::{column_letter, CellUpdate};
use crate::retry::RetryPolicy;
use crate::snapshot::Snapshot;
use crate::{sheet_title, StoreError, StoreResult, TabularStore};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const VOCAB_PREFIX: &str = "VOCAB:";
// cell text is stored as typed; no formula or number parsing
const VALUE_INPUT: &str = "RAW";

static RANGE_ROWS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\D*(\d+)(?::\D*(\d+))?").unwrap());

pub struct SheetsStore {
    client: Client,
    spreadsheet_id: String,
    names: SheetNames,
    auth: ServiceAccountAuth,
    retry: RetryPolicy,
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl SheetsStore {
    pub fn new(spreadsheet_id: &str, credentials: &Path, names: SheetNames) -> StoreResult<Self> {
        let auth = ServiceAccountAuth::from_file(credentials)?;
        tracing::debug!(event = "store_remote_auth", account = auth.client_email());
        Ok(Self {
            client: Client::builder().build()?,
            spreadsheet_id: spreadsheet_id.to_string(),
            names,
            auth,
            retry: RetryPolicy::default(),
            sheet_ids: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, suffix: &str) -> String {
        format!("{API_BASE}/{}{suffix}", self.spreadsheet_id)
    }

    /// Send with auth and retry; non-2xx becomes [`StoreError::Http`].
    fn call(&self, what: &str, build: impl Fn(&Client) -> RequestBuilder) -> StoreResult<Value> {
        self.retry.run(what, || {
            let token = self.auth.token(&self.client)?;
            exchange(build(&self.client).bearer_auth(token))
        })
    }

    fn sheet_id(&self, sheet: &str) -> StoreResult<i64> {
        if let Some(id) = self.ids()?.get(sheet) {
            return Ok(*id);
        }
        let url = self.url("?fields=sheets.properties");
        let meta = self.call("sheet_ids", |c| c.get(&url))?;
        let mut ids = self.ids()?;
        for s in meta["sheets"].as_array().map(Vec::as_slice).unwrap_or(&[]) {
            let props = &s["properties"];
            if let (Some(title), Some(id)) = (props["title"].as_str(), props["sheetId"].as_i64()) {
                ids.insert(title.to_string(), id);
            }
        }
        ids.get(sheet)
            .copied()
            .ok_or_else(|| StoreError::MissingSheet(sheet.to_string()))
    }

    fn ids(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, i64>>> {
        self.sheet_ids
            .lock()
            .map_err(|_| StoreError::Response("sheet id cache poisoned".into()))
    }

    fn batch_update(&self, what: &str, requests: Vec<Value>) -> StoreResult<()> {
        let url = self.url(":batchUpdate");
        let body = json!({ "requests": requests });
        self.call(what, |c| c.post(&url).json(&body))?;
        Ok(())
    }
}

/// `'Sheet'!A2:D`, URL-encoded for a path segment.
pub fn encoded_range(sheet: &str, cells: &str) -> String {
    urlencoding::encode(&a1_range(sheet, cells)).into_owned()
}

pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{cells}", sheet.replace('\'', "''"))
}

/// First and last row of an A1 range like `'Dialogues'!A120:D131`.
pub fn range_rows(range: &str) -> Option<(u32, u32)> {
    let caps = RANGE_ROWS_RE.captures(range)?;
    let start: u32 = caps.get(1)?.as_str().parse().ok()?;
    let end = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(start);
    Some((start, end))
}

/// Path suffix of an append into columns `A..` of `sheet`.
pub fn append_path(sheet: &str, width: usize) -> String {
    let last = column_letter(width.saturating_sub(1));
    format!(
        "/values/{}:append?valueInputOption={VALUE_INPUT}&insertDataOption=INSERT_ROWS",
        encoded_range(sheet, &format!("A:{last}"))
    )
}

pub fn append_body(rows: &[Vec<String>]) -> Value {
    json!({ "values": rows })
}

/// `values:batchUpdate` body with one range per cell.
pub fn values_update_body(sheet: &str, updates: &[CellUpdate]) -> Value {
    let data: Vec<Value> = updates
        .iter()
        .map(|u| json!({ "range": a1_range(sheet, &u.a1()), "values": [[u.value]] }))
        .collect();
    json!({ "valueInputOption": VALUE_INPUT, "data": data })
}

/// Plain white, unbolded formatting over rows `start..=end` (1-based).
pub fn reset_format_request(sheet_id: i64, start: u32, end: u32, width: usize) -> Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": start.saturating_sub(1),
                "endRowIndex": end,
                "startColumnIndex": 0,
                "endColumnIndex": width,
            },
            "cell": {
                "userEnteredFormat": {
                    "backgroundColor": { "red": 1, "green": 1, "blue": 1 },
                    "textFormat": { "fontSize": 10, "bold": false },
                }
            },
            "fields": "userEnteredFormat(backgroundColor,textFormat)",
        }
    })
}

/// One background-colour request per row, on a single column.
pub fn mark_requests(sheet_id: i64, rows: &BTreeSet<u32>, column: usize, rgb: &Value) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            json!({
                "updateCells": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": row - 1,
                        "endRowIndex": row,
                        "startColumnIndex": column,
                        "endColumnIndex": column + 1,
                    },
                    "rows": [{ "values": [{ "userEnteredFormat": { "backgroundColor": rgb } }] }],
                    "fields": "userEnteredFormat.backgroundColor",
                }
            })
        })
        .collect()
}

fn exchange(request: RequestBuilder) -> StoreResult<Value> {
    let resp = request.send()?;
    let status = resp.status().as_u16();
    let body = resp.text()?;
    read_response(status, &body)
}

fn read_response(status: u16, body: &str) -> StoreResult<Value> {
    if !(200..300).contains(&status) {
        return Err(StoreError::Http {
            status,
            message: error_message(body),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}

/// `#rrggbb` to Sheets' 0..1 colour components.
pub fn hex_to_rgb(hex: &str) -> StoreResult<Value> {
    let bad = || StoreError::Colour(hex.to_string());
    let digits = hex.strip_prefix('#').ok_or_else(bad)?;
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .map(|v| f64::from(v) / 255.0)
            .map_err(|_| bad())
    };
    Ok(json!({ "red": channel(0)?, "green": channel(2)?, "blue": channel(4)? }))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl TabularStore for SheetsStore {
    fn backend(&self) -> &'static str {
        "remote"
    }

    fn sheet_name(&self, table: &Table) -> String {
        sheet_title(&self.names, table, VOCAB_PREFIX)
    }

    fn get(&self, table: &Table) -> StoreResult<Snapshot> {
        let sheet = self.sheet_name(table);
        let last = column_letter(table.shape().width() - 1);
        let url = self.url(&format!("/values/{}", encoded_range(&sheet, &format!("A2:{last}"))));
        let body = self.call("get", |c| c.get(&url))?;
        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|r| {
                        r.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect::<Vec<Vec<String>>>()
            })
            .unwrap_or_default();
        let snapshot = Snapshot::from_values(table.shape(), rows);
        tracing::debug!(event = "store_get", backend = "remote", sheet = %sheet, rows = snapshot.len());
        Ok(snapshot)
    }

    fn append(&self, table: &Table, rows: &[Vec<String>]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sheet = self.sheet_name(table);
        let width = table.shape().width();
        let url = self.url(&append_path(&sheet, width));
        let body = append_body(rows);
        let resp = self.call("append", |c| c.post(&url).json(&body))?;
        tracing::info!(event = "store_append", backend = "remote", sheet = %sheet, rows = rows.len());

        // appended rows inherit the formatting of the row above; reset it
        let updated = resp["updates"]["updatedRange"].as_str().unwrap_or_default();
        let Some((start, end)) = range_rows(updated) else {
            return Err(StoreError::Response(format!("append returned range `{updated}`")));
        };
        let sheet_id = self.sheet_id(&sheet)?;
        self.batch_update("append_format", vec![reset_format_request(sheet_id, start, end, width)])
    }

    fn update(&self, table: &Table, updates: &[CellUpdate]) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let sheet = self.sheet_name(table);
        let url = self.url("/values:batchUpdate");
        let body = values_update_body(&sheet, updates);
        self.call("update", |c| c.post(&url).json(&body))?;
        tracing::info!(event = "store_update", backend = "remote", sheet = %sheet, cells = updates.len());
        Ok(())
    }

    fn mark(&self, table: &Table, keys: &[String], colour: &str, field: Field) -> StoreResult<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let shape = table.shape();
        let column = shape
            .column(field)
            .ok_or_else(|| StoreError::Response(format!("{table} has no {} column", field.as_str())))?;
        let rgb = hex_to_rgb(colour)?;
        let sheet = self.sheet_name(table);
        let sheet_id = self.sheet_id(&sheet)?;
        let snapshot = self.get(table)?;

        let rows: BTreeSet<u32> = keys
            .iter()
            .filter_map(|k| snapshot.find(k).map(|(_, r)| r.row))
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let requests = mark_requests(sheet_id, &rows, column, &rgb);
        self.batch_update("mark", requests)?;
        tracing::info!(event = "store_mark", backend = "remote", sheet = %sheet, rows = rows.len(), colour = colour);
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::JoinHandle;
    use std::time::Duration;

    const QUOTA: &str = r#"{"error":{"code":429,"message":"Quota exceeded for quota metric 'Write requests'","status":"RESOURCE_EXHAUSTED"}}"#;

    fn no_sleep(_: Duration) {}

    fn read_request(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request = String::new();
        let mut length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap();
                }
            }
            let done = line == "\r\n" || line.is_empty();
            request.push_str(&line);
            if done {
                break;
            }
        }
        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();
        request + &String::from_utf8(body).unwrap()
    }

    /// Answers one connection per canned response and hands back the raw requests.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request(&stream));
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });
        (base, handle)
    }

    fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn updates() -> Vec<CellUpdate> {
        vec![
            CellUpdate { row: 2, column: 2, value: "007".into() },
            CellUpdate { row: 2, column: 3, value: "=x".into() },
            CellUpdate { row: 9, column: 2, value: "'quoted".into() },
        ]
    }

    #[test]
    fn values_are_written_raw_one_range_per_cell() {
        let body = values_update_body("Dialogues", &updates());
        assert_eq!(body["valueInputOption"], "RAW");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["range"], "'Dialogues'!C2");
        assert_eq!(data[0]["values"], json!([["007"]]));
        assert_eq!(data[1]["range"], "'Dialogues'!D2");
        assert_eq!(data[1]["values"], json!([["=x"]]));
        assert_eq!(data[2]["range"], "'Dialogues'!C9");
        assert_eq!(data[2]["values"], json!([["'quoted"]]));
    }

    #[test]
    fn appends_insert_rows_raw() {
        assert_eq!(
            append_path("Dialogues", 4),
            "/values/%27Dialogues%27%21A%3AD:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS"
        );
        let rows = vec![vec!["Dialogue/Intro/0009".to_string(), "Grace".into(), "0.50".into()]];
        assert_eq!(append_body(&rows), json!({ "values": [["Dialogue/Intro/0009", "Grace", "0.50"]] }));

        let reset = reset_format_request(7, 120, 131, 4);
        let range = &reset["repeatCell"]["range"];
        assert_eq!(range["sheetId"], 7);
        assert_eq!(range["startRowIndex"], 119);
        assert_eq!(range["endRowIndex"], 131);
        assert_eq!(range["endColumnIndex"], 4);
        assert_eq!(reset["repeatCell"]["cell"]["userEnteredFormat"]["textFormat"]["bold"], false);
    }

    #[test]
    fn marks_one_request_per_row() {
        let rows: BTreeSet<u32> = [5, 2].into_iter().collect();
        let rgb = hex_to_rgb("#ffaaaa").unwrap();
        let requests = mark_requests(3, &rows, 3, &rgb);
        assert_eq!(requests.len(), 2);
        let first = &requests[0]["updateCells"];
        assert_eq!(first["range"]["startRowIndex"], 1);
        assert_eq!(first["range"]["endRowIndex"], 2);
        assert_eq!(first["range"]["startColumnIndex"], 3);
        assert_eq!(first["range"]["endColumnIndex"], 4);
        assert_eq!(first["rows"][0]["values"][0]["userEnteredFormat"]["backgroundColor"], rgb);
        assert_eq!(requests[1]["updateCells"]["range"]["startRowIndex"], 4);
    }

    #[test]
    fn responses_are_classified() {
        assert_eq!(read_response(200, r#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert_eq!(read_response(204, "").unwrap(), Value::Null);
        assert!(read_response(429, QUOTA).unwrap_err().is_quota());
        let denied = read_response(403, r#"{"error":{"message":"The caller does not have permission"}}"#);
        assert!(!denied.unwrap_err().is_quota());
    }

    #[test]
    fn quota_responses_are_retried_over_http() {
        let (base, server) = serve(vec![
            (429, QUOTA),
            (429, QUOTA),
            (200, r#"{"updates":{"updatedRange":"'Dialogues'!A120:D121"}}"#),
        ]);
        let client = client();
        let url = format!("{base}{}", append_path("Dialogues", 4));
        let rows = vec![vec!["k".to_string(), "Grace".into(), "007".into(), String::new()]];
        let body = append_body(&rows);
        let policy = RetryPolicy::new(10, Duration::ZERO).with_sleeper(no_sleep);

        let resp = policy.run("append", || exchange(client.post(&url).json(&body))).unwrap();
        assert_eq!(range_rows(resp["updates"]["updatedRange"].as_str().unwrap()), Some((120, 121)));

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 3);
        for request in &seen {
            assert!(request.starts_with("POST /values/"), "{request}");
            assert!(request.contains("valueInputOption=RAW&insertDataOption=INSERT_ROWS"));
            assert!(request.ends_with(r#"{"values":[["k","Grace","007",""]]}"#), "{request}");
        }
    }

    #[test]
    fn non_quota_http_errors_are_not_retried() {
        let (base, server) = serve(vec![(
            400,
            r#"{"error":{"code":400,"message":"Unable to parse range","status":"INVALID_ARGUMENT"}}"#,
        )]);
        let client = client();
        let url = format!("{base}/values:batchUpdate");
        let body = values_update_body("Dialogues", &updates());
        let policy = RetryPolicy::new(10, Duration::ZERO).with_sleeper(no_sleep);

        let err = policy
            .run("update", || exchange(client.post(&url).json(&body)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Http { status: 400, ref message } if message == "Unable to parse range"));

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains(r#""valueInputOption":"RAW""#));
    }

    #[test]
    fn ranges_are_quoted_and_encoded() {
        assert_eq!(a1_range("Dialogues", "A2:D"), "'Dialogues'!A2:D");
        assert_eq!(a1_range("Bob's", "C5"), "'Bob''s'!C5");
        assert_eq!(encoded_range("VOCAB:Chars", "A2:B"), "%27VOCAB%3AChars%27%21A2%3AB");
    }

    #[test]
    fn appended_range_rows() {
        assert_eq!(range_rows("'Dialogues'!A120:D131"), Some((120, 131)));
        assert_eq!(range_rows("Actors!A7:C7"), Some((7, 7)));
        assert_eq!(range_rows("Actors!A7"), Some((7, 7)));
        assert_eq!(range_rows("garbage"), None);
    }

    #[test]
    fn colours() {
        let c = hex_to_rgb("#ffaaaa").unwrap();
        assert_eq!(c["red"].as_f64(), Some(1.0));
        assert!((c["green"].as_f64().unwrap() - 170.0 / 255.0).abs() < 1e-9);
        assert!(hex_to_rgb("ffaaaa").is_err());
        assert!(hex_to_rgb("#ffaa").is_err());
        assert!(hex_to_rgb("#gg0000").is_err());
    }

    #[test]
    fn api_error_message_is_extracted() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for quota metric","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(error_message(body), "Quota exceeded for quota metric");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
