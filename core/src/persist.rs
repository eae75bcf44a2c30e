//! Reading `config.json` / `requests.json` and writing `answers.json`.
//!
//! Everything here runs before or after the index and ranker; inputs are
//! validated so the core never sees a malformed corpus or request list.

use crate::search::RelevanceResult;
use crate::DocId;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SUPPORTED_VERSION: &str = "0.1";
pub const DEFAULT_MAX_RESPONSES: usize = 5;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("config file is missing: {}", .0.display())]
    MissingConfig(PathBuf),

    #[error("config file is empty")]
    EmptyConfig,

    #[error("config file missing required field `{0}`")]
    MissingField(&'static str),

    #[error("config file has incorrect version {actual}, expected {expected}")]
    IncompatibleVersion { expected: &'static str, actual: String },

    #[error("requests file is missing: {}", .0.display())]
    MissingRequests(PathBuf),

    #[error("requests file is empty or missing `requests`")]
    MalformedRequests,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PersistError>;

pub struct WorkspacePaths {
    pub root: PathBuf,
}

impl WorkspacePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn config(&self) -> PathBuf { self.root.join("config.json") }
    pub fn requests(&self) -> PathBuf { self.root.join("requests.json") }
    pub fn answers(&self) -> PathBuf { self.root.join("answers.json") }
    /// Resolve a document path listed in the config; absolute paths are kept.
    pub fn document(&self, file: &str) -> PathBuf { self.root.join(file) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub name: String,
    pub version: String,
    #[serde(default = "default_max_responses")]
    pub max_responses: usize,
}

fn default_max_responses() -> usize { DEFAULT_MAX_RESPONSES }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub config: EngineSettings,
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RequestsFile {
    requests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub docid: DocId,
    pub rank: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(with = "bool_as_str")]
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Vec<Relevance>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answers {
    pub answers: BTreeMap<String, Answer>,
}

impl Answers {
    /// Convert ranked results into answers, keeping at most `max_responses`
    /// entries per request.
    pub fn from_results(results: &[Vec<RelevanceResult>], max_responses: usize) -> Self {
        let answers = results
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let relevance: Vec<Relevance> = row
                    .iter()
                    .take(max_responses)
                    .map(|r| Relevance { docid: r.doc_id, rank: r.rank })
                    .collect();
                let answer = if relevance.is_empty() {
                    Answer { result: false, relevance: None }
                } else {
                    Answer { result: true, relevance: Some(relevance) }
                };
                (request_id(i), answer)
            })
            .collect();
        Self { answers }
    }
}

/// `request001` for the first request, `request010` for the tenth.
pub fn request_id(index: usize) -> String {
    format!("request{:03}", index + 1)
}

pub fn load_config(paths: &WorkspacePaths) -> Result<Config> {
    let path = paths.config();
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(PersistError::MissingConfig(path)),
        Err(e) => return Err(e.into()),
    };
    let json: Value = serde_json::from_str(&text)?;

    let section = json
        .get("config")
        .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
        .ok_or(PersistError::EmptyConfig)?;
    for field in ["name", "version"] {
        if section.get(field).is_none() {
            return Err(PersistError::MissingField(field));
        }
    }
    if !json.get("files").is_some_and(Value::is_array) {
        return Err(PersistError::MissingField("files"));
    }

    let config: Config = serde_json::from_value(json)?;
    if config.config.version != SUPPORTED_VERSION {
        return Err(PersistError::IncompatibleVersion {
            expected: SUPPORTED_VERSION,
            actual: config.config.version,
        });
    }
    Ok(config)
}

/// Read the documents listed in the config, in order.
///
/// Unreadable files are logged and skipped, so they do not take a doc id.
pub fn load_documents(paths: &WorkspacePaths, config: &Config) -> Vec<String> {
    let mut docs = Vec::with_capacity(config.files.len());
    for file in &config.files {
        let path = paths.document(file);
        match fs::read_to_string(&path) {
            Ok(text) => docs.push(text),
            Err(error) => tracing::warn!(path = %path.display(), %error, "skipping unreadable document"),
        }
    }
    tracing::info!(requested = config.files.len(), loaded = docs.len(), "loaded documents");
    docs
}

pub fn load_requests(paths: &WorkspacePaths) -> Result<Vec<String>> {
    let path = paths.requests();
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(PersistError::MissingRequests(path)),
        Err(e) => return Err(e.into()),
    };
    let json: Value = serde_json::from_str(&text)?;
    if !json.get("requests").is_some_and(Value::is_array) {
        return Err(PersistError::MalformedRequests);
    }
    let file: RequestsFile = serde_json::from_value(json).map_err(|_| PersistError::MalformedRequests)?;
    Ok(file.requests)
}

pub fn save_answers(paths: &WorkspacePaths, answers: &Answers) -> Result<()> {
    let f = File::create(paths.answers())?;
    let mut writer = BufWriter::new(f);
    let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    answers.serialize(&mut ser)?;
    writer.flush()?;
    Ok(())
}

pub fn load_answers(paths: &WorkspacePaths) -> Result<Answers> {
    let text = fs::read_to_string(paths.answers())?;
    Ok(serde_json::from_str(&text)?)
}

/// `answers.json` spells booleans as the strings `"true"` / `"false"`.
mod bool_as_str {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match String::deserialize(d)?.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(de::Error::invalid_value(de::Unexpected::Str(other), &"\"true\" or \"false\"")),
        }
    }
}
