//! On-disk configuration schema, mirrored field-for-field from
//! `original_source/server/config.go`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub apps: Vec<App>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub logfmts: Vec<Logfmt>,
    #[serde(default)]
    pub syslog: Option<Log>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub domains: Vec<Domain>,
    pub port: u16,
    #[serde(default)]
    pub certfile: Option<String>,
    #[serde(default)]
    pub keyfile: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub access_log: Option<Log>,
    #[serde(default)]
    pub error_log: Option<Log>,
    #[serde(default)]
    pub logfmts: Vec<Logfmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub to: String,
    #[serde(default)]
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub request_uris: Vec<String>,
    #[serde(default)]
    pub headers: Vec<HeaderFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderFilter {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub headers: Vec<HeaderTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum When {
    Request,
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMethod {
    Add,
    Set,
    Del,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderTransform {
    pub when: When,
    pub method: HeaderMethod,
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub host: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub checks: Vec<Check>,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Check {
    #[serde(default)]
    pub schema: Option<String>,
    pub path: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub window: Option<usize>,
    #[serde(default)]
    pub down: Option<usize>,
    #[serde(default)]
    pub up: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logfmt {
    pub name: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateTime {
    Hour,
    Day,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fmt: Option<String>,
    #[serde(default)]
    pub rotate_time: Option<RotateTime>,
    #[serde(default)]
    pub rotate_size: Option<u64>,
    #[serde(default)]
    pub rotate_number: Option<usize>,
}
