use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "LabSight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_MAX_RETAINED_JOBS: usize = 1024;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_RECENT_REPORTS: usize = 5;
/// Upper bound on the default worker count; OCR is CPU-heavy.
const MAX_DEFAULT_WORKERS: usize = 4;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "labsight=info,tower_http=info"
}

/// Get the application data directory
/// ~/LabSight/ on all platforms, or the working directory when no home is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime settings for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub database_path: PathBuf,
    pub max_concurrent_jobs: usize,
    pub max_retained_jobs: usize,
    pub max_upload_bytes: u64,
    pub ocr_language: String,
    /// Explicit tessdata location; system paths are probed when unset.
    pub tessdata_dir: Option<PathBuf>,
    pub recent_reports_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::rooted_at(app_data_dir())
    }
}

impl ServiceConfig {
    /// Defaults with every path under `data_dir`.
    pub fn rooted_at(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            uploads_dir: data_dir.join("uploads"),
            database_path: data_dir.join("reports.db"),
            data_dir,
            max_concurrent_jobs: default_workers(),
            max_retained_jobs: DEFAULT_MAX_RETAINED_JOBS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tessdata_dir: None,
            recent_reports_limit: DEFAULT_RECENT_REPORTS,
        }
    }

    /// Read `LABSIGHT_*` variables (and `TESSDATA_PREFIX`) over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("LABSIGHT_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let mut config = Self::rooted_at(data_dir);

        if let Some(dir) = lookup("LABSIGHT_UPLOADS_DIR").filter(|v| !v.trim().is_empty()) {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Some(addr) = parse_var(&lookup, "LABSIGHT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(n) = parse_var::<usize>(&lookup, "LABSIGHT_MAX_CONCURRENT_JOBS") {
            config.max_concurrent_jobs = n.max(1);
        }
        if let Some(n) = parse_var(&lookup, "LABSIGHT_MAX_RETAINED_JOBS") {
            config.max_retained_jobs = n;
        }
        if let Some(n) = parse_var(&lookup, "LABSIGHT_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = n;
        }
        if let Some(lang) = lookup("LABSIGHT_OCR_LANG").filter(|v| !v.trim().is_empty()) {
            config.ocr_language = lang.trim().to_string();
        }
        config.tessdata_dir = lookup("TESSDATA_PREFIX")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        config
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DEFAULT_WORKERS)
}

/// Parse one variable. A value that does not parse is ignored with a warning.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid setting, keeping default");
            None
        }
    }
}
