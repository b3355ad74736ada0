use crate::api::KeepsakeApi;
use crate::config::{BackendConfig, Settings};
use crate::error::Result;
use crate::notify::realtime::RealtimeNotifier;
use crate::notify::{self, ChangeNotifier};
use crate::remote::rest::RestRepository;
use crate::remote::{self, RecordRepository};
use crate::store::fs::FileKv;
use std::path::{Path, PathBuf};

const LOCAL_DIR: &str = "local";

pub type AppApi = KeepsakeApi<FileKv, Box<dyn RecordRepository>, Box<dyn ChangeNotifier>>;

pub struct KeepsakeContext {
    pub api: AppApi,
    pub settings: Settings,
    pub data_dir: PathBuf,
    /// `None` when the backend is not configured.
    pub backend: Option<BackendConfig>,
}

impl KeepsakeContext {
    /// Backend values that are not set, empty when the backend is configured.
    pub fn missing_backend_vars(&self) -> Vec<String> {
        self.settings.missing_backend_vars()
    }
}

/// Build the application from `<data_dir>/config.json` plus backend values from `env`.
///
/// Missing backend values are not an error: the repository and notifier are disabled and
/// only local data is available. A backend value that is present but unusable is.
pub fn initialize<F>(data_dir: &Path, env: F) -> Result<KeepsakeContext>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = match Settings::load(data_dir) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable settings file");
            Settings::default()
        }
    }
    .with_env(env);

    let mut kv = FileKv::new(data_dir.join(LOCAL_DIR));
    if let Some(quota) = settings.cache_quota_bytes {
        kv = kv.with_capacity(quota);
    }

    let missing = settings.missing_backend_vars();
    let (repo, notifier, backend): (Box<dyn RecordRepository>, Box<dyn ChangeNotifier>, _) =
        if missing.is_empty() {
            let backend = settings.backend()?;
            tracing::debug!(url = %backend.url, bucket = %backend.bucket, "backend configured");
            (
                Box::new(RestRepository::new(
                    backend.url.clone(),
                    backend.key.clone(),
                    backend.bucket.clone(),
                )?),
                Box::new(RealtimeNotifier::new(&backend.url, backend.key.clone())?),
                Some(backend),
            )
        } else {
            tracing::info!(missing = %missing.join(", "), "backend not configured, local only");
            (
                Box::new(remote::Disabled::new(missing)),
                Box::new(notify::Disabled),
                None,
            )
        };

    let api = KeepsakeApi::new(kv, repo, notifier).with_max_image_bytes(settings.max_image_bytes);
    Ok(KeepsakeContext {
        api,
        settings,
        data_dir: data_dir.to_path_buf(),
        backend,
    })
}
