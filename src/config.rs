use crate::auth::{password_digest, AdminCredential};
use crate::error::{PortalError, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Process-wide configuration, read once at startup and read-only afterwards.
///
/// Env:
/// - STORAGE_URL (e.g. https://xyzcompany.supabase.co) OR STORAGE_PROJECT_REF
/// - STORAGE_SERVICE_KEY (service role key)
/// - STORAGE_BUCKET (bucket name)
/// - ADMIN_{1..3}_USERNAME / ADMIN_{1..3}_PASSWORD (one pair per year)
/// - MAX_UPLOAD_MB (default 100)
/// - PORT (default 5003)
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_key: String,
    pub admins: HashMap<u16, AdminCredential>,
    pub max_upload_bytes: usize,
    pub registry_path: PathBuf,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Allow either a full URL or a project ref
        let storage_url = match env::var("STORAGE_URL") {
            Ok(u) => u,
            Err(_) => {
                let project_ref = env::var("STORAGE_PROJECT_REF").map_err(|_| {
                    PortalError::Config("STORAGE_URL or STORAGE_PROJECT_REF must be set".into())
                })?;
                format!("https://{}.supabase.co", project_ref)
            }
        };

        let storage_key = env::var("STORAGE_SERVICE_KEY")
            .map_err(|_| PortalError::Config("STORAGE_SERVICE_KEY must be set".into()))?;
        let storage_bucket = env::var("STORAGE_BUCKET")
            .map_err(|_| PortalError::Config("STORAGE_BUCKET must be set".into()))?;

        let mut admins = HashMap::new();
        for year in 1u16..=3 {
            let username = env::var(format!("ADMIN_{year}_USERNAME"));
            let password = env::var(format!("ADMIN_{year}_PASSWORD"));
            if let (Ok(username), Ok(password)) = (username, password) {
                admins.insert(
                    year,
                    AdminCredential {
                        username,
                        password_digest: password_digest(&password),
                    },
                );
            }
        }
        if admins.is_empty() {
            return Err(PortalError::Config(
                "no ADMIN_{N}_USERNAME/ADMIN_{N}_PASSWORD pairs configured".into(),
            ));
        }

        let max_upload_mb: usize = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5003);

        Ok(Self {
            storage_url,
            storage_bucket,
            storage_key,
            admins,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            registry_path: env::temp_dir().join("notes_dock_users.db"),
            port,
        })
    }
}
