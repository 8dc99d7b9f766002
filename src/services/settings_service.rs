use std::sync::Arc;

use log::{info, warn};

use crate::errors::BlogError;
use crate::models::settings::{Settings, SettingsUpdate};
use crate::repositories::SettingsRepository;
use crate::services::upload_service::UploadService;

/// Header image submitted together with a settings update.
pub struct ImageUpload<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

pub struct SettingsService {
    settings: Arc<dyn SettingsRepository>,
    uploads: Arc<UploadService>,
}

impl SettingsService {
    pub fn new(settings: Arc<dyn SettingsRepository>, uploads: Arc<UploadService>) -> Self {
        Self { settings, uploads }
    }

    /// The singleton, created with defaults on first access.
    pub async fn get(&self) -> Result<Settings, BlogError> {
        Ok(self.settings.get_or_create_settings(&Settings::default()).await?)
    }

    /// Overwrites every scalar field. A supplied image is stored first and its
    /// URL becomes `head_image`; if the settings write then fails the image is
    /// removed again.
    pub async fn update(&self, update: SettingsUpdate, image: Option<ImageUpload<'_>>) -> Result<Settings, BlogError> {
        let mut settings = self.get().await?;
        settings.apply(update);

        let stored = match image {
            Some(image) => {
                let stored = self.uploads.store(image.file_name, Some(image.bytes))?;
                settings.head_image = Some(stored.url.clone());
                Some(stored)
            }
            None => None,
        };

        match self.settings.save_settings(&settings).await {
            Ok(saved) => {
                info!("settings updated");
                Ok(saved)
            }
            Err(e) => {
                if let Some(stored) = stored {
                    warn!("settings write failed, discarding image {}", stored.name);
                    self.uploads.discard(&stored.name);
                }
                Err(e.into())
            }
        }
    }
}
