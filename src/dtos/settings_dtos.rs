use serde::{Deserialize, Serialize};

use crate::models::settings::{Settings, SettingsUpdate};
use crate::models::user::UserPublic;

/// Body of `POST /settings`. The header image, if any, arrives base64
/// encoded (optionally as a data URL) with its original file name.
#[derive(Debug, Deserialize, Default)]
pub struct SettingsForm {
    pub blog_title: Option<String>,
    pub blog_description: Option<String>,
    /// Checkbox: present means checked, whatever the value.
    pub show_head_image: Option<String>,
    pub footer_html: Option<String>,
    pub copyright_text: Option<String>,
    pub head_image_name: Option<String>,
    pub head_image_data: Option<String>,
}

impl SettingsForm {
    pub fn to_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            blog_title: self.blog_title.clone(),
            blog_description: self.blog_description.clone(),
            show_head_image: self.show_head_image.is_some(),
            footer_html: self.footer_html.clone(),
            copyright_text: self.copyright_text.clone(),
        }
    }

    /// An image counts as submitted only when both name and data are present.
    pub fn has_image(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.head_image_name) && filled(&self.head_image_data)
    }
}

#[derive(Serialize)]
pub struct SettingsPage {
    pub settings: Settings,
    pub current_user: UserPublic,
    pub notice: Option<String>,
}
