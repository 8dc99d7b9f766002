use serde::{Deserialize, Serialize};

/// The settings table holds exactly one row with this key.
pub const SETTINGS_ID: i16 = 1;

/// Site-wide display configuration (singleton row).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub blog_title: Option<String>,
    pub blog_description: Option<String>,
    pub head_image: Option<String>,
    pub show_head_image: bool,
    pub footer_html: Option<String>,
    pub copyright_text: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            blog_title: Some("My Blog".to_string()),
            blog_description: Some("Welcome to my blog!".to_string()),
            head_image: None,
            show_head_image: true,
            footer_html: None,
            copyright_text: Some("© 2024 My Blog. All rights reserved.".to_string()),
        }
    }
}

/// Scalar fields submitted by the settings form. Every field overwrites the
/// stored value; the header image is handled separately.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub blog_title: Option<String>,
    pub blog_description: Option<String>,
    pub show_head_image: bool,
    pub footer_html: Option<String>,
    pub copyright_text: Option<String>,
}

impl Settings {
    pub fn apply(&mut self, update: SettingsUpdate) {
        self.blog_title = update.blog_title;
        self.blog_description = update.blog_description;
        self.show_head_image = update.show_head_image;
        self.footer_html = update.footer_html;
        self.copyright_text = update.copyright_text;
    }
}
