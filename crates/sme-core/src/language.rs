//! 言語判定
//!
//! タイ語を優先し、文字種とビジネス用語からユーザーの言語を推定します。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported reply languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Th,
    En,
    Ja,
    Ko,
    Zh,
}

const THAI_KEYWORDS: &[&str] = &[
    "ครับ", "ค่ะ", "กรุณา", "ธุรกิจ", "การตลาด", "เงิน", "ขาย", "ซื้อ", "ร้าน", "บริษัท", "ลูกค้า",
    "สินค้า", "บริการ", "แผน", "กำไร", "ต้นทุน", "ราคา",
];

const ENGLISH_KEYWORDS: &[&str] = &[
    "business", "marketing", "sale", "product", "customer", "profit", "revenue",
];

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Th,
        Language::En,
        Language::Ja,
        Language::Ko,
        Language::Zh,
    ];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::Th => "th",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Zh => "zh",
        }
    }

    /// Native display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Th => "ไทย",
            Language::En => "English",
            Language::Ja => "日本語",
            Language::Ko => "한국어",
            Language::Zh => "中文",
        }
    }

    /// Parse a language code (case-insensitive)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "th" => Some(Language::Th),
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            "ko" => Some(Language::Ko),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }

    /// Parse a code, falling back to Thai
    pub fn from_code_or_default(code: &str) -> Self {
        Self::from_code(code).unwrap_or_default()
    }

    /// Detect the language of a message
    ///
    /// Returns `None` when nothing recognisable is found, so callers can keep
    /// the user's current preference.
    pub fn detect(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }

        let chars = || text.chars().map(|c| c as u32);

        if chars().any(|c| (0x0E00..=0x0E7F).contains(&c))
            || THAI_KEYWORDS.iter().any(|k| text.contains(k))
        {
            return Some(Language::Th);
        }

        // Hiragana, katakana and the common CJK block read as Japanese first
        if chars().any(|c| {
            (0x3040..=0x309F).contains(&c) || (0x30A0..=0x30FF).contains(&c) || (0x4E00..=0x9FAF).contains(&c)
        }) {
            return Some(Language::Ja);
        }

        if chars().any(|c| (0xAC00..=0xD7AF).contains(&c)) {
            return Some(Language::Ko);
        }

        if chars().any(|c| (0x4E00..=0x9FFF).contains(&c)) {
            return Some(Language::Zh);
        }

        let lower = text.to_lowercase();
        if ENGLISH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return Some(Language::En);
        }

        None
    }

    /// Detect, falling back to `default`
    pub fn detect_or(text: &str, default: Language) -> Self {
        Self::detect(text).unwrap_or(default)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
