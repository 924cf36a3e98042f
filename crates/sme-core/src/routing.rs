//! Fast-path routing for text messages
//!
//! Short, simple messages skip conversation history and use a smaller token
//! budget; anything that looks like real business analysis gets the full
//! pipeline.

use std::sync::LazyLock;

use regex::Regex;

/// Routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    FastPath,
    FullPipeline,
}

impl Route {
    /// Completion budget for this route
    pub fn max_tokens(&self) -> u32 {
        match self {
            Route::FastPath => 500,
            Route::FullPipeline => 1000,
        }
    }

    pub fn uses_history(&self) -> bool {
        matches!(self, Route::FullPipeline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::FastPath => "fast_path",
            Route::FullPipeline => "full_pipeline",
        }
    }
}

static COMMAND_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^/\w+").ok());

const COMPLEX_INDICATORS: &[&str] = &[
    "วิเคราะห์", "ประเมิน", "แผนธุรกิจ", "กลยุทธ์", "การตลาด", "การเงิน", "บัญชี", "ภาษี", "กฎหมาย",
    "สัญญา", "ใบเสนอราคา", "รายงาน", "สรุป", "เปรียบเทียบ", "คำนวณ", "วางแผน",
    "analyze", "analysis", "evaluate", "assessment", "business plan", "strategy", "marketing",
    "financial", "accounting", "tax", "legal", "contract", "proposal", "report", "summary",
    "compare", "calculate", "planning", "consultation", "recommendation",
];

const GREETING_KEYWORDS: &[&str] = &[
    "สวัสดี", "ขอบคุณ", "หวัดดี", "โอเค", "hello", "hi", "hey", "thanks", "thank you", "ok",
    "good morning", "good night",
];

const MEDIUM_BLOCKERS: &[&str] = &[
    "detailed", "comprehensive", "analysis", "strategy", "วิเคราะห์", "ยุทธศาสตร์",
];

/// Threshold-based message classifier
#[derive(Debug, Clone)]
pub struct ComplexityRouter {
    pub max_chars: usize,
    pub max_words: usize,
    pub max_lines: usize,
}

impl Default for ComplexityRouter {
    fn default() -> Self {
        Self {
            max_chars: 200,
            max_words: 25,
            max_lines: 3,
        }
    }
}

impl ComplexityRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a text message
    pub fn classify(&self, message: &str) -> Route {
        let trimmed = message.trim();
        let lower = trimmed.to_lowercase();
        let chars = message.chars().count();
        let words = message.split_whitespace().count();
        let lines = trimmed.lines().count().max(1);

        if chars > self.max_chars || words > self.max_words || lines > self.max_lines {
            return Route::FullPipeline;
        }

        if COMMAND_PATTERN.as_ref().is_some_and(|re| re.is_match(&lower)) {
            return Route::FastPath;
        }

        if COMPLEX_INDICATORS.iter().any(|k| lower.contains(k)) {
            return Route::FullPipeline;
        }

        if contains_greeting(&lower) {
            return Route::FastPath;
        }

        if words <= 8 && lines == 1 && chars <= 80 {
            return Route::FastPath;
        }

        if words <= 15 && lines <= 2 && chars <= 120 && !MEDIUM_BLOCKERS.iter().any(|k| lower.contains(k)) {
            return Route::FastPath;
        }

        Route::FullPipeline
    }
}

/// ASCII greetings must match whole words ("hi" is not in "this")
fn contains_greeting(lower: &str) -> bool {
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let padded = format!(" {} ", words.join(" "));

    GREETING_KEYWORDS.iter().any(|k| {
        if k.is_ascii() {
            padded.contains(&format!(" {} ", k))
        } else {
            lower.contains(k)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_messages_fast() {
        let router = ComplexityRouter::new();
        assert_eq!(router.classify("สวัสดีครับ"), Route::FastPath);
        assert_eq!(router.classify("hello"), Route::FastPath);
        assert_eq!(router.classify("what time do you open?"), Route::FastPath);
    }

    #[test]
    fn test_commands_fast() {
        let router = ComplexityRouter::new();
        assert_eq!(router.classify("/foo"), Route::FastPath);
    }

    #[test]
    fn test_complex_indicators_full() {
        let router = ComplexityRouter::new();
        assert_eq!(router.classify("ช่วยวิเคราะห์ยอดขาย"), Route::FullPipeline);
        assert_eq!(router.classify("Need a marketing plan"), Route::FullPipeline);
        assert_eq!(router.classify("hi, can you write a business plan"), Route::FullPipeline);
    }

    #[test]
    fn test_length_limits_full() {
        let router = ComplexityRouter::new();
        assert_eq!(router.classify(&"a".repeat(201)), Route::FullPipeline);
        assert_eq!(router.classify(&"word ".repeat(26)), Route::FullPipeline);
        assert_eq!(router.classify("one\ntwo\nthree\nfour"), Route::FullPipeline);
    }

    #[test]
    fn test_medium_messages() {
        let router = ComplexityRouter::new();
        let medium = "could you tell me which delivery apps are popular with cafes in Chiang Mai";
        assert_eq!(router.classify(medium), Route::FastPath);

        let detailed = "could you give me a detailed look at which delivery apps cafes in Chiang Mai use";
        assert_eq!(router.classify(detailed), Route::FullPipeline);
    }

    #[test]
    fn test_greeting_whole_word() {
        assert!(contains_greeting("hi there"));
        assert!(contains_greeting("thank you so much"));
        assert!(!contains_greeting("this shipment"));
    }

    #[test]
    fn test_route_budget() {
        assert_eq!(Route::FastPath.max_tokens(), 500);
        assert_eq!(Route::FullPipeline.max_tokens(), 1000);
        assert!(!Route::FastPath.uses_history());
    }
}
