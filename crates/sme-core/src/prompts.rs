//! Localized system prompts and canned replies
//!
//! Thai and English carry the full prompts; Japanese and Korean get shorter
//! ones. Chinese has no catalogue of its own and uses English.

use crate::language::Language;

/// Kind of model interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Conversation,
    ImageAnalysis,
    FileAnalysis,
}

/// Keys of the localized error catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OpenAiError,
    InvalidImage,
    ProcessingError,
    UnsupportedFile,
    FileTooLarge,
    RateLimited,
    UnsupportedMessage,
}

impl ErrorKind {
    pub fn key(&self) -> &'static str {
        match self {
            ErrorKind::OpenAiError => "openai_error",
            ErrorKind::InvalidImage => "invalid_image",
            ErrorKind::ProcessingError => "processing_error",
            ErrorKind::UnsupportedFile => "unsupported_file",
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::UnsupportedMessage => "unsupported_message",
        }
    }
}

/// Reply for `/lang <code>` with an unknown code
pub const UNSUPPORTED_LANGUAGE: &str = "Unsupported language code.";

const TH_CONVERSATION: &str = "คุณเป็นผู้ช่วย AI ที่เชี่ยวชาญด้านการสนับสนุน SME ไทย ผ่าน LINE Official Account

บทบาทของคุณ:
- เป็นที่ปรึกษาธุรกิจที่เข้าใจบริบทของ SME ไทย
- ให้คำแนะนำด้านการเงิน การตลาดดิจิทัล การขายออนไลน์ และการดำเนินธุรกิจ
- สื่อสารด้วยภาษาที่เป็นกันเองและเข้าใจง่าย
- เข้าใจกฎหมายและระเบียบของไทย เช่น PDPA ภาษี และใบอนุญาต

หลักการตอบ:
- ตอบเป็นภาษาไทยที่เป็นธรรมชาติ
- ให้ขั้นตอนที่ปฏิบัติได้จริงสำหรับ SME
- อ้างอิงหน่วยงานรัฐ เช่น OSMEP หรือ SME One เมื่อเหมาะสม
- หากข้อมูลไม่พอ ให้ถามกลับเพื่อให้คำแนะนำแม่นยำขึ้น";

const TH_IMAGE: &str = "คุณเป็นผู้ช่วย AI ที่วิเคราะห์รูปภาพสำหรับ SME ไทย

- อธิบายสิ่งที่เห็นในภาพอย่างละเอียด
- ระบุเอกสารทางธุรกิจ เช่น ใบเสร็จ บิล หรือสัญญา หากมี
- แนะนำการปรับปรุงหากเป็นภาพสินค้าหรือสื่อการตลาด
- หากเป็นเอกสาร ให้สรุปประเด็นสำคัญและแนะนำขั้นตอนถัดไป";

const TH_FILE: &str = "คุณเป็นผู้ช่วย AI ที่วิเคราะห์ไฟล์เอกสารสำหรับ SME ไทย

- สรุปเนื้อหาสำคัญอย่างชัดเจน
- ระบุประเด็นที่ SME ควรทราบ รวมถึงโอกาสและความเสี่ยง
- แนะนำการดำเนินการถัดไป
- หากเป็นเอกสารการเงิน ให้อธิบายตัวเลขสำคัญและแนวทางปรับปรุง";

const EN_CONVERSATION: &str = "You are an AI assistant supporting Thai SMEs (small and medium enterprises) through a LINE Official Account.

Your role:
- Business advisor who understands the Thai SME context
- Give practical guidance on finance, digital marketing, online sales and operations
- Communicate in a friendly, easy-to-understand way
- Be aware of Thai regulations such as PDPA, taxes and licensing

Guidelines:
- Suggest simple, actionable steps a small business can take now
- Mention government resources like OSMEP or SME One when relevant
- Ask a follow-up question when the request is unclear";

const EN_IMAGE: &str = "You are an AI assistant that analyzes images for Thai SMEs.

- Describe what you see in detail
- Identify business documents (receipts, bills, contracts) if present
- Suggest improvements for product or marketing images
- For documents, summarize the key content and recommend next steps";

const EN_FILE: &str = "You are an AI assistant that analyzes files for Thai SMEs.

- Give a clear summary of the key content
- Point out what the business should know, including opportunities and risks
- Recommend concrete next steps
- For financial documents, explain the important numbers and possible improvements";

const JA_CONVERSATION: &str = "あなたはタイのSME（中小企業）を支援するLINE公式アカウントのAIアシスタントです。タイのビジネス事情を踏まえ、財務、デジタルマーケティング、オンライン販売、事業運営について実践的な助言をしてください。";
const JA_IMAGE: &str = "タイのSME向けに画像を分析するAIアシスタントです。ビジネス文書や商品画像を見分け、SMEに役立つ助言をしてください。";
const JA_FILE: &str = "タイのSME向けにファイルを分析するAIアシスタントです。重要なポイントを整理し、実行可能な提案をしてください。";

const KO_CONVERSATION: &str = "당신은 태국 중소기업(SME)을 지원하는 LINE 공식 계정 AI 어시스턴트입니다. 태국 비즈니스 환경을 이해하고 금융, 디지털 마케팅, 온라인 판매, 운영에 대해 실용적인 조언을 제공하세요.";
const KO_IMAGE: &str = "태국 중소기업을 위해 이미지를 분석하는 AI 어시스턴트입니다. 비즈니스 문서나 제품 이미지를 파악하고 관련 조언을 제공하세요.";
const KO_FILE: &str = "태국 중소기업을 위해 파일을 분석하는 AI 어시스턴트입니다. 핵심 내용을 정리하고 실행 가능한 권장 사항을 제공하세요.";

/// System prompt for a language and interaction kind
pub fn system_prompt(language: Language, kind: PromptKind) -> &'static str {
    use PromptKind::*;
    match (language, kind) {
        (Language::Th, Conversation) => TH_CONVERSATION,
        (Language::Th, ImageAnalysis) => TH_IMAGE,
        (Language::Th, FileAnalysis) => TH_FILE,
        (Language::Ja, Conversation) => JA_CONVERSATION,
        (Language::Ja, ImageAnalysis) => JA_IMAGE,
        (Language::Ja, FileAnalysis) => JA_FILE,
        (Language::Ko, Conversation) => KO_CONVERSATION,
        (Language::Ko, ImageAnalysis) => KO_IMAGE,
        (Language::Ko, FileAnalysis) => KO_FILE,
        (Language::En | Language::Zh, Conversation) => EN_CONVERSATION,
        (Language::En | Language::Zh, ImageAnalysis) => EN_IMAGE,
        (Language::En | Language::Zh, FileAnalysis) => EN_FILE,
    }
}

/// Localized error message
pub fn error_message(language: Language, kind: ErrorKind) -> &'static str {
    use ErrorKind::*;
    match language {
        Language::Th => match kind {
            OpenAiError => "เกิดข้อผิดพลาดในการประมวลผล กรุณาลองใหม่อีกครั้ง",
            InvalidImage => "ไม่สามารถวิเคราะห์รูปภาพได้ กรุณาส่งรูปภาพที่ชัดเจน",
            ProcessingError => "เกิดข้อผิดพลาดในการประมวลผลไฟล์ กรุณาลองใหม่",
            UnsupportedFile => "ประเภทไฟล์นี้ไม่รองรับ กรุณาส่งไฟล์ประเภทอื่น",
            FileTooLarge => "ไฟล์มีขนาดเกิน 20MB กรุณาส่งไฟล์ที่เล็กกว่า",
            RateLimited => "คุณส่งข้อความเร็วเกินไป กรุณารอสักครู่แล้วลองใหม่",
            UnsupportedMessage => "ขออภัย ยังไม่รองรับข้อความประเภทนี้ กรุณาส่งข้อความ รูปภาพ หรือไฟล์",
        },
        Language::En | Language::Zh => match kind {
            OpenAiError => "An error occurred while processing. Please try again.",
            InvalidImage => "Unable to analyze the image. Please send a clear image.",
            ProcessingError => "An error occurred while processing the file. Please try again.",
            UnsupportedFile => "This file type is not supported. Please send a different file type.",
            FileTooLarge => "File size exceeds 20MB limit. Please upload a smaller file.",
            RateLimited => "You're sending messages too quickly. Please wait a moment and try again.",
            UnsupportedMessage => "Sorry, this message type isn't supported yet. Please send text, an image, or a file.",
        },
        Language::Ja => match kind {
            OpenAiError => "処理中にエラーが発生しました。もう一度お試しください。",
            InvalidImage => "画像を分析できません。鮮明な画像を送信してください。",
            ProcessingError => "ファイルの処理中にエラーが発生しました。もう一度お試しください。",
            UnsupportedFile => "このファイル形式はサポートされていません。別の形式で送信してください。",
            FileTooLarge => "ファイルサイズが20MBの上限を超えています。小さいファイルを送信してください。",
            RateLimited => "メッセージの送信が速すぎます。少し待ってからお試しください。",
            UnsupportedMessage => "このメッセージ形式には対応していません。テキスト、画像、ファイルを送信してください。",
        },
        Language::Ko => match kind {
            OpenAiError => "처리 중 오류가 발생했습니다. 다시 시도해 주세요.",
            InvalidImage => "이미지를 분석할 수 없습니다. 선명한 이미지를 보내주세요.",
            ProcessingError => "파일 처리 중 오류가 발생했습니다. 다시 시도해 주세요.",
            UnsupportedFile => "이 파일 형식은 지원되지 않습니다. 다른 형식으로 보내주세요.",
            FileTooLarge => "파일 크기가 20MB 제한을 초과합니다. 더 작은 파일을 보내주세요.",
            RateLimited => "메시지를 너무 빠르게 보내고 있습니다. 잠시 후 다시 시도해 주세요.",
            UnsupportedMessage => "이 메시지 형식은 아직 지원되지 않습니다. 텍스트, 이미지 또는 파일을 보내주세요.",
        },
    }
}

/// `/help` reply
pub fn help_message(language: Language) -> &'static str {
    match language {
        Language::Th => "🤖 ผู้ช่วย AI สำหรับ SME

ช่วยอะไรได้บ้าง:
📝 สนทนาเรื่องธุรกิจ ถามได้ทุกเรื่อง
🖼️ วิเคราะห์รูปภาพ ส่งรูปมาได้เลย
📄 สรุปไฟล์ เอกสาร สเปรดชีต งานนำเสนอ หรือโค้ด

คำสั่ง:
/help - แสดงวิธีใช้งาน
/lang - เปลี่ยนภาษา
/clear - ล้างประวัติการสนทนา
/status - ดูสถานะการสนทนา

ไฟล์ที่รองรับ: PDF, DOCX, TXT, MD, XLSX, CSV, PPTX และไฟล์โค้ด",
        Language::En | Language::Zh => "🤖 SME AI Assistant Help

I can help you with:
📝 Text conversations - ask me anything about your business
🖼️ Image analysis - send me an image
📄 File processing - documents, spreadsheets, presentations or code

Commands:
/help - Show this help message
/lang - Change language
/clear - Clear conversation history
/status - Show conversation status

Supported files: PDF, DOCX, TXT, MD, XLSX, CSV, PPTX and code files",
        Language::Ja => "🤖 SME AIアシスタント ヘルプ

できること:
📝 テキスト会話 - 何でも聞いてください
🖼️ 画像解析 - 画像を送信してください
📄 ファイル処理 - 文書、スプレッドシート、プレゼンテーション、コード

コマンド:
/help - ヘルプを表示
/lang - 言語を変更
/clear - 会話履歴をクリア
/status - 会話の状態を表示

対応ファイル: PDF, DOCX, TXT, MD, XLSX, CSV, PPTX, コードファイル",
        Language::Ko => "🤖 SME AI 어시스턴트 도움말

도와드릴 수 있는 것:
📝 텍스트 대화 - 무엇이든 물어보세요
🖼️ 이미지 분석 - 이미지를 보내주세요
📄 파일 처리 - 문서, 스프레드시트, 프레젠테이션, 코드

명령어:
/help - 도움말 표시
/lang - 언어 변경
/clear - 대화 기록 지우기
/status - 대화 상태 보기

지원 파일: PDF, DOCX, TXT, MD, XLSX, CSV, PPTX, 코드 파일",
    }
}

/// `/lang` reply listing the supported codes
pub fn language_menu() -> String {
    let mut menu = String::from("🌐 Language / ภาษา\n\n");
    for lang in Language::ALL {
        menu.push_str(&format!("/lang {} - {}\n", lang.code(), lang.display_name()));
    }
    menu.trim_end().to_string()
}

/// Confirmation after `/lang <code>`
pub fn language_updated(language: Language) -> &'static str {
    match language {
        Language::Th => "เปลี่ยนภาษาเรียบร้อยแล้ว",
        Language::En => "Language updated successfully!",
        Language::Ja => "言語が更新されました！",
        Language::Ko => "언어가 변경되었습니다!",
        Language::Zh => "语言已更新！",
    }
}

/// Confirmation after `/clear`
pub fn history_cleared(language: Language) -> &'static str {
    match language {
        Language::Th => "ล้างประวัติการสนทนาเรียบร้อยแล้ว",
        Language::Ja => "会話履歴をクリアしました！",
        Language::Ko => "대화 기록을 지웠습니다!",
        Language::En | Language::Zh => "Conversation history cleared!",
    }
}

/// `/status` reply
pub fn status_message(language: Language, history_len: usize) -> String {
    match language {
        Language::Th => format!(
            "📊 สถานะ\nประวัติการสนทนา: {} ข้อความ\nภาษา: {}",
            history_len,
            language.display_name()
        ),
        _ => format!(
            "📊 Status\nConversation history: {} messages\nLanguage: {}",
            history_len,
            language.display_name()
        ),
    }
}

/// Reply to a follow event
pub fn welcome_message(language: Language, user_name: &str) -> String {
    match language {
        Language::Th => format!(
            "🎉 ยินดีต้อนรับคุณ {}!\n\nผมเป็นผู้ช่วย AI สำหรับ SME ไทย ช่วยได้ทั้ง:\n\n📝 ตอบคำถามธุรกิจ\n🖼️ วิเคราะห์รูปภาพ\n📄 สรุปไฟล์ (PDF, DOCX, XLSX, PPTX, โค้ด)\n\nพิมพ์ /help เพื่อดูวิธีใช้งาน หรือเริ่มพิมพ์คำถามได้เลย!",
            user_name
        ),
        _ => format!(
            "🎉 Welcome {}!\n\nI'm your AI assistant powered by Azure OpenAI. I can help you with:\n\n📝 Text conversations\n🖼️ Image analysis\n📄 File processing (PDF, DOCX, XLSX, PPTX, code files)\n\nSend me /help for more information or just start chatting!",
            user_name
        ),
    }
}

/// Prompt sent with an extracted file
pub fn file_prompt(file_name: &str, content: &str, request: &str) -> String {
    format!(
        "File name: {}\n\nFile content:\n{}\n\nUser request: {}",
        file_name, content, request
    )
}

/// Default request attached to an uploaded file
pub fn default_file_request(language: Language) -> &'static str {
    match language {
        Language::Th => "กรุณาวิเคราะห์และสรุปเนื้อหาของไฟล์นี้",
        _ => "Please analyze and summarize this file.",
    }
}

/// Default request attached to an uploaded image
pub fn default_image_request(language: Language) -> &'static str {
    match language {
        Language::Th => "กรุณาวิเคราะห์รูปภาพนี้",
        _ => "Please analyze this image.",
    }
}
