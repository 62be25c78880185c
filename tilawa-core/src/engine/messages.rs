//! User-facing status text.

use serde::{Deserialize, Serialize};

use crate::ipc::events::SessionStatus;
use crate::recognizer::RecognitionErrorKind;

/// Text shown for each status and recognizer error. Defaults are Arabic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct StatusMessages {
    pub ready: String,
    pub listening: String,
    pub matched: String,
    pub completed: String,
    pub stopped: String,
    pub permission_denied: String,
    pub no_match: String,
    pub speech_timeout: String,
    pub network: String,
    pub network_timeout: String,
    pub audio: String,
    pub generic_error: String,
    pub start_failed: String,
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            ready: "جاهز للاستماع...".into(),
            listening: "جارٍ الاستماع...".into(),
            matched: "أحسنت، استمر...".into(),
            completed: "أحسنت! لقد أكملت السورة".into(),
            stopped: "تم إيقاف الاستماع".into(),
            permission_denied: "يرجى منح إذن الميكروفون والمحاولة مرة أخرى".into(),
            no_match: "لم يتم التعرف على الكلام. حاول مرة أخرى".into(),
            speech_timeout: "لم يتم اكتشاف صوت".into(),
            network: "تحقق من اتصال الإنترنت".into(),
            network_timeout: "انتهت مهلة الاتصال بالشبكة".into(),
            audio: "خطأ في تسجيل الصوت".into(),
            generic_error: "حدث خطأ. حاول مرة أخرى".into(),
            start_failed: "خطأ في بدء التعرف على الكلام".into(),
        }
    }
}

impl StatusMessages {
    pub fn describe(&self, status: &SessionStatus) -> String {
        match status {
            SessionStatus::Idle => String::new(),
            SessionStatus::ReadyToListen => self.ready.clone(),
            SessionStatus::Listening => self.listening.clone(),
            SessionStatus::Matched => self.matched.clone(),
            SessionStatus::Completed => self.completed.clone(),
            SessionStatus::Stopped => self.stopped.clone(),
            SessionStatus::Error(message) => message.clone(),
        }
    }

    pub fn for_error(&self, kind: RecognitionErrorKind) -> &str {
        match kind {
            RecognitionErrorKind::PermissionDenied => &self.permission_denied,
            RecognitionErrorKind::NoSpeechDetected => &self.no_match,
            RecognitionErrorKind::SpeechTimeout => &self.speech_timeout,
            RecognitionErrorKind::Network => &self.network,
            RecognitionErrorKind::NetworkTimeout => &self.network_timeout,
            RecognitionErrorKind::Audio => &self.audio,
            RecognitionErrorKind::Generic(_) => &self.generic_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_describes_its_own_message() {
        let messages = StatusMessages::default();
        let status = SessionStatus::Error(messages.for_error(RecognitionErrorKind::Network).into());
        assert_eq!(messages.describe(&status), "تحقق من اتصال الإنترنت");
    }

    #[test]
    fn generic_codes_share_one_message() {
        let messages = StatusMessages::default();
        assert_eq!(
            messages.for_error(RecognitionErrorKind::Generic(4)),
            messages.for_error(RecognitionErrorKind::Generic(8))
        );
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let messages: StatusMessages =
            serde_json::from_str(r#"{"completed":"Done!"}"#).expect("parse messages");
        assert_eq!(messages.describe(&SessionStatus::Completed), "Done!");
        assert_eq!(messages.stopped, StatusMessages::default().stopped);
    }
}
