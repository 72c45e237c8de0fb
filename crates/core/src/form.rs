use serde::Serialize;

/// Identifies one rendered lead form so the view can remove it after submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(pub u64);

impl FormId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Contact details collected through the in-transcript form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
}

impl LeadForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.email.is_empty()
    }

    /// Turn content sent to the backend.
    pub fn to_turn_content(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// How an assistant reply should be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    Text(String),
    /// The sentinel was present; `text` is the reply with the marker removed.
    LeadForm { text: String },
}

impl ReplyKind {
    pub fn classify(reply: &str, sentinel: &str) -> Self {
        if sentinel.is_empty() || !reply.contains(sentinel) {
            return Self::Text(reply.to_string());
        }

        Self::LeadForm {
            text: reply.replace(sentinel, "").trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_switches_to_form_and_is_stripped() {
        assert_eq!(
            ReplyKind::classify("Deixe os seus dados [[LEAD_FORM]]", "[[LEAD_FORM]]"),
            ReplyKind::LeadForm {
                text: "Deixe os seus dados".to_string()
            }
        );
        assert_eq!(
            ReplyKind::classify("[[LEAD_FORM]]", "[[LEAD_FORM]]"),
            ReplyKind::LeadForm {
                text: String::new()
            }
        );
        assert_eq!(
            ReplyKind::classify("plain reply", "[[LEAD_FORM]]"),
            ReplyKind::Text("plain reply".to_string())
        );
    }

    #[test]
    fn form_serializes_trimmed_fields() {
        let form = LeadForm::new(" Ana ", "ana@example.com ");
        assert_eq!(
            form.to_turn_content().expect("encode"),
            r#"{"name":"Ana","email":"ana@example.com"}"#
        );
        assert!(LeadForm::new(" ", "").is_blank());
    }
}
