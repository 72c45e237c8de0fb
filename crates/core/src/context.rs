use chatlet_storage::{SharedStore, SubjectId};

/// The subject the conversation is about, plus notification dedup state.
pub struct ContextModel {
    current: Option<SubjectId>,
    last_notified: Option<SubjectId>,
    store: SharedStore,
    key: String,
}

impl ContextModel {
    /// Launch parameter first, persisted value second.
    pub fn resolve_initial(
        launch_subject: Option<SubjectId>,
        store: SharedStore,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let current = launch_subject.or_else(|| match store.get(&key) {
            Ok(stored) => SubjectId::from_optional(stored.as_deref()),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "stored subject could not be read");
                None
            }
        });

        Self {
            current,
            last_notified: None,
            store,
            key,
        }
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.current.as_ref()
    }

    pub fn last_notified(&self) -> Option<&SubjectId> {
        self.last_notified.as_ref()
    }

    /// Replaces the current subject; present values are persisted.
    pub fn set_subject(&mut self, subject: Option<SubjectId>) {
        if let Some(subject) = &subject
            && let Err(error) = self.store.set(&self.key, subject.as_str())
        {
            tracing::warn!(key = %self.key, error = %error, "subject not persisted");
        }
        self.current = subject;
    }

    pub fn should_notify(&self) -> bool {
        match &self.current {
            Some(current) => self.last_notified.as_ref() != Some(current),
            None => false,
        }
    }

    pub fn mark_notified(&mut self) {
        if self.current.is_some() {
            self.last_notified = self.current.clone();
        }
    }

    /// Returns the subject to report, marking it notified in the same step.
    ///
    /// The context sink gives no delivery confirmation, so the mark is set as
    /// soon as the send is attempted.
    pub fn take_pending_notification(&mut self) -> Option<SubjectId> {
        if !self.should_notify() {
            return None;
        }
        self.mark_notified();
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chatlet_storage::{KeyValueStore, MemoryStore};

    use super::*;

    fn subject(raw: &str) -> Option<SubjectId> {
        SubjectId::from_optional(Some(raw))
    }

    #[test]
    fn launch_parameter_overrides_storage() {
        let store = Rc::new(MemoryStore::new());
        store.set("urlId", "stored").ok();

        let model = ContextModel::resolve_initial(subject("launch"), store.clone(), "urlId");
        assert_eq!(model.subject().map(SubjectId::as_str), Some("launch"));

        let model = ContextModel::resolve_initial(None, store, "urlId");
        assert_eq!(model.subject().map(SubjectId::as_str), Some("stored"));
    }

    #[test]
    fn set_subject_persists_only_present_values() {
        let store = Rc::new(MemoryStore::new());
        let mut model = ContextModel::resolve_initial(None, store.clone(), "urlId");

        model.set_subject(subject("42"));
        assert_eq!(store.get("urlId").ok().flatten().as_deref(), Some("42"));

        model.set_subject(None);
        assert_eq!(model.subject(), None);
        assert_eq!(store.get("urlId").ok().flatten().as_deref(), Some("42"));
    }

    #[test]
    fn notifications_fire_once_per_distinct_consecutive_subject() {
        let store = Rc::new(MemoryStore::new());
        let mut model = ContextModel::resolve_initial(None, store, "urlId");
        let sequence = [
            Some("1"),
            Some("1"),
            None,
            Some("1"),
            Some("2"),
            Some("2"),
            Some("1"),
            None,
            None,
        ];

        let mut notified = Vec::new();
        for raw in sequence {
            model.set_subject(raw.and_then(|value| subject(value)));
            if let Some(reported) = model.take_pending_notification() {
                notified.push(reported.into_string());
            }
        }

        assert_eq!(notified, vec!["1", "2", "1"]);
    }

    #[test]
    fn absent_subject_never_notifies() {
        let store = Rc::new(MemoryStore::new());
        let mut model = ContextModel::resolve_initial(None, store, "urlId");
        assert!(!model.should_notify());
        model.mark_notified();
        assert_eq!(model.last_notified(), None);
    }
}
