//! Scripted capabilities shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use triage_rs::error::{Error, Result};
use triage_rs::llm::{Classifier, GroupingRequest, GroupingService};
use triage_rs::model::{Classification, ItemId, ItemUpdate, WorkItem};
use triage_rs::store::{ItemStore, MemoryStore};

/// Classifies by email subject. Unknown subjects fail.
#[derive(Default)]
pub struct ScriptedClassifier {
    by_subject: HashMap<String, Classification>,
    pub calls: AtomicUsize,
    pub contexts: Mutex<Vec<Option<String>>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, subject: &str, category: &str, summary: &str) -> Self {
        let mut classification = Classification::new(category);
        classification.summary = Some(summary.to_string());
        classification.confidence = Some(0.9);
        self.by_subject.insert(subject.to_string(), classification);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, content: &str, context: Option<&str>) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .unwrap()
            .push(context.map(str::to_string));

        let subject = content
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("Subject: "))
            .unwrap_or_default();
        self.by_subject
            .get(subject)
            .cloned()
            .ok_or_else(|| Error::Classifier(format!("model timed out on {subject:?}")))
    }
}

/// Replies per category with canned text, or fails.
#[derive(Default)]
pub struct ScriptedGrouping {
    replies: HashMap<String, std::result::Result<String, String>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGrouping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, category: &str, raw: &str) -> Self {
        self.replies.insert(category.to_string(), Ok(raw.to_string()));
        self
    }

    pub fn fail(mut self, category: &str, message: &str) -> Self {
        self.replies
            .insert(category.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupingService for ScriptedGrouping {
    async fn find_duplicate_groups(&self, request: &GroupingRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match self.replies.get(&request.category) {
            Some(Ok(raw)) => Ok(raw.clone()),
            Some(Err(message)) => Err(Error::GroupingService(message.clone())),
            None => Ok(r#"{"duplicate_groups": [], "reasoning": "none"}"#.to_string()),
        }
    }
}

/// A memory store whose updates fail for chosen items.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_updates: HashSet<String>,
}

impl FlakyStore {
    pub fn new(items: Vec<WorkItem>, failing_updates: &[&str]) -> Self {
        Self {
            inner: MemoryStore::with_items(items),
            failing_updates: failing_updates.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn get(&self, id: &ItemId) -> Result<WorkItem> {
        self.inner.get(id).await
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<WorkItem>> {
        self.inner.get_by_category(category).await
    }

    async fn categories(&self) -> Result<Vec<String>> {
        self.inner.categories().await
    }

    async fn update(&self, id: &ItemId, update: &ItemUpdate) -> Result<()> {
        if self.failing_updates.contains(id.as_str()) {
            return Err(Error::Persistence(format!("update {id}: connection reset")));
        }
        self.inner.update(id, update).await
    }

    async fn delete(&self, id: &ItemId) -> Result<()> {
        self.inner.delete(id).await
    }
}

pub fn email(id: &str, subject: &str) -> WorkItem {
    WorkItem::new(id, subject, "inbox").description(format!("Body of {subject}"))
}

pub fn task(id: &str, title: &str, category: &str) -> WorkItem {
    WorkItem::new(id, title, category)
}
