/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use static_assertions::assert_impl_all;

/// Ambient caller state carried across an asynchronous hand-off.
///
/// An `ExecutionContext` is captured by the caller at submission time and
/// handed back, as an ordinary value, to whatever callback ends up running on
/// a pool task. There is no thread-local involved: the context travels with
/// the work item itself, so the callback observes the submitter's context no
/// matter which task executes it.
///
/// Contexts are cheap to clone; the entry map is shared behind an `Arc` and
/// copied only when a new entry is added.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    correlation: Option<Arc<str>>,
    entries: Arc<BTreeMap<String, String>>,
}

impl ExecutionContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying a correlation label, surfaced on tracing spans.
    pub fn named(correlation: impl AsRef<str>) -> Self {
        Self {
            correlation: Some(Arc::from(correlation.as_ref())),
            entries: Arc::new(BTreeMap::new()),
        }
    }

    /// Returns a context with `key` set to `value`, leaving `self`'s shared
    /// entries untouched.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(key.into(), value.into());
        Self {
            correlation: self.correlation.clone(),
            entries: Arc::new(entries),
        }
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The correlation label, if one was set.
    pub fn correlation(&self) -> Option<&str> {
        self.correlation.as_deref()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.correlation {
            Some(correlation) => write!(f, "{correlation}")?,
            None => write!(f, "anonymous")?,
        }
        for (key, value) in self.entries.iter() {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

// Contexts cross task boundaries on every pool hand-off.
assert_impl_all!(ExecutionContext: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_does_not_disturb_the_source_context() {
        let base = ExecutionContext::named("request-7");
        let derived = base.with("tenant", "blue");
        assert_eq!(base.get("tenant"), None);
        assert_eq!(derived.get("tenant"), Some("blue"));
        assert_eq!(derived.correlation(), Some("request-7"));
    }

    #[test]
    fn display_renders_correlation_and_entries() {
        let context = ExecutionContext::named("job-1").with("locale", "en-US");
        assert_eq!(context.to_string(), "job-1 locale=en-US");
    }
}
